pub mod engine;
pub mod lander;
pub mod presets;

pub use engine::Engine;
pub use lander::{Lander, LanderBuilder, DEFAULT_SPECIFIC_IMPULSE};
pub use presets::VehicleKind;
