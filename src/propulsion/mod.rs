pub mod allocator;
pub mod fuel;

pub use allocator::ThrustAllocator;
pub use fuel::{consume_fuel_for_thrusts, mass_flow_rate};
