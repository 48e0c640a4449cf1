pub mod aerodynamics;
pub mod planet;

pub use planet::{presets, AtmosphereModel, Planet};
