pub mod rigid_body;
pub mod state;

pub use rigid_body::{step, AppliedForces};
pub use state::{KinematicState, G0};
