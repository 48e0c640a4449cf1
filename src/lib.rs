pub mod config;
pub mod dynamics;
pub mod emergency;
pub mod error;
pub mod gnc;
pub mod physics;
pub mod propulsion;
pub mod sim;
pub mod vehicle;

pub use config::{InactivePolicy, ScenarioConfig, SimConfig};
pub use emergency::{EmergencyScenario, EmergencyScenarioHandler};
pub use error::{ConfigError, SimError, SolverError};
pub use gnc::{Controller, ControllerConfig, ControllerKind};
pub use physics::Planet;
pub use sim::{FlightPhase, LandingOutcome, Simulator, Telemetry};
pub use vehicle::{Engine, Lander, LanderBuilder, VehicleKind};
