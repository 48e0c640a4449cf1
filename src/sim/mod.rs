pub mod event;
pub mod runner;
pub mod telemetry;

pub use event::{FlightPhase, LandingOutcome, Touchdown};
pub use runner::Simulator;
pub use telemetry::{Telemetry, TelemetryExtras};
