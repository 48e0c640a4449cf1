pub mod config;
pub mod controller;
pub mod lqr;
pub mod mpc;
pub mod pid;
pub mod qp;
pub mod riccati;

pub use config::{ControllerConfig, ControllerKind, LqrConfig, MpcConfig, PidConfig};
pub use controller::{build_controller, Controller};
pub use lqr::LqrController;
pub use mpc::MpcController;
pub use pid::Pid;
pub use qp::{BoxQpSolver, ProjectedGradient};
pub use riccati::{ClosedFormCare, Kleinman, RiccatiSolver};
