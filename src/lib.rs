// ================================
// src/lib.rs
// ================================
pub mod commander;
pub mod config;
pub mod error;
pub mod hardware;
pub mod sonar;
pub mod steering;

pub use commander::{make_commander, Command, Commander, CommanderKind};
pub use config::RoverParams;
pub use error::{HardwareError, SonarError};
pub use sonar::{RangeFinder, Sonar};
pub use steering::{Direction, SteeringGear};
