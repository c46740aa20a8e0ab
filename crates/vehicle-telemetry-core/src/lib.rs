//! # Vehicle Telemetry Core Library
//!
//! Core functionality for the vehicle telemetry simulator.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - A fixed-timestep longitudinal vehicle model (speed, RPM, gears)
//! - A control surface for throttle, brake, engine and gear input
//! - Plausible auxiliary sensor readings (coolant, fuel, battery)
//! - Periodic telemetry logging to CSV or JSON Lines
//! - A dashboard feed with bounded plot history
//!
//! ## Example
//!
//! ```rust,ignore
//! use vehicle_telemetry_core::prelude::*;
//!
//! let handle = Simulator::new(SimConfig::default())?.start()?;
//! let controls = handle.controls();
//! controls.toggle_engine();
//! controls.set_throttle(true);
//!
//! tokio::time::sleep(std::time::Duration::from_secs(2)).await;
//! println!("Speed: {:.1} km/h", handle.snapshot().speed_kmh);
//!
//! let summary = handle.shutdown().await?;
//! println!("Rows written: {}", summary.log.written);
//! ```

pub mod config;
pub mod dashboard;
pub mod datalog;
pub mod error;
pub mod physics;
pub mod runtime;
pub mod sensors;
pub mod simulation;
pub mod unit_conversion;
pub mod vehicle;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{SimConfig, TelemetrySettings, VehicleParams};
    pub use crate::dashboard::{DashboardFrame, DisplaySink, HeadlessDisplay, RenderError};
    pub use crate::datalog::{read_records, LogFormat, LogRecord, TelemetryLogger};
    pub use crate::error::SimError;
    pub use crate::physics::PhysicsEngine;
    pub use crate::runtime::{RunSummary, Simulator, SimulatorHandle};
    pub use crate::sensors::{SensorReading, SensorSource};
    pub use crate::simulation::{Simulation, TickReport};
    pub use crate::unit_conversion::UnitSystem;
    pub use crate::vehicle::{ControlSurface, VehicleState};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
