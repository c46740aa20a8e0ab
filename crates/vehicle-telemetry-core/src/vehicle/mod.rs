//! Vehicle
//!
//! The shared vehicle record and the driver's control inputs.

mod controls;
mod state;

pub use controls::{ControlFrame, ControlIntent, ControlSurface};
pub use state::VehicleState;
