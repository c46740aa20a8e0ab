//! Vehicle state record

use serde::{Deserialize, Serialize};

/// The simulated vehicle
///
/// Only the physics engine holds this mutably. Everyone else receives it by
/// value, which makes every read a consistent snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Road speed (km/h), never negative
    pub speed_kmh: f64,
    /// Engine speed
    pub rpm: f64,
    /// Selected gear, 1-based
    pub gear: u8,
    /// Engine running
    pub engine_on: bool,
    /// Conditioned throttle intensity (0..1)
    pub throttle: f64,
    /// Conditioned brake intensity (0..1)
    pub brake: f64,
    /// Physics ticks since startup
    pub ticks: u64,
    /// Simulated seconds since startup
    pub elapsed_s: f64,
    /// Incremented on every reset
    pub epoch: u32,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            speed_kmh: 0.0,
            rpm: 0.0,
            gear: 1,
            engine_on: false,
            throttle: 0.0,
            brake: 0.0,
            ticks: 0,
            elapsed_s: 0.0,
            epoch: 0,
        }
    }
}

impl VehicleState {
    /// Fresh vehicle: engine off, first gear, at rest
    pub fn new() -> Self {
        Self::default()
    }

    /// Startup motion state, keeping the simulation clock
    pub fn reset(&mut self) {
        *self = Self {
            ticks: self.ticks,
            elapsed_s: self.elapsed_s,
            epoch: self.epoch.wrapping_add(1),
            ..Self::default()
        };
    }

    /// True when every floating-point field holds a finite value
    pub fn is_finite(&self) -> bool {
        [
            self.speed_kmh,
            self.rpm,
            self.throttle,
            self.brake,
            self.elapsed_s,
        ]
        .iter()
        .all(|v| v.is_finite())
    }

    /// RPM scaled for plotting next to speed
    pub fn rpm_scaled(&self) -> f64 {
        self.rpm / 100.0
    }
}
