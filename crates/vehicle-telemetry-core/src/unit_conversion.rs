//! Unit Conversion Functions
//!
//! Conversions used by the physics and the dashboard:
//! - Speed: km/h ↔ m/s, km/h → mph
//! - Temperature: °C → °F
//! - Rotation: wheel linear speed ↔ revolutions per minute

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Convert km/h to m/s
pub fn kmh_to_mps(kmh: f64) -> f64 {
    kmh / 3.6
}

/// Convert m/s to km/h
pub fn mps_to_kmh(mps: f64) -> f64 {
    mps * 3.6
}

/// Convert km/h to mph
pub fn kmh_to_mph(kmh: f64) -> f64 {
    kmh * 0.62137119223733
}

/// Convert Celsius to Fahrenheit
pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

/// Wheel revolutions per minute for a linear speed
///
/// # Arguments
/// * `mps` - Vehicle speed in m/s
/// * `wheel_radius_m` - Rolling radius of the driven wheel
pub fn wheel_rpm(mps: f64, wheel_radius_m: f64) -> f64 {
    mps / (2.0 * PI * wheel_radius_m) * 60.0
}

/// Display unit system for the dashboard
///
/// Physics and the telemetry log stay metric; only rendered values convert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// km/h and °C
    #[default]
    Metric,
    /// mph and °F
    Imperial,
}

impl UnitSystem {
    /// Speed in this system's unit, from km/h
    pub fn speed(&self, kmh: f64) -> f64 {
        match self {
            UnitSystem::Metric => kmh,
            UnitSystem::Imperial => kmh_to_mph(kmh),
        }
    }

    /// Temperature in this system's unit, from °C
    pub fn temperature(&self, celsius: f64) -> f64 {
        match self {
            UnitSystem::Metric => celsius,
            UnitSystem::Imperial => celsius_to_fahrenheit(celsius),
        }
    }

    /// Speed unit label
    pub fn speed_label(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "km/h",
            UnitSystem::Imperial => "mph",
        }
    }

    /// Temperature unit label
    pub fn temperature_label(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "°C",
            UnitSystem::Imperial => "°F",
        }
    }
}
