//! Simulator configuration
//!
//! Every tunable of the simulator lives in [`SimConfig`], stored as JSON.
//! Missing fields fall back to their defaults, so a config file only needs the
//! values it wants to change.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read or written
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Config file is not valid JSON for [`SimConfig`]
    #[error("Malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A parameter is out of range
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        /// Dotted path of the offending field, e.g. `vehicle.drag_coeff`
        field: &'static str,
        /// What the field must satisfy
        message: String,
    },
}

/// Top-level simulator configuration stored in `simulator.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Vehicle and drivetrain parameters
    pub vehicle: VehicleParams,

    /// Pedal ramp timing
    pub controls: ControlParams,

    /// Sensor model parameters
    pub sensors: SensorParams,

    /// Cadences and log destination
    pub telemetry: TelemetrySettings,
}

/// Physical parameters of the simulated vehicle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VehicleParams {
    /// Acceleration at full throttle in first gear (m/s²)
    pub max_drive_accel_mps2: f64,

    /// Deceleration at full brake (m/s²)
    pub max_brake_decel_mps2: f64,

    /// Linear drag coefficient (1/s), deceleration = coeff * v
    pub drag_coeff: f64,

    /// Engine-braking deceleration at redline with the throttle closed (m/s²)
    pub engine_brake_decel_mps2: f64,

    /// Absolute clamp on net acceleration (m/s²)
    pub accel_limit_mps2: f64,

    /// Top speed clamp (km/h)
    pub max_speed_kmh: f64,

    /// Engine idle speed
    pub idle_rpm: f64,

    /// Engine maximum speed
    pub redline_rpm: f64,

    /// Width of the rev limiter band below redline over which drive fades out
    pub rev_limiter_band_rpm: f64,

    /// RPM decay rate when the engine is off (rpm/s)
    pub engine_off_decay_rpm_per_s: f64,

    /// Wheel rolling radius (m)
    pub wheel_radius_m: f64,

    /// Differential ratio
    pub final_drive: f64,

    /// Gear ratios, first gear first
    pub gear_ratios: Vec<f64>,

    /// Shift automatically at the thresholds below
    pub auto_shift: bool,

    /// Auto-shift upshift threshold
    pub shift_up_rpm: f64,

    /// Auto-shift downshift threshold
    pub shift_down_rpm: f64,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            max_drive_accel_mps2: 3.5,
            max_brake_decel_mps2: 8.5,
            drag_coeff: 0.015,
            engine_brake_decel_mps2: 0.8,
            accel_limit_mps2: 9.0,
            max_speed_kmh: 220.0,
            idle_rpm: 800.0,
            redline_rpm: 6500.0,
            rev_limiter_band_rpm: 400.0,
            engine_off_decay_rpm_per_s: 3000.0,
            wheel_radius_m: 0.31,
            final_drive: 3.42,
            gear_ratios: vec![3.8, 2.2, 1.5, 1.0, 0.8, 0.68],
            auto_shift: false,
            shift_up_rpm: 3000.0,
            shift_down_rpm: 1100.0,
        }
    }
}

impl VehicleParams {
    /// Highest selectable gear
    pub fn max_gear(&self) -> u8 {
        self.gear_ratios.len() as u8
    }

    /// Ratio of the given gear, `None` when out of range
    pub fn gear_ratio(&self, gear: u8) -> Option<f64> {
        if gear == 0 {
            return None;
        }
        self.gear_ratios.get(gear as usize - 1).copied()
    }
}

/// Pedal ramp timing: seconds to go from 0 to 1 (rise) and 1 to 0 (fall)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControlParams {
    /// Throttle press time (s)
    pub throttle_rise_s: f64,
    /// Throttle release time (s)
    pub throttle_fall_s: f64,
    /// Brake press time (s)
    pub brake_rise_s: f64,
    /// Brake release time (s)
    pub brake_fall_s: f64,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            throttle_rise_s: 0.3,
            throttle_fall_s: 0.2,
            brake_rise_s: 0.15,
            brake_fall_s: 0.15,
        }
    }
}

/// Sensor model parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SensorParams {
    /// RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,

    /// Coolant temperature at startup (°C)
    pub coolant_start_c: f64,

    /// Ambient temperature the coolant relaxes to with the engine off (°C)
    pub ambient_c: f64,

    /// Coolant operating temperature at idle (°C)
    pub coolant_operating_c: f64,

    /// Additional coolant temperature at redline (°C)
    pub coolant_rpm_rise_c: f64,

    /// Coolant time constant (s)
    pub coolant_time_constant_s: f64,

    /// Maximum random-walk step per sample (°C)
    pub coolant_walk_c: f64,

    /// Fuel level at startup (%)
    pub fuel_start_pct: f64,

    /// Baseline fuel drain (%/s)
    pub fuel_drain_pct_per_s: f64,

    /// Additional drain at redline (%/s)
    pub fuel_drain_rpm_pct_per_s: f64,

    /// Charging voltage with the engine running (V)
    pub battery_charging_v: f64,

    /// Resting voltage with the engine off (V)
    pub battery_resting_v: f64,

    /// Peak voltage noise (V)
    pub battery_noise_v: f64,
}

impl Default for SensorParams {
    fn default() -> Self {
        Self {
            seed: None,
            coolant_start_c: 70.0,
            ambient_c: 20.0,
            coolant_operating_c: 88.0,
            coolant_rpm_rise_c: 8.0,
            coolant_time_constant_s: 60.0,
            coolant_walk_c: 0.3,
            fuel_start_pct: 80.0,
            fuel_drain_pct_per_s: 0.002,
            fuel_drain_rpm_pct_per_s: 0.02,
            battery_charging_v: 13.8,
            battery_resting_v: 12.5,
            battery_noise_v: 0.1,
        }
    }
}

/// Cadences and log destination
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Physics tick rate (Hz)
    pub tick_hz: u32,

    /// Dashboard refresh period (ms)
    pub ui_refresh_ms: u64,

    /// Number of points kept in the dashboard plot
    pub plot_history_len: usize,

    /// Log interval in simulated seconds
    pub log_interval_s: f64,

    /// Log file; `None` uses the default data directory
    pub log_path: Option<PathBuf>,

    /// Records that may wait for the log writer before new ones are dropped
    pub log_queue_depth: usize,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            tick_hz: 60,
            ui_refresh_ms: 100,
            plot_history_len: 600,
            log_interval_s: 2.0,
            log_path: None,
            log_queue_depth: 8,
        }
    }
}

impl TelemetrySettings {
    /// Fixed physics timestep
    pub fn dt(&self) -> f64 {
        1.0 / self.tick_hz as f64
    }

    /// Physics timestep as a [`Duration`]
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(self.dt())
    }

    /// Number of ticks between two log records (at least one)
    pub fn ticks_per_log(&self) -> u64 {
        (self.log_interval_s * self.tick_hz as f64).round().max(1.0) as u64
    }

    /// Log destination, falling back to the default location
    pub fn resolved_log_path(&self) -> PathBuf {
        self.log_path.clone().unwrap_or_else(default_log_path)
    }
}

/// Default log file: `<data dir>/vehicle-telemetry/logs/telemetry_log.csv`
pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vehicle-telemetry")
        .join("logs")
        .join("telemetry_log.csv")
}

impl SimConfig {
    /// Load a config from a JSON file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a config from JSON text and validate it
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reject values the physics cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = &self.vehicle;
        if v.gear_ratios.is_empty() || v.gear_ratios.len() > u8::MAX as usize {
            return Err(invalid("vehicle.gear_ratios", "need between 1 and 255 gears"));
        }
        if v.gear_ratios.iter().any(|r| !(*r > 0.0)) {
            return Err(invalid("vehicle.gear_ratios", "ratios must be positive"));
        }
        if v.gear_ratios.windows(2).any(|w| w[1] >= w[0]) {
            return Err(invalid(
                "vehicle.gear_ratios",
                "ratios must strictly decrease from first gear",
            ));
        }
        if !(v.idle_rpm > 0.0 && v.idle_rpm < v.redline_rpm) {
            return Err(invalid("vehicle.idle_rpm", "must be positive and below redline"));
        }
        if !(v.max_speed_kmh > 0.0) {
            return Err(invalid("vehicle.max_speed_kmh", "must be positive"));
        }
        if !(v.wheel_radius_m > 0.0 && v.final_drive > 0.0) {
            return Err(invalid("vehicle.wheel_radius_m", "wheel radius and final drive must be positive"));
        }
        if !(v.accel_limit_mps2 > 0.0) {
            return Err(invalid("vehicle.accel_limit_mps2", "must be positive"));
        }
        // A negative coefficient would turn a resisting force into thrust
        for (field, value) in [
            ("vehicle.max_drive_accel_mps2", v.max_drive_accel_mps2),
            ("vehicle.max_brake_decel_mps2", v.max_brake_decel_mps2),
            ("vehicle.drag_coeff", v.drag_coeff),
            ("vehicle.engine_brake_decel_mps2", v.engine_brake_decel_mps2),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(field, "must be finite and non-negative"));
            }
        }
        if !(v.shift_up_rpm > v.shift_down_rpm) {
            return Err(invalid("vehicle.shift_up_rpm", "must be above shift_down_rpm"));
        }
        if v.rev_limiter_band_rpm < 0.0 || v.engine_off_decay_rpm_per_s <= 0.0 {
            return Err(invalid(
                "vehicle.engine_off_decay_rpm_per_s",
                "decay must be positive and limiter band non-negative",
            ));
        }

        let c = &self.controls;
        for (field, value) in [
            ("controls.throttle_rise_s", c.throttle_rise_s),
            ("controls.throttle_fall_s", c.throttle_fall_s),
            ("controls.brake_rise_s", c.brake_rise_s),
            ("controls.brake_fall_s", c.brake_fall_s),
        ] {
            if !(value >= 0.0) {
                return Err(invalid(field, "ramp time cannot be negative"));
            }
        }

        let s = &self.sensors;
        if !(0.0..=100.0).contains(&s.fuel_start_pct) {
            return Err(invalid("sensors.fuel_start_pct", "must be within 0..=100"));
        }
        if s.fuel_drain_pct_per_s < 0.0 || s.fuel_drain_rpm_pct_per_s < 0.0 {
            return Err(invalid("sensors.fuel_drain_pct_per_s", "fuel cannot be added back"));
        }

        let t = &self.telemetry;
        if t.tick_hz == 0 {
            return Err(invalid("telemetry.tick_hz", "must be non-zero"));
        }
        if t.ui_refresh_ms == 0 {
            return Err(invalid("telemetry.ui_refresh_ms", "must be non-zero"));
        }
        if t.plot_history_len == 0 {
            return Err(invalid("telemetry.plot_history_len", "must be non-zero"));
        }
        if !(t.log_interval_s > 0.0) {
            return Err(invalid("telemetry.log_interval_s", "must be positive"));
        }
        if t.log_queue_depth == 0 {
            return Err(invalid("telemetry.log_queue_depth", "must be non-zero"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.vehicle.max_gear(), 6);
        assert_eq!(config.telemetry.ticks_per_log(), 120);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SimConfig::from_json(r#"{ "telemetry": { "tick_hz": 100 } }"#).unwrap();
        assert_eq!(config.telemetry.tick_hz, 100);
        assert_eq!(config.telemetry.ui_refresh_ms, 100);
        assert_eq!(config.vehicle, VehicleParams::default());
    }

    #[test]
    fn test_rejects_increasing_ratios() {
        let err = SimConfig::from_json(r#"{ "vehicle": { "gear_ratios": [1.0, 2.0] } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "vehicle.gear_ratios", .. }
        ));
    }

    #[test]
    fn test_rejects_negative_force_coefficients() {
        for field in [
            "max_drive_accel_mps2",
            "max_brake_decel_mps2",
            "drag_coeff",
            "engine_brake_decel_mps2",
        ] {
            let json = format!(r#"{{ "vehicle": {{ "{field}": -0.5 }} }}"#);
            let err = SimConfig::from_json(&json).unwrap_err();
            match err {
                ConfigError::InvalidValue { field: rejected, .. } => {
                    assert_eq!(rejected, format!("vehicle.{field}"));
                }
                other => panic!("unexpected error for {field}: {other}"),
            }
        }
    }

    #[test]
    fn test_rejects_non_finite_force_coefficient() {
        let mut config = SimConfig::default();
        config.vehicle.drag_coeff = f64::INFINITY;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "vehicle.drag_coeff", .. })
        ));
    }

    #[test]
    fn test_rejects_inverted_shift_thresholds() {
        let err = SimConfig::from_json(
            r#"{ "vehicle": { "shift_up_rpm": 1000.0, "shift_down_rpm": 2000.0 } }"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "vehicle.shift_up_rpm", .. }
        ));
    }

    #[test]
    fn test_gear_ratio_lookup() {
        let params = VehicleParams::default();
        assert_eq!(params.gear_ratio(0), None);
        assert_eq!(params.gear_ratio(1), Some(3.8));
        assert_eq!(params.gear_ratio(6), Some(0.68));
        assert_eq!(params.gear_ratio(7), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simulator.json");

        let mut config = SimConfig::default();
        config.sensors.seed = Some(42);
        config.telemetry.log_interval_s = 1.0;
        config.save(&path).unwrap();

        let loaded = SimConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
