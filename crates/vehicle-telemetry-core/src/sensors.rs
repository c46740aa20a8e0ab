//! Sensor Source - auxiliary engine readings
//!
//! Generates plausible coolant temperature, fuel level and battery voltage
//! for a given vehicle snapshot. The values drift with bounded randomness
//! from a seedable generator, so tests can pin the sequence.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{SensorParams, SimConfig};
use crate::vehicle::VehicleState;

/// Upper bound of the coolant random-walk offset (°C)
const COOLANT_WALK_BOUND_C: f64 = 1.5;

/// Hottest coolant reading the model will report (°C)
const COOLANT_MAX_C: f64 = 125.0;

/// Largest downward jitter on the fuel gauge (%)
const FUEL_NOISE_PCT: f64 = 0.02;

/// Battery voltage clamp (V)
const BATTERY_MIN_V: f64 = 11.5;
const BATTERY_MAX_V: f64 = 14.4;

/// One set of auxiliary sensor values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Coolant temperature (°C)
    pub coolant_temp_c: f64,
    /// Fuel level (0..100 %)
    pub fuel_level_pct: f64,
    /// Battery voltage (V)
    pub battery_voltage_v: f64,
}

impl SensorReading {
    fn is_finite(&self) -> bool {
        self.coolant_temp_c.is_finite()
            && self.fuel_level_pct.is_finite()
            && self.battery_voltage_v.is_finite()
    }
}

/// Mutable model state behind the source's lock
#[derive(Debug)]
struct SensorModel {
    /// Noise generator
    rng: StdRng,
    /// Last reading handed out
    last: SensorReading,
    /// Coolant temperature without the random-walk offset
    coolant_base_c: f64,
    /// Current random-walk offset
    coolant_offset_c: f64,
    /// Fuel burnt so far (%)
    fuel_used_pct: f64,
    /// Latest simulated time seen (s)
    last_elapsed_s: Option<f64>,
}

/// Thread-safe sensor generator shared by the dashboard and the logger
#[derive(Debug)]
pub struct SensorSource {
    params: SensorParams,
    redline_rpm: f64,
    model: Mutex<SensorModel>,
}

impl SensorSource {
    /// Create a source, seeded from the config or from entropy
    pub fn new(config: &SimConfig) -> Self {
        let rng = match config.sensors.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    /// Create a source with a fixed seed
    pub fn with_seed(config: &SimConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &SimConfig, rng: StdRng) -> Self {
        let params = config.sensors.clone();
        let initial = SensorReading {
            coolant_temp_c: params.coolant_start_c,
            fuel_level_pct: params.fuel_start_pct.clamp(0.0, 100.0),
            battery_voltage_v: params.battery_resting_v,
        };
        Self {
            redline_rpm: config.vehicle.redline_rpm,
            model: Mutex::new(SensorModel {
                rng,
                last: initial,
                coolant_base_c: params.coolant_start_c,
                coolant_offset_c: 0.0,
                fuel_used_pct: 0.0,
                last_elapsed_s: None,
            }),
            params,
        }
    }

    /// Take one reading for the given vehicle snapshot
    ///
    /// Time only moves forward: a snapshot older than one already sampled
    /// contributes no warm-up or fuel burn.
    pub fn sample(&self, vehicle: &VehicleState) -> SensorReading {
        let mut model = self.model.lock().unwrap_or_else(PoisonError::into_inner);

        let dt = match model.last_elapsed_s {
            Some(prev) => (vehicle.elapsed_s - prev).max(0.0),
            None => 0.0,
        };
        model.last_elapsed_s = Some(match model.last_elapsed_s {
            Some(prev) => prev.max(vehicle.elapsed_s),
            None => vehicle.elapsed_s,
        });

        let reading = self.generate(&mut model, vehicle, dt);
        if reading.is_finite() {
            model.last = reading;
            reading
        } else {
            warn!(?reading, "Discarding non-finite sensor reading");
            model.last
        }
    }

    /// Last reading handed out, without advancing the model
    pub fn last(&self) -> SensorReading {
        self.model
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last
    }

    fn generate(&self, model: &mut SensorModel, vehicle: &VehicleState, dt: f64) -> SensorReading {
        let p = &self.params;
        let rpm_frac = (vehicle.rpm / self.redline_rpm).clamp(0.0, 1.0);

        // Coolant: first-order lag toward the operating or ambient target
        let target = if vehicle.engine_on {
            p.coolant_operating_c + p.coolant_rpm_rise_c * rpm_frac
        } else {
            p.ambient_c
        };
        let alpha = if p.coolant_time_constant_s > 0.0 {
            1.0 - (-dt / p.coolant_time_constant_s).exp()
        } else {
            1.0
        };
        model.coolant_base_c += (target - model.coolant_base_c) * alpha;
        if p.coolant_walk_c > 0.0 {
            let step = model.rng.gen_range(-p.coolant_walk_c..=p.coolant_walk_c);
            model.coolant_offset_c =
                (model.coolant_offset_c + step).clamp(-COOLANT_WALK_BOUND_C, COOLANT_WALK_BOUND_C);
        }
        let coolant_temp_c = (model.coolant_base_c + model.coolant_offset_c)
            .clamp(p.ambient_c.min(p.coolant_start_c) - COOLANT_WALK_BOUND_C, COOLANT_MAX_C);

        // Fuel: burnt only while running, and never handed back
        if vehicle.engine_on {
            model.fuel_used_pct += dt * (p.fuel_drain_pct_per_s + p.fuel_drain_rpm_pct_per_s * rpm_frac);
        }
        let jitter = model.rng.gen_range(0.0..FUEL_NOISE_PCT);
        let fuel_level_pct = (p.fuel_start_pct - model.fuel_used_pct - jitter)
            .min(model.last.fuel_level_pct)
            .max(0.0);

        // Battery: charging when running, resting otherwise
        let nominal = if vehicle.engine_on {
            p.battery_charging_v
        } else {
            p.battery_resting_v
        };
        let noise = if p.battery_noise_v > 0.0 {
            model.rng.gen_range(-p.battery_noise_v..=p.battery_noise_v)
        } else {
            0.0
        };
        let battery_voltage_v = (nominal + noise).clamp(BATTERY_MIN_V, BATTERY_MAX_V);

        SensorReading {
            coolant_temp_c,
            fuel_level_pct,
            battery_voltage_v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(elapsed_s: f64, rpm: f64, engine_on: bool) -> VehicleState {
        VehicleState {
            rpm,
            engine_on,
            elapsed_s,
            ..VehicleState::default()
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let config = SimConfig::default();
        let a = SensorSource::with_seed(&config, 7);
        let b = SensorSource::with_seed(&config, 7);
        for i in 0..20 {
            let vehicle = at(i as f64, 2000.0, true);
            assert_eq!(a.sample(&vehicle), b.sample(&vehicle));
        }
    }

    #[test]
    fn test_fuel_never_increases() {
        let source = SensorSource::with_seed(&SimConfig::default(), 1);
        let mut previous = source.last().fuel_level_pct;
        for i in 0..500 {
            let engine_on = i % 50 < 40;
            let reading = source.sample(&at(i as f64 * 0.5, 6000.0, engine_on));
            assert!(reading.fuel_level_pct <= previous);
            assert!(reading.fuel_level_pct >= 0.0);
            previous = reading.fuel_level_pct;
        }
        assert!(previous < 80.0);
    }

    #[test]
    fn test_fuel_floors_at_zero() {
        let mut config = SimConfig::default();
        config.sensors.fuel_start_pct = 1.0;
        config.sensors.fuel_drain_pct_per_s = 1.0;
        let source = SensorSource::with_seed(&config, 3);
        source.sample(&at(0.0, 800.0, true));
        let reading = source.sample(&at(10.0, 800.0, true));
        assert_eq!(reading.fuel_level_pct, 0.0);
    }

    #[test]
    fn test_stale_snapshot_burns_nothing() {
        let mut config = SimConfig::default();
        config.sensors.fuel_drain_pct_per_s = 1.0;
        let source = SensorSource::with_seed(&config, 5);
        source.sample(&at(0.0, 800.0, true));
        let newer = source.sample(&at(10.0, 800.0, true));
        let older = source.sample(&at(5.0, 800.0, true));
        assert!(older.fuel_level_pct > newer.fuel_level_pct - 0.05);
    }

    #[test]
    fn test_coolant_warms_with_rpm() {
        let config = SimConfig::default();
        let idle = SensorSource::with_seed(&config, 9);
        let revving = SensorSource::with_seed(&config, 9);
        let mut idle_reading = idle.last();
        let mut revving_reading = revving.last();
        for i in 0..400 {
            let t = i as f64;
            idle_reading = idle.sample(&at(t, 800.0, true));
            revving_reading = revving.sample(&at(t, 6000.0, true));
        }
        assert!(revving_reading.coolant_temp_c > idle_reading.coolant_temp_c);
        assert!(idle_reading.coolant_temp_c > 80.0 && idle_reading.coolant_temp_c < 95.0);
    }

    #[test]
    fn test_battery_lower_with_engine_off() {
        let source = SensorSource::with_seed(&SimConfig::default(), 11);
        for i in 0..50 {
            let on = source.sample(&at(i as f64, 2000.0, true));
            let off = source.sample(&at(i as f64, 0.0, false));
            assert!(off.battery_voltage_v < on.battery_voltage_v);
            assert!(on.battery_voltage_v <= BATTERY_MAX_V);
            assert!(off.battery_voltage_v >= BATTERY_MIN_V);
        }
    }

    #[test]
    fn test_non_finite_reading_keeps_last() {
        let mut config = SimConfig::default();
        config.sensors.ambient_c = f64::NAN;
        let source = SensorSource::with_seed(&config, 17);
        let before = source.last();

        let reading = source.sample(&at(1.0, 0.0, false));
        assert_eq!(reading, before);
        assert_eq!(source.last(), before);
        assert_eq!(reading.coolant_temp_c, 70.0);
        assert_eq!(reading.fuel_level_pct, 80.0);
        assert_eq!(reading.battery_voltage_v, 12.5);
    }

    #[test]
    fn test_concurrent_sampling() {
        let source = std::sync::Arc::new(SensorSource::with_seed(&SimConfig::default(), 13));
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let source = source.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let reading = source.sample(&at((n * 100 + i) as f64 * 0.1, 3000.0, true));
                        assert!(reading.fuel_level_pct <= 80.0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
