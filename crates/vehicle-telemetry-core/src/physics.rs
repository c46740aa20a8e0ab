//! Physics Engine - longitudinal vehicle dynamics
//!
//! Advances [`VehicleState`] by one fixed timestep from the driver's
//! [`ControlFrame`]. Motion is fully deterministic; randomness lives only in
//! the sensor model.
//!
//! Force model, all expressed as accelerations in m/s²:
//! - drive: `throttle * max_drive_accel * ratio(gear) / ratio(1) * rev_limiter * (1 - brake)`
//! - brake: `brake * max_brake_decel`
//! - drag: linear in speed, `drag_coeff * v`
//! - engine braking: closed throttle, proportional to how far RPM sits above idle
//!
//! The net is clamped to `±accel_limit` and integrated with explicit Euler.

use tracing::{debug, info};

use crate::config::{ControlParams, SimConfig, VehicleParams};
use crate::error::SimError;
use crate::unit_conversion::{kmh_to_mps, mps_to_kmh, wheel_rpm};
use crate::vehicle::{ControlFrame, VehicleState};

/// Below this speed (m/s) the vehicle counts as stopped
const STOPPED_MPS: f64 = 0.05;

/// Throttle below this counts as released
const THROTTLE_CLOSED: f64 = 0.01;

/// Fixed-timestep integrator for the vehicle
#[derive(Debug, Clone)]
pub struct PhysicsEngine {
    /// Drivetrain and force parameters
    vehicle: VehicleParams,
    /// Pedal ramp timing
    controls: ControlParams,
    /// Timestep (s)
    dt: f64,
    /// Top speed (m/s)
    max_speed_mps: f64,
}

impl PhysicsEngine {
    /// Create an engine from a validated config
    pub fn new(config: &SimConfig) -> Self {
        Self {
            vehicle: config.vehicle.clone(),
            controls: config.controls.clone(),
            dt: config.telemetry.dt(),
            max_speed_mps: kmh_to_mps(config.vehicle.max_speed_kmh),
        }
    }

    /// Fixed timestep in seconds
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Vehicle parameters in use
    pub fn params(&self) -> &VehicleParams {
        &self.vehicle
    }

    /// Advance `state` by one tick
    ///
    /// Returns [`SimError::CorruptState`] if the result is not finite; the
    /// caller must treat that as fatal.
    pub fn tick(&self, state: &mut VehicleState, frame: &ControlFrame) -> Result<(), SimError> {
        self.apply_events(state, frame);
        self.condition_inputs(state, frame);

        let v = kmh_to_mps(state.speed_kmh);
        let accel = self.net_acceleration(state, v);
        let v_next = (v + accel * self.dt).clamp(0.0, self.max_speed_mps);
        state.speed_kmh = mps_to_kmh(v_next);

        state.rpm = self.next_rpm(state, v_next);
        if self.vehicle.auto_shift {
            self.auto_shift(state, v_next);
        }

        state.ticks += 1;
        state.elapsed_s = state.ticks as f64 * self.dt;

        if !state.is_finite() {
            return Err(SimError::CorruptState(format!("{state:?}")));
        }
        Ok(())
    }

    /// Reset, engine toggle and gear shifts, in that order
    fn apply_events(&self, state: &mut VehicleState, frame: &ControlFrame) {
        if frame.reset {
            state.reset();
            info!("Vehicle reset");
        }

        if frame.toggle_engine {
            state.engine_on = !state.engine_on;
            info!(engine_on = state.engine_on, "Engine toggled");
        }

        for &delta in &frame.shifts {
            self.shift(state, delta);
        }
    }

    /// Move one gear up or down; out-of-range requests leave the gear unchanged
    pub fn shift(&self, state: &mut VehicleState, delta: i8) -> bool {
        let target = state.gear as i16 + delta as i16;
        if target < 1 || target > self.vehicle.max_gear() as i16 {
            debug!(gear = state.gear, delta, "Rejected gear shift");
            return false;
        }
        state.gear = target as u8;
        // Recompute from the new ratio so readers never see a stale pairing
        state.rpm = self.next_rpm_for_gear(state, kmh_to_mps(state.speed_kmh));
        true
    }

    /// Ramp pedal intensities toward their held targets
    fn condition_inputs(&self, state: &mut VehicleState, frame: &ControlFrame) {
        state.throttle = ramp(
            state.throttle,
            frame.throttle_held,
            self.controls.throttle_rise_s,
            self.controls.throttle_fall_s,
            self.dt,
        );
        state.brake = ramp(
            state.brake,
            frame.brake_held,
            self.controls.brake_rise_s,
            self.controls.brake_fall_s,
            self.dt,
        );
    }

    fn net_acceleration(&self, state: &VehicleState, v: f64) -> f64 {
        let p = &self.vehicle;

        let drive = if state.engine_on {
            state.throttle
                * p.max_drive_accel_mps2
                * self.torque_factor(state.gear)
                * self.rev_limiter(self.mapped_rpm(v, state.gear))
                * (1.0 - state.brake)
        } else {
            0.0
        };

        let brake = state.brake * p.max_brake_decel_mps2;
        let drag = p.drag_coeff * v;

        let engine_brake = if state.engine_on && state.throttle < THROTTLE_CLOSED && v > STOPPED_MPS {
            let span = p.redline_rpm - p.idle_rpm;
            p.engine_brake_decel_mps2 * ((state.rpm - p.idle_rpm) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };

        (drive - brake - drag - engine_brake).clamp(-p.accel_limit_mps2, p.accel_limit_mps2)
    }

    /// Lower gears pull harder; first gear is 1.0
    fn torque_factor(&self, gear: u8) -> f64 {
        match (self.vehicle.gear_ratio(gear), self.vehicle.gear_ratio(1)) {
            (Some(ratio), Some(first)) => ratio / first,
            _ => 0.0,
        }
    }

    /// Fades drive to zero over the last band below redline
    fn rev_limiter(&self, rpm: f64) -> f64 {
        let p = &self.vehicle;
        let headroom = p.redline_rpm - rpm;
        if p.rev_limiter_band_rpm <= 0.0 {
            return if headroom > 0.0 { 1.0 } else { 0.0 };
        }
        (headroom / p.rev_limiter_band_rpm).clamp(0.0, 1.0)
    }

    /// Engine speed implied by road speed in `gear`, without idle floor or clamp
    pub fn mapped_rpm(&self, v: f64, gear: u8) -> f64 {
        let ratio = self.vehicle.gear_ratio(gear).unwrap_or(0.0);
        wheel_rpm(v, self.vehicle.wheel_radius_m) * self.vehicle.final_drive * ratio
    }

    fn next_rpm(&self, state: &VehicleState, v: f64) -> f64 {
        if state.engine_on {
            self.next_rpm_for_gear(state, v)
        } else {
            (state.rpm - self.vehicle.engine_off_decay_rpm_per_s * self.dt).max(0.0)
        }
    }

    // Stopped with the throttle closed lands on the idle floor as well.
    fn next_rpm_for_gear(&self, state: &VehicleState, v: f64) -> f64 {
        let p = &self.vehicle;
        if !state.engine_on {
            return state.rpm.clamp(0.0, p.redline_rpm);
        }
        self.mapped_rpm(v, state.gear).clamp(p.idle_rpm, p.redline_rpm)
    }

    fn auto_shift(&self, state: &mut VehicleState, v: f64) {
        if !state.engine_on {
            return;
        }
        let p = &self.vehicle;
        if state.rpm > p.shift_up_rpm && state.gear < p.max_gear() {
            state.gear += 1;
        } else if state.rpm < p.shift_down_rpm && state.gear > 1 && v > STOPPED_MPS {
            state.gear -= 1;
        } else {
            return;
        }
        debug!(gear = state.gear, rpm = state.rpm, "Auto shift");
        state.rpm = self.next_rpm_for_gear(state, v);
    }
}

/// Move `current` toward 1.0 when held, 0.0 when released
///
/// `rise_s`/`fall_s` are the times for a full 0→1 / 1→0 sweep; zero snaps.
fn ramp(current: f64, held: bool, rise_s: f64, fall_s: f64, dt: f64) -> f64 {
    if held {
        let step = if rise_s > 0.0 { dt / rise_s } else { 1.0 };
        (current + step).min(1.0)
    } else {
        let step = if fall_s > 0.0 { dt / fall_s } else { 1.0 };
        (current - step).max(0.0)
    }
}
