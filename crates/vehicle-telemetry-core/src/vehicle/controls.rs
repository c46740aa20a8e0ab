//! Control input surface
//!
//! Input handlers record driver intent here; the physics tick drains it once
//! per step. Both sides go through the same mutex, so a tick never sees half
//! of an update.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::SimError;

/// Pending driver intent between two ticks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlIntent {
    throttle_held: bool,
    brake_held: bool,
    engine_toggles: u32,
    shifts: Vec<i8>,
    reset: bool,
}

impl ControlIntent {
    /// Take everything queued since the previous tick
    ///
    /// Held pedals stay held; toggles, shifts and resets are consumed.
    pub fn take_frame(&mut self) -> ControlFrame {
        let frame = ControlFrame {
            throttle_held: self.throttle_held,
            brake_held: self.brake_held,
            toggle_engine: self.engine_toggles % 2 == 1,
            shifts: std::mem::take(&mut self.shifts),
            reset: self.reset,
        };
        self.engine_toggles = 0;
        self.reset = false;
        frame
    }
}

/// What one physics tick consumes from the driver
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlFrame {
    /// Gas pedal is held down
    pub throttle_held: bool,
    /// Brake pedal is held down
    pub brake_held: bool,
    /// An odd number of engine toggles arrived
    pub toggle_engine: bool,
    /// Gear shift requests in arrival order
    pub shifts: Vec<i8>,
    /// Return to startup state before anything else
    pub reset: bool,
}

impl ControlFrame {
    /// Frame with the gas pedal held
    pub fn throttle() -> Self {
        Self {
            throttle_held: true,
            ..Self::default()
        }
    }

    /// Frame with the brake pedal held
    pub fn brake() -> Self {
        Self {
            brake_held: true,
            ..Self::default()
        }
    }
}

/// Cloneable handle through which input handlers drive the vehicle
#[derive(Debug, Clone, Default)]
pub struct ControlSurface {
    intent: Arc<Mutex<ControlIntent>>,
}

impl ControlSurface {
    /// Create a surface with nothing pressed
    pub fn new() -> Self {
        Self::default()
    }

    /// Press (`true`) or release (`false`) the gas pedal
    pub fn set_throttle(&self, active: bool) {
        self.lock().throttle_held = active;
    }

    /// Press (`true`) or release (`false`) the brake pedal
    pub fn set_brake(&self, active: bool) {
        self.lock().brake_held = active;
    }

    /// Flip the engine between off and on
    pub fn toggle_engine(&self) {
        let mut intent = self.lock();
        intent.engine_toggles = intent.engine_toggles.wrapping_add(1);
    }

    /// Request a shift one gear up (`1`) or down (`-1`)
    ///
    /// Shifts past the first or last gear are dropped by the physics tick.
    pub fn shift_gear(&self, delta: i8) -> Result<(), SimError> {
        if delta != 1 && delta != -1 {
            return Err(SimError::InvalidShift(delta));
        }
        self.lock().shifts.push(delta);
        Ok(())
    }

    /// Return the vehicle to its startup state, discarding queued input
    pub fn reset(&self) {
        let mut intent = self.lock();
        *intent = ControlIntent {
            reset: true,
            ..ControlIntent::default()
        };
    }

    /// Drain the intent for one tick
    pub fn take_frame(&self) -> ControlFrame {
        self.lock().take_frame()
    }

    // Poisoning is ignored: every field is valid on its own.
    fn lock(&self) -> MutexGuard<'_, ControlIntent> {
        self.intent.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
