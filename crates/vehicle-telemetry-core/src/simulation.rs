//! Deterministic simulation core
//!
//! Bundles the vehicle, the physics engine and the control surface so the
//! simulation can be stepped one tick at a time, with no threads involved.
//! The runtime drives a [`Simulation`] from its physics thread; tests drive
//! it directly.

use crate::config::SimConfig;
use crate::error::SimError;
use crate::physics::PhysicsEngine;
use crate::vehicle::{ControlSurface, VehicleState};

/// Outcome of one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Vehicle after the tick
    pub snapshot: VehicleState,
    /// This tick closes a logging interval
    pub log_due: bool,
}

/// Single owner of the vehicle state
pub struct Simulation {
    physics: PhysicsEngine,
    state: VehicleState,
    controls: ControlSurface,
    ticks_per_log: u64,
}

impl Simulation {
    /// Start from the idle defaults: engine off, first gear, at rest
    pub fn new(config: &SimConfig) -> Self {
        Self::from_state(config, VehicleState::new())
    }

    /// Start from an arbitrary vehicle state
    pub fn from_state(config: &SimConfig, state: VehicleState) -> Self {
        Self {
            physics: PhysicsEngine::new(config),
            state,
            controls: ControlSurface::new(),
            ticks_per_log: config.telemetry.ticks_per_log(),
        }
    }

    /// Handle for feeding driver input
    pub fn controls(&self) -> ControlSurface {
        self.controls.clone()
    }

    /// Current vehicle state, by value
    pub fn snapshot(&self) -> VehicleState {
        self.state
    }

    /// Physics engine in use
    pub fn physics(&self) -> &PhysicsEngine {
        &self.physics
    }

    /// Advance by one fixed tick
    pub fn step(&mut self) -> Result<TickReport, SimError> {
        let frame = self.controls.take_frame();
        self.physics.tick(&mut self.state, &frame)?;
        Ok(TickReport {
            snapshot: self.state,
            log_due: self.state.ticks % self.ticks_per_log == 0,
        })
    }

    /// Advance by `ticks` ticks, returning the last report
    pub fn run(&mut self, ticks: u64) -> Result<TickReport, SimError> {
        let mut report = TickReport {
            snapshot: self.state,
            log_due: false,
        };
        for _ in 0..ticks {
            report = self.step()?;
        }
        Ok(report)
    }
}
