//! Dashboard Module
//!
//! Turns vehicle snapshots into display frames: current values plus a
//! bounded plot history of speed and RPM/100. The widgets themselves live
//! behind [`DisplaySink`].

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sensors::{SensorReading, SensorSource};
use crate::vehicle::VehicleState;

/// Errors a display can report back to the renderer
#[derive(Error, Debug)]
pub enum RenderError {
    /// The display cannot show frames right now
    #[error("Display unavailable: {0}")]
    Unavailable(String),

    /// Writing the frame out failed
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Rolling time series shown in the dashboard plot
///
/// Holds at most `capacity` points; the oldest point is evicted first.
#[derive(Debug, Clone)]
pub struct PlotHistory {
    capacity: usize,
    time_s: VecDeque<f64>,
    speed_kmh: VecDeque<f64>,
    rpm_scaled: VecDeque<f64>,
}

impl PlotHistory {
    /// Create an empty history of at most `capacity` points
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            time_s: VecDeque::with_capacity(capacity),
            speed_kmh: VecDeque::with_capacity(capacity),
            rpm_scaled: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a point from a vehicle snapshot
    pub fn push(&mut self, vehicle: &VehicleState) {
        if self.time_s.len() >= self.capacity {
            self.time_s.pop_front();
            self.speed_kmh.pop_front();
            self.rpm_scaled.pop_front();
        }
        self.time_s.push_back(vehicle.elapsed_s);
        self.speed_kmh.push_back(vehicle.speed_kmh);
        self.rpm_scaled.push_back(vehicle.rpm_scaled());
    }

    /// Drop every point
    pub fn clear(&mut self) {
        self.time_s.clear();
        self.speed_kmh.clear();
        self.rpm_scaled.clear();
    }

    /// Number of points held
    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.time_s.is_empty()
    }

    /// Maximum number of points
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copy the series out for a frame
    pub fn series(&self) -> PlotSeries {
        PlotSeries {
            time_s: self.time_s.iter().copied().collect(),
            speed_kmh: self.speed_kmh.iter().copied().collect(),
            rpm_scaled: self.rpm_scaled.iter().copied().collect(),
        }
    }
}

/// Plot data carried by a frame; all three vectors have the same length
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlotSeries {
    /// Simulated time of each point (s)
    pub time_s: Vec<f64>,
    /// Speed (km/h)
    pub speed_kmh: Vec<f64>,
    /// RPM divided by 100
    pub rpm_scaled: Vec<f64>,
}

/// Everything a display needs for one refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardFrame {
    /// Engine speed (rev/min)
    pub rpm: f64,
    /// Vehicle speed (km/h)
    pub speed_kmh: f64,
    /// Current gear, 1-based
    pub gear: u8,
    /// Whether the engine is running
    pub engine_on: bool,
    /// Ramped throttle position, 0..=1
    pub throttle: f64,
    /// Ramped brake position, 0..=1
    pub brake: f64,
    /// Simulated time of the snapshot (s)
    pub elapsed_s: f64,
    /// Sensor sample taken for this refresh
    pub sensors: SensorReading,
    /// Speed and RPM history up to this refresh
    pub plot: PlotSeries,
}

impl DashboardFrame {
    /// Frame for a vehicle before anything has been plotted
    pub fn initial(vehicle: &VehicleState, sensors: SensorReading) -> Self {
        Self::build(vehicle, sensors, PlotSeries::default())
    }

    fn build(vehicle: &VehicleState, sensors: SensorReading, plot: PlotSeries) -> Self {
        Self {
            rpm: vehicle.rpm,
            speed_kmh: vehicle.speed_kmh,
            gear: vehicle.gear,
            engine_on: vehicle.engine_on,
            throttle: vehicle.throttle,
            brake: vehicle.brake,
            elapsed_s: vehicle.elapsed_s,
            sensors,
            plot,
        }
    }
}

/// A display the renderer pushes frames to
pub trait DisplaySink: Send {
    /// Show one frame
    fn present(&mut self, frame: &DashboardFrame) -> Result<(), RenderError>;
}

/// Display that ignores frames; the pull-based feed still works
#[derive(Debug, Default)]
pub struct HeadlessDisplay;

impl DisplaySink for HeadlessDisplay {
    fn present(&mut self, _frame: &DashboardFrame) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Builds frames from snapshots; never writes vehicle state
pub struct Dashboard {
    history: PlotHistory,
    sensors: Arc<SensorSource>,
    epoch: u32,
}

impl Dashboard {
    /// Create a dashboard keeping `history_len` plot points
    pub fn new(sensors: Arc<SensorSource>, history_len: usize) -> Self {
        Self {
            history: PlotHistory::new(history_len),
            sensors,
            epoch: 0,
        }
    }

    /// Sample sensors, extend the plot and build a frame
    ///
    /// The plot restarts when the vehicle has been reset since the last call.
    pub fn refresh(&mut self, vehicle: &VehicleState) -> DashboardFrame {
        if vehicle.epoch != self.epoch {
            self.history.clear();
            self.epoch = vehicle.epoch;
        }
        let sensors = self.sensors.sample(vehicle);
        self.history.push(vehicle);
        DashboardFrame::build(vehicle, sensors, self.history.series())
    }

    /// Plot history so far
    pub fn history(&self) -> &PlotHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use pretty_assertions::assert_eq;

    fn vehicle_at(t: f64, speed_kmh: f64) -> VehicleState {
        VehicleState {
            speed_kmh,
            rpm: 1000.0 + speed_kmh * 10.0,
            engine_on: true,
            elapsed_s: t,
            ..VehicleState::default()
        }
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut history = PlotHistory::new(3);
        for i in 0..5 {
            history.push(&vehicle_at(i as f64, i as f64 * 10.0));
        }
        assert_eq!(history.len(), 3);

        let series = history.series();
        assert_eq!(series.time_s, vec![2.0, 3.0, 4.0]);
        assert_eq!(series.speed_kmh, vec![20.0, 30.0, 40.0]);
        assert_eq!(series.rpm_scaled, vec![12.0, 13.0, 14.0]);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut history = PlotHistory::new(0);
        history.push(&vehicle_at(0.0, 1.0));
        history.push(&vehicle_at(1.0, 2.0));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.series().speed_kmh, vec![2.0]);
    }

    #[test]
    fn test_refresh_builds_frame() {
        let sensors = Arc::new(SensorSource::with_seed(&SimConfig::default(), 4));
        let mut dashboard = Dashboard::new(sensors, 10);

        let frame = dashboard.refresh(&vehicle_at(0.5, 30.0));
        assert_eq!(frame.speed_kmh, 30.0);
        assert_eq!(frame.rpm, 1300.0);
        assert!(frame.engine_on);
        assert_eq!(frame.plot.speed_kmh, vec![30.0]);
    }

    #[test]
    fn test_reset_restarts_plot() {
        let sensors = Arc::new(SensorSource::with_seed(&SimConfig::default(), 4));
        let mut dashboard = Dashboard::new(sensors, 10);
        dashboard.refresh(&vehicle_at(0.1, 10.0));
        dashboard.refresh(&vehicle_at(0.2, 12.0));
        assert_eq!(dashboard.history().len(), 2);

        let mut after_reset = vehicle_at(0.3, 0.0);
        after_reset.epoch = 1;
        let frame = dashboard.refresh(&after_reset);
        assert_eq!(frame.plot.time_s, vec![0.3]);
    }
}
