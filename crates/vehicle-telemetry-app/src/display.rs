//! Text dashboard printed to stdout

use std::io::{self, Write};

use vehicle_telemetry_core::dashboard::{DashboardFrame, DisplaySink, RenderError};
use vehicle_telemetry_core::unit_conversion::UnitSystem;

/// Prints one status line every `every` frames
pub struct TerminalDisplay {
    units: UnitSystem,
    every: u32,
    seen: u32,
}

impl TerminalDisplay {
    pub fn new(units: UnitSystem, every: u32) -> Self {
        Self {
            units,
            every: every.max(1),
            seen: 0,
        }
    }
}

impl DisplaySink for TerminalDisplay {
    fn present(&mut self, frame: &DashboardFrame) -> Result<(), RenderError> {
        self.seen = self.seen.wrapping_add(1);
        if self.seen % self.every != 0 {
            return Ok(());
        }
        let mut out = io::stdout().lock();
        writeln!(out, "{}", render_line(frame, self.units))?;
        out.flush()?;
        Ok(())
    }
}

/// Single-line gauge cluster for `frame`
pub fn render_line(frame: &DashboardFrame, units: UnitSystem) -> String {
    let engine = if frame.engine_on { "ON " } else { "OFF" };
    format!(
        "[{:>7.1}s] engine {} | gear {} | {:>4.0} rpm | {:>6.1} {} | thr {:>3.0}% brk {:>3.0}% | \
         coolant {:>5.1} {} | fuel {:>5.1}% | batt {:>5.2} V",
        frame.elapsed_s,
        engine,
        frame.gear,
        frame.rpm,
        units.speed(frame.speed_kmh),
        units.speed_label(),
        frame.throttle * 100.0,
        frame.brake * 100.0,
        units.temperature(frame.sensors.coolant_temp_c),
        units.temperature_label(),
        frame.sensors.fuel_level_pct,
        frame.sensors.battery_voltage_v,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use vehicle_telemetry_core::sensors::SensorReading;
    use vehicle_telemetry_core::vehicle::VehicleState;

    fn frame() -> DashboardFrame {
        let vehicle = VehicleState {
            speed_kmh: 100.0,
            rpm: 3000.0,
            gear: 4,
            engine_on: true,
            throttle: 0.5,
            elapsed_s: 12.0,
            ..VehicleState::default()
        };
        let sensors = SensorReading {
            coolant_temp_c: 90.0,
            fuel_level_pct: 75.5,
            battery_voltage_v: 13.8,
        };
        DashboardFrame::initial(&vehicle, sensors)
    }

    #[test]
    fn test_metric_line() {
        let line = render_line(&frame(), UnitSystem::Metric);
        assert!(line.contains("gear 4"));
        assert!(line.contains("3000 rpm"));
        assert!(line.contains("100.0 km/h"));
        assert!(line.contains("fuel  75.5%"));
    }

    #[test]
    fn test_imperial_line() {
        let line = render_line(&frame(), UnitSystem::Imperial);
        assert!(line.contains("62.1 mph"));
        assert!(line.contains("194.0"));
    }
}
