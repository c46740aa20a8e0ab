//! Behavioural properties of the vehicle model

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vehicle_telemetry_core::config::SimConfig;
use vehicle_telemetry_core::physics::PhysicsEngine;
use vehicle_telemetry_core::simulation::Simulation;
use vehicle_telemetry_core::vehicle::{ControlFrame, VehicleState};

fn running_in_gear(gear: u8) -> VehicleState {
    VehicleState {
        engine_on: true,
        rpm: 800.0,
        gear,
        ..VehicleState::default()
    }
}

#[test]
fn test_state_stays_in_bounds_under_random_input() {
    let config = SimConfig::default();
    let max_gear = config.vehicle.max_gear();
    let mut sim = Simulation::new(&config);
    let controls = sim.controls();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..20_000 {
        match rng.gen_range(0..40) {
            0 => controls.toggle_engine(),
            1 => {
                let _ = controls.shift_gear(1);
            }
            2 => {
                let _ = controls.shift_gear(-1);
            }
            3 => controls.set_throttle(rng.gen()),
            4 => controls.set_brake(rng.gen()),
            5 if rng.gen_ratio(1, 20) => controls.reset(),
            _ => {}
        }

        let s = sim.step().unwrap().snapshot;
        assert!(
            (0.0..=config.vehicle.max_speed_kmh).contains(&s.speed_kmh),
            "speed out of range: {s:?}"
        );
        assert!(
            (0.0..=config.vehicle.redline_rpm).contains(&s.rpm),
            "rpm out of range: {s:?}"
        );
        assert!((1..=max_gear).contains(&s.gear), "gear out of range: {s:?}");
        assert!((0.0..=1.0).contains(&s.throttle));
        assert!((0.0..=1.0).contains(&s.brake));
        if s.engine_on {
            assert!(s.rpm >= config.vehicle.idle_rpm, "running below idle: {s:?}");
        }
    }
}

#[test]
fn test_full_throttle_rises_to_plateau() {
    let config = SimConfig::default();
    let physics = PhysicsEngine::new(&config);
    let mut state = running_in_gear(1);
    let frame = ControlFrame::throttle();

    let mut speeds = Vec::with_capacity(1200);
    for _ in 0..1200 {
        physics.tick(&mut state, &frame).unwrap();
        speeds.push(state.speed_kmh);
    }

    for pair in speeds.windows(2) {
        assert!(pair[1] >= pair[0], "speed dropped: {} -> {}", pair[0], pair[1]);
    }

    let last = speeds[speeds.len() - 1];
    let second_ago = speeds[speeds.len() - 61];
    assert!(last <= config.vehicle.max_speed_kmh);
    assert!(last - second_ago < 0.05, "still accelerating: {second_ago} -> {last}");
    assert!(state.rpm <= config.vehicle.redline_rpm);
}

#[test]
fn test_full_brake_stops_exactly() {
    let physics = PhysicsEngine::new(&SimConfig::default());
    let mut state = VehicleState {
        speed_kmh: 100.0,
        rpm: 3300.0,
        ..running_in_gear(3)
    };
    let frame = ControlFrame::brake();

    let mut previous = state.speed_kmh;
    for _ in 0..600 {
        physics.tick(&mut state, &frame).unwrap();
        if previous > 0.0 {
            assert!(state.speed_kmh < previous, "brake did not slow the car");
        } else {
            assert_eq!(state.speed_kmh, 0.0);
        }
        previous = state.speed_kmh;
    }
    assert_eq!(state.speed_kmh, 0.0);
}

#[test]
fn test_engine_off_never_accelerates() {
    let config = SimConfig::default();
    let physics = PhysicsEngine::new(&config);
    let mut state = VehicleState {
        speed_kmh: 80.0,
        rpm: config.vehicle.redline_rpm,
        gear: 2,
        engine_on: false,
        ..VehicleState::default()
    };
    // Gas held does nothing without the engine
    let frame = ControlFrame::throttle();

    let bound = (config.vehicle.redline_rpm / config.vehicle.engine_off_decay_rpm_per_s
        * config.telemetry.tick_hz as f64)
        .ceil() as usize
        + 1;

    let mut previous = state.speed_kmh;
    let mut rpm_zero_at = None;
    for tick in 1..=bound * 2 {
        physics.tick(&mut state, &frame).unwrap();
        assert!(state.speed_kmh <= previous);
        previous = state.speed_kmh;
        if state.rpm == 0.0 && rpm_zero_at.is_none() {
            rpm_zero_at = Some(tick);
        }
    }

    let zero_at = rpm_zero_at.expect("rpm never reached zero");
    assert!(zero_at <= bound, "rpm reached zero after {zero_at} ticks");
    assert_eq!(state.rpm, 0.0);
}

#[test]
fn test_shift_beyond_range_is_ignored() {
    let config = SimConfig::default();
    let top = config.vehicle.max_gear();

    let mut sim = Simulation::from_state(&config, running_in_gear(top));
    let controls = sim.controls();
    controls.shift_gear(1).unwrap();
    assert_eq!(sim.step().unwrap().snapshot.gear, top);

    let mut sim = Simulation::from_state(&config, running_in_gear(1));
    let controls = sim.controls();
    controls.shift_gear(-1).unwrap();
    assert_eq!(sim.step().unwrap().snapshot.gear, 1);
}

#[test]
fn test_invalid_shift_delta_is_rejected() {
    let mut sim = Simulation::new(&SimConfig::default());
    let controls = sim.controls();
    assert!(controls.shift_gear(2).is_err());
    assert!(controls.shift_gear(0).is_err());
    assert_eq!(sim.step().unwrap().snapshot.gear, 1);
}

#[test]
fn test_double_toggle_is_idempotent() {
    let config = SimConfig::default();

    let mut toggled = Simulation::new(&config);
    let controls = toggled.controls();
    controls.toggle_engine();
    controls.toggle_engine();

    let mut untouched = Simulation::new(&config);

    for _ in 0..30 {
        assert_eq!(
            toggled.step().unwrap().snapshot,
            untouched.step().unwrap().snapshot
        );
    }
    assert!(!toggled.snapshot().engine_on);
}

#[test]
fn test_reset_returns_to_idle_defaults() {
    let config = SimConfig::default();
    let mut sim = Simulation::new(&config);
    let controls = sim.controls();
    controls.toggle_engine();
    controls.set_throttle(true);
    sim.run(300).unwrap();
    assert!(sim.snapshot().speed_kmh > 0.0);

    controls.reset();
    let s = sim.step().unwrap().snapshot;
    assert_eq!(s.speed_kmh, 0.0);
    assert_eq!(s.rpm, 0.0);
    assert_eq!(s.gear, 1);
    assert!(!s.engine_on);
    assert_eq!(s.epoch, 1);
    assert_eq!(s.ticks, 301);
}

#[test]
fn test_auto_shift_climbs_through_gears() {
    let mut config = SimConfig::default();
    config.vehicle.auto_shift = true;
    let physics = PhysicsEngine::new(&config);
    let mut state = running_in_gear(1);

    for _ in 0..1800 {
        physics.tick(&mut state, &ControlFrame::throttle()).unwrap();
    }
    assert!(state.gear >= 3, "stuck in gear {}", state.gear);
    assert!(state.rpm <= config.vehicle.redline_rpm);
}
