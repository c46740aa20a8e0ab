//! Simulator runtime
//!
//! Runs the three cadences side by side:
//! - physics: a dedicated OS thread stepping the [`Simulation`] at the fixed
//!   tick rate and publishing every snapshot on a watch channel
//! - dashboard: a Tokio task refreshing at the UI rate
//! - logging: a blocking worker fed through a bounded queue; the physics
//!   thread only ever `try_send`s, so a slow disk drops intervals instead of
//!   stalling the tick
//!
//! A single [`CancellationToken`] stops all of them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SimConfig;
use crate::dashboard::{Dashboard, DashboardFrame, DisplaySink, HeadlessDisplay};
use crate::datalog::{open_sink, LoggerStats, RecordSink, TelemetryLogger};
use crate::error::SimError;
use crate::sensors::SensorSource;
use crate::simulation::Simulation;
use crate::vehicle::{ControlSurface, VehicleState};

/// Ticks the physics thread may run back-to-back before dropping its backlog
const MAX_CATCH_UP_TICKS: u32 = 5;

/// Counters collected at shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Physics ticks executed
    pub ticks: u64,
    /// Rows written / skipped by the logger
    pub log: LoggerStats,
    /// Log intervals dropped because the writer was busy
    pub log_dropped: u64,
}

/// Configures and starts a simulator
pub struct Simulator {
    config: SimConfig,
    display: Box<dyn DisplaySink>,
    log_sink: Option<Box<dyn RecordSink>>,
    sensors: Option<Arc<SensorSource>>,
}

impl Simulator {
    /// Validate `config` and prepare a headless simulator
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            config,
            display: Box::new(HeadlessDisplay),
            log_sink: None,
            sensors: None,
        })
    }

    /// Push dashboard frames to `display`
    pub fn with_display(mut self, display: Box<dyn DisplaySink>) -> Self {
        self.display = display;
        self
    }

    /// Write rows to `sink` instead of the configured log file
    pub fn with_log_sink(mut self, sink: Box<dyn RecordSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    /// Use a specific sensor source
    pub fn with_sensors(mut self, sensors: Arc<SensorSource>) -> Self {
        self.sensors = Some(sensors);
        self
    }

    /// Spawn the physics thread, renderer and log writer
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self) -> Result<SimulatorHandle, SimError> {
        let Simulator {
            config,
            display,
            log_sink,
            sensors,
        } = self;
        let telemetry = &config.telemetry;

        let sensors = sensors.unwrap_or_else(|| Arc::new(SensorSource::new(&config)));
        let simulation = Simulation::new(&config);
        let controls = simulation.controls();
        let initial = simulation.snapshot();
        let cancel = CancellationToken::new();

        let (vehicle_tx, vehicle_rx) = watch::channel(initial);
        let (display_tx, display_rx) =
            watch::channel(DashboardFrame::initial(&initial, sensors.last()));
        let (log_tx, log_rx) = mpsc::channel(telemetry.log_queue_depth);
        let log_dropped = Arc::new(AtomicU64::new(0));

        let sink = log_sink.unwrap_or_else(|| open_sink(telemetry.resolved_log_path()));
        let logger = TelemetryLogger::new(sink, sensors.clone());
        let log_active = logger.is_active();
        let logger_task = tokio::task::spawn_blocking(move || log_loop(logger, log_rx));

        let dashboard = Dashboard::new(sensors, telemetry.plot_history_len);
        let renderer_task = tokio::spawn(render_loop(
            dashboard,
            display,
            vehicle_rx.clone(),
            display_tx,
            Duration::from_millis(telemetry.ui_refresh_ms),
            cancel.clone(),
        ));

        let physics = PhysicsLoop {
            simulation,
            period: telemetry.tick_period(),
            vehicle_tx,
            log_tx,
            log_dropped: log_dropped.clone(),
            cancel: cancel.clone(),
        };
        let physics_thread = match thread::Builder::new()
            .name("physics".to_string())
            .spawn(move || physics.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                cancel.cancel();
                return Err(SimError::Spawn("physics", e));
            }
        };

        info!(
            tick_hz = telemetry.tick_hz,
            ui_refresh_ms = telemetry.ui_refresh_ms,
            log_interval_s = telemetry.log_interval_s,
            log_active,
            "Simulator started"
        );

        Ok(SimulatorHandle {
            controls,
            vehicle_rx,
            display_rx,
            cancel,
            physics: Some(physics_thread),
            renderer: Some(renderer_task),
            logger: Some(logger_task),
            log_dropped,
            log_active,
        })
    }
}

/// Running simulator
///
/// Dropping the handle signals every loop to stop; call
/// [`SimulatorHandle::shutdown`] to also wait for them.
pub struct SimulatorHandle {
    controls: ControlSurface,
    vehicle_rx: watch::Receiver<VehicleState>,
    display_rx: watch::Receiver<DashboardFrame>,
    cancel: CancellationToken,
    physics: Option<thread::JoinHandle<Result<u64, SimError>>>,
    renderer: Option<JoinHandle<()>>,
    logger: Option<JoinHandle<LoggerStats>>,
    log_dropped: Arc<AtomicU64>,
    log_active: bool,
}

impl SimulatorHandle {
    /// Driver input surface
    pub fn controls(&self) -> ControlSurface {
        self.controls.clone()
    }

    /// Latest vehicle snapshot published by the physics thread
    pub fn snapshot(&self) -> VehicleState {
        *self.vehicle_rx.borrow()
    }

    /// Subscribe to vehicle snapshots
    pub fn vehicle_feed(&self) -> watch::Receiver<VehicleState> {
        self.vehicle_rx.clone()
    }

    /// Pull-based display feed, updated at the dashboard cadence
    pub fn display_feed(&self) -> watch::Receiver<DashboardFrame> {
        self.display_rx.clone()
    }

    /// Latest dashboard frame
    pub fn latest_frame(&self) -> DashboardFrame {
        self.display_rx.borrow().clone()
    }

    /// Whether rows reach a log file
    pub fn logging_active(&self) -> bool {
        self.log_active
    }

    /// Token that stops the simulator when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Resolves once the simulator has been asked to stop
    pub async fn stopped(&self) {
        self.cancel.cancelled().await
    }

    /// Stop every loop and wait for them
    ///
    /// Returns the physics error if the tick loop died on a corrupt state.
    pub async fn shutdown(mut self) -> Result<RunSummary, SimError> {
        self.cancel.cancel();

        let physics = match self.physics.take() {
            Some(thread) => match tokio::task::spawn_blocking(move || thread.join()).await {
                Ok(Ok(result)) => result,
                _ => Err(SimError::WorkerPanicked("physics")),
            },
            None => Ok(0),
        };

        if let Some(renderer) = self.renderer.take() {
            if renderer.await.is_err() {
                warn!("Renderer task ended abnormally");
            }
        }

        let log = match self.logger.take() {
            Some(logger) => logger.await.unwrap_or_else(|_| {
                warn!("Log writer ended abnormally");
                LoggerStats::default()
            }),
            None => LoggerStats::default(),
        };

        let summary = RunSummary {
            ticks: physics?,
            log,
            log_dropped: self.log_dropped.load(Ordering::Relaxed),
        };
        info!(?summary, "Simulator stopped");
        Ok(summary)
    }
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct PhysicsLoop {
    simulation: Simulation,
    period: Duration,
    vehicle_tx: watch::Sender<VehicleState>,
    log_tx: mpsc::Sender<VehicleState>,
    log_dropped: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl PhysicsLoop {
    /// Fixed-timestep loop; sleeps at most one period between checks of the token
    fn run(mut self) -> Result<u64, SimError> {
        debug!(period = ?self.period, "Physics loop running");
        let mut next_tick = Instant::now() + self.period;

        while !self.cancel.is_cancelled() {
            let mut stepped = 0;
            while Instant::now() >= next_tick {
                if stepped == MAX_CATCH_UP_TICKS {
                    warn!("Physics loop fell behind, dropping backlog");
                    next_tick = Instant::now() + self.period;
                    break;
                }
                self.step()?;
                next_tick += self.period;
                stepped += 1;
            }

            let now = Instant::now();
            if next_tick > now {
                thread::sleep(next_tick - now);
            }
        }

        debug!("Physics loop stopped");
        Ok(self.simulation.snapshot().ticks)
    }

    fn step(&mut self) -> Result<(), SimError> {
        let report = match self.simulation.step() {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Physics state corrupted, stopping simulator");
                self.cancel.cancel();
                return Err(e);
            }
        };

        self.vehicle_tx.send_replace(report.snapshot);

        if report.log_due {
            if let Err(TrySendError::Full(_)) = self.log_tx.try_send(report.snapshot) {
                let dropped = self.log_dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(dropped, "Log writer busy, dropping interval");
            }
        }
        Ok(())
    }
}

async fn render_loop(
    mut dashboard: Dashboard,
    mut display: Box<dyn DisplaySink>,
    vehicle_rx: watch::Receiver<VehicleState>,
    display_tx: watch::Sender<DashboardFrame>,
    refresh: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut failing = false;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let vehicle = *vehicle_rx.borrow();
        let frame = dashboard.refresh(&vehicle);

        match display.present(&frame) {
            Ok(()) if failing => {
                info!("Display recovered");
                failing = false;
            }
            Ok(()) => {}
            Err(e) => {
                if !failing {
                    warn!(error = %e, "Display failed to render frame");
                    failing = true;
                }
            }
        }

        display_tx.send_replace(frame);
    }

    debug!("Renderer stopped");
}

// Exits once the physics thread drops its sender.
fn log_loop(mut logger: TelemetryLogger, mut rx: mpsc::Receiver<VehicleState>) -> LoggerStats {
    while let Some(vehicle) = rx.blocking_recv() {
        logger.record(&vehicle);
    }
    logger.stats()
}
