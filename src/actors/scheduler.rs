//! Scheduler - owned poll loop with sampling and discovery cadences
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──start()──▶ Running ──stop()──▶ Stopped
//!   └──────────────stop()──────────────────┘
//! ```
//!
//! `Stopped` is terminal and `stop()` is idempotent.
//!
//! ## Cadences
//!
//! Sampling runs on its own interval. Discovery is only checked at the end of
//! a sampling tick: when more than the discovery cadence has elapsed since the
//! last scan, a scan runs inline and the marker resets. With a sampling
//! cadence larger than the discovery cadence, discovery therefore runs once
//! per sampling tick rather than at its configured rate.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, instrument, trace, warn};

use crate::discovery::DiscoveryService;
use crate::observations::ObservationStore;
use crate::registry::DeviceRegistry;
use crate::sampler::Sampler;

use super::messages::{SchedulerCommand, TickReport};

/// Upper bound for one discovery scan unless configured otherwise
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(15);

/// Periods of the two recurring actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub sampling: Duration,
    pub discovery: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("scheduler is already running")]
    AlreadyRunning,

    #[error("scheduler has been stopped")]
    Stopped,

    #[error("scheduler is not running")]
    NotRunning,

    #[error("poll loop is no longer reachable")]
    LoopGone,

    #[error("sampling cadence must be non-zero")]
    InvalidCadence,
}

/// The loop itself, moved into its own task on start
struct PollActor {
    registry: DeviceRegistry,
    store: ObservationStore,
    sampler: Arc<dyn Sampler>,
    discovery: DiscoveryService,
    cadence: Cadence,
    scan_timeout: Duration,
    command_rx: mpsc::Receiver<SchedulerCommand>,
    last_discovery: Instant,
}

impl PollActor {
    #[instrument(skip(self), fields(sampling = ?self.cadence.sampling, discovery = ?self.cadence.discovery))]
    async fn run(mut self) {
        debug!("starting poll loop");

        let start = Instant::now();
        self.last_discovery = start;

        let mut ticker = interval_at(start + self.cadence.sampling, self.cadence.sampling);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick().await;
                    trace!("tick finished: {report:?}");
                }

                cmd = self.command_rx.recv() => match cmd {
                    Some(SchedulerCommand::TickNow { respond_to }) => {
                        debug!("received TickNow command");
                        let report = self.tick().await;
                        let _ = respond_to.send(report);
                    }

                    Some(SchedulerCommand::Shutdown) => {
                        debug!("received shutdown command");
                        break;
                    }

                    None => {
                        warn!("command channel closed, shutting down");
                        break;
                    }
                }
            }
        }

        debug!("poll loop stopped");
    }

    /// Sample every known device in order, then re-discover if due
    ///
    /// A failed sample leaves the previous reading in place; the next tick is
    /// the retry.
    async fn tick(&mut self) -> TickReport {
        let devices = self.registry.list().await;
        let mut report = TickReport {
            devices: devices.len(),
            ..TickReport::default()
        };

        for device in &devices {
            match self.sampler.sample(device).await {
                Ok(reading) => {
                    trace!("device {} power state: {reading:?}", device.instance);
                    self.store.record(reading).await;
                    report.sampled += 1;
                }
                Err(e) => {
                    error!("error getting power state: {e}");
                    report.failed += 1;
                }
            }
        }

        if self.last_discovery.elapsed() > self.cadence.discovery {
            debug!("discovery cadence elapsed, scanning");
            report.discovery = Some(self.discovery.discover(self.scan_timeout).await);
            self.last_discovery = Instant::now();
        }

        report
    }
}

/// Owner of the poll loop and its lifecycle
pub struct Scheduler {
    state: SchedulerState,
    idle: Option<PollActor>,
    command_tx: mpsc::Sender<SchedulerCommand>,
    task: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(
        cadence: Cadence,
        registry: DeviceRegistry,
        store: ObservationStore,
        sampler: Arc<dyn Sampler>,
        discovery: DiscoveryService,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = PollActor {
            registry,
            store,
            sampler,
            discovery,
            cadence,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            command_rx,
            last_discovery: Instant::now(),
        };

        Self {
            state: SchedulerState::Idle,
            idle: Some(actor),
            command_tx,
            task: None,
        }
    }

    /// Bound each discovery scan by `timeout`; only effective before start
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        if let Some(actor) = self.idle.as_mut() {
            actor.scan_timeout = timeout;
        }
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Spawn the loop. The first sampling tick fires one period later.
    ///
    /// A zero sampling cadence is refused and leaves the scheduler idle.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        match self.state {
            SchedulerState::Running => Err(SchedulerError::AlreadyRunning),
            SchedulerState::Stopped => Err(SchedulerError::Stopped),
            SchedulerState::Idle => {
                let cadence = self.idle.as_ref().map(|actor| actor.cadence);
                if cadence.is_some_and(|c| c.sampling.is_zero()) {
                    return Err(SchedulerError::InvalidCadence);
                }

                let actor = self.idle.take().ok_or(SchedulerError::Stopped)?;
                self.task = Some(tokio::spawn(actor.run()));
                self.state = SchedulerState::Running;
                Ok(())
            }
        }
    }

    /// Run one tick on the loop now and wait for its report
    pub async fn tick_now(&self) -> Result<TickReport, SchedulerError> {
        if self.state != SchedulerState::Running {
            return Err(SchedulerError::NotRunning);
        }

        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(SchedulerCommand::TickNow { respond_to: tx })
            .await
            .map_err(|_| SchedulerError::LoopGone)?;

        rx.await.map_err(|_| SchedulerError::LoopGone)
    }

    /// Halt the loop, letting an in-flight tick finish. Stopping twice is a no-op.
    pub async fn stop(&mut self) {
        match self.state {
            SchedulerState::Stopped => {}
            SchedulerState::Idle => {
                self.idle = None;
                self.state = SchedulerState::Stopped;
            }
            SchedulerState::Running => {
                // the loop may already be gone; joining below covers both cases
                let _ = self.command_tx.send(SchedulerCommand::Shutdown).await;

                if let Some(task) = self.task.take() {
                    if let Err(e) = task.await {
                        error!("poll loop task failed: {e}");
                    }
                }

                self.state = SchedulerState::Stopped;
                debug!("scheduler stopped");
            }
        }
    }
}
