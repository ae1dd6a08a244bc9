//! Interval scheduler driving the lifecycle engine.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::cycle::LifecycleEngine;

/// Scheduler operational state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Not started, or stopped after running.
    Stopped,
    /// The cycle loop is active.
    Running,
}

/// Runs the lifecycle engine immediately on start and then on a fixed
/// interval.
///
/// At most one cycle is in flight at a time: the loop awaits each cycle
/// before looking at the ticker again, and ticks that elapse while a cycle
/// runs are skipped rather than queued. Stopping lets an in-flight cycle
/// finish so no request is left in `processing` without an owner.
pub struct Scheduler {
    engine: Arc<LifecycleEngine>,
    interval: Duration,
    state: Arc<RwLock<SchedulerState>>,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: RwLock<Option<mpsc::Receiver<()>>>,
}

impl Scheduler {
    /// Create a new scheduler; call [`start`](Self::start) to begin cycling.
    pub fn new(engine: Arc<LifecycleEngine>, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        Self {
            engine,
            interval,
            state: Arc::new(RwLock::new(SchedulerState::Stopped)),
            shutdown_tx,
            shutdown_rx: RwLock::new(Some(shutdown_rx)),
        }
    }

    /// Start the cycle loop. The first cycle runs immediately; later cycles
    /// fire on the interval until [`stop`](Self::stop).
    pub fn start(&self) {
        let Some(mut shutdown_rx) = self.shutdown_rx.write().take() else {
            warn!("Scheduler already started");
            return;
        };

        *self.state.write() = SchedulerState::Running;
        info!(interval_secs = self.interval.as_secs(), "Starting quote scheduler");

        let engine = self.engine.clone();
        let state = self.state.clone();
        let interval = self.interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = engine.run_cycle().await {
                            error!(error = %e, "Cycle could not read pending requests");
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }

            *state.write() = SchedulerState::Stopped;
            info!("Quote scheduler stopped");
        });
    }

    /// Stop the loop. An in-flight cycle finishes before the loop exits.
    /// Repeated stops are no-ops: the signal is buffered or already taken.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.try_send(());
    }

    /// Current scheduler state.
    pub fn state(&self) -> SchedulerState {
        *self.state.read()
    }

    /// Check if the cycle loop is active.
    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }
}
