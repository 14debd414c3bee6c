//! Periodic poll loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::supervisor::{LifecycleSupervisor, PollOutcome};
use crate::remote::SessionCoordinator;

/// Runs a session refresh and a supervisor pass every `interval`, or
/// immediately when triggered.
pub struct PollScheduler {
    supervisor: Arc<LifecycleSupervisor>,
    session: Arc<SessionCoordinator>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl PollScheduler {
    pub fn new(
        supervisor: Arc<LifecycleSupervisor>,
        session: Arc<SessionCoordinator>,
        interval: Duration,
    ) -> Self {
        Self {
            supervisor,
            session,
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts the loop on the current runtime. Sending on the trigger
    /// channel runs a cycle without waiting for the next tick.
    pub fn start(&self, mut trigger_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        let supervisor = Arc::clone(&self.supervisor);
        let session = Arc::clone(&self.session);
        let shutdown = Arc::clone(&self.shutdown);
        let interval = self.interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.tick().await; // skip immediate first tick

            loop {
                if shutdown.load(Ordering::Acquire) {
                    break;
                }

                tokio::select! {
                    _ = interval_timer.tick() => {},
                    Ok(()) = trigger_rx.recv() => {
                        log::debug!("Manual poll triggered");
                    },
                }

                if shutdown.load(Ordering::Acquire) {
                    break;
                }

                if let Err(e) = session.refresh().await {
                    log::warn!("Session refresh failed: {}", e);
                }

                match supervisor.poll_active().await {
                    Ok(outcomes) => {
                        let changed = outcomes
                            .iter()
                            .filter(|(_, o)| matches!(o, PollOutcome::Updated { .. } | PollOutcome::Gone))
                            .count();
                        if changed > 0 {
                            log::info!("Poll cycle: {} of {} jobs updated", changed, outcomes.len());
                        }
                    }
                    Err(e) => log::error!("Poll cycle failed: {}", e),
                }
            }
        })
    }

    /// Signals the loop to stop after its current cycle.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}
