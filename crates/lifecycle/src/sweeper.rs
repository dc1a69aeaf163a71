//! Periodic expiry of overdue pending bookings.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::lifecycle::BookingLifecycle;
use crate::services::PaymentService;
use store::Store;

/// Runs [`BookingLifecycle::expire_due_bookings`] on a fixed interval.
///
/// Sweeps run one after another, never overlapping; a sweep that overruns
/// the interval skips the missed ticks. The loop stops when the shutdown
/// channel flips to `true` or its sender is dropped.
pub struct ExpirySweeper<S, P> {
    lifecycle: Arc<BookingLifecycle<S, P>>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl<S, P> ExpirySweeper<S, P>
where
    S: Store,
    P: PaymentService + 'static,
{
    /// Creates a sweeper.
    pub fn new(
        lifecycle: Arc<BookingLifecycle<S, P>>,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            lifecycle,
            interval,
            shutdown,
        }
    }

    /// Runs until shutdown. The first sweep happens immediately.
    pub async fn run(mut self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "expiry sweeper started");
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.lifecycle.expire_due_bookings().await {
                        metrics::counter!("expiry_sweep_failures_total").increment(1);
                        tracing::error!(error = %e, "expiry sweep failed");
                    }
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("expiry sweeper stopped");
    }

    /// Runs the sweeper on the tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
