//! Shutdown sequencing.
//!
//! Readiness drops as soon as shutdown begins while the listener keeps
//! serving through the drain period. Authorizations still running a grace
//! period after the listener stops are cancelled and denied.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Grace period for in-flight authorizations once the listener stops.
pub const IN_FLIGHT_GRACE: Duration = Duration::from_secs(10);

/// Tokens shared between the signal handler and request handlers.
#[derive(Debug, Clone, Default)]
pub struct ShutdownTokens {
    /// Cancelled when shutdown begins. Readiness fails from then on.
    pub draining: CancellationToken,

    /// Cancelled when in-flight authorizations must be abandoned.
    pub in_flight: CancellationToken,
}

impl ShutdownTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.draining.is_cancelled() || self.in_flight.is_cancelled()
    }

    /// Mark the service as draining, then wait out `drain`.
    ///
    /// Returns when the listener should stop accepting connections.
    pub async fn drain(&self, drain: Duration) {
        self.draining.cancel();

        if drain.is_zero() {
            info!("Skipping drain period");
            return;
        }

        warn!(drain_seconds = drain.as_secs(), "Draining connections");
        tokio::time::sleep(drain).await;
        info!("Drain period complete");
    }

    /// Cancel in-flight authorizations after `grace` unless the process
    /// exits first.
    pub fn cancel_in_flight_after(&self, grace: Duration) {
        let in_flight = self.in_flight.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            warn!("Cancelling in-flight authorizations");
            in_flight.cancel();
        });
    }
}
