//! Propagation waiting
//!
//! After a batch is accepted the provider replicates it to its
//! authoritative servers. The waiter polls the change status at a fixed
//! interval until it reports in-sync, the time bound runs out, or the
//! shutdown future completes.

use crate::config::PropagationConfig;
use crate::error::Result;
use crate::traits::{ChangeHandle, DnsProvider};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How a propagation wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationOutcome {
    /// The provider reports the change on every authoritative server
    InSync,
    /// The time bound ran out first; the change is still accepted
    TimedOut {
        /// Time spent waiting
        waited: Duration,
    },
    /// The shutdown future completed first
    Cancelled,
}

/// Bounded, cancellable status poller
#[derive(Debug, Clone)]
pub struct PropagationWaiter {
    interval: Duration,
    max_wait: Duration,
}

impl PropagationWaiter {
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }

    pub fn from_config(config: &PropagationConfig) -> Self {
        Self::new(config.interval(), config.max_wait())
    }

    /// Poll until the change is in sync
    ///
    /// Status queries that fail abort the wait with the provider error.
    /// The shutdown future is only observed between queries.
    pub async fn wait<F>(
        &self,
        provider: &dyn DnsProvider,
        handle: &ChangeHandle,
        shutdown: F,
    ) -> Result<PropagationOutcome>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        let started = Instant::now();
        let mut current = handle.clone();
        let mut polls: usize = 0;

        loop {
            if current.is_in_sync() {
                info!(
                    "Change {} propagated after {:?} ({} status queries)",
                    current.id,
                    started.elapsed(),
                    polls
                );
                return Ok(PropagationOutcome::InSync);
            }

            let elapsed = started.elapsed();
            if elapsed >= self.max_wait {
                warn!(
                    "Change {} still not propagated after {:?}, giving up",
                    current.id, elapsed
                );
                return Ok(PropagationOutcome::TimedOut { waited: elapsed });
            }

            info!("Waiting for DNS update to propagate");
            let nap = self.interval.min(self.max_wait - elapsed);

            tokio::select! {
                _ = tokio::time::sleep(nap) => {}
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer waiting for change {}", current.id);
                    return Ok(PropagationOutcome::Cancelled);
                }
            }

            current = provider.get_change(&current.id).await?;
            polls += 1;
            debug!("Change {} status: {:?}", current.id, current.status);
        }
    }
}

impl Default for PropagationWaiter {
    fn default() -> Self {
        Self::from_config(&PropagationConfig::default())
    }
}
