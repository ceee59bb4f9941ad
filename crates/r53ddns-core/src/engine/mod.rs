//! Core updater engine
//!
//! The Updater is responsible for one complete run:
//! - Discovering the current address of each family via AddressSource
//! - Resolving the zone that owns the host name
//! - Reconciling each family's record against the discovered address
//! - Submitting every resulting change as one atomic batch
//! - Optionally waiting for the change to propagate
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐  ┌───────────────┐
//! │ AddressSource │  │ AddressSource │
//! │    (IPv4)     │  │    (IPv6)     │
//! └───────┬───────┘  └───────┬───────┘
//!         └─── Discovery ────┘
//!                  │
//!                  ▼
//!          ┌──────────────┐        ┌──────────────────┐
//!          │   Updater    │───────▶│ resolve_zone     │
//!          └──────────────┘        │ reconcile (x2)   │
//!                  │               └──────────────────┘
//!                  ▼
//!          ┌──────────────┐        ┌──────────────────┐
//!          │ DnsProvider  │◀───────│ PropagationWaiter│
//!          │ (one batch)  │        └──────────────────┘
//!          └──────────────┘
//! ```
//!
//! ## Concurrency
//!
//! The two discoveries run concurrently, each under the configured time
//! bound. Provider calls are sequential. The tool assumes a single writer
//! per record; `recheck_before_submit` narrows the race window but is not a
//! lock.

use crate::config::UpdaterConfig;
use crate::error::{Error, Result};
use crate::host::HostName;
use crate::propagation::{PropagationOutcome, PropagationWaiter};
use crate::reconcile::{ExistingRecord, Reconciliation, existing_record, reconcile};
use crate::traits::{
    AddressFamily, AddressSource, Change, ChangeHandle, Discovery, DnsProvider, Zone,
};
use crate::zone::resolve_zone;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Route53 returns at most this many record sets for an exact-match lookup
const RECORD_LOOKUP_MAX_ITEMS: usize = 1;

/// Everything that happened during one run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The normalized host name
    pub host: HostName,
    /// The zone that was used
    pub zone: Zone,
    /// Discovery outcome per family
    pub discoveries: Vec<(AddressFamily, Discovery)>,
    /// Decision per family
    pub decisions: Vec<(AddressFamily, Reconciliation)>,
    /// Whether the batch was withheld because of dry-run mode
    pub dry_run: bool,
    /// Handle of the submitted batch, if one was submitted
    pub submitted: Option<ChangeHandle>,
    /// Result of the propagation wait, if one was requested
    pub propagation: Option<PropagationOutcome>,
}

impl RunReport {
    /// Changes decided during the run (submitted unless dry-run)
    pub fn changes(&self) -> Vec<&Change> {
        self.decisions
            .iter()
            .filter_map(|(_, decision)| decision.change())
            .collect()
    }

    /// The decision taken for one family
    pub fn decision(&self, family: AddressFamily) -> Option<&Reconciliation> {
        self.decisions
            .iter()
            .find(|(f, _)| *f == family)
            .map(|(_, decision)| decision)
    }

    /// The discovery outcome for one family
    pub fn discovery(&self, family: AddressFamily) -> Option<&Discovery> {
        self.discoveries
            .iter()
            .find(|(f, _)| *f == family)
            .map(|(_, discovery)| discovery)
    }
}

/// One-shot updater
///
/// ## Lifecycle
///
/// 1. Create with [`Updater::new()`]
/// 2. Call [`Updater::run()`] (or [`Updater::run_with_shutdown()`])
/// 3. Inspect the returned [`RunReport`]
///
/// Running twice with unchanged inputs makes no second submission.
pub struct Updater {
    /// DNS provider for reading and changing records
    provider: Box<dyn DnsProvider>,

    /// At most one address source per family
    sources: Vec<Box<dyn AddressSource>>,

    /// Normalized host name
    host: HostName,

    /// Run settings
    config: UpdaterConfig,

    /// Bound applied to each discovery
    discovery_timeout: Duration,

    /// Poller used when waiting for propagation
    waiter: PropagationWaiter,
}

impl Updater {
    /// Create a new updater
    ///
    /// # Parameters
    ///
    /// - `provider`: DNS provider implementation
    /// - `sources`: address sources, at most one per family; a family
    ///   without a source is treated as having no address
    /// - `config`: run configuration
    pub fn new(
        provider: Box<dyn DnsProvider>,
        sources: Vec<Box<dyn AddressSource>>,
        config: UpdaterConfig,
    ) -> Result<Self> {
        config.validate()?;

        for family in AddressFamily::ALL {
            let count = sources.iter().filter(|s| s.family() == family).count();
            if count > 1 {
                return Err(Error::config(format!(
                    "Only one {} address source may be configured, got {}",
                    family, count
                )));
            }
        }

        Ok(Self {
            provider,
            sources,
            host: config.host()?,
            discovery_timeout: config.discovery.timeout(),
            waiter: PropagationWaiter::from_config(&config.propagation),
            config,
        })
    }

    /// Override the per-family discovery bound
    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Override the propagation poller
    pub fn with_waiter(mut self, waiter: PropagationWaiter) -> Self {
        self.waiter = waiter;
        self
    }

    /// The normalized host name this updater manages
    pub fn host(&self) -> &HostName {
        &self.host
    }

    /// Run once, cancelling a propagation wait on Ctrl-C
    pub async fn run(&self) -> Result<RunReport> {
        self.run_with_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run once; `shutdown` cancels a propagation wait when it completes
    pub async fn run_with_shutdown<F>(&self, shutdown: F) -> Result<RunReport>
    where
        F: Future<Output = ()> + Send,
    {
        info!("Looking for Route53 record for {}", self.host);

        let discoveries = self.discover_all().await?;
        let zone = self.resolve_zone().await?;

        // Evaluate both families even if one fails, so every problem is
        // reported, but never submit anything when one did.
        let mut decisions = Vec::with_capacity(AddressFamily::ALL.len());
        let mut snapshot = Vec::with_capacity(AddressFamily::ALL.len());
        let mut first_error = None;

        for (family, discovery) in &discoveries {
            match self.fetch_existing(&zone.id, *family).await {
                Ok(existing) => {
                    let decision = reconcile(
                        &self.host,
                        *family,
                        discovery.address(),
                        self.config.ttl,
                        existing.as_ref(),
                    );
                    self.log_decision(*family, discovery, &decision);
                    snapshot.push((*family, existing));
                    decisions.push((*family, decision));
                }
                Err(e) => {
                    error!(
                        "Cannot reconcile {} record for {} in zone {}: {}",
                        family.record_type(),
                        self.host,
                        zone.id,
                        e
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        let mut report = RunReport {
            host: self.host.clone(),
            zone,
            discoveries,
            decisions,
            dry_run: self.config.dry_run,
            submitted: None,
            propagation: None,
        };

        let changes: Vec<Change> = report.changes().into_iter().cloned().collect();

        if changes.is_empty() {
            info!("All records for {} are already correct", self.host);
            return Ok(report);
        }

        if self.config.dry_run {
            for change in &changes {
                info!("[DRY-RUN] Would submit {} to zone {}", change, report.zone.id);
            }
            return Ok(report);
        }

        if self.config.recheck_before_submit {
            self.recheck(&report.zone.id, &snapshot).await?;
        }

        let handle = self.submit(&report.zone.id, &changes).await?;
        report.submitted = Some(handle.clone());

        if self.config.wait_for_propagation {
            let outcome = self
                .waiter
                .wait(self.provider.as_ref(), &handle, shutdown)
                .await?;
            report.propagation = Some(outcome);
        }

        Ok(report)
    }

    /// Discover both families concurrently
    async fn discover_all(&self) -> Result<Vec<(AddressFamily, Discovery)>> {
        let (v4, v6) = tokio::join!(
            self.discover(AddressFamily::V4),
            self.discover(AddressFamily::V6)
        );

        Ok(vec![(AddressFamily::V4, v4?), (AddressFamily::V6, v6?)])
    }

    /// Discover one family under the discovery bound
    async fn discover(&self, family: AddressFamily) -> Result<Discovery> {
        let Some(source) = self.sources.iter().find(|s| s.family() == family) else {
            debug!("No {} address source configured", family);
            return Ok(Discovery::unavailable("no address source configured"));
        };

        let discovery = match tokio::time::timeout(self.discovery_timeout, source.discover()).await
        {
            Ok(result) => result?,
            Err(_) => Discovery::TimedOut {
                after: self.discovery_timeout,
            },
        };

        match &discovery {
            Discovery::Found(ip) if !family.matches(ip) => {
                warn!(
                    "{} source {} returned {}, ignoring it",
                    family,
                    source.source_name(),
                    ip
                );
                Ok(Discovery::unavailable(format!("source returned non-{} address {}", family, ip)))
            }
            Discovery::Found(ip) => {
                info!("Current {} address is {} (via {})", family, ip, source.source_name());
                Ok(discovery)
            }
            Discovery::Unavailable { reason } => {
                info!("No {} address available: {}", family, reason);
                Ok(discovery)
            }
            Discovery::TimedOut { after } => {
                warn!(
                    "{} address discovery via {} timed out after {:?}, treating as no address",
                    family,
                    source.source_name(),
                    after
                );
                Ok(discovery)
            }
        }
    }

    /// Use the configured zone or pick the most specific owning zone
    async fn resolve_zone(&self) -> Result<Zone> {
        if let Some(zone_id) = &self.config.zone_id {
            debug!("Using pre-configured zone ID {}", zone_id);
            return Ok(Zone::new(zone_id.clone(), String::new()));
        }

        let zones = self.provider.list_zones().await?;
        debug!("{} zone(s) visible", zones.len());

        let zone = resolve_zone(&self.host, &zones)?.clone();
        info!("Using zone {} ({})", zone.name, zone.id);
        Ok(zone)
    }

    /// Fetch and validate the existing record of one family
    async fn fetch_existing(
        &self,
        zone_id: &str,
        family: AddressFamily,
    ) -> Result<Option<ExistingRecord>> {
        let record_type = family.record_type();
        let sets = self
            .provider
            .list_record_sets(zone_id, &self.host, record_type, RECORD_LOOKUP_MAX_ITEMS)
            .await?;

        existing_record(&self.host, record_type, &sets)
    }

    /// Re-read every family and fail if anything moved since reconciliation
    async fn recheck(
        &self,
        zone_id: &str,
        snapshot: &[(AddressFamily, Option<ExistingRecord>)],
    ) -> Result<()> {
        for (family, before) in snapshot {
            let now = self.fetch_existing(zone_id, *family).await?;
            if &now != before {
                warn!(
                    "{} record for {} changed from {:?} to {:?} during this run",
                    family.record_type(),
                    self.host,
                    before,
                    now
                );
                return Err(Error::concurrent_modification(
                    self.host.as_str(),
                    family.record_type().as_str(),
                ));
            }
        }

        debug!("Records unchanged since reconciliation");
        Ok(())
    }

    /// Submit the batch
    async fn submit(&self, zone_id: &str, changes: &[Change]) -> Result<ChangeHandle> {
        for change in changes {
            debug!("Batch entry: {}", change);
        }

        let handle = self.provider.submit_changes(zone_id, changes).await?;
        info!(
            "Submitted {} change(s) to {} zone {}: change {} is {:?}",
            changes.len(),
            self.provider.provider_name(),
            zone_id,
            handle.id,
            handle.status
        );
        Ok(handle)
    }

    fn log_decision(&self, family: AddressFamily, discovery: &Discovery, decision: &Reconciliation) {
        match decision {
            Reconciliation::NothingToDo => {
                info!(
                    "No {} address record exists and we don't have an address of that type",
                    family
                );
            }
            Reconciliation::Unchanged { value, ttl } => {
                info!(
                    "Record is already set to correct {} address {} (TTL {})",
                    family, value, ttl
                );
            }
            Reconciliation::Create(change) => {
                info!(
                    "Setting record to point to {} address {} with TTL {}",
                    family, change.record.value, change.record.ttl
                );
            }
            Reconciliation::Update { previous, change } => {
                info!(
                    "Setting record to point to {} address {} with TTL {} (was {} with TTL {})",
                    family, change.record.value, change.record.ttl, previous.value, previous.ttl
                );
            }
            Reconciliation::Delete(change) => {
                info!(
                    "Removing record for {} address {} because we don't have an address of that type",
                    family, change.record.value
                );
                if let Discovery::TimedOut { after } = discovery {
                    warn!(
                        "{} record for {} is being removed because discovery timed out after {:?}; check connectivity if this is unexpected",
                        family.record_type(),
                        self.host,
                        after
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::RecordType;

    #[test]
    fn test_report_accessors() {
        let host = HostName::new("host.example.com").unwrap();
        let create = Change::upsert(&host, RecordType::A, 60, "203.0.113.5".to_string());
        let report = RunReport {
            host,
            zone: Zone::new("Z1", "example.com."),
            discoveries: vec![
                (AddressFamily::V4, Discovery::Found("203.0.113.5".parse().unwrap())),
                (AddressFamily::V6, Discovery::unavailable("no route")),
            ],
            decisions: vec![
                (AddressFamily::V4, Reconciliation::Create(create.clone())),
                (AddressFamily::V6, Reconciliation::NothingToDo),
            ],
            dry_run: false,
            submitted: None,
            propagation: None,
        };

        assert_eq!(report.changes(), vec![&create]);
        assert_eq!(report.decision(AddressFamily::V6), Some(&Reconciliation::NothingToDo));
        assert_eq!(
            report.discovery(AddressFamily::V4).and_then(Discovery::address),
            Some("203.0.113.5".parse().unwrap())
        );
    }
}
