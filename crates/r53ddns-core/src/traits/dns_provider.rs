// # DNS Provider Trait
//
// Defines the interface to the DNS-hosting provider's record API.
//
// ## Implementations
//
// - Route53: `r53ddns-provider-route53` crate
//
// ## Usage
//
// ```rust,ignore
// use r53ddns_core::DnsProvider;
//
// let zones = provider.list_zones().await?;
// let sets = provider
//     .list_record_sets(&zone.id, &host, RecordType::A, 1)
//     .await?;
// let handle = provider.submit_changes(&zone.id, &changes).await?;
// ```

use crate::host::HostName;
use async_trait::async_trait;
use std::fmt;

/// A hosted zone visible to the caller's credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    /// Opaque provider identifier
    pub id: String,
    /// Fully-qualified domain suffix (e.g. "example.com.")
    pub name: String,
}

impl Zone {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Address record types managed by this tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record set as reported by the provider
///
/// `record_type` is kept as the provider's string because a listing can
/// return a neighbouring record of any type (CNAME, MX, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    pub name: String,
    pub record_type: String,
    /// Absent for alias records
    pub ttl: Option<u32>,
    pub values: Vec<String>,
}

/// What to do with a record set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    /// Create or replace
    Upsert,
    /// Remove (must carry the current value and TTL)
    Delete,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeAction::Upsert => f.write_str("UPSERT"),
            ChangeAction::Delete => f.write_str("DELETE"),
        }
    }
}

/// Single-value address record carried by a change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    pub name: String,
    pub record_type: RecordType,
    pub ttl: u32,
    pub value: String,
}

/// One entry of an atomic change batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub action: ChangeAction,
    pub record: AddressRecord,
}

impl Change {
    pub fn upsert(host: &HostName, record_type: RecordType, ttl: u32, value: String) -> Self {
        Self {
            action: ChangeAction::Upsert,
            record: AddressRecord {
                name: host.as_str().to_string(),
                record_type,
                ttl,
                value,
            },
        }
    }

    pub fn delete(host: &HostName, record_type: RecordType, ttl: u32, value: String) -> Self {
        Self {
            action: ChangeAction::Delete,
            record: AddressRecord {
                name: host.as_str().to_string(),
                record_type,
                ttl,
                value,
            },
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} (TTL {})",
            self.action, self.record.name, self.record.record_type, self.record.value, self.record.ttl
        )
    }
}

/// Replication state of a submitted change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    /// Accepted but not yet on every authoritative server
    Pending,
    /// Fully propagated
    InSync,
}

/// Tracking handle returned by a batch submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeHandle {
    pub id: String,
    pub status: ChangeStatus,
}

impl ChangeHandle {
    pub fn new(id: impl Into<String>, status: ChangeStatus) -> Self {
        Self {
            id: id.into(),
            status,
        }
    }

    pub fn is_in_sync(&self) -> bool {
        self.status == ChangeStatus::InSync
    }
}

/// Trait for DNS provider implementations
///
/// Providers are thin adapters over the hosting API. They make one API call
/// (or one paginated listing) per method and never decide whether a change
/// is needed; that is owned by the reconciler.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Retries
///
/// Providers return errors instead of retrying. The only retry-like
/// behaviour in the system is the propagation poll, which lives in
/// [`crate::propagation::PropagationWaiter`].
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every zone visible to the credentials, following pagination
    async fn list_zones(&self) -> Result<Vec<Zone>, crate::Error>;

    /// List record sets starting at (`start_name`, `start_type`)
    ///
    /// The listing is ordered, so the first result may be a neighbouring
    /// record when no exact match exists. Callers must check name and type.
    async fn list_record_sets(
        &self,
        zone_id: &str,
        start_name: &HostName,
        start_type: RecordType,
        max_items: usize,
    ) -> Result<Vec<RecordSet>, crate::Error>;

    /// Submit all changes as one atomic batch
    ///
    /// Callers never pass an empty slice.
    async fn submit_changes(
        &self,
        zone_id: &str,
        changes: &[Change],
    ) -> Result<ChangeHandle, crate::Error>;

    /// Query the status of a previously submitted change
    async fn get_change(&self, change_id: &str) -> Result<ChangeHandle, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
