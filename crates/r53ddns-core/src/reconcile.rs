//! Record reconciliation
//!
//! Decides, for one address family, whether the record for the host has to
//! be created, updated, deleted or left alone.
//!
//! ```text
//! existing   discovered   action
//! --------   ----------   ------------------------------------------
//! absent     absent       nothing to do
//! absent     present      UPSERT (user TTL or default)
//! present    present      nothing if value and TTL already match,
//!                         otherwise UPSERT (user, existing or default TTL)
//! present    absent       DELETE (existing value and TTL)
//! ```
//!
//! A user TTL only forces an update when it differs from the existing TTL.

use crate::error::{Error, Result};
use crate::host::HostName;
use crate::traits::{AddressFamily, Change, RecordSet, RecordType};
use std::net::IpAddr;
use tracing::debug;

/// TTL used when neither the user nor an existing record provides one
pub const DEFAULT_TTL: u32 = 60;

/// The single existing value of a record, after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingRecord {
    pub ttl: u32,
    pub value: String,
}

impl ExistingRecord {
    pub fn new(ttl: u32, value: impl Into<String>) -> Self {
        Self {
            ttl,
            value: value.into(),
        }
    }

    /// Compare against an address, tolerating non-canonical spellings
    /// (`2001:DB8::1` vs `2001:db8::1`)
    pub fn holds(&self, ip: &IpAddr) -> bool {
        match self.value.parse::<IpAddr>() {
            Ok(existing) => existing == *ip,
            Err(_) => self.value == ip.to_string(),
        }
    }
}

/// Validate a `(name, type)` listing and extract the existing record
///
/// The listing is expected to hold at most one record set. A set whose name
/// or type differs from the query is a neighbour returned because no exact
/// match exists, and counts as "no record". Alias records carry no values and
/// also count as "no record".
pub fn existing_record(
    host: &HostName,
    record_type: RecordType,
    record_sets: &[RecordSet],
) -> Result<Option<ExistingRecord>> {
    if record_sets.len() > 1 {
        return Err(Error::ambiguous_record_set(
            host.as_str(),
            record_type.as_str(),
            record_sets.len(),
        ));
    }

    let Some(set) = record_sets.first() else {
        return Ok(None);
    };

    if set.record_type != record_type.as_str() || !host.matches_record_name(&set.name) {
        debug!(
            "Listing returned neighbouring record {} {}, no exact match for {} {}",
            set.name, set.record_type, host, record_type
        );
        return Ok(None);
    }

    match set.values.as_slice() {
        [] => {
            debug!("{} {} carries no values (alias record?)", host, record_type);
            Ok(None)
        }
        [value] => Ok(Some(ExistingRecord::new(
            set.ttl.unwrap_or(DEFAULT_TTL),
            value.clone(),
        ))),
        values => Err(Error::multi_value_record(
            host.as_str(),
            record_type.as_str(),
            values.len(),
        )),
    }
}

/// Resolve the TTL to write: user TTL, else existing TTL, else the default
pub fn desired_ttl(user_ttl: Option<u32>, existing: Option<&ExistingRecord>) -> u32 {
    user_ttl
        .or(existing.map(|record| record.ttl))
        .unwrap_or(DEFAULT_TTL)
}

/// Decision for one address family
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// No record exists and no address of this family is available
    NothingToDo,
    /// The record already holds the right value and TTL
    Unchanged { value: String, ttl: u32 },
    /// The record does not exist yet
    Create(Change),
    /// The record exists with a different value or TTL
    Update {
        previous: ExistingRecord,
        change: Change,
    },
    /// The record exists but there is no address of this family anymore
    Delete(Change),
}

impl Reconciliation {
    /// The change to submit, if any
    pub fn change(&self) -> Option<&Change> {
        match self {
            Reconciliation::Create(change)
            | Reconciliation::Update { change, .. }
            | Reconciliation::Delete(change) => Some(change),
            Reconciliation::NothingToDo | Reconciliation::Unchanged { .. } => None,
        }
    }

    /// Consume the decision, yielding the change to submit, if any
    pub fn into_change(self) -> Option<Change> {
        match self {
            Reconciliation::Create(change)
            | Reconciliation::Update { change, .. }
            | Reconciliation::Delete(change) => Some(change),
            Reconciliation::NothingToDo | Reconciliation::Unchanged { .. } => None,
        }
    }
}

/// Decide what to do with the record of one family
///
/// Pure function: the same inputs always yield the same decision.
pub fn reconcile(
    host: &HostName,
    family: AddressFamily,
    discovered: Option<IpAddr>,
    user_ttl: Option<u32>,
    existing: Option<&ExistingRecord>,
) -> Reconciliation {
    let record_type = family.record_type();
    let ttl = desired_ttl(user_ttl, existing);

    match (existing, discovered) {
        (None, None) => Reconciliation::NothingToDo,
        (None, Some(ip)) => {
            Reconciliation::Create(Change::upsert(host, record_type, ttl, ip.to_string()))
        }
        (Some(record), Some(ip)) => {
            let ttl_conflicts = user_ttl.is_some_and(|requested| requested != record.ttl);

            if record.holds(&ip) && !ttl_conflicts {
                Reconciliation::Unchanged {
                    value: record.value.clone(),
                    ttl: record.ttl,
                }
            } else {
                Reconciliation::Update {
                    previous: record.clone(),
                    change: Change::upsert(host, record_type, ttl, ip.to_string()),
                }
            }
        }
        (Some(record), None) => Reconciliation::Delete(Change::delete(
            host,
            record_type,
            record.ttl,
            record.value.clone(),
        )),
    }
}
