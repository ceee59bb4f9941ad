// # Address Source Trait
//
// Defines the interface for discovering this machine's current address of
// one family.
//
// ## Implementations
//
// - UDP "connect" lookup: `r53ddns-ip-socket` crate (IPv4 and IPv6)
// - External echo service: `r53ddns-ip-http` crate (public IPv4)
//
// ## Usage
//
// ```rust,ignore
// use r53ddns_core::AddressSource;
//
// match source.discover().await? {
//     Discovery::Found(ip) => println!("{ip}"),
//     other => println!("no address: {other}"),
// }
// ```

use crate::traits::dns_provider::RecordType;
use async_trait::async_trait;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

/// Address family (IPv4 or IPv6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Both families, in the order they are reconciled
    pub const ALL: [AddressFamily; 2] = [AddressFamily::V4, AddressFamily::V6];

    /// The address record type for this family
    pub fn record_type(&self) -> RecordType {
        match self {
            AddressFamily::V4 => RecordType::A,
            AddressFamily::V6 => RecordType::Aaaa,
        }
    }

    /// Whether an address belongs to this family
    pub fn matches(&self, ip: &IpAddr) -> bool {
        match self {
            AddressFamily::V4 => ip.is_ipv4(),
            AddressFamily::V6 => ip.is_ipv6(),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("IPv4"),
            AddressFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// Outcome of probing for an address of one family
///
/// Only `Found` yields an address. The other two both mean "no usable
/// address" for reconciliation purposes, but they are kept apart so a
/// timed-out lookup can be told from a host that has no address of the
/// family at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// An address was obtained
    Found(IpAddr),
    /// The host has no usable address of this family
    Unavailable {
        /// Human-readable explanation (e.g. the OS error)
        reason: String,
    },
    /// The lookup did not finish within its time bound
    TimedOut {
        /// The bound that was exceeded
        after: Duration,
    },
}

impl Discovery {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Discovery::Unavailable {
            reason: reason.into(),
        }
    }

    /// The discovered address, if any
    pub fn address(&self) -> Option<IpAddr> {
        match self {
            Discovery::Found(ip) => Some(*ip),
            _ => None,
        }
    }
}

impl fmt::Display for Discovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discovery::Found(ip) => write!(f, "{}", ip),
            Discovery::Unavailable { reason } => write!(f, "unavailable ({})", reason),
            Discovery::TimedOut { after } => write!(f, "timed out after {:?}", after),
        }
    }
}

/// Trait for address source implementations
///
/// A source answers for exactly one family. It performs a single lookup per
/// call; the updater owns the time bound around it.
///
/// Return `Ok(Discovery::Unavailable { .. })` when the machine simply has no
/// address of the family. Return `Err` only for failures that must abort the
/// run, because absence leads to the record being deleted.
#[async_trait]
pub trait AddressSource: Send + Sync {
    /// Look up the current address
    async fn discover(&self) -> Result<Discovery, crate::Error>;

    /// The family this source answers for
    fn family(&self) -> AddressFamily;

    /// Source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
