//! Core traits for the updater
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`AddressSource`]: Discover the current address of one family
//! - [`DnsProvider`]: Query and change records via the provider API

pub mod address_source;
pub mod dns_provider;

pub use address_source::{AddressFamily, AddressSource, Discovery};
pub use dns_provider::{
    AddressRecord, Change, ChangeAction, ChangeHandle, ChangeStatus, DnsProvider, RecordSet,
    RecordType, Zone,
};
