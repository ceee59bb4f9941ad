//! Error types for the updater
//!
//! This module defines all error types used throughout the workspace.
//! Everything here is fatal for the current run: a host without an address
//! of some family is not an error and never shows up as one.

use thiserror::Error;

/// Result type alias for updater operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the updater
#[derive(Error, Debug)]
pub enum Error {
    /// No managed zone owns the host name
    #[error("No Route53 zone found for {host}")]
    NoZoneFound {
        /// The normalized host name
        host: String,
    },

    /// The provider returned more than one record set for an exact-match query
    #[error(
        "Multiple record sets ({count}) returned for {host} {record_type}, and we don't know how to handle that"
    )]
    AmbiguousRecordSet {
        host: String,
        record_type: String,
        count: usize,
    },

    /// The existing record holds more than one value
    #[error(
        "Multiple addresses ({count}) found on the {record_type} record for {host} so this record has been modified by someone or something other than this tool. Please delete all but one of the values to use the record with this tool."
    )]
    MultiValueRecord {
        host: String,
        record_type: String,
        count: usize,
    },

    /// The record changed between reconciliation and submission
    #[error("The {record_type} record for {host} changed while this run was in progress")]
    ConcurrentModification { host: String, record_type: String },

    /// Address source failure that must not be mistaken for "no address"
    #[error("Address source error ({source_name}): {message}")]
    AddressSource {
        /// Source name
        source_name: String,
        /// Error message
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider-specific error (transport, authentication, throttling)
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a "no zone" error
    pub fn no_zone_found(host: impl Into<String>) -> Self {
        Self::NoZoneFound { host: host.into() }
    }

    /// Create an ambiguous record set error
    pub fn ambiguous_record_set(
        host: impl Into<String>,
        record_type: impl Into<String>,
        count: usize,
    ) -> Self {
        Self::AmbiguousRecordSet {
            host: host.into(),
            record_type: record_type.into(),
            count,
        }
    }

    /// Create a multi-value record error
    pub fn multi_value_record(
        host: impl Into<String>,
        record_type: impl Into<String>,
        count: usize,
    ) -> Self {
        Self::MultiValueRecord {
            host: host.into(),
            record_type: record_type.into(),
            count,
        }
    }

    /// Create a concurrent modification error
    pub fn concurrent_modification(
        host: impl Into<String>,
        record_type: impl Into<String>,
    ) -> Self {
        Self::ConcurrentModification {
            host: host.into(),
            record_type: record_type.into(),
        }
    }

    /// Create an address source error
    pub fn address_source(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AddressSource {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error means the remote records are not in the shape this
    /// tool manages (someone else touched them)
    pub fn is_precondition_failure(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousRecordSet { .. }
                | Self::MultiValueRecord { .. }
                | Self::ConcurrentModification { .. }
        )
    }
}
