//! Configuration types for the updater
//!
//! This module defines all configuration structures used throughout the
//! workspace. The binary fills them from command-line arguments and
//! environment variables; library users can build or deserialize them
//! directly.

use crate::host::HostName;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest TTL Route53 accepts
pub const MAX_TTL: u32 = 2_147_483_647;

/// Default external service answering with the caller's public IPv4 address
pub const DEFAULT_PUBLIC_ADDRESS_URL: &str = "https://ipv4.myexternalip.com/raw";

/// Main updater configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Host name whose address records are managed
    pub host_name: String,

    /// Explicit TTL; when absent the existing TTL (or the default) is kept
    #[serde(default)]
    pub ttl: Option<u32>,

    /// Zone to use instead of searching all zones
    #[serde(default)]
    pub zone_id: Option<String>,

    /// Perform all reads but never submit changes
    #[serde(default)]
    pub dry_run: bool,

    /// Re-read the records right before submitting and abort if they moved
    #[serde(default)]
    pub recheck_before_submit: bool,

    /// Block until the provider reports the change as propagated
    #[serde(default)]
    pub wait_for_propagation: bool,

    /// Address discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Propagation wait settings
    #[serde(default)]
    pub propagation: PropagationConfig,
}

impl UpdaterConfig {
    /// Create a configuration for a host with defaults everywhere else
    pub fn new(host_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            ttl: None,
            zone_id: None,
            dry_run: false,
            recheck_before_submit: false,
            wait_for_propagation: false,
            discovery: DiscoveryConfig::default(),
            propagation: PropagationConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        HostName::new(&self.host_name)
            .map_err(|e| crate::Error::config(format!("Invalid host name: {}", e)))?;

        if let Some(ttl) = self.ttl
            && ttl > MAX_TTL
        {
            return Err(crate::Error::config(format!(
                "TTL must be between 0 and {}. Got: {}",
                MAX_TTL, ttl
            )));
        }

        if let Some(zone_id) = &self.zone_id
            && zone_id.trim().is_empty()
        {
            return Err(crate::Error::config("Zone ID cannot be empty"));
        }

        self.discovery.validate()?;
        self.propagation.validate()?;

        Ok(())
    }

    /// The normalized host name
    pub fn host(&self) -> Result<HostName, crate::Error> {
        HostName::new(&self.host_name)
    }
}

/// Address discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Use the external echo service for IPv4 instead of the local socket lookup
    #[serde(default)]
    pub public_address: bool,

    /// URL of the external echo service
    #[serde(default = "default_public_address_url")]
    pub public_address_url: String,

    /// Prefer a temporary (RFC 4941) IPv6 source address over the public one
    #[serde(default)]
    pub prefer_temporary_ipv6: bool,

    /// Upper bound for each family's discovery, in seconds
    #[serde(default = "default_discovery_timeout_secs")]
    pub timeout_secs: u64,
}

impl DiscoveryConfig {
    /// Validate the discovery configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Discovery timeout must be > 0"));
        }

        if self.public_address {
            let url = self.public_address_url.trim();
            if url.is_empty() {
                return Err(crate::Error::config(
                    "Public address URL cannot be empty",
                ));
            }
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(crate::Error::config(format!(
                    "Public address URL must use HTTP or HTTPS scheme. Got: {}",
                    url
                )));
            }
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            public_address: false,
            public_address_url: default_public_address_url(),
            prefer_temporary_ipv6: false,
            timeout_secs: default_discovery_timeout_secs(),
        }
    }
}

/// Propagation wait configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationConfig {
    /// Delay between status queries, in seconds
    #[serde(default = "default_propagation_interval_secs")]
    pub interval_secs: u64,

    /// Give up waiting after this many seconds
    #[serde(default = "default_propagation_max_wait_secs")]
    pub max_wait_secs: u64,
}

impl PropagationConfig {
    /// Validate the propagation configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Propagation interval must be > 0"));
        }
        if self.max_wait_secs == 0 {
            return Err(crate::Error::config("Propagation timeout must be > 0"));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_propagation_interval_secs(),
            max_wait_secs: default_propagation_max_wait_secs(),
        }
    }
}

fn default_public_address_url() -> String {
    DEFAULT_PUBLIC_ADDRESS_URL.to_string()
}

fn default_discovery_timeout_secs() -> u64 {
    5
}

fn default_propagation_interval_secs() -> u64 {
    15
}

fn default_propagation_max_wait_secs() -> u64 {
    900
}
