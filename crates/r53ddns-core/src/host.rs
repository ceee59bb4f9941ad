//! Host name normalization
//!
//! Route53 always presents zone and record names in fully-qualified,
//! lowercase form with a trailing dot. [`HostName`] brings user input into
//! the same shape once, so every later comparison is a plain string compare.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a domain name, excluding the trailing dot (RFC 1035)
const MAX_NAME_LEN: usize = 253;

/// Maximum length of a single label (RFC 1035)
const MAX_LABEL_LEN: usize = 63;

/// A validated, fully-qualified host name (lowercase, trailing dot)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostName(String);

impl HostName {
    /// Normalize and validate a host name
    ///
    /// Appends the trailing dot when missing and lowercases the name.
    /// A leading `*` label is accepted so wildcard records can be managed.
    pub fn new(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let bare = trimmed.strip_suffix('.').unwrap_or(trimmed);

        if bare.is_empty() {
            return Err(Error::invalid_input("Host name cannot be empty"));
        }

        if bare.len() > MAX_NAME_LEN {
            return Err(Error::invalid_input(format!(
                "Host name too long: {} chars (max {}). Got: {}",
                bare.len(),
                MAX_NAME_LEN,
                bare
            )));
        }

        for (index, label) in bare.split('.').enumerate() {
            if label.is_empty() {
                return Err(Error::invalid_input(format!(
                    "Host name has empty label: '{}'",
                    trimmed
                )));
            }

            if label.len() > MAX_LABEL_LEN {
                return Err(Error::invalid_input(format!(
                    "Host name label too long: {} chars (max {}). Label: '{}'",
                    label.len(),
                    MAX_LABEL_LEN,
                    label
                )));
            }

            if label == "*" && index == 0 {
                continue;
            }

            if label.chars().any(|c| c.is_whitespace() || c == '*') {
                return Err(Error::invalid_input(format!(
                    "Host name label contains invalid characters. Label: '{}'",
                    label
                )));
            }
        }

        Ok(Self(format!("{}.", bare.to_ascii_lowercase())))
    }

    /// The normalized name, always ending with "."
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this name sits inside the given zone
    ///
    /// Suffix match on whole labels: `ample.com.` does not own
    /// `host.example.com.`.
    pub fn is_within(&self, zone_name: &str) -> bool {
        let mut zone_name = zone_name.to_ascii_lowercase();
        if !zone_name.ends_with('.') {
            zone_name.push('.');
        }

        if zone_name == "." {
            return true;
        }

        self.0 == zone_name || self.0.ends_with(&format!(".{}", zone_name))
    }

    /// Whether a provider-reported record name refers to this host
    pub fn matches_record_name(&self, record_name: &str) -> bool {
        let record_name = record_name.to_ascii_lowercase();
        record_name == self.0 || format!("{}.", record_name) == self.0
    }
}

impl FromStr for HostName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for HostName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HostName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
