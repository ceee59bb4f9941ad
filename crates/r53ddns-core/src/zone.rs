//! Zone resolution
//!
//! An account may manage both a parent and a child zone (`example.com.` and
//! `dev.example.com.`). Records must be created in the most specific owning
//! zone, so the longest matching zone name wins.

use crate::error::{Error, Result};
use crate::host::HostName;
use crate::traits::Zone;
use tracing::debug;

/// Pick the zone that owns `host`
///
/// Ties on length keep the first zone seen; equal-length suffixes of the
/// same name are identical names.
pub fn resolve_zone<'a>(host: &HostName, zones: &'a [Zone]) -> Result<&'a Zone> {
    let mut selected: Option<&Zone> = None;

    for zone in zones {
        if !host.is_within(&zone.name) {
            continue;
        }

        debug!("Zone {} ({}) owns {}", zone.name, zone.id, host);

        match selected {
            Some(current) if current.name.len() >= zone.name.len() => {}
            _ => selected = Some(zone),
        }
    }

    selected.ok_or_else(|| Error::no_zone_found(host.as_str()))
}
