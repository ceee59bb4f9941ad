//! Test doubles and common utilities for contract tests
//!
//! The doubles record every call so tests can assert on what the updater
//! did against the provider, not only on what it returned.

#![allow(dead_code)]

use r53ddns_core::error::Result;
use r53ddns_core::traits::{
    AddressFamily, AddressSource, Change, ChangeHandle, ChangeStatus, Discovery, DnsProvider,
    RecordSet, RecordType, Zone,
};
use r53ddns_core::{HostName, PropagationWaiter, Updater, UpdaterConfig};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const HOST: &str = "host.example.com";
pub const ZONE_ID: &str = "/hostedzone/Z2EXAMPLE";

/// Shared, inspectable state behind [`MockDnsProvider`]
#[derive(Default)]
pub struct ProviderState {
    pub zones: Vec<Zone>,
    /// Listing returned per queried record type
    pub record_sets: HashMap<RecordType, Vec<RecordSet>>,
    /// Every submitted batch, with the zone it was sent to
    pub submissions: Vec<(String, Vec<Change>)>,
    /// Number of `Pending` answers before `get_change` reports in-sync
    pub pending_polls: usize,
    /// Listings to swap in after the first `list_record_sets` of a type
    pub record_sets_after_first_read: HashMap<RecordType, Vec<RecordSet>>,
    pub list_zones_calls: usize,
    pub list_record_sets_calls: HashMap<RecordType, usize>,
    pub get_change_calls: usize,
    pub fail_submit: bool,
}

/// A DnsProvider double backed by [`ProviderState`]
#[derive(Clone, Default)]
pub struct MockDnsProvider {
    pub state: Arc<Mutex<ProviderState>>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        let provider = Self::default();
        provider.state.lock().unwrap().zones = vec![
            Zone::new("/hostedzone/ZCOM", "com."),
            Zone::new(ZONE_ID, "example.com."),
        ];
        provider
    }

    pub fn with_zones(self, zones: Vec<Zone>) -> Self {
        self.state.lock().unwrap().zones = zones;
        self
    }

    pub fn with_record(self, record_type: RecordType, ttl: u32, values: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .record_sets
            .insert(record_type, vec![record_set(HOST, record_type.as_str(), ttl, values)]);
        self
    }

    pub fn with_listing(self, record_type: RecordType, sets: Vec<RecordSet>) -> Self {
        self.state.lock().unwrap().record_sets.insert(record_type, sets);
        self
    }

    pub fn with_pending_polls(self, pending_polls: usize) -> Self {
        self.state.lock().unwrap().pending_polls = pending_polls;
        self
    }

    pub fn submissions(&self) -> Vec<(String, Vec<Change>)> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn submission_count(&self) -> usize {
        self.state.lock().unwrap().submissions.len()
    }

    pub fn list_zones_calls(&self) -> usize {
        self.state.lock().unwrap().list_zones_calls
    }

    pub fn get_change_calls(&self) -> usize {
        self.state.lock().unwrap().get_change_calls
    }

    /// Apply submitted changes to the stored listings, like the real service
    fn apply(state: &mut ProviderState, changes: &[Change]) {
        for change in changes {
            let record_type = change.record.record_type;
            match change.action {
                r53ddns_core::traits::ChangeAction::Upsert => {
                    state.record_sets.insert(
                        record_type,
                        vec![RecordSet {
                            name: change.record.name.clone(),
                            record_type: record_type.as_str().to_string(),
                            ttl: Some(change.record.ttl),
                            values: vec![change.record.value.clone()],
                        }],
                    );
                }
                r53ddns_core::traits::ChangeAction::Delete => {
                    state.record_sets.remove(&record_type);
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        let mut state = self.state.lock().unwrap();
        state.list_zones_calls += 1;
        Ok(state.zones.clone())
    }

    async fn list_record_sets(
        &self,
        _zone_id: &str,
        _start_name: &HostName,
        start_type: RecordType,
        _max_items: usize,
    ) -> Result<Vec<RecordSet>> {
        let mut state = self.state.lock().unwrap();
        let calls = state.list_record_sets_calls.entry(start_type).or_insert(0);
        *calls += 1;
        let first_read = *calls == 1;

        let sets = state.record_sets.get(&start_type).cloned().unwrap_or_default();

        if first_read
            && let Some(replacement) = state.record_sets_after_first_read.remove(&start_type)
        {
            state.record_sets.insert(start_type, replacement);
        }

        Ok(sets)
    }

    async fn submit_changes(&self, zone_id: &str, changes: &[Change]) -> Result<ChangeHandle> {
        let mut state = self.state.lock().unwrap();
        if state.fail_submit {
            return Err(r53ddns_core::Error::provider("mock", "Throttling: Rate exceeded"));
        }
        state.submissions.push((zone_id.to_string(), changes.to_vec()));
        Self::apply(&mut state, changes);

        let status = if state.pending_polls == 0 {
            ChangeStatus::InSync
        } else {
            ChangeStatus::Pending
        };
        Ok(ChangeHandle::new(
            format!("/change/C{}", state.submissions.len()),
            status,
        ))
    }

    async fn get_change(&self, change_id: &str) -> Result<ChangeHandle> {
        let mut state = self.state.lock().unwrap();
        state.get_change_calls += 1;
        let status = if state.get_change_calls >= state.pending_polls {
            ChangeStatus::InSync
        } else {
            ChangeStatus::Pending
        };
        Ok(ChangeHandle::new(change_id, status))
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// An address source that always answers the same
pub struct StaticAddressSource {
    family: AddressFamily,
    discovery: Discovery,
    calls: Arc<AtomicUsize>,
}

impl StaticAddressSource {
    pub fn found(ip: &str) -> Self {
        let ip: IpAddr = ip.parse().expect("valid test address");
        let family = if ip.is_ipv4() {
            AddressFamily::V4
        } else {
            AddressFamily::V6
        };
        Self {
            family,
            discovery: Discovery::Found(ip),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unavailable(family: AddressFamily) -> Self {
        Self {
            family,
            discovery: Discovery::unavailable("Network is unreachable (os error 101)"),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Claims to answer for `family` but returns `ip`
    pub fn mislabelled(family: AddressFamily, ip: &str) -> Self {
        Self {
            family,
            discovery: Discovery::Found(ip.parse().expect("valid test address")),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl AddressSource for StaticAddressSource {
    async fn discover(&self) -> Result<Discovery> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.discovery.clone())
    }

    fn family(&self) -> AddressFamily {
        self.family
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// An address source that never answers in time
pub struct HangingAddressSource {
    pub family: AddressFamily,
}

#[async_trait::async_trait]
impl AddressSource for HangingAddressSource {
    async fn discover(&self) -> Result<Discovery> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Discovery::unavailable("unreachable"))
    }

    fn family(&self) -> AddressFamily {
        self.family
    }

    fn source_name(&self) -> &'static str {
        "hanging"
    }
}

/// An address source whose failures are fatal
pub struct FailingAddressSource {
    pub family: AddressFamily,
}

#[async_trait::async_trait]
impl AddressSource for FailingAddressSource {
    async fn discover(&self) -> Result<Discovery> {
        Err(r53ddns_core::Error::address_source(
            "failing",
            "HTTP error: 503 Service Unavailable",
        ))
    }

    fn family(&self) -> AddressFamily {
        self.family
    }

    fn source_name(&self) -> &'static str {
        "failing"
    }
}

pub fn record_set(name: &str, record_type: &str, ttl: u32, values: &[&str]) -> RecordSet {
    let name = if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    };
    RecordSet {
        name,
        record_type: record_type.to_string(),
        ttl: Some(ttl),
        values: values.iter().map(|v| v.to_string()).collect(),
    }
}

/// Build an updater around shared doubles with fast timings
pub fn updater(
    provider: &MockDnsProvider,
    sources: Vec<Box<dyn AddressSource>>,
    config: UpdaterConfig,
) -> Updater {
    Updater::new(Box::new(provider.clone()), sources, config)
        .expect("updater construction succeeds")
        .with_discovery_timeout(Duration::from_millis(100))
        .with_waiter(PropagationWaiter::new(
            Duration::from_millis(5),
            Duration::from_secs(5),
        ))
}

/// Sources for a dual-stack host
pub fn dual_stack(v4: &str, v6: &str) -> Vec<Box<dyn AddressSource>> {
    vec![
        Box::new(StaticAddressSource::found(v4)),
        Box::new(StaticAddressSource::found(v6)),
    ]
}

/// Sources for an IPv4-only host
pub fn v4_only(v4: &str) -> Vec<Box<dyn AddressSource>> {
    vec![
        Box::new(StaticAddressSource::found(v4)),
        Box::new(StaticAddressSource::unavailable(AddressFamily::V6)),
    ]
}

pub fn config() -> UpdaterConfig {
    UpdaterConfig::new(HOST)
}
