// # Route53 DNS Provider
//
// This crate provides the AWS Route53 implementation of `DnsProvider`.
//
// ## Behavior
//
// - One API call per trait method (zone listing follows pagination markers)
// - Errors are returned to the caller unchanged in meaning; no retries here
//   beyond what the AWS SDK's standard retry policy already does
// - Credentials and region come from the standard AWS chain (environment,
//   shared config/credentials files, container or instance metadata)
//
// ## Security Requirements
//
// - Credentials NEVER appear in logs; this crate never handles them directly
//
// ## API Reference
//
// - ListHostedZones, ListResourceRecordSets, ChangeResourceRecordSets, GetChange
// - https://docs.aws.amazon.com/Route53/latest/APIReference/

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_route53::Client;
use aws_sdk_route53::error::DisplayErrorContext;
use aws_sdk_route53::types as sdk;
use r53ddns_core::HostName;
use r53ddns_core::traits::{
    Change, ChangeAction, ChangeHandle, ChangeStatus, DnsProvider, RecordSet, RecordType, Zone,
};
use r53ddns_core::{Error, Result};
use std::time::Duration;

/// Name used in errors and logs
const PROVIDER_NAME: &str = "route53";

/// Upper bound for a single API operation, retries included
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// AWS Route53 DNS provider
///
/// Holds an SDK client and nothing else; every call goes to the API.
pub struct Route53Provider {
    client: Client,
}

impl std::fmt::Debug for Route53Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53Provider")
            .field(
                "region",
                &self.client.config().region().map(|r| r.as_ref().to_string()),
            )
            .field("credentials", &"<from AWS credential chain>")
            .finish()
    }
}

impl Route53Provider {
    /// Wrap an existing SDK client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the standard AWS configuration chain
    pub async fn from_env() -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(DEFAULT_OPERATION_TIMEOUT)
                    .build(),
            )
            .load()
            .await;

        tracing::debug!(
            "Route53 client configured (region: {:?})",
            sdk_config.region().map(|r| r.as_ref().to_string())
        );

        Self::new(Client::new(&sdk_config))
    }
}

#[async_trait]
impl DnsProvider for Route53Provider {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        let mut zones = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page = self
                .client
                .list_hosted_zones()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| api_error("ListHostedZones", e))?;

            zones.extend(
                page.hosted_zones()
                    .iter()
                    .map(|zone| Zone::new(zone.id(), unescape_record_name(zone.name()))),
            );

            marker = next_page_marker(page.is_truncated(), page.next_marker());
            if marker.is_none() {
                break;
            }
        }

        tracing::debug!("Listed {} hosted zone(s)", zones.len());
        Ok(zones)
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        start_name: &HostName,
        start_type: RecordType,
        max_items: usize,
    ) -> Result<Vec<RecordSet>> {
        tracing::debug!(
            "Listing record sets in {} starting at {} {}",
            zone_id,
            start_name,
            start_type
        );

        let output = self
            .client
            .list_resource_record_sets()
            .hosted_zone_id(zone_id)
            .start_record_name(start_name.as_str())
            .start_record_type(to_sdk_type(start_type))
            .max_items(i32::try_from(max_items).unwrap_or(i32::MAX))
            .send()
            .await
            .map_err(|e| api_error("ListResourceRecordSets", e))?;

        Ok(output
            .resource_record_sets()
            .iter()
            .map(record_set_from_sdk)
            .collect())
    }

    async fn submit_changes(&self, zone_id: &str, changes: &[Change]) -> Result<ChangeHandle> {
        let batch = change_batch(changes)?;

        let output = self
            .client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(batch)
            .send()
            .await
            .map_err(|e| api_error("ChangeResourceRecordSets", e))?;

        let info = output
            .change_info()
            .ok_or_else(|| Error::provider(PROVIDER_NAME, "response carried no change info"))?;

        Ok(handle_from_sdk(info))
    }

    async fn get_change(&self, change_id: &str) -> Result<ChangeHandle> {
        let output = self
            .client
            .get_change()
            .id(change_id)
            .send()
            .await
            .map_err(|e| api_error("GetChange", e))?;

        let info = output
            .change_info()
            .ok_or_else(|| Error::provider(PROVIDER_NAME, "response carried no change info"))?;

        Ok(handle_from_sdk(info))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

fn api_error<E>(operation: &str, err: aws_sdk_route53::error::SdkError<E>) -> Error
where
    E: std::error::Error + 'static,
{
    Error::provider(
        PROVIDER_NAME,
        format!("{} failed: {}", operation, DisplayErrorContext(&err)),
    )
}

fn build_error(err: aws_sdk_route53::error::BuildError) -> Error {
    Error::provider(PROVIDER_NAME, format!("invalid change request: {}", err))
}

fn to_sdk_type(record_type: RecordType) -> sdk::RrType {
    match record_type {
        RecordType::A => sdk::RrType::A,
        RecordType::Aaaa => sdk::RrType::Aaaa,
    }
}

fn to_sdk_action(action: ChangeAction) -> sdk::ChangeAction {
    match action {
        ChangeAction::Upsert => sdk::ChangeAction::Upsert,
        ChangeAction::Delete => sdk::ChangeAction::Delete,
    }
}

/// Convert one change into its API representation
fn to_sdk_change(change: &Change) -> Result<sdk::Change> {
    let record = &change.record;

    let value = sdk::ResourceRecord::builder()
        .value(record.value.as_str())
        .build()
        .map_err(build_error)?;

    let record_set = sdk::ResourceRecordSet::builder()
        .name(record.name.as_str())
        .r#type(to_sdk_type(record.record_type))
        .ttl(i64::from(record.ttl))
        .resource_records(value)
        .build()
        .map_err(build_error)?;

    sdk::Change::builder()
        .action(to_sdk_action(change.action))
        .resource_record_set(record_set)
        .build()
        .map_err(build_error)
}

/// Wrap all changes into one batch, applied atomically by Route53
fn change_batch(changes: &[Change]) -> Result<sdk::ChangeBatch> {
    if changes.is_empty() {
        return Err(Error::invalid_input("Refusing to submit an empty change batch"));
    }

    let changes = changes
        .iter()
        .map(to_sdk_change)
        .collect::<Result<Vec<_>>>()?;

    sdk::ChangeBatch::builder()
        .set_changes(Some(changes))
        .build()
        .map_err(build_error)
}

fn record_set_from_sdk(set: &sdk::ResourceRecordSet) -> RecordSet {
    RecordSet {
        name: unescape_record_name(set.name()),
        record_type: set.r#type().as_str().to_string(),
        ttl: set.ttl().and_then(|ttl| u32::try_from(ttl).ok()),
        values: set
            .resource_records()
            .iter()
            .map(|record| record.value().to_string())
            .collect(),
    }
}

/// Marker for the next ListHostedZones page, `None` once the listing is complete
///
/// A truncated page without a usable marker ends the listing rather than
/// restarting it from the first page.
fn next_page_marker(is_truncated: bool, next_marker: Option<&str>) -> Option<String> {
    match next_marker {
        Some(next) if is_truncated && !next.is_empty() => Some(next.to_string()),
        _ => None,
    }
}

fn handle_from_sdk(info: &sdk::ChangeInfo) -> ChangeHandle {
    let status = match info.status() {
        sdk::ChangeStatus::Insync => ChangeStatus::InSync,
        _ => ChangeStatus::Pending,
    };
    ChangeHandle::new(info.id(), status)
}

/// Decode the `\ddd` octal escapes Route53 uses in names (`\052` is `*`)
///
/// Sequences that are not three octal digits are kept verbatim.
pub fn unescape_record_name(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\'
            && let Some(digits) = bytes.get(i + 1..i + 4)
            && digits.iter().all(|d| (b'0'..=b'7').contains(d))
        {
            let code = digits
                .iter()
                .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
            if let Ok(byte) = u8::try_from(code) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}
