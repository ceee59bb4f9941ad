// # r53ddns - Route53 dynamic DNS updater
//
// This binary is a THIN integration layer: it parses arguments, builds the
// address sources and the Route53 provider, runs one update and maps the
// outcome to an exit code. All decisions live in r53ddns-core.
//
// ## Configuration
//
// Every option can also be given through an environment variable:
//
// - `R53DDNS_HOST_NAME`: host name to update (positional argument)
// - `R53DDNS_PUBLIC_ADDRESS`: use the external echo service for IPv4
// - `R53DDNS_PUBLIC_ADDRESS_URL`: echo service URL
// - `R53DDNS_WAIT`: wait for the change to reach every Route53 server
// - `R53DDNS_PROPAGATION_TIMEOUT` / `R53DDNS_PROPAGATION_INTERVAL`
// - `R53DDNS_TTL`: explicit TTL
// - `R53DDNS_TEMPORARY_ADDRESS`: prefer the temporary IPv6 address
// - `R53DDNS_ZONE_ID`: skip the zone search
// - `R53DDNS_DISCOVERY_TIMEOUT`: bound for each address lookup
// - `R53DDNS_DRY_RUN`, `R53DDNS_RECHECK`, `R53DDNS_LOG_LEVEL`
//
// AWS credentials and region come from the standard AWS environment.
//
// ## Example
//
// ```bash
// export AWS_PROFILE=dns-updater
// r53ddns --public-address --wait-for-route53-propagation home.example.com
// ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, ValueEnum};
use r53ddns_core::config::{DEFAULT_PUBLIC_ADDRESS_URL, MAX_TTL};
use r53ddns_core::{
    AddressSource, DiscoveryConfig, PropagationConfig, PropagationOutcome, RunReport, Updater,
    UpdaterConfig,
};
use r53ddns_ip_socket::SocketAddressSource;
use r53ddns_provider_route53::Route53Provider;
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for the different ways a run can end
///
/// - 0: Records are correct (updated, unchanged or dry-run)
/// - 1: Configuration or startup error
/// - 2: Runtime error (zone, record or API problem)
/// - 3: Change submitted but not propagated within the time bound
/// - 130: Interrupted while waiting for propagation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum R53ddnsExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
    PropagationTimeout = 3,
    Interrupted = 130,
}

impl From<R53ddnsExitCode> for ExitCode {
    fn from(code: R53ddnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Point a Route53 host name at this machine's current IPv4 and IPv6 addresses
#[derive(Debug, Parser)]
#[command(name = "r53ddns", version)]
struct Cli {
    /// The host name for the entry to update
    #[arg(env = "R53DDNS_HOST_NAME")]
    host_name: String,

    /// Use public IP address rather than local one (only applies to IPv4 addresses)
    #[arg(long, env = "R53DDNS_PUBLIC_ADDRESS")]
    public_address: bool,

    /// Service answering with the caller's public IPv4 address as plain text
    #[arg(
        long,
        env = "R53DDNS_PUBLIC_ADDRESS_URL",
        value_name = "URL",
        default_value = DEFAULT_PUBLIC_ADDRESS_URL
    )]
    public_address_url: String,

    /// Wait for update to propagate to all Route53 servers before exiting
    #[arg(long = "wait-for-route53-propagation", env = "R53DDNS_WAIT")]
    wait_for_propagation: bool,

    /// Give up waiting for propagation after this many seconds
    #[arg(
        long,
        env = "R53DDNS_PROPAGATION_TIMEOUT",
        value_name = "SECS",
        default_value_t = 900
    )]
    propagation_timeout: u64,

    /// Seconds between propagation status checks
    #[arg(
        long,
        env = "R53DDNS_PROPAGATION_INTERVAL",
        value_name = "SECS",
        default_value_t = 15
    )]
    propagation_interval: u64,

    /// TTL to use (default: the existing record's TTL, or 60 for new records)
    #[arg(
        long,
        env = "R53DDNS_TTL",
        value_name = "SECS",
        value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_TTL))
    )]
    ttl: Option<u32>,

    /// Use your temporary ("private", "ephemeral") IPv6 address rather than your public one
    #[arg(long, env = "R53DDNS_TEMPORARY_ADDRESS")]
    temporary_address: bool,

    /// Hosted zone to use instead of searching for the most specific one
    #[arg(long, env = "R53DDNS_ZONE_ID", value_name = "ID")]
    zone_id: Option<String>,

    /// Seconds to wait for each address lookup before treating it as "no address"
    #[arg(
        long,
        env = "R53DDNS_DISCOVERY_TIMEOUT",
        value_name = "SECS",
        default_value_t = 5
    )]
    discovery_timeout: u64,

    /// Look everything up and log the changes, but do not submit them
    #[arg(long, env = "R53DDNS_DRY_RUN")]
    dry_run: bool,

    /// Re-read the records right before submitting and abort if they changed
    #[arg(long, env = "R53DDNS_RECHECK")]
    recheck_before_submit: bool,

    /// Log verbosity
    #[arg(
        long,
        env = "R53DDNS_LOG_LEVEL",
        value_enum,
        ignore_case = true,
        default_value_t = LogLevel::Info
    )]
    log_level: LogLevel,
}

impl Cli {
    fn to_config(&self) -> UpdaterConfig {
        UpdaterConfig {
            host_name: self.host_name.clone(),
            ttl: self.ttl,
            zone_id: self.zone_id.clone(),
            dry_run: self.dry_run,
            recheck_before_submit: self.recheck_before_submit,
            wait_for_propagation: self.wait_for_propagation,
            discovery: DiscoveryConfig {
                public_address: self.public_address,
                public_address_url: self.public_address_url.clone(),
                prefer_temporary_ipv6: self.temporary_address,
                timeout_secs: self.discovery_timeout,
            },
            propagation: PropagationConfig {
                interval_secs: self.propagation_interval,
                max_wait_secs: self.propagation_timeout,
            },
        }
    }
}

fn main() -> ExitCode {
    // No arguments at all: show usage instead of a terse error
    if std::env::args_os().len() <= 1 && std::env::var_os("R53DDNS_HOST_NAME").is_none() {
        let _ = Cli::command().print_help();
        return R53ddnsExitCode::Success.into();
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                R53ddnsExitCode::ConfigError.into()
            } else {
                R53ddnsExitCode::Success.into()
            };
        }
    };

    let config = cli.to_config();
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        return R53ddnsExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::from(cli.log_level))
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return R53ddnsExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return R53ddnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let updater = match build_updater(config).await {
            Ok(updater) => updater,
            Err(e) => {
                error!("{:#}", e);
                return R53ddnsExitCode::ConfigError;
            }
        };

        match updater.run_with_shutdown(shutdown_signal()).await {
            Ok(report) => exit_code_for(&report),
            Err(e) => {
                error!("{}", e);
                if let Some(hint) = run_error_hint(&e) {
                    warn!("{}", hint);
                }
                R53ddnsExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Wire the address sources and the provider into an updater
async fn build_updater(config: UpdaterConfig) -> Result<Updater> {
    let mut sources: Vec<Box<dyn AddressSource>> = Vec::with_capacity(2);

    if config.discovery.public_address {
        sources.push(public_v4_source(&config.discovery)?);
    } else {
        sources.push(Box::new(SocketAddressSource::v4()));
    }
    sources.push(Box::new(SocketAddressSource::v6(
        config.discovery.prefer_temporary_ipv6,
    )));

    let provider = Route53Provider::from_env().await;
    if config.dry_run {
        warn!("DRY-RUN mode: no changes will be submitted to Route53");
    }

    Updater::new(Box::new(provider), sources, config).context("Cannot start update")
}

#[cfg(feature = "http")]
fn public_v4_source(discovery: &DiscoveryConfig) -> Result<Box<dyn AddressSource>> {
    let source =
        r53ddns_ip_http::HttpAddressSource::new(&discovery.public_address_url, discovery.timeout())?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "http"))]
fn public_v4_source(_discovery: &DiscoveryConfig) -> Result<Box<dyn AddressSource>> {
    anyhow::bail!("--public-address requires r53ddns to be built with the \"http\" feature")
}

/// Advice for failures the operator has to resolve by hand
fn run_error_hint(err: &r53ddns_core::Error) -> Option<&'static str> {
    err.is_precondition_failure().then_some(
        "The record was changed outside r53ddns; fix or delete the extra values in Route53 and run again",
    )
}

fn exit_code_for(report: &RunReport) -> R53ddnsExitCode {
    match report.propagation {
        Some(PropagationOutcome::TimedOut { waited }) => {
            warn!(
                "Change was accepted but had not propagated after {:?}",
                waited
            );
            R53ddnsExitCode::PropagationTimeout
        }
        Some(PropagationOutcome::Cancelled) => R53ddnsExitCode::Interrupted,
        Some(PropagationOutcome::InSync) | None => R53ddnsExitCode::Success,
    }
}

/// Completes on SIGTERM or SIGINT; never completes if handlers can't be set up
async fn shutdown_signal() {
    match wait_for_shutdown().await {
        Ok(signal) => info!("Received shutdown signal: {}", signal),
        Err(e) => {
            warn!("{}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for CTRL-C")?;
    Ok("CTRL-C")
}
