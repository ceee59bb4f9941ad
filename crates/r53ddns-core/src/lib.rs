// # r53ddns-core
//
// Core library for the Route53 dynamic DNS updater.
//
// ## Architecture Overview
//
// This library provides the core functionality for one update run:
// - **AddressSource**: Trait for discovering the current address of one family
// - **DnsProvider**: Trait for querying and changing records via the provider API
// - **resolve_zone**: Picks the most specific zone owning the host name
// - **reconcile**: Decides create / update / delete / nothing per family
// - **Updater**: Orchestrates discovery → zone → reconcile → one atomic batch
// - **PropagationWaiter**: Bounded, cancellable wait for the batch to propagate
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Decisions live here, I/O lives in plugin crates
// 2. **Atomic Batches**: Both families land in one provider transaction
// 3. **Idempotency**: A run with nothing to change makes no mutation call
// 4. **Fail Closed**: Records touched by someone else abort the run untouched
// 5. **Library-First**: The binary is a thin layer over this crate

pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod propagation;
pub mod reconcile;
pub mod traits;
pub mod zone;

// Re-export core types for convenience
pub use config::{DiscoveryConfig, PropagationConfig, UpdaterConfig};
pub use engine::{RunReport, Updater};
pub use error::{Error, Result};
pub use host::HostName;
pub use propagation::{PropagationOutcome, PropagationWaiter};
pub use reconcile::{DEFAULT_TTL, ExistingRecord, Reconciliation};
pub use traits::{AddressFamily, AddressSource, Discovery, DnsProvider};
