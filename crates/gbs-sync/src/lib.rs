//! Synchronization engine for git-bundle-sync.
//!
//! Moves a single branch between a remote repository and HTTP clients as
//! git bundles. A pull exports the branch of the source mirror as a bundle;
//! a push imports a received bundle into the sink mirror and pushes it on.
//!
//! # Architecture
//!
//! - **SyncEngine**: entry point; resolves the mirror, takes its lease,
//!   runs an orchestrator, records metrics, and returns a [`SyncOutcome`]
//! - **PushOrchestrator** / **PullOrchestrator**: the step sequences
//! - **MirrorRegistry**: per-mirror locks and the set of mirrors to rebuild
//! - **MetricsSink**: injectable operation counters

pub mod engine;
pub mod error;
pub mod metrics;
pub mod outcome;
pub mod pull;
pub mod push;
pub mod registry;

pub use engine::SyncEngine;
pub use error::{Stage, SyncError, SyncResult};
pub use metrics::{
    CounterSample, InMemoryMetrics, MetricsSink, MetricsSnapshot, NoopMetrics, Operation,
    OPS_ERROR_TOTAL, OPS_TOTAL,
};
pub use outcome::{OutcomeKind, PulledBundle, PushReceipt, SyncOutcome};
pub use pull::{single_head, PullOrchestrator};
pub use push::PushOrchestrator;
pub use registry::{MirrorLease, MirrorRegistry};
