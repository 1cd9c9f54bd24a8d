use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::outcome::OutcomeKind;

pub const OPS_TOTAL: &str = "git_sync_ops_total";
pub const OPS_ERROR_TOTAL: &str = "git_sync_ops_error_total";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Push,
    Pull,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pull => "pull",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives one record per finished operation. Never read back by the
/// engine.
pub trait MetricsSink: Send + Sync {
    fn record(&self, op: Operation, repository_url: &str, outcome: OutcomeKind);
}

/// Sink that discards everything.
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record(&self, _op: Operation, _repository_url: &str, _outcome: OutcomeKind) {}
}

/// One counter value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSample {
    pub op: Operation,
    pub repository_url: String,
    pub value: u64,
}

/// Point-in-time copy of the counters, keyed by metric name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, Vec<CounterSample>>,
}

impl MetricsSnapshot {
    pub fn get(&self, metric: &str, op: Operation, repository_url: &str) -> u64 {
        self.counters
            .get(metric)
            .and_then(|samples| {
                samples
                    .iter()
                    .find(|s| s.op == op && s.repository_url == repository_url)
            })
            .map_or(0, |s| s.value)
    }
}

#[derive(Default)]
struct Counters {
    total: BTreeMap<(Operation, String), u64>,
    errors: BTreeMap<(Operation, String), u64>,
}

/// Process-local counters: every operation increments `git_sync_ops_total`,
/// failed ones also `git_sync_ops_error_total`.
#[derive(Default)]
pub struct InMemoryMetrics {
    counters: Mutex<Counters>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let samples = |map: &BTreeMap<(Operation, String), u64>| {
            map.iter()
                .map(|((op, url), value)| CounterSample {
                    op: *op,
                    repository_url: url.clone(),
                    value: *value,
                })
                .collect::<Vec<_>>()
        };
        let mut snapshot = MetricsSnapshot::default();
        snapshot.counters.insert(OPS_TOTAL.into(), samples(&counters.total));
        snapshot.counters.insert(OPS_ERROR_TOTAL.into(), samples(&counters.errors));
        snapshot
    }
}

impl MetricsSink for InMemoryMetrics {
    fn record(&self, op: Operation, repository_url: &str, outcome: OutcomeKind) {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let key = (op, repository_url.to_string());
        *counters.total.entry(key.clone()).or_default() += 1;
        if outcome.is_error() {
            *counters.errors.entry(key).or_default() += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://git.example.com/org/repo.git";

    #[test]
    fn counts_totals_and_errors() {
        let m = InMemoryMetrics::new();
        m.record(Operation::Pull, URL, OutcomeKind::Success);
        m.record(Operation::Pull, URL, OutcomeKind::NoContent);
        m.record(Operation::Pull, URL, OutcomeKind::InternalError);
        m.record(Operation::Push, URL, OutcomeKind::Conflict);

        let s = m.snapshot();
        assert_eq!(s.get(OPS_TOTAL, Operation::Pull, URL), 3);
        assert_eq!(s.get(OPS_ERROR_TOTAL, Operation::Pull, URL), 1);
        assert_eq!(s.get(OPS_TOTAL, Operation::Push, URL), 1);
        assert_eq!(s.get(OPS_ERROR_TOTAL, Operation::Push, URL), 1);
    }

    #[test]
    fn unknown_series_is_zero() {
        let s = InMemoryMetrics::new().snapshot();
        assert_eq!(s.get(OPS_TOTAL, Operation::Push, URL), 0);
        assert!(s.counters[OPS_TOTAL].is_empty());
    }

    #[test]
    fn snapshot_serializes() {
        let m = InMemoryMetrics::new();
        m.record(Operation::Push, URL, OutcomeKind::Success);
        let json = serde_json::to_value(m.snapshot()).unwrap();
        assert_eq!(json["counters"][OPS_TOTAL][0]["op"], "push");
        assert_eq!(json["counters"][OPS_TOTAL][0]["value"], 1);
    }

    #[test]
    fn noop_accepts_records() {
        NoopMetrics.record(Operation::Pull, URL, OutcomeKind::Success);
    }
}
