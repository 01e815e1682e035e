use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Last N log lines kept on the progress document.
pub const LOG_TAIL_LIMIT: usize = 100;

pub const COST_RAW_FETCH: &str = "rawFetch";
pub const COST_ENRICHMENT: &str = "enrichment";

/// Running cost totals per source plus the derived total.
/// Updated additively on every successful paid operation, never decremented.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostLedger {
    #[serde(default)]
    pub per_source: BTreeMap<String, f64>,
    #[serde(default)]
    pub total: f64,
}

impl CostLedger {
    pub fn record(&mut self, source: &str, usd: f64) {
        if usd <= 0.0 {
            return;
        }
        *self.per_source.entry(source.to_string()).or_insert(0.0) += usd;
        self.total += usd;
    }

    pub fn source_total(&self, source: &str) -> f64 {
        self.per_source.get(source).copied().unwrap_or(0.0)
    }
}

/// One entry in the failure list. Deduplicated by salon key: a repeat
/// failure bumps `retries` and replaces `error` instead of appending.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedSalon {
    pub key: String,
    pub error: String,
    pub retries: u32,
}

/// The durable pipeline-progress document — the sole source of truth for
/// resumability. Loaded whole, merged, and saved whole once per batch.
/// Single writer: one pipeline process per progress document at a time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressState {
    pub is_running: bool,
    pub total_salons: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub skipped: u32,
    pub cost: CostLedger,
    pub completed_keys: Vec<String>,
    pub failed_salons: Vec<FailedSalon>,
    pub current_location: Option<String>,
    pub log_tail: Vec<String>,
}

impl ProgressState {
    pub fn is_completed(&self, key: &str) -> bool {
        self.completed_keys.iter().any(|k| k == key)
    }

    /// Append to `completedKeys` if not already present.
    pub fn record_completed(&mut self, key: &str) {
        if !self.is_completed(key) {
            self.completed_keys.push(key.to_string());
        }
    }

    /// Record a failure, bumping `retries` in place for a repeat key.
    pub fn record_failure(&mut self, key: &str, error: &str) {
        if let Some(entry) = self.failed_salons.iter_mut().find(|f| f.key == key) {
            entry.retries += 1;
            entry.error = error.to_string();
        } else {
            self.failed_salons.push(FailedSalon {
                key: key.to_string(),
                error: error.to_string(),
                retries: 0,
            });
        }
    }

    /// Append a log line, trimming the tail to the last `LOG_TAIL_LIMIT`.
    pub fn push_log(&mut self, line: impl Into<String>) {
        self.log_tail.push(line.into());
        if self.log_tail.len() > LOG_TAIL_LIMIT {
            let excess = self.log_tail.len() - LOG_TAIL_LIMIT;
            self.log_tail.drain(..excess);
        }
    }
}
