use std::env;

use tracing::info;

const DEFAULT_MODELS: &str = "claude-sonnet-4-20250514,claude-haiku-4-5-20251001";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Generative provider
    pub anthropic_api_key: String,
    pub anthropic_fallback_api_key: Option<String>,
    pub models: Vec<String>,

    // Raw-data provider
    pub places_api_key: String,

    // Object store
    pub store_root: String,
    pub namespace: String,

    // Batch scheduling
    pub batch_size: usize,
    pub batch_cooldown_secs: u64,
    pub salon_timeout_secs: u64,

    // Enrichment retry policy
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub error_delay_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            anthropic_fallback_api_key: env::var("ANTHROPIC_FALLBACK_API_KEY").ok(),
            models: env::var("ATLAS_MODELS")
                .unwrap_or_else(|_| DEFAULT_MODELS.to_string())
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            places_api_key: required_env("GOOGLE_PLACES_API_KEY"),
            store_root: env::var("ATLAS_STORE_ROOT").unwrap_or_else(|_| "./data".to_string()),
            namespace: env::var("ATLAS_NAMESPACE").unwrap_or_else(|_| "salonatlas".to_string()),
            batch_size: numeric_env("ATLAS_BATCH_SIZE", 3),
            batch_cooldown_secs: numeric_env("ATLAS_BATCH_COOLDOWN_SECS", 5),
            salon_timeout_secs: numeric_env("ATLAS_SALON_TIMEOUT_SECS", 120),
            backoff_base_ms: numeric_env("ATLAS_BACKOFF_BASE_MS", 2000),
            backoff_cap_ms: numeric_env("ATLAS_BACKOFF_CAP_MS", 60_000),
            error_delay_ms: numeric_env("ATLAS_ERROR_DELAY_MS", 1000),
        }
    }

    /// Log the loaded config without leaking credentials.
    pub fn log_redacted(&self) {
        info!(
            models = self.models.join(",").as_str(),
            fallback_credential = self.anthropic_fallback_api_key.is_some(),
            store_root = self.store_root.as_str(),
            namespace = self.namespace.as_str(),
            batch_size = self.batch_size,
            batch_cooldown_secs = self.batch_cooldown_secs,
            salon_timeout_secs = self.salon_timeout_secs,
            "Config loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn numeric_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number, got {raw:?}")),
        Err(_) => default,
    }
}
