use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("Queue document unreadable at {key}: {reason}")]
    QueueUnreadable { key: String, reason: String },

    #[error("Raw fetch failed for {key}: {reason}")]
    RawFetch { key: String, reason: String },

    #[error("Enrichment attempts exhausted for {key}: {last}")]
    EnrichmentExhausted { key: String, last: String },

    #[error("Salon {key} timed out after {seconds}s")]
    SalonTimeout { key: String, seconds: u64 },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
