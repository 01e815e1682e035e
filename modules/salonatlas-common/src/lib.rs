pub mod config;
pub mod error;
pub mod keys;
pub mod state;
pub mod types;

pub use config::Config;
pub use error::AtlasError;
pub use keys::CacheKeys;
pub use state::{CostLedger, FailedSalon, ProgressState, COST_ENRICHMENT, COST_RAW_FETCH};
pub use types::{
    slugify, ContentTier, EnrichedDoc, FaqItem, QueueDoc, QueueSalon, RawData, SalonCopy,
    SalonRef, ServiceHighlight, TierContent,
};
