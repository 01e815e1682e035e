use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lowercase, keep alphanumerics, collapse everything else into single dashes.
/// Stable across runs — cache keys are derived from these.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut prev_dash = true; // suppress a leading dash
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Identity of one salon in the directory.
///
/// `place_id`, when present, is the canonical dedup key. Without it we fall
/// back to a name-derived slug, which can collide for two distinct salons
/// sharing a name within one subregion — the selector drops id-less salons
/// from enrichment, so the fallback is only used for key derivation of
/// records that were identified out-of-band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalonRef {
    pub name: String,
    pub region: String,
    pub subregion: String,
    #[serde(default)]
    pub place_id: Option<String>,
}

impl SalonRef {
    pub fn dedup_key(&self) -> String {
        match &self.place_id {
            Some(id) => id.clone(),
            None => format!(
                "{}/{}/{}",
                slugify(&self.region),
                slugify(&self.subregion),
                slugify(&self.name)
            ),
        }
    }

    /// Human-readable location, used for `currentLocation` in progress.
    pub fn location(&self) -> String {
        format!("{}/{}", slugify(&self.region), slugify(&self.subregion))
    }
}

/// Named level of generated content requested from the enrichment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContentTier {
    #[serde(rename = "tier1")]
    Tier1,
    #[serde(rename = "tier2")]
    Tier2,
}

impl ContentTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentTier::Tier1 => "tier1",
            ContentTier::Tier2 => "tier2",
        }
    }
}

impl fmt::Display for ContentTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tier1" => Ok(ContentTier::Tier1),
            "tier2" => Ok(ContentTier::Tier2),
            other => Err(format!("unknown tier: {other} (expected tier1 or tier2)")),
        }
    }
}

/// Provider payload for one salon, cached verbatim under the raw cache key.
/// Written once; re-fetched only when absent or force-refreshed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawData {
    pub fetched_at: DateTime<Utc>,
    pub provider_id: String,
    pub payload: serde_json::Value,
}

/// One FAQ entry in tier2 copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

/// A single service with a short pitch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ServiceHighlight {
    /// Service name as a customer would search for it
    pub name: String,
    /// One- or two-sentence pitch for this service at this salon
    pub blurb: String,
}

/// Generated profile copy for one salon. The generation call is forced
/// through this schema, so every field is grounded in the raw payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SalonCopy {
    /// Short display headline, no salon name repetition
    pub headline: String,
    /// Two-paragraph profile of the salon
    pub about: String,
    /// Notable services, most distinctive first
    pub services: Vec<ServiceHighlight>,
    /// One paragraph on atmosphere and clientele
    pub ambience: String,
    /// Three to five short bullet highlights
    pub highlights: Vec<String>,
    /// FAQ entries — tier2 only, omitted for tier1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faq: Option<Vec<FaqItem>>,
}

/// Generated content for one (salon, tier) pair plus provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierContent {
    pub enriched_at: DateTime<Utc>,
    pub model_used: String,
    pub copy: SalonCopy,
}

/// The enriched-cache document for one salon: one entry per generated tier.
/// A (salon, tier) pair is written at-most-once absent a force flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichedDoc {
    #[serde(default)]
    pub tiers: BTreeMap<ContentTier, TierContent>,
}

impl EnrichedDoc {
    pub fn has_tier(&self, tier: ContentTier) -> bool {
        self.tiers.contains_key(&tier)
    }
}

/// One record in the source queue document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSalon {
    pub name: String,
    pub region: String,
    pub subregion: String,
    #[serde(default)]
    pub place_id: Option<String>,
}

impl From<QueueSalon> for SalonRef {
    fn from(q: QueueSalon) -> Self {
        SalonRef {
            name: q.name,
            region: q.region,
            subregion: q.subregion,
            place_id: q.place_id,
        }
    }
}

/// The ordered work queue, built out-of-band and read by the selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueDoc {
    pub created_at: DateTime<Utc>,
    pub salons: Vec<QueueSalon>,
}
