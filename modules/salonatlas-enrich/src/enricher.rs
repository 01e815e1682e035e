use std::sync::Arc;
use std::time::Duration;

use ai_client::{AiError, Claude};
use async_trait::async_trait;
use rand::Rng;
use salonatlas_common::{AtlasError, ContentTier, RawData, SalonCopy, SalonRef};
use tokio::time::sleep;
use tracing::{info, warn};

const TIER1_SYSTEM_PROMPT: &str = "You are a copywriter for a salon directory. \
From the provider payload you are given, write a grounded profile for one salon. \
Use only facts present in the payload: services mentioned in reviews, the address, \
hours, rating. Never invent prices, staff names, or services. Write for a reader \
deciding where to book, not for the salon owner. Plain, specific language; no \
superlatives you cannot back with a review.";

const TIER2_SYSTEM_PROMPT: &str = "You are a copywriter for a salon directory. \
From the provider payload you are given, write a grounded long-form profile for \
one salon. Use only facts present in the payload: services mentioned in reviews, \
the address, hours, rating. Never invent prices, staff names, or services. In \
addition to the profile sections, write 4-6 FAQ entries a first-time visitor \
would ask, answered from the payload (hours, location, booking, services). Plain, \
specific language; no superlatives you cannot back with a review.";

/// Generated copy plus the provenance the scheduler needs for bookkeeping.
#[derive(Debug, Clone)]
pub struct GeneratedCopy {
    pub copy: SalonCopy,
    pub model: String,
    pub cost_usd: f64,
}

// --- CopyModel trait ---

/// One attempt against the generative provider with an explicit model and
/// credential. Pure request/response; retry policy lives in [`Enricher`].
#[async_trait]
pub trait CopyModel: Send + Sync {
    async fn generate(
        &self,
        salon: &SalonRef,
        raw: &RawData,
        tier: ContentTier,
        model: &str,
        credential: &str,
    ) -> Result<GeneratedCopy, AiError>;
}

/// Claude-backed implementation: schema-forced extraction of [`SalonCopy`].
pub struct ClaudeCopyModel;

#[async_trait]
impl CopyModel for ClaudeCopyModel {
    async fn generate(
        &self,
        salon: &SalonRef,
        raw: &RawData,
        tier: ContentTier,
        model: &str,
        credential: &str,
    ) -> Result<GeneratedCopy, AiError> {
        let claude = Claude::new(credential, model);
        let system = match tier {
            ContentTier::Tier1 => TIER1_SYSTEM_PROMPT,
            ContentTier::Tier2 => TIER2_SYSTEM_PROMPT,
        };
        let user = build_user_prompt(salon, raw, tier);

        let extraction = claude.extract::<SalonCopy>(system, user).await?;
        let cost_usd = extraction.cost_usd();
        Ok(GeneratedCopy {
            copy: extraction.value,
            model: extraction.model,
            cost_usd,
        })
    }
}

fn build_user_prompt(salon: &SalonRef, raw: &RawData, tier: ContentTier) -> String {
    let payload = serde_json::to_string_pretty(&raw.payload)
        .unwrap_or_else(|_| raw.payload.to_string());
    format!(
        "Salon: {name}\nLocation: {subregion}, {region}\nRequested tier: {tier}\n\n\
         Provider payload:\n{payload}",
        name = salon.name,
        subregion = salon.subregion,
        region = salon.region,
        tier = tier,
    )
}

// --- Backoff policy ---

#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Base wait for the exponential rate-limit curve.
    pub base: Duration,
    /// Ceiling on any single rate-limit wait.
    pub cap: Duration,
    /// Flat wait after a non-rate-limit failure. Those are unlikely to be
    /// resolved by waiting, so the next candidate is tried almost at once.
    pub error_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(2000),
            cap: Duration::from_millis(60_000),
            error_delay: Duration::from_millis(1000),
        }
    }
}

/// Rate-limit wait before the attempt after `attempt` (0-based):
/// `min(cap, base * 2^attempt)`.
pub fn backoff_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let exp = base.saturating_mul(2u32.saturating_pow(attempt.min(31)));
    exp.min(cap)
}

// --- Enricher ---

/// Walks an ordered candidate list of (model, credential) pairs: every
/// configured model with the primary credential, then the full model list
/// again with the fallback credential. Stops on the first success.
pub struct Enricher {
    source: Arc<dyn CopyModel>,
    models: Vec<String>,
    credentials: Vec<String>,
    policy: BackoffPolicy,
}

impl Enricher {
    pub fn new(
        source: Arc<dyn CopyModel>,
        models: Vec<String>,
        credentials: Vec<String>,
        policy: BackoffPolicy,
    ) -> Self {
        Self {
            source,
            models,
            credentials,
            policy,
        }
    }

    fn candidates(&self) -> Vec<(&str, &str)> {
        let mut out = Vec::with_capacity(self.models.len() * self.credentials.len());
        for credential in &self.credentials {
            for model in &self.models {
                out.push((model.as_str(), credential.as_str()));
            }
        }
        out
    }

    pub async fn enrich(
        &self,
        salon: &SalonRef,
        raw: &RawData,
        tier: ContentTier,
    ) -> Result<GeneratedCopy, AtlasError> {
        let candidates = self.candidates();
        let total = candidates.len();
        let mut last_error = String::from("no candidates configured");

        for (attempt, (model, credential)) in candidates.into_iter().enumerate() {
            match self
                .source
                .generate(salon, raw, tier, model, credential)
                .await
            {
                Ok(generated) => {
                    info!(
                        salon = salon.name.as_str(),
                        model = generated.model.as_str(),
                        attempt,
                        tier = %tier,
                        "Enrichment succeeded"
                    );
                    return Ok(generated);
                }
                Err(e) => {
                    let rate_limited = e.is_rate_limited();
                    warn!(
                        salon = salon.name.as_str(),
                        model,
                        attempt,
                        rate_limited,
                        error = %e,
                        "Enrichment attempt failed"
                    );
                    last_error = e.to_string();

                    if attempt + 1 < total {
                        let delay = if rate_limited {
                            let jitter =
                                Duration::from_millis(rand::rng().random_range(0..1000));
                            backoff_delay(attempt as u32, self.policy.base, self.policy.cap)
                                + jitter
                        } else {
                            self.policy.error_delay
                        };
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(AtlasError::EnrichmentExhausted {
            key: salon.dedup_key(),
            last: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn salon() -> SalonRef {
        SalonRef {
            name: "Shear Bliss".into(),
            region: "Ontario".into(),
            subregion: "Toronto".into(),
            place_id: Some("p-a".into()),
        }
    }

    fn raw() -> RawData {
        RawData {
            fetched_at: Utc::now(),
            provider_id: "google-places".into(),
            payload: serde_json::json!({"id": "p-a"}),
        }
    }

    fn copy() -> SalonCopy {
        SalonCopy {
            headline: "h".into(),
            about: "a".into(),
            services: vec![],
            ambience: "m".into(),
            highlights: vec![],
            faq: None,
        }
    }

    /// Fails the first `failures` attempts with the scripted error, then
    /// succeeds, recording every (model, credential) pair it saw.
    struct ScriptedModel {
        failures: usize,
        rate_limited: bool,
        calls: AtomicUsize,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedModel {
        fn new(failures: usize, rate_limited: bool) -> Arc<Self> {
            Arc::new(Self {
                failures,
                rate_limited,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CopyModel for ScriptedModel {
        async fn generate(
            &self,
            _salon: &SalonRef,
            _raw: &RawData,
            _tier: ContentTier,
            model: &str,
            credential: &str,
        ) -> Result<GeneratedCopy, AiError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .unwrap()
                .push((model.to_string(), credential.to_string()));
            if n < self.failures {
                return Err(if self.rate_limited {
                    AiError::Api {
                        status: 429,
                        message: "rate limited".into(),
                    }
                } else {
                    AiError::Api {
                        status: 500,
                        message: "boom".into(),
                    }
                });
            }
            Ok(GeneratedCopy {
                copy: copy(),
                model: model.to_string(),
                cost_usd: 0.01,
            })
        }
    }

    fn enricher(source: Arc<ScriptedModel>) -> Enricher {
        Enricher::new(
            source,
            vec!["model-a".into(), "model-b".into()],
            vec!["key-primary".into(), "key-fallback".into()],
            BackoffPolicy::default(),
        )
    }

    #[test]
    fn backoff_curve_is_min_cap_base_times_two_to_the_attempt() {
        let base = Duration::from_millis(2000);
        let cap = Duration::from_millis(60_000);
        assert_eq!(backoff_delay(0, base, cap), Duration::from_millis(2000));
        assert_eq!(backoff_delay(1, base, cap), Duration::from_millis(4000));
        assert_eq!(backoff_delay(2, base, cap), Duration::from_millis(8000));
        assert_eq!(backoff_delay(4, base, cap), Duration::from_millis(32_000));
        // Capped from attempt 5 onward
        assert_eq!(backoff_delay(5, base, cap), cap);
        assert_eq!(backoff_delay(30, base, cap), cap);
    }

    #[tokio::test(start_paused = true)]
    async fn candidate_order_is_models_then_fallback_credential() {
        let source = ScriptedModel::new(usize::MAX, false);
        let result = enricher(source.clone()).enrich(&salon(), &raw(), ContentTier::Tier1).await;

        assert!(matches!(
            result,
            Err(AtlasError::EnrichmentExhausted { .. })
        ));
        let seen = source.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ("model-a".to_string(), "key-primary".to_string()),
                ("model-b".to_string(), "key-primary".to_string()),
                ("model-a".to_string(), "key-fallback".to_string()),
                ("model-b".to_string(), "key-fallback".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fourth_candidate_wins_after_three_rate_limits() {
        let source = ScriptedModel::new(3, true);
        let started = tokio::time::Instant::now();
        let generated = enricher(source.clone())
            .enrich(&salon(), &raw(), ContentTier::Tier1)
            .await
            .unwrap();

        assert_eq!(generated.model, "model-b");
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
        // Three backoff sleeps: 2s + 4s + 8s, plus up to 1s jitter each.
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(14), "waited {waited:?}");
        assert!(waited < Duration::from_secs(17), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn non_rate_limit_failures_use_the_flat_delay() {
        let source = ScriptedModel::new(2, false);
        let started = tokio::time::Instant::now();
        enricher(source.clone())
            .enrich(&salon(), &raw(), ContentTier::Tier1)
            .await
            .unwrap();

        // Two flat 1s delays, no exponential growth.
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(2), "waited {waited:?}");
        assert!(waited < Duration::from_secs(3), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_carries_the_last_error() {
        let source = ScriptedModel::new(usize::MAX, true);
        let err = enricher(source.clone())
            .enrich(&salon(), &raw(), ContentTier::Tier1)
            .await
            .unwrap_err();

        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
        match err {
            AtlasError::EnrichmentExhausted { key, last } => {
                assert_eq!(key, "p-a");
                assert!(last.contains("429"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn tier2_prompt_asks_for_faq() {
        let user = build_user_prompt(&salon(), &raw(), ContentTier::Tier2);
        assert!(user.contains("tier2"));
        assert!(TIER2_SYSTEM_PROMPT.contains("FAQ"));
        assert!(!TIER1_SYSTEM_PROMPT.contains("FAQ"));
    }
}
