use crate::types::{slugify, SalonRef};

/// Cache key scheme. Slash-separated string paths, stable across runs:
///
/// - raw:      `{ns}/raw/{region}/{subregion}/{salon}.json`
/// - enriched: `{ns}/enriched/{region}/{subregion}/{salon}.json`
/// - queue:    `{ns}/{queue}.json`
/// - progress: `{ns}/progress.json`, or `{ns}/{queue}-progress.json` for a
///   non-default queue
#[derive(Debug, Clone)]
pub struct CacheKeys {
    namespace: String,
}

pub const DEFAULT_QUEUE: &str = "queue";

impl CacheKeys {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn raw_key(&self, salon: &SalonRef) -> String {
        format!(
            "{}/raw/{}/{}/{}.json",
            self.namespace,
            slugify(&salon.region),
            slugify(&salon.subregion),
            slugify(&salon.name)
        )
    }

    pub fn enriched_key(&self, salon: &SalonRef) -> String {
        format!(
            "{}/enriched/{}/{}/{}.json",
            self.namespace,
            slugify(&salon.region),
            slugify(&salon.subregion),
            slugify(&salon.name)
        )
    }

    pub fn queue_key(&self, queue: &str) -> String {
        format!("{}/{}.json", self.namespace, slugify(queue))
    }

    pub fn progress_key(&self, queue: &str) -> String {
        if queue == DEFAULT_QUEUE {
            format!("{}/progress.json", self.namespace)
        } else {
            format!("{}/{}-progress.json", self.namespace, slugify(queue))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salon() -> SalonRef {
        SalonRef {
            name: "Shear Bliss & Co.".into(),
            region: "Ontario".into(),
            subregion: "North York".into(),
            place_id: Some("ChIJabc".into()),
        }
    }

    #[test]
    fn key_paths_are_stable() {
        let keys = CacheKeys::new("salonatlas");
        assert_eq!(
            keys.raw_key(&salon()),
            "salonatlas/raw/ontario/north-york/shear-bliss-co.json"
        );
        assert_eq!(
            keys.enriched_key(&salon()),
            "salonatlas/enriched/ontario/north-york/shear-bliss-co.json"
        );
    }

    #[test]
    fn progress_key_varies_by_queue() {
        let keys = CacheKeys::new("salonatlas");
        assert_eq!(keys.queue_key(DEFAULT_QUEUE), "salonatlas/queue.json");
        assert_eq!(keys.progress_key(DEFAULT_QUEUE), "salonatlas/progress.json");
        assert_eq!(keys.queue_key("quality"), "salonatlas/quality.json");
        assert_eq!(
            keys.progress_key("quality"),
            "salonatlas/quality-progress.json"
        );
    }

    #[test]
    fn same_identity_maps_to_same_keys() {
        let keys = CacheKeys::new("salonatlas");
        let a = salon();
        let mut b = salon();
        b.place_id = None; // identity fields unchanged
        assert_eq!(keys.raw_key(&a), keys.raw_key(&b));
    }
}
