pub mod error;
pub mod types;

pub use error::{PlacesError, Result};
pub use types::{LocalizedText, OpeningHours, PlaceDetails, PlaceSummary, Review};

use types::{SearchTextRequest, SearchTextResponse};

const BASE_URL: &str = "https://places.googleapis.com/v1";

/// Field mask for detail lookups — everything the enrichment prompt can use.
const DETAILS_FIELD_MASK: &str = "id,displayName,formattedAddress,nationalPhoneNumber,\
websiteUri,rating,userRatingCount,priceLevel,regularOpeningHours,editorialSummary,reviews";

const SEARCH_FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress";

/// Unit cost of one Place Details (Pro SKU) call, USD.
pub const DETAILS_COST_USD: f64 = 0.017;

pub struct PlacesClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl PlacesClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Fetch the full detail payload for a known place id.
    pub async fn place_details(&self, place_id: &str) -> Result<PlaceDetails> {
        let url = format!("{}/places/{}", self.base_url, place_id);
        tracing::debug!(place_id, "Places detail request");

        let resp = self
            .client
            .get(&url)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", DETAILS_FIELD_MASK)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 404 {
            return Err(PlacesError::NotFound(place_id.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PlacesError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }

    /// Text search, used when building a queue to resolve place ids.
    pub async fn search_text(&self, query: &str, page_size: u32) -> Result<Vec<PlaceSummary>> {
        let url = format!("{}/places:searchText", self.base_url);
        tracing::debug!(query, "Places text search");

        let resp = self
            .client
            .post(&url)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", SEARCH_FIELD_MASK)
            .json(&SearchTextRequest {
                text_query: query.to_string(),
                page_size,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PlacesError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: SearchTextResponse = resp.json().await?;
        tracing::debug!(query, count = parsed.places.len(), "Text search complete");
        Ok(parsed.places)
    }
}
