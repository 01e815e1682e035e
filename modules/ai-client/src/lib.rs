mod client;
pub mod error;
pub mod pricing;
pub(crate) mod types;

pub use error::{AiError, Result};
pub use types::Usage;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use client::ClaudeClient;
use types::{ChatRequest, ToolDefinitionWire, WireMessage};

const STRUCTURED_TOOL: &str = "structured_response";

/// A structured extraction plus the provenance the caller needs for cost
/// accounting: which model answered and what it consumed.
#[derive(Debug, Clone)]
pub struct Extraction<T> {
    pub value: T,
    pub model: String,
    pub usage: Usage,
}

impl<T> Extraction<T> {
    pub fn cost_usd(&self) -> f64 {
        pricing::cost_usd(&self.model, &self.usage)
    }
}

/// Claude agent bound to one api key and model. Pure request/response —
/// retry and fallback policy belongs to the caller.
#[derive(Clone)]
pub struct Claude {
    api_key: String,
    model: String,
    base_url: Option<String>,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> ClaudeClient {
        let client = ClaudeClient::new(&self.api_key);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    /// Extract a `T` by forcing a tool call whose input schema is `T`'s
    /// JSON schema. The model cannot answer in prose.
    pub async fn extract<T: JsonSchema + DeserializeOwned>(
        &self,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Result<Extraction<T>> {
        let schema = serde_json::to_value(schemars::schema_for!(T))?;

        let mut request = ChatRequest::new(&self.model)
            .system(system_prompt)
            .message(WireMessage::user(user_prompt))
            .temperature(0.7)
            .tool(ToolDefinitionWire {
                name: STRUCTURED_TOOL.to_string(),
                description: "Return the structured result.".to_string(),
                input_schema: schema,
            });
        request.tool_choice = Some(serde_json::json!({
            "type": "tool",
            "name": STRUCTURED_TOOL,
        }));

        let response = self.client().chat(&request).await?;

        let input = response
            .tool_input(STRUCTURED_TOOL)
            .ok_or(AiError::NoStructuredOutput)?;
        let value = serde_json::from_value(input.clone())
            .map_err(|e| AiError::Parse(format!("structured response mismatch: {e}")))?;

        Ok(Extraction {
            value,
            model: response.model,
            usage: response.usage,
        })
    }
}
