use thiserror::Error;

pub type Result<T> = std::result::Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("No structured output in response")]
    NoStructuredOutput,

    #[error("Parse error: {0}")]
    Parse(String),
}

impl AiError {
    /// Throttling signal, keyed off the HTTP status — 429 (rate limit) and
    /// 529 (overloaded). Message text is never consulted.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AiError::Api { status: 429 | 529, .. })
    }
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        AiError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AiError {
    fn from(err: serde_json::Error) -> Self {
        AiError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_classification_is_status_based() {
        let limited = AiError::Api {
            status: 429,
            message: "slow down".into(),
        };
        let overloaded = AiError::Api {
            status: 529,
            message: "overloaded".into(),
        };
        // A 500 whose message mentions rate limits must NOT classify as one.
        let misleading = AiError::Api {
            status: 500,
            message: "internal rate limit bookkeeping error".into(),
        };

        assert!(limited.is_rate_limited());
        assert!(overloaded.is_rate_limited());
        assert!(!misleading.is_rate_limited());
        assert!(!AiError::NoStructuredOutput.is_rate_limited());
    }
}
