use thiserror::Error;

use crate::worker::CANONICAL_FAILURE_MESSAGE;

#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("No API key set. Run `element-summarizer validate-key <KEY>` or set OPENAI_API_KEY.")]
    MissingCredential,

    #[error("OpenAI error ({status}): {body}")]
    ProviderError { status: u16, body: String },

    #[error("Failed to reach the summarization provider: {0}")]
    TransportError(String),

    #[error("Failed to read settings: {0}")]
    ConfigError(String),

    #[error("Failed to parse request: {0}")]
    ParseError(String),

    #[error("Seems to be an invalid key.")]
    InvalidApiKey,

    #[error("I/O error: {0}")]
    IoError(String),
}

impl SummarizerError {
    /// Text placed in an `ok: false` reply.
    ///
    /// Provider bodies and credential hints pass through verbatim; network
    /// failures collapse to the canonical failure message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SummarizerError::TransportError(_) => CANONICAL_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for SummarizerError {
    fn from(error: reqwest::Error) -> Self {
        SummarizerError::TransportError(error.to_string())
    }
}

impl From<serde_json::Error> for SummarizerError {
    fn from(error: serde_json::Error) -> Self {
        SummarizerError::ParseError(error.to_string())
    }
}

impl From<std::io::Error> for SummarizerError {
    fn from(error: std::io::Error) -> Self {
        SummarizerError::IoError(error.to_string())
    }
}
