use crate::core::config::Config;
use crate::errors::SummarizerError;

/// Text picked by the extraction surface, paired with the configuration
/// snapshot it will be summarized under.
#[derive(Debug, Clone)]
pub struct SummarizationRequest {
    text: String,
    config: Config,
}

impl SummarizationRequest {
    pub fn new(text: impl Into<String>, config: Config) -> Self {
        Self {
            text: text.into(),
            config,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Outcome of a single provider call.
pub type ProviderCallResult = Result<String, SummarizerError>;
