use crate::ai::client::CompletionProvider;
use crate::ai::prompt_builder::{system_instruction, wrap_user_text};
use crate::core::config::Config;
use crate::core::models::ProviderCallResult;

/// Summarizes one piece of text under a request's sentence budget and
/// prompt template. Leaf chunks and the merge document go through the same
/// call.
pub struct ChunkSummarizer<'a, P: CompletionProvider + ?Sized> {
    provider: &'a P,
    config: &'a Config,
}

impl<'a, P: CompletionProvider + ?Sized> ChunkSummarizer<'a, P> {
    pub fn new(provider: &'a P, config: &'a Config) -> Self {
        Self { provider, config }
    }

    #[must_use]
    pub fn system_instruction(&self) -> String {
        system_instruction(
            self.config.sentence_budget,
            self.config.prompt_template.as_deref(),
        )
    }

    /// Issues exactly one provider call.
    ///
    /// # Errors
    ///
    /// Propagates the provider's failure unchanged.
    pub async fn summarize_chunk(&self, text: &str) -> ProviderCallResult {
        let system_prompt = self.system_instruction();
        let user_text = wrap_user_text(text);
        self.provider.complete(&system_prompt, &user_text).await
    }
}
