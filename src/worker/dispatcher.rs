//! Hierarchical summarization: pass small inputs straight through, otherwise
//! summarize each chunk and merge the partial summaries with one more call.

use futures::future::{BoxFuture, FutureExt};
use futures::{StreamExt, TryStreamExt};
use tracing::{error, info, warn};

use super::chunker::{self, MAX_CHARS, char_len};
use super::summarize::ChunkSummarizer;
use crate::ai::client::CompletionProvider;
use crate::ai::prompt_builder::merge_document;
use crate::core::models::{ProviderCallResult, SummarizationRequest};
use crate::errors::SummarizerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Character ceiling for a single provider call.
    pub max_chars: usize,
    /// Chunk calls kept in flight at once. `1` summarizes strictly in order.
    pub concurrency: usize,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            max_chars: MAX_CHARS,
            concurrency: 1,
        }
    }
}

/// Stateless per call: everything a dispatch needs lives in the request.
pub struct Dispatcher<P: CompletionProvider> {
    provider: P,
    options: DispatchOptions,
}

impl<P: CompletionProvider> Dispatcher<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            options: DispatchOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = DispatchOptions {
            concurrency: options.concurrency.max(1),
            ..options
        };
        self
    }

    #[must_use]
    pub fn options(&self) -> DispatchOptions {
        self.options
    }

    /// # Errors
    ///
    /// The first failing provider call aborts the dispatch and its error is
    /// returned unchanged; no partial summary is produced.
    #[tracing::instrument(level = "info", skip_all, fields(chars = char_len(request.text())))]
    pub async fn dispatch(&self, request: &SummarizationRequest) -> Result<String, SummarizerError> {
        let summarizer = ChunkSummarizer::new(&self.provider, request.config());
        let text = request.text();
        let max_chars = self.options.max_chars;

        if char_len(text) <= max_chars {
            info!("Input fits in one call, summarizing directly");
            return summarizer.summarize_chunk(text).await;
        }

        let chunks = chunker::split(text, max_chars);
        info!(
            chunks = chunks.len(),
            concurrency = self.options.concurrency,
            "Input split into chunks"
        );

        let partials = self.summarize_chunks(&summarizer, &chunks).await?;

        let merge_doc = merge_document(&partials);
        let merge_chars = char_len(&merge_doc);
        if merge_chars > max_chars {
            // Known gap: the merge document is sent as-is even when oversized.
            warn!(
                merge_chars,
                max_chars, "Merge document exceeds the per-call ceiling"
            );
        }

        info!(merge_chars, "Merging partial summaries");
        summarizer.summarize_chunk(&merge_doc).await
    }

    async fn summarize_chunks(
        &self,
        summarizer: &ChunkSummarizer<'_, P>,
        chunks: &[String],
    ) -> Result<Vec<String>, SummarizerError> {
        if self.options.concurrency <= 1 {
            let mut partials = Vec::with_capacity(chunks.len());
            for (i, chunk) in chunks.iter().enumerate() {
                let partial = summarizer.summarize_chunk(chunk).await.inspect_err(|e| {
                    error!(chunk = i + 1, error = %e, "Chunk summarization failed");
                })?;
                partials.push(partial);
            }
            return Ok(partials);
        }

        // Boxed so the combined future is `Send` for any provider.
        let calls: Vec<BoxFuture<'_, ProviderCallResult>> = chunks
            .iter()
            .map(|chunk| summarizer.summarize_chunk(chunk).boxed())
            .collect();

        // `buffered` yields results in input order regardless of completion order.
        futures::stream::iter(calls)
            .buffered(self.options.concurrency)
            .inspect_err(|e| error!(error = %e, "Chunk summarization failed"))
            .try_collect()
            .await
    }
}
