//! Summarization pipeline: chunking, per-chunk calls and the merge step

pub mod chunker;
pub mod dispatcher;
pub mod summarize;

pub use dispatcher::{DispatchOptions, Dispatcher};
pub use summarize::ChunkSummarizer;

/// Canonical failure message shown to users when the provider is unreachable.
pub const CANONICAL_FAILURE_MESSAGE: &str =
    "Sorry, I couldn't generate a summary at this time. Please try again later.";
