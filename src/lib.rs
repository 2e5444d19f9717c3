//! Element Summarizer - summarizes text picked from a page using `OpenAI`
//! chat completions.
//!
//! The pipeline has two halves:
//! 1. An extraction surface that enters pick mode, captures an element's text
//!    and sends a `summarize` request
//! 2. A host that resolves settings per request and runs the hierarchical
//!    summarizer: split long input into paragraph-preserving chunks,
//!    summarize each one, then merge the partial summaries
//!
//! # Architecture
//!
//! - `core` holds settings storage and the per-request [`core::config::Config`]
//! - `ai` wraps the chat-completion endpoint behind [`ai::CompletionProvider`]
//! - `worker` contains the chunker and the [`worker::Dispatcher`]
//! - `api` defines the request protocol, the host handler and the line server
//!
//! # Example
//!
//! ```no_run
//! use element_summarizer::ai::OpenAiProviderFactory;
//! use element_summarizer::api::{Request, RequestHandler, SummarizeHost};
//! use element_summarizer::core::config::AppConfig;
//! use element_summarizer::core::settings::FileSettingsStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     element_summarizer::setup_logging();
//!
//!     let app = AppConfig::from_env()?;
//!     let factory = OpenAiProviderFactory::new(&app.openai_base_url, app.request_timeout)?;
//!     let store = FileSettingsStore::new(&app.settings_path);
//!     let host = SummarizeHost::from_app_config(store, factory, &app);
//!
//!     let reply = host
//!         .handle(Request::Summarize {
//!             text: "A long article...".to_string(),
//!         })
//!         .await;
//!     println!("{}", reply.display_text());
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod api;
pub mod core;
pub mod errors;
pub mod worker;

pub use errors::SummarizerError;

/// Configure structured JSON logging on stderr.
///
/// Verbosity follows `RUST_LOG` and defaults to `info`. Stdout stays free for
/// protocol replies. Calling this more than once is harmless.
///
/// # Example
///
/// ```
/// element_summarizer::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
