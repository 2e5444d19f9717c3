//! Request handling - the host that serves summarize requests, the router in
//! front of it, and picker activation.
//!
//! This module handles:
//! - Summarize requests (config resolved per request, then dispatched)
//! - Routing each request kind to the host or the extraction surface
//! - Activating the picker, reinstalling the surface when it stops answering

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use super::protocol::{Reply, Request};
use super::surface::PickSurface;
use crate::ai::client::ProviderFactory;
use crate::core::config::{AppConfig, ConfigResolver};
use crate::core::models::SummarizationRequest;
use crate::core::settings::SettingsStore;
use crate::errors::SummarizerError;
use crate::worker::{DispatchOptions, Dispatcher};

/// Default wait for a ping reply before the surface is considered absent.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_millis(500);

/// Anything that answers requests. Every request gets exactly one reply;
/// failures are carried inside the [`Reply`].
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: Request) -> Reply;
}

/// Serves summarize requests against a settings store and provider factory.
pub struct SummarizeHost<S: SettingsStore, F: ProviderFactory> {
    store: S,
    factory: F,
    options: DispatchOptions,
}

impl<S: SettingsStore, F: ProviderFactory> SummarizeHost<S, F> {
    pub fn new(store: S, factory: F) -> Self {
        Self {
            store,
            factory,
            options: DispatchOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Host wired from process configuration.
    pub fn from_app_config(store: S, factory: F, app: &AppConfig) -> Self {
        Self::new(store, factory).with_options(DispatchOptions {
            concurrency: app.chunk_concurrency,
            ..DispatchOptions::default()
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve settings fresh, then run the hierarchical pipeline.
    ///
    /// # Errors
    ///
    /// Returns `MissingCredential` before any provider call when no key is
    /// stored, otherwise the first provider or transport failure.
    pub async fn summarize(&self, text: String) -> Result<String, SummarizerError> {
        let config = ConfigResolver::new(&self.store).resolve()?;
        let provider = self.factory.build(&config)?;
        let request = SummarizationRequest::new(text, config);

        Dispatcher::new(provider)
            .with_options(self.options)
            .dispatch(&request)
            .await
    }
}

#[async_trait]
impl<S: SettingsStore, F: ProviderFactory> RequestHandler for SummarizeHost<S, F> {
    async fn handle(&self, request: Request) -> Reply {
        match request {
            Request::Summarize { text } => {
                let correlation_id = Uuid::new_v4();
                let span = info_span!("summarize", %correlation_id);

                async move {
                    match self.summarize(text).await {
                        Ok(summary) => {
                            info!("Summary ready");
                            Reply::summary(summary)
                        }
                        Err(e) => {
                            error!(error = %e, "Summarization failed");
                            Reply::failure(e.user_message())
                        }
                    }
                }
                .instrument(span)
                .await
            }
            Request::Ping => Reply::ack(),
            Request::TogglePick => {
                warn!("toggle-pick sent to the host");
                Reply::failure("Pick mode is handled by the extraction surface")
            }
        }
    }
}

/// Sends summarize requests to the host and everything else to the surface.
pub struct Router<H: RequestHandler, U: RequestHandler> {
    host: H,
    surface: U,
}

impl<H: RequestHandler, U: RequestHandler> Router<H, U> {
    pub fn new(host: H, surface: U) -> Self {
        Self { host, surface }
    }

    pub fn surface(&self) -> &U {
        &self.surface
    }
}

#[async_trait]
impl<H: RequestHandler, U: RequestHandler> RequestHandler for Router<H, U> {
    async fn handle(&self, request: Request) -> Reply {
        info!(kind = request.kind(), "Routing request");
        match request {
            Request::Summarize { .. } => self.host.handle(request).await,
            Request::Ping | Request::TogglePick => self.surface.handle(request).await,
        }
    }
}

#[async_trait]
impl<T: RequestHandler + ?Sized> RequestHandler for Arc<T> {
    async fn handle(&self, request: Request) -> Reply {
        (**self).handle(request).await
    }
}

/// The host's link to a page's extraction surface.
#[async_trait]
pub trait SurfaceChannel: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when no surface is listening.
    async fn send(&self, request: Request) -> Result<Reply, SummarizerError>;

    /// Install a fresh surface on the page.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be installed.
    async fn install(&self) -> Result<(), SummarizerError>;
}

/// Channel to a surface living in this process.
#[derive(Default)]
pub struct InProcessChannel {
    surface: Mutex<Option<Arc<PickSurface>>>,
}

impl InProcessChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_surface(surface: Arc<PickSurface>) -> Self {
        Self {
            surface: Mutex::new(Some(surface)),
        }
    }

    /// The installed surface, if any.
    #[must_use]
    pub fn surface(&self) -> Option<Arc<PickSurface>> {
        self.surface.lock().ok().and_then(|s| s.clone())
    }
}

#[async_trait]
impl SurfaceChannel for InProcessChannel {
    async fn send(&self, request: Request) -> Result<Reply, SummarizerError> {
        let surface = self.surface().ok_or_else(|| {
            SummarizerError::TransportError("No extraction surface installed".to_string())
        })?;
        Ok(surface.handle(request).await)
    }

    async fn install(&self) -> Result<(), SummarizerError> {
        let mut slot = self
            .surface
            .lock()
            .map_err(|e| SummarizerError::TransportError(format!("surface lock poisoned: {e}")))?;
        *slot = Some(Arc::new(PickSurface::new()));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// No API key stored; open the settings surface instead of picking.
    NeedsConfiguration,
    /// Pick mode was toggled, after reinstalling the surface if it was absent.
    Activated { reinstalled: bool },
}

/// User gesture on a page: ping the surface, reinstall it when it does not
/// answer in time, then toggle pick mode.
///
/// # Errors
///
/// Returns an error when the settings cannot be read, the surface cannot be
/// installed, or the toggle cannot be delivered.
pub async fn activate_picker<S, C>(
    store: &S,
    channel: &C,
    ping_timeout: Duration,
) -> Result<ActivationOutcome, SummarizerError>
where
    S: SettingsStore + ?Sized,
    C: SurfaceChannel + ?Sized,
{
    let record = store.load()?;
    if record.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
        info!("No API key stored, opening settings");
        return Ok(ActivationOutcome::NeedsConfiguration);
    }

    let alive = matches!(
        tokio::time::timeout(ping_timeout, channel.send(Request::Ping)).await,
        Ok(Ok(reply)) if reply.ok
    );

    if !alive {
        info!("Extraction surface not answering, reinstalling");
        channel.install().await?;
    }

    let reply = channel.send(Request::TogglePick).await?;
    if !reply.ok {
        warn!(error = ?reply.error, "Surface rejected toggle-pick");
    }

    Ok(ActivationOutcome::Activated {
        reinstalled: !alive,
    })
}
