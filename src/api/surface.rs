//! Extraction surface: pick-mode state and the text taken from a picked element.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::handler::RequestHandler;
use super::protocol::{Reply, Request};

/// Elements whose text is never summarized.
const SKIPPED_TAGS: [&str; 3] = ["script", "style", "noscript"];

/// Wrap width for HTML rendering; line breaks are collapsed afterwards.
const HTML_RENDER_WIDTH: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickMode {
    Idle,
    Picking,
}

/// What the surface knows about the element the user clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedElement {
    pub tag: String,
    pub inner_text: String,
}

impl PickedElement {
    pub fn new(tag: impl Into<String>, inner_text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            inner_text: inner_text.into(),
        }
    }

    /// Rendered HTML fragment as plain text.
    pub fn from_html(tag: impl Into<String>, html: &str) -> Self {
        Self::new(tag, html_to_text(html))
    }
}

/// Collapse every whitespace run to one space and trim.
#[must_use]
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text to summarize from a picked element; empty for non-content tags.
#[must_use]
pub fn extract_text(element: &PickedElement) -> String {
    let tag = element.tag.trim();
    if SKIPPED_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
        return String::new();
    }
    normalize_text(&element.inner_text)
}

/// Plain text of an HTML document, whitespace-normalized.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let rendered = html2text::from_read(html.as_bytes(), HTML_RENDER_WIDTH)
        .unwrap_or_else(|_| html.to_string());
    normalize_text(&rendered)
}

/// Pick-mode state for one page. Safe to share across tasks.
#[derive(Debug, Default)]
pub struct PickSurface {
    picking: AtomicBool,
}

impl PickSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mode(&self) -> PickMode {
        if self.picking.load(Ordering::SeqCst) {
            PickMode::Picking
        } else {
            PickMode::Idle
        }
    }

    /// Flip between idle and picking, returning the new mode.
    pub fn toggle(&self) -> PickMode {
        let was_picking = self.picking.fetch_xor(true, Ordering::SeqCst);
        let mode = if was_picking {
            PickMode::Idle
        } else {
            PickMode::Picking
        };
        debug!(?mode, "Pick mode toggled");
        mode
    }

    /// Leave pick mode without selecting anything. Returns whether it was active.
    pub fn cancel(&self) -> bool {
        self.picking.swap(false, Ordering::SeqCst)
    }

    /// Finish a pick. Leaves pick mode and yields the summarize request, or
    /// `None` when not picking or the element has nothing to summarize.
    pub fn complete_pick(&self, element: &PickedElement) -> Option<Request> {
        if !self.picking.swap(false, Ordering::SeqCst) {
            return None;
        }
        let text = extract_text(element);
        if text.is_empty() {
            debug!(tag = %element.tag, "Picked element has no text");
            return None;
        }
        Some(Request::Summarize { text })
    }
}

#[async_trait]
impl RequestHandler for PickSurface {
    async fn handle(&self, request: Request) -> Reply {
        match request {
            Request::Ping => Reply::ack(),
            Request::TogglePick => {
                self.toggle();
                Reply::ack()
            }
            Request::Summarize { .. } => {
                Reply::failure("Summarize requests are handled by the host")
            }
        }
    }
}
