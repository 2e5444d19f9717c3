//! Wire types for the picker ⇄ host exchange and their line framing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::SummarizerError;

/// Prefix marking a failure when a reply is rendered for the user.
pub const ERROR_PREFIX: &str = "❗ ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Request {
    /// Enter or leave capture mode on the extraction surface.
    TogglePick,
    /// Liveness check.
    Ping,
    /// Summarize text picked on the extraction surface.
    Summarize { text: String },
}

impl Request {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Request::TogglePick => "toggle-pick",
            Request::Ping => "ping",
            Request::Summarize { .. } => "summarize",
        }
    }
}

/// The single reply every request receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    #[must_use]
    pub fn ack() -> Self {
        Self {
            ok: true,
            summary: None,
            error: None,
        }
    }

    pub fn summary(summary: impl Into<String>) -> Self {
        Self {
            ok: true,
            summary: Some(summary.into()),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            summary: None,
            error: Some(message.into()),
        }
    }

    /// What the overlay shows: the summary, or the error with a distinct prefix.
    #[must_use]
    pub fn display_text(&self) -> String {
        if self.ok {
            self.summary.clone().unwrap_or_default()
        } else {
            format!("{ERROR_PREFIX}{}", self.error.as_deref().unwrap_or_default())
        }
    }
}

/// Decode one request line. The optional `id` is returned even when the
/// request itself is malformed so the reply can still be correlated.
#[must_use]
pub fn decode_request(line: &str) -> (Option<Value>, Result<Request, SummarizerError>) {
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            return (
                None,
                Err(SummarizerError::ParseError(format!("Invalid JSON frame: {e}"))),
            );
        }
    };

    let id = value.get("id").filter(|v| !v.is_null()).cloned();
    let request = serde_json::from_value::<Request>(value)
        .map_err(|e| SummarizerError::ParseError(format!("Unknown request: {e}")));

    (id, request)
}

/// Encode a reply as one JSON line (without the trailing newline).
///
/// # Errors
///
/// Returns `ParseError` if serialization fails.
pub fn encode_reply(id: Option<&Value>, reply: &Reply) -> Result<String, SummarizerError> {
    let mut value = serde_json::to_value(reply)?;
    if let (Some(id), Some(obj)) = (id, value.as_object_mut()) {
        obj.insert("id".to_string(), id.clone());
    }
    Ok(serde_json::to_string(&value)?)
}
