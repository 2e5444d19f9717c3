//! Model-list discovery with a 24 hour cache in the settings record.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::core::config::DEFAULT_MODEL;
use crate::core::settings::{SettingsRecord, SettingsStore};
use crate::errors::SummarizerError;

pub const MODEL_LIST_TTL_MS: i64 = 86_400_000;

pub const FALLBACK_MODELS: [&str; 3] = ["gpt-4o", "gpt-4o-mini", "gpt-3.5-turbo-0125"];

static CHAT_MODEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)gpt|turbo|chat|mixtral|command").expect("static regex compile"));

/// Keep chat-capable model ids, sorted case-insensitively.
#[must_use]
pub fn filter_model_ids<I>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut models: Vec<String> = ids
        .into_iter()
        .filter(|id| CHAT_MODEL_RE.is_match(id))
        .collect();
    models.sort_by_cached_key(|m| (m.to_lowercase(), m.clone()));
    models
}

#[must_use]
pub fn fallback_models() -> Vec<String> {
    FALLBACK_MODELS.iter().map(ToString::to_string).collect()
}

/// Cached list if it was stored less than a day before `now_ms`.
#[must_use]
pub fn cached_models(record: &SettingsRecord, now_ms: i64) -> Option<&[String]> {
    let list = record.model_list.as_deref()?;
    let stamped = record.model_list_ts?;
    (now_ms.saturating_sub(stamped) < MODEL_LIST_TTL_MS).then_some(list)
}

/// The stored model when listed, else `gpt-4o` when listed, else the first entry.
#[must_use]
pub fn preferred_model(models: &[String], stored: Option<&str>) -> Option<String> {
    stored
        .filter(|m| models.iter().any(|x| x.as_str() == *m))
        .or_else(|| models.iter().find(|m| *m == DEFAULT_MODEL).map(String::as_str))
        .or_else(|| models.first().map(String::as_str))
        .map(ToString::to_string)
}

/// # Errors
///
/// Returns `ProviderError` on a non-2xx status and `TransportError` when the
/// endpoint is unreachable or the body is not a model listing.
pub async fn fetch_model_ids(
    client: &Client,
    base_url: &str,
    api_key: &str,
) -> Result<Vec<String>, SummarizerError> {
    let response = client
        .get(format!("{base_url}/models"))
        .bearer_auth(api_key)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SummarizerError::ProviderError {
            status: status.as_u16(),
            body,
        });
    }

    let json: Value = response.json().await?;
    let data = json
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| SummarizerError::TransportError("Model listing missing data".to_string()))?;

    Ok(filter_model_ids(
        data.iter()
            .filter_map(|m| m.get("id").and_then(Value::as_str))
            .map(ToString::to_string),
    ))
}

/// Cache, then network, then the fixed fallback list. Never fails.
pub async fn load_model_list<S: SettingsStore + ?Sized>(
    store: &S,
    client: &Client,
    base_url: &str,
    now_ms: i64,
) -> Vec<String> {
    let record = match store.load() {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "Settings unreadable, using fallback model list");
            return fallback_models();
        }
    };

    if let Some(list) = cached_models(&record, now_ms) {
        return list.to_vec();
    }

    let Some(api_key) = record.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
        return fallback_models();
    };

    match fetch_model_ids(client, base_url, api_key).await {
        Ok(models) => {
            info!(count = models.len(), "Fetched model list");
            let mut updated = record.clone();
            updated.model_list = Some(models.clone());
            updated.model_list_ts = Some(now_ms);
            if let Err(e) = store.save(&updated) {
                warn!(error = %e, "Failed to cache model list");
            }
            models
        }
        Err(e) => {
            warn!(error = %e, "Model fetch failed, using fallback");
            fallback_models()
        }
    }
}

/// Persist the preferred model when none is stored yet.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub fn ensure_model_selected<S: SettingsStore + ?Sized>(
    store: &S,
    models: &[String],
) -> Result<Option<String>, SummarizerError> {
    let mut record = store.load()?;
    let preferred = preferred_model(models, record.model.as_deref());
    if record.model.is_none() {
        if let Some(model) = &preferred {
            record.model = Some(model.clone());
            store.save(&record)?;
        }
    }
    Ok(preferred)
}
