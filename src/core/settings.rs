use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use super::config::{clamp_font_size, clamp_sentences};
use crate::errors::SummarizerError;

/// The persisted configuration record shared with the settings surface.
///
/// `sentences` and `fontSize` stay loosely typed because older records may
/// hold them as strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentences: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_list: Option<Vec<String>>,
    #[serde(
        default,
        rename = "modelListTS",
        skip_serializing_if = "Option::is_none"
    )]
    pub model_list_ts: Option<i64>,
}

/// Backing storage for [`SettingsRecord`].
pub trait SettingsStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `ConfigError` if the underlying storage is unreadable.
    fn load(&self) -> Result<SettingsRecord, SummarizerError>;

    /// # Errors
    ///
    /// Returns `ConfigError` if the store is read-only or the write fails.
    fn save(&self, record: &SettingsRecord) -> Result<(), SummarizerError>;
}

/// Reads settings from process environment variables. Read-only.
pub struct EnvSettingsStore {
    lookup: Box<dyn Fn(&str) -> Option<String> + Send + Sync>,
}

impl EnvSettingsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_lookup(|name| std::env::var(name).ok())
    }

    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
        }
    }

    fn var(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }
}

impl Default for EnvSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for EnvSettingsStore {
    fn load(&self) -> Result<SettingsRecord, SummarizerError> {
        Ok(SettingsRecord {
            api_key: self.var("OPENAI_API_KEY"),
            model: self.var("OPENAI_MODEL"),
            sentences: self.var("SUMMARY_SENTENCES").map(Value::String),
            font_size: self.var("SUMMARY_FONT_SIZE").map(Value::String),
            custom_prompt: self.var("SUMMARY_PROMPT"),
            model_list: None,
            model_list_ts: None,
        })
    }

    fn save(&self, _record: &SettingsRecord) -> Result<(), SummarizerError> {
        Err(SummarizerError::ConfigError(
            "environment settings are read-only".to_string(),
        ))
    }
}

/// JSON file on disk. A missing file reads as an empty record.
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<SettingsRecord, SummarizerError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Settings file absent, using defaults");
            return Ok(SettingsRecord::default());
        }

        let raw = fs::read_to_string(&self.path).map_err(|e| {
            SummarizerError::ConfigError(format!("{}: {e}", self.path.display()))
        })?;
        if raw.trim().is_empty() {
            return Ok(SettingsRecord::default());
        }

        serde_json::from_str(&raw)
            .map_err(|e| SummarizerError::ConfigError(format!("{}: {e}", self.path.display())))
    }

    fn save(&self, record: &SettingsRecord) -> Result<(), SummarizerError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SummarizerError::ConfigError(format!("{}: {e}", parent.display()))
            })?;
        }

        let body = serde_json::to_string_pretty(record)
            .map_err(|e| SummarizerError::ConfigError(format!("settings serialize: {e}")))?;
        fs::write(&self.path, body).map_err(|e| {
            SummarizerError::ConfigError(format!("{}: {e}", self.path.display()))
        })?;

        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

/// In-process store, used when embedding the host and in tests.
#[derive(Default)]
pub struct MemorySettingsStore {
    record: Mutex<SettingsRecord>,
}

impl MemorySettingsStore {
    #[must_use]
    pub fn new(record: SettingsRecord) -> Self {
        Self {
            record: Mutex::new(record),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<SettingsRecord, SummarizerError> {
        self.record
            .lock()
            .map(|r| r.clone())
            .map_err(|e| SummarizerError::ConfigError(format!("settings lock poisoned: {e}")))
    }

    fn save(&self, record: &SettingsRecord) -> Result<(), SummarizerError> {
        let mut guard = self
            .record
            .lock()
            .map_err(|e| SummarizerError::ConfigError(format!("settings lock poisoned: {e}")))?;
        *guard = record.clone();
        Ok(())
    }
}

/// Primary store overlaid on a fallback: fields present in the primary win,
/// absent ones come from the fallback. Writes go to the primary only.
pub struct LayeredSettingsStore<P: SettingsStore, F: SettingsStore> {
    primary: P,
    fallback: F,
}

impl<P: SettingsStore, F: SettingsStore> LayeredSettingsStore<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }
}

impl<P: SettingsStore, F: SettingsStore> SettingsStore for LayeredSettingsStore<P, F> {
    fn load(&self) -> Result<SettingsRecord, SummarizerError> {
        let top = self.primary.load()?;
        let base = self.fallback.load()?;
        Ok(SettingsRecord {
            api_key: top.api_key.or(base.api_key),
            model: top.model.or(base.model),
            sentences: top.sentences.or(base.sentences),
            font_size: top.font_size.or(base.font_size),
            custom_prompt: top.custom_prompt.or(base.custom_prompt),
            model_list: top.model_list.or(base.model_list),
            model_list_ts: top.model_list_ts.or(base.model_list_ts),
        })
    }

    /// Values inherited unchanged from the fallback are not copied into the primary.
    fn save(&self, record: &SettingsRecord) -> Result<(), SummarizerError> {
        let top = self.primary.load()?;
        let base = self.fallback.load()?;
        let own = SettingsRecord {
            api_key: own_value(&record.api_key, &top.api_key, &base.api_key),
            model: own_value(&record.model, &top.model, &base.model),
            sentences: own_value(&record.sentences, &top.sentences, &base.sentences),
            font_size: own_value(&record.font_size, &top.font_size, &base.font_size),
            custom_prompt: own_value(&record.custom_prompt, &top.custom_prompt, &base.custom_prompt),
            model_list: own_value(&record.model_list, &top.model_list, &base.model_list),
            model_list_ts: own_value(&record.model_list_ts, &top.model_list_ts, &base.model_list_ts),
        };
        self.primary.save(&own)
    }
}

fn own_value<T: Clone + PartialEq>(
    new: &Option<T>,
    top: &Option<T>,
    base: &Option<T>,
) -> Option<T> {
    if top.is_none() && new == base {
        None
    } else {
        new.clone()
    }
}

static API_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^sk-[A-Za-z0-9_-]{32,}$").expect("static regex compile"));

/// Checks the `sk-` key shape before anything is persisted.
///
/// # Errors
///
/// Returns `InvalidApiKey` when the trimmed key does not match.
pub fn validate_api_key(raw: &str) -> Result<String, SummarizerError> {
    let key = raw.trim();
    if API_KEY_RE.is_match(key) {
        Ok(key.to_string())
    } else {
        Err(SummarizerError::InvalidApiKey)
    }
}

fn update<S, F>(store: &S, apply: F) -> Result<SettingsRecord, SummarizerError>
where
    S: SettingsStore + ?Sized,
    F: FnOnce(&mut SettingsRecord),
{
    let mut record = store.load()?;
    apply(&mut record);
    store.save(&record)?;
    Ok(record)
}

/// # Errors
///
/// Returns `InvalidApiKey` without touching the store if the key is malformed.
pub fn save_api_key<S: SettingsStore + ?Sized>(
    store: &S,
    raw: &str,
) -> Result<(), SummarizerError> {
    let key = validate_api_key(raw)?;
    update(store, |r| r.api_key = Some(key))?;
    Ok(())
}

/// Clamps and stores the sentence budget, returning the stored value.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub fn set_sentences<S: SettingsStore + ?Sized>(
    store: &S,
    raw: &Value,
) -> Result<u32, SummarizerError> {
    let n = clamp_sentences(Some(raw));
    update(store, |r| r.sentences = Some(Value::from(n)))?;
    Ok(n)
}

/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub fn set_font_size<S: SettingsStore + ?Sized>(
    store: &S,
    raw: &Value,
) -> Result<u32, SummarizerError> {
    let n = clamp_font_size(Some(raw));
    update(store, |r| r.font_size = Some(Value::from(n)))?;
    Ok(n)
}

/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub fn set_custom_prompt<S: SettingsStore + ?Sized>(
    store: &S,
    prompt: &str,
) -> Result<(), SummarizerError> {
    let trimmed = prompt.trim().to_string();
    update(store, |r| r.custom_prompt = Some(trimmed))?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub fn set_model<S: SettingsStore + ?Sized>(store: &S, model: &str) -> Result<(), SummarizerError> {
    let model = model.trim().to_string();
    update(store, |r| r.model = Some(model))?;
    Ok(())
}
