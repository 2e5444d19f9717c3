use serde_json::Value;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use super::settings::{SettingsRecord, SettingsStore};
use crate::errors::SummarizerError;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_SENTENCES: u32 = 5;
pub const MIN_SENTENCES: u32 = 1;
pub const MAX_SENTENCES: u32 = 100;
pub const DEFAULT_FONT_SIZE: u32 = 14;
pub const MIN_FONT_SIZE: u32 = 8;
pub const MAX_FONT_SIZE: u32 = 32;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Per-request summarization settings, resolved fresh for every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub sentence_budget: u32,
    pub prompt_template: Option<String>,
}

impl Config {
    /// # Errors
    ///
    /// Returns `MissingCredential` when the record has no usable API key.
    pub fn from_record(record: &SettingsRecord) -> Result<Self, SummarizerError> {
        let api_key = record
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(SummarizerError::MissingCredential)?
            .to_string();

        let model = record
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MODEL)
            .to_string();

        let prompt_template = record
            .custom_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(ToString::to_string);

        Ok(Self {
            api_key,
            model,
            sentence_budget: clamp_sentences(record.sentences.as_ref()),
            prompt_template,
        })
    }
}

/// Reads the settings store and normalizes it into a [`Config`].
pub struct ConfigResolver<'a, S: SettingsStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: SettingsStore + ?Sized> ConfigResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `MissingCredential` if no API key is stored, or `ConfigError`
    /// if the store cannot be read.
    pub fn resolve(&self) -> Result<Config, SummarizerError> {
        let record = self.store.load()?;
        Config::from_record(&record)
    }
}

/// Integer-prefix parse of a loosely typed stored value.
///
/// Strings parse their leading `[+-]digits` run, numbers truncate toward
/// zero, everything else is absent.
#[must_use]
pub fn parse_leading_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc().clamp(i64::MIN as f64, i64::MAX as f64) as i64)
        }),
        Value::String(s) => {
            let s = s.trim_start();
            let (negative, rest) = match s.as_bytes().first() {
                Some(b'-') => (true, &s[1..]),
                Some(b'+') => (false, &s[1..]),
                _ => (false, s),
            };
            let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits_len == 0 {
                return None;
            }
            let magnitude = rest[..digits_len].parse::<i64>().unwrap_or(i64::MAX);
            Some(if negative { -magnitude } else { magnitude })
        }
        _ => None,
    }
}

fn clamp_with_default(raw: Option<&Value>, default: u32, min: u32, max: u32) -> u32 {
    let n = raw
        .and_then(parse_leading_int)
        .unwrap_or(i64::from(default));
    // Bounds are small positive numbers, so the narrowing below is lossless.
    n.clamp(i64::from(min), i64::from(max)) as u32
}

/// `clamp(parse(v) or 5, 1, 100)`
#[must_use]
pub fn clamp_sentences(raw: Option<&Value>) -> u32 {
    clamp_with_default(raw, DEFAULT_SENTENCES, MIN_SENTENCES, MAX_SENTENCES)
}

/// `clamp(parse(v) or 14, 8, 32)`
#[must_use]
pub fn clamp_font_size(raw: Option<&Value>) -> u32 {
    clamp_with_default(raw, DEFAULT_FONT_SIZE, MIN_FONT_SIZE, MAX_FONT_SIZE)
}

/// Process-level settings for the binary, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub settings_path: PathBuf,
    pub openai_base_url: String,
    pub request_timeout: Duration,
    pub chunk_concurrency: usize,
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` when a numeric variable does not parse.
    pub fn from_env() -> Result<Self, SummarizerError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// # Errors
    ///
    /// Returns `ConfigError` when a numeric variable does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SummarizerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings_path = lookup("SUMMARIZER_SETTINGS")
            .map(PathBuf::from)
            .unwrap_or_else(default_settings_path);

        let openai_base_url = lookup("OPENAI_BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let request_timeout = match lookup("SUMMARIZER_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|e| {
                SummarizerError::ConfigError(format!("SUMMARIZER_TIMEOUT_SECS: {e}"))
            })?),
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let chunk_concurrency = match lookup("SUMMARIZER_CONCURRENCY") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                SummarizerError::ConfigError(format!("SUMMARIZER_CONCURRENCY: {e}"))
            })?,
            None => 1,
        }
        .max(1);

        Ok(Self {
            settings_path,
            openai_base_url,
            request_timeout,
            chunk_concurrency,
        })
    }
}

fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("element-summarizer")
        .join("settings.json")
}
