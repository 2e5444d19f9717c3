#![allow(dead_code)]

use async_trait::async_trait;
use element_summarizer::ai::{CompletionProvider, ProviderFactory};
use element_summarizer::core::config::Config;
use element_summarizer::errors::SummarizerError;
use std::sync::{Arc, Mutex};

/// One recorded provider call: `(system_prompt, user_text)`.
pub type Call = (String, String);

#[derive(Clone, Copy)]
enum Behavior {
    /// Reply `summary-<n>` for the n-th call.
    Numbered,
    /// Fail the given call with a provider error, number the rest.
    FailOn { call: usize, status: u16 },
    /// Every call fails to connect.
    Unreachable,
}

#[derive(Clone)]
pub struct MockProvider {
    pub calls: Arc<Mutex<Vec<Call>>>,
    behavior: Behavior,
}

impl MockProvider {
    pub fn numbered() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            behavior: Behavior::Numbered,
        }
    }

    pub fn failing_on(call: usize, status: u16) -> Self {
        Self {
            behavior: Behavior::FailOn { call, status },
            ..Self::numbered()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            behavior: Behavior::Unreachable,
            ..Self::numbered()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String, SummarizerError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((system_prompt.to_string(), user_text.to_string()));
            calls.len()
        };

        match self.behavior {
            Behavior::FailOn { call, status } if call == n => Err(SummarizerError::ProviderError {
                status,
                body: "{\"error\":\"mock failure\"}".to_string(),
            }),
            Behavior::Unreachable => Err(SummarizerError::TransportError(
                "connection refused".to_string(),
            )),
            _ => Ok(format!("summary-{n}")),
        }
    }
}

/// Hands out clones of one provider and records the config of every build.
#[derive(Clone)]
pub struct MockFactory {
    pub provider: MockProvider,
    pub configs: Arc<Mutex<Vec<Config>>>,
}

impl MockFactory {
    pub fn new(provider: MockProvider) -> Self {
        Self {
            provider,
            configs: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl ProviderFactory for MockFactory {
    type Provider = MockProvider;

    fn build(&self, config: &Config) -> Result<MockProvider, SummarizerError> {
        self.configs.lock().unwrap().push(config.clone());
        Ok(self.provider.clone())
    }
}

pub fn config(sentence_budget: u32, prompt_template: Option<&str>) -> Config {
    Config {
        api_key: "sk-test".to_string(),
        model: "gpt-4o".to_string(),
        sentence_budget,
        prompt_template: prompt_template.map(ToString::to_string),
    }
}

/// `count` paragraphs of `len` characters each, separated by blank lines.
pub fn paragraphs(count: usize, len: usize) -> String {
    (0..count)
        .map(|i| {
            let ch = char::from(b'a' + (i % 26) as u8);
            ch.to_string().repeat(len)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
