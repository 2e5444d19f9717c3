//! Completion provider (`OpenAI`) client module
//!
//! Encapsulates the single chat-completion call every summarization step
//! goes through.

use async_trait::async_trait;
use openai_api_rs::v1::chat_completion::{ChatCompletionMessage, Content, MessageRole};
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::prompt_builder::{NO_SUMMARY_RETURNED, build_prompt};
use crate::core::config::Config;
use crate::errors::SummarizerError;

/// Sampling temperature for every summarization call.
pub const TEMPERATURE: f64 = 0.3;

/// A remote text-completion service.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns `ProviderError` for non-2xx responses and `TransportError`
    /// when the provider cannot be reached.
    async fn complete(&self, system_prompt: &str, user_text: &str)
    -> Result<String, SummarizerError>;
}

#[async_trait]
impl<T: CompletionProvider + ?Sized> CompletionProvider for Arc<T> {
    async fn complete(
        &self,
        system_prompt: &str,
        user_text: &str,
    ) -> Result<String, SummarizerError> {
        (**self).complete(system_prompt, user_text).await
    }
}

/// Builds a provider bound to one request's credential and model.
pub trait ProviderFactory: Send + Sync {
    type Provider: CompletionProvider;

    /// # Errors
    ///
    /// Returns an error if the provider cannot be constructed.
    fn build(&self, config: &Config) -> Result<Self::Provider, SummarizerError>;
}

/// Chat-completions client for `OpenAI` compatible endpoints.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(client: Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: crate::core::config::DEFAULT_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn request_body(&self, prompt: &[ChatCompletionMessage]) -> Value {
        json!({
            "model": self.model,
            "messages": build_messages_from_prompt(prompt),
            "temperature": TEMPERATURE
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(
        &self,
        system_prompt: &str,
        user_text: &str,
    ) -> Result<String, SummarizerError> {
        let prompt = build_prompt(system_prompt, user_text);

        #[cfg(feature = "debug-logs")]
        info!("Using completion prompt:\n{:?}", prompt);

        #[cfg(not(feature = "debug-logs"))]
        info!(
            model = %self.model,
            system_chars = system_prompt.chars().count(),
            user_chars = user_text.chars().count(),
            "Requesting completion"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&prompt))
            .send()
            .await
            .map_err(|e| {
                SummarizerError::TransportError(format!("OpenAI API request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|e| {
                format!("Failed to read error response body (status {status}): {e}")
            });
            return Err(SummarizerError::ProviderError {
                status: status.as_u16(),
                body,
            });
        }

        let response_json: Value = response.json().await.map_err(|e| {
            SummarizerError::TransportError(format!("Failed to parse OpenAI response: {e}"))
        })?;

        let text = extract_completion_text(&response_json);
        debug!(chars = text.chars().count(), "Completion received");
        Ok(text)
    }
}

/// Creates [`OpenAiProvider`]s sharing one pooled HTTP client.
#[derive(Clone)]
pub struct OpenAiProviderFactory {
    client: Client,
    base_url: String,
}

impl OpenAiProviderFactory {
    /// # Errors
    ///
    /// Returns `TransportError` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SummarizerError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            SummarizerError::TransportError(format!("Failed to build OpenAI HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl ProviderFactory for OpenAiProviderFactory {
    type Provider = OpenAiProvider;

    fn build(&self, config: &Config) -> Result<OpenAiProvider, SummarizerError> {
        Ok(
            OpenAiProvider::new(self.client.clone(), &config.api_key, &config.model)
                .with_base_url(&self.base_url),
        )
    }
}

/// `choices[0].message.content`, or the fixed fallback when absent.
#[must_use]
pub fn extract_completion_text(response: &Value) -> String {
    response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map_or_else(|| NO_SUMMARY_RETURNED.to_string(), ToString::to_string)
}

/// Chat-completions `messages` payload from a chat-style prompt.
pub(crate) fn build_messages_from_prompt(prompt: &[ChatCompletionMessage]) -> Vec<Value> {
    prompt
        .iter()
        .filter_map(|m| {
            let role_str = match m.role {
                MessageRole::system => "system",
                MessageRole::user | MessageRole::function | MessageRole::tool => "user",
                MessageRole::assistant => "assistant",
            };

            match &m.content {
                Content::Text(t) => Some(json!({
                    "role": role_str,
                    "content": t
                })),
                Content::ImageUrl(_) => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new(Client::new(), "sk-test", "gpt-4o-mini")
    }

    /// Answers one HTTP request with `status` and `body`, returning the raw request.
    async fn canned_server(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&raw);
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if raw.len() >= split + 4 + length {
                        break;
                    }
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8(raw).unwrap()
        });

        (base_url, handle)
    }

    fn provider_at(base_url: &str) -> OpenAiProvider {
        OpenAiProvider::new(Client::new(), "sk-abc", "gpt-4o-mini").with_base_url(base_url)
    }

    #[test]
    fn test_request_body_shape() {
        let provider = provider();
        let body = provider.request_body(&build_prompt("be brief", "TEXT:\n\"\"\"\nhi\n\"\"\""));

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["temperature"], 0.3);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], json!({"role": "system", "content": "be brief"}));
        assert_eq!(messages[1]["role"], "user");
    }

    #[test]
    fn test_extract_completion_text_reads_first_choice() {
        let response = json!({
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Short."}},
                {"index": 1, "message": {"role": "assistant", "content": "Other."}}
            ]
        });
        assert_eq!(extract_completion_text(&response), "Short.");
    }

    #[test]
    fn test_extract_completion_text_defaults_when_missing() {
        for response in [
            json!({}),
            json!({"choices": []}),
            json!({"choices": [{"message": {"role": "assistant", "content": null}}]}),
        ] {
            assert_eq!(extract_completion_text(&response), NO_SUMMARY_RETURNED);
        }
    }

    #[test]
    fn test_factory_binds_request_config() {
        let factory =
            OpenAiProviderFactory::new("http://localhost:9/v1", Duration::from_secs(1)).unwrap();
        let config = Config {
            api_key: "sk-abc".to_string(),
            model: "gpt-4o".to_string(),
            sentence_budget: 5,
            prompt_template: None,
        };

        let provider = factory.build(&config).unwrap();
        assert_eq!(provider.base_url, "http://localhost:9/v1");
        assert_eq!(provider.model, "gpt-4o");
        assert_eq!(provider.api_key, "sk-abc");
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_transport_error() {
        // Port 9 (discard) is not expected to accept HTTP connections.
        let factory =
            OpenAiProviderFactory::new("http://127.0.0.1:9/v1", Duration::from_secs(2)).unwrap();
        let provider = OpenAiProvider::new(factory.client().clone(), "sk-abc", "gpt-4o")
            .with_base_url(factory.base_url());

        let err = provider.complete("sys", "user").await.unwrap_err();
        assert!(matches!(err, SummarizerError::TransportError(_)));
    }

    #[tokio::test]
    async fn test_error_status_keeps_response_body_verbatim() {
        let body = r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#;
        let (base_url, server) = canned_server("429 Too Many Requests", body).await;

        let err = provider_at(&base_url).complete("sys", "user").await.unwrap_err();
        server.await.unwrap();

        match err {
            SummarizerError::ProviderError { status, body: got } => {
                assert_eq!(status, 429);
                assert_eq!(got, body);
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_without_choices_is_no_summary() {
        let (base_url, server) = canned_server("200 OK", "{}").await;

        let text = provider_at(&base_url).complete("sys", "user").await.unwrap();
        server.await.unwrap();

        assert_eq!(text, NO_SUMMARY_RETURNED);
    }

    #[tokio::test]
    async fn test_request_carries_bearer_key_and_chat_body() {
        let reply = r#"{"choices":[{"message":{"role":"assistant","content":"Short."}}]}"#;
        let (base_url, server) = canned_server("200 OK", reply).await;

        let text = provider_at(&base_url)
            .complete("be brief", "TEXT: hi")
            .await
            .unwrap();
        let raw = server.await.unwrap();

        assert_eq!(text, "Short.");
        let (head, body) = raw.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("POST /v1/chat/completions "), "got: {head}");
        assert!(
            head.lines()
                .any(|l| l.to_ascii_lowercase() == "authorization: bearer sk-abc"),
            "got: {head}"
        );

        let body: Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["temperature"], 0.3);
        assert_eq!(
            body["messages"],
            json!([
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "TEXT: hi"}
            ])
        );
    }
}
