//! The delegated text-completion service boundary.
//!
//! Pipeline engines are generic over [`CompletionProvider`], so the underlying
//! model/provider can be swapped (or faked in tests) without touching pipeline
//! logic. The production implementation posts OpenAI-style chat-completions
//! requests.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use clauseforge_shared::{ClauseForgeError, ProviderConfig, Result};

/// Narrow interface to the delegated text-completion service.
///
/// Implementations send one natural-language instruction and return the raw
/// model output. All task framing and response parsing stays in the engines.
#[allow(async_fn_in_trait)]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

// Engines own their provider; a shared reference lets several engines drive
// the same underlying client.
impl<P: CompletionProvider> CompletionProvider for &P {
    async fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt).await
    }
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Chat-completions client for OpenRouter-compatible endpoints.
pub struct HttpCompletionProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl HttpCompletionProvider {
    /// Build a provider from config; the API key is read from the configured
    /// env var, never from the config file itself.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            ClauseForgeError::config(format!(
                "completion-provider API key not found. Set the {} environment variable.",
                config.api_key_env
            ))
        })?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("ClauseForge/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClauseForgeError::Service(format!("client build: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    /// Construct directly; used by tests against a mock server.
    pub fn with_parts(base_url: &str, model: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClauseForgeError::Service(format!("client build: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

impl CompletionProvider for HttpCompletionProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0.2,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClauseForgeError::Service(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClauseForgeError::Service(format!("{url}: HTTP {status}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClauseForgeError::Service(format!("{url}: invalid response body: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ClauseForgeError::Service(format!("{url}: empty choices")))?;

        debug!(chars = content.len(), "completion received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> HttpCompletionProvider {
        HttpCompletionProvider::with_parts(
            &server.uri(),
            "test-model",
            "test-key",
            Duration::from_secs(5),
        )
        .expect("build provider")
    }

    #[tokio::test]
    async fn returns_message_content_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "{\"ok\": true}" } }]
            })))
            .mount(&server)
            .await;

        let content = provider_for(&server)
            .complete("classify this")
            .await
            .expect("complete");
        assert_eq!(content, "{\"ok\": true}");
    }

    #[tokio::test]
    async fn non_success_status_is_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = provider_for(&server).complete("prompt").await.unwrap_err();
        assert!(matches!(err, ClauseForgeError::Service(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn malformed_body_is_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
            .mount(&server)
            .await;

        let err = provider_for(&server).complete("prompt").await.unwrap_err();
        assert!(matches!(err, ClauseForgeError::Service(_)));
    }

    #[tokio::test]
    async fn empty_choices_is_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let err = provider_for(&server).complete("prompt").await.unwrap_err();
        assert!(err.to_string().contains("empty choices"));
    }
}
