//! OpenAI-compatible HTTP completion client.

use async_trait::async_trait;
use impresario_error::{ImpresarioResult, PolicyError, PolicyErrorKind};
use impresario_interface::{CompletionDriver, CompletionRequest, CompletionResponse};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// HTTP driver for any provider speaking the OpenAI chat-completions
/// protocol.
///
/// The client carries its own request timeout; rate limiting (429) and
/// server errors (5xx) are retried with exponential backoff and jitter,
/// while timeouts and transport failures surface immediately as normal
/// per-call failures.
#[derive(Debug, Clone)]
pub struct HttpCompletionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_retries: usize,
    timeout_secs: u64,
}

impl HttpCompletionClient {
    /// Creates a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Provider root, e.g. `https://api.openai.com`
    /// * `api_key` - Bearer token; `None` for unauthenticated local servers
    /// * `model` - Default model identifier
    /// * `timeout` - Per-request ceiling applied at the HTTP client level
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> ImpresarioResult<Self> {
        let base_url = base_url.into();
        let model = model.into();
        debug!(url = %base_url, model = %model, "Creating completion client");

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                PolicyError::new(PolicyErrorKind::Backend(format!(
                    "Failed to build HTTP client: {}",
                    e
                )))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            max_retries: 3,
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Override the retry ceiling. Zero disables retries entirely.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// One request-response exchange, no retries.
    async fn send_once(&self, req: &CompletionRequest) -> Result<CompletionResponse, PolicyError> {
        let model = req.model.as_deref().unwrap_or(&self.model);
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &req.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &req.prompt,
        });

        let body = ChatRequest {
            model,
            messages,
            max_tokens: req.max_tokens,
            temperature: req.temperature,
        };

        let url = format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH);
        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                PolicyError::new(PolicyErrorKind::Timeout(self.timeout_secs))
            } else {
                PolicyError::new(PolicyErrorKind::Backend(format!("Request failed: {}", e)))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %message, "Provider returned error");
            if status.as_u16() == 429 {
                return Err(PolicyError::new(PolicyErrorKind::RateLimited(message)));
            }
            return Err(PolicyError::new(PolicyErrorKind::HttpStatus {
                status_code: status.as_u16(),
                message,
            }));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            PolicyError::new(PolicyErrorKind::UnexpectedShape(format!(
                "Failed to parse response: {}",
                e
            )))
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PolicyError::new(PolicyErrorKind::UnexpectedShape(
                    "Response carried no choices".to_string(),
                ))
            })?;

        debug!(response_length = text.len(), "Received completion");
        Ok(CompletionResponse::new(text))
    }
}

#[async_trait]
impl CompletionDriver for HttpCompletionClient {
    #[instrument(skip(self, req), fields(model = %req.model.as_deref().unwrap_or(&self.model)))]
    async fn complete(&self, req: &CompletionRequest) -> ImpresarioResult<CompletionResponse> {
        use tokio_retry2::{Retry, RetryError, strategy::ExponentialBackoff, strategy::jitter};

        // First attempt decides the retry strategy from its error kind.
        let first_error = match self.send_once(req).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        if !first_error.kind.is_retryable() || self.max_retries == 0 {
            return Err(first_error.into());
        }

        let (initial_ms, kind_retries, max_delay_secs) = first_error.kind.retry_strategy_params();
        let retries = kind_retries.min(self.max_retries);
        warn!(
            error = %first_error,
            initial_backoff_ms = initial_ms,
            max_retries = retries,
            "Completion call failed, retrying with backoff"
        );

        let retry_strategy = ExponentialBackoff::from_millis(initial_ms)
            .factor(2)
            .max_delay(Duration::from_secs(max_delay_secs))
            .map(jitter)
            .take(retries);

        let response = Retry::spawn(retry_strategy, || async {
            match self.send_once(req).await {
                Ok(response) => Ok(response),
                Err(e) => {
                    if e.kind.is_retryable() {
                        warn!(error = %e, "Completion call failed, will retry");
                        Err(RetryError::Transient {
                            err: e,
                            retry_after: None,
                        })
                    } else {
                        warn!(error = %e, "Permanent completion error, failing immediately");
                        Err(RetryError::Permanent(e))
                    }
                }
            }
        })
        .await?;

        Ok(response)
    }

    fn provider_name(&self) -> &'static str {
        "openai-compatible"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = HttpCompletionClient::new(
            "http://localhost:8080/",
            None,
            "local-model",
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_request_serializes_without_absent_fields() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
            max_tokens: None,
            temperature: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("max_tokens"));
        assert!(!json.contains("temperature"));
    }

    #[test]
    fn test_response_parses_openai_shape() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "curtain up"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("curtain up")
        );
    }
}
