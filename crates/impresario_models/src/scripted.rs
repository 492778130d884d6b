//! Scripted driver for tests and dry runs.

use async_trait::async_trait;
use impresario_error::{ImpresarioResult, PolicyError, PolicyErrorKind};
use impresario_interface::{CompletionDriver, CompletionRequest, CompletionResponse};
use parking_lot::Mutex;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Failure(String),
}

/// Driver that replays a canned sequence of responses.
///
/// Each call to `complete` consumes the next reply in order and records
/// the request it answered, so tests can assert on both sides of the
/// conversation. An exhausted script fails the call, which keeps runaway
/// loops visible in tests.
///
/// # Examples
///
/// ```
/// use impresario_models::ScriptedDriver;
/// use impresario_interface::{CompletionDriver, CompletionRequest};
///
/// # #[tokio::main]
/// # async fn main() {
/// let driver = ScriptedDriver::new(vec![r#"[{"worker": "lore"}]"#]);
/// let response = driver
///     .complete(&CompletionRequest::new("What next?"))
///     .await
///     .unwrap();
/// assert!(response.text.contains("lore"));
/// assert_eq!(driver.request_count(), 1);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedDriver {
    /// A driver that answers with the given texts in order.
    pub fn new<S: Into<String>>(responses: Vec<S>) -> Self {
        Self {
            replies: Mutex::new(
                responses
                    .into_iter()
                    .map(|s| Reply::Text(s.into()))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue another successful response.
    pub fn push_response(&self, text: impl Into<String>) {
        self.replies.lock().push_back(Reply::Text(text.into()));
    }

    /// Queue a failure; the corresponding `complete` call will error with
    /// this message.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.replies.lock().push_back(Reply::Failure(message.into()));
    }

    /// Requests answered so far, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests answered so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Replies still queued.
    pub fn remaining(&self) -> usize {
        self.replies.lock().len()
    }
}

#[async_trait]
impl CompletionDriver for ScriptedDriver {
    async fn complete(&self, req: &CompletionRequest) -> ImpresarioResult<CompletionResponse> {
        self.requests.lock().push(req.clone());
        let reply = self.replies.lock().pop_front();
        match reply {
            Some(Reply::Text(text)) => Ok(CompletionResponse::new(text)),
            Some(Reply::Failure(message)) => {
                Err(PolicyError::new(PolicyErrorKind::Backend(message)).into())
            }
            None => Err(PolicyError::new(PolicyErrorKind::Backend(
                "Scripted driver exhausted".to_string(),
            ))
            .into()),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
