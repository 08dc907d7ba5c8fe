use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use lumen_core::errors::GatewayError;
use lumen_core::provider::{Completion, CompletionRequest, ReasoningClient};

/// Pre-programmed responses for deterministic testing without API calls.
#[derive(Clone, Debug)]
pub enum MockResponse {
    Completion(Completion),
    Error(GatewayError),
    /// Wait a duration, then yield the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn text(text: &str) -> Self {
        Self::Completion(Completion::text(text))
    }

    /// The model asks for a `web_search` call with the given query.
    pub fn search_call(query: &str) -> Self {
        Self::Completion(Completion::tool_call(
            "web_search",
            serde_json::json!({ "query": query }),
        ))
    }

    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

type Handler = Box<dyn Fn(&CompletionRequest, usize) -> MockResponse + Send + Sync>;

enum Script {
    Sequence(Vec<MockResponse>),
    Handler(Handler),
}

/// Mock reasoning client. Either replays responses in call order or asks a
/// handler to pick one per request (useful when several pipelines share it).
pub struct MockReasoner {
    script: Script,
    call_count: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockReasoner {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            script: Script::Sequence(responses),
            call_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_handler(
        handler: impl Fn(&CompletionRequest, usize) -> MockResponse + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Script::Handler(Box::new(handler)),
            call_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Every request seen so far, in arrival order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ReasoningClient for MockReasoner {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, GatewayError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.requests.lock().push(request.clone());

        let response = match &self.script {
            Script::Sequence(responses) => responses.get(idx).cloned().ok_or_else(|| {
                GatewayError::InvalidRequest(format!(
                    "MockReasoner: no response configured for call {idx}"
                ))
            })?,
            Script::Handler(handler) => handler(request, idx),
        };

        resolve_response(response).await
    }
}

/// Resolve a MockResponse, unrolling nested delays iteratively.
async fn resolve_response(response: MockResponse) -> Result<Completion, GatewayError> {
    let mut current = response;
    loop {
        match current {
            MockResponse::Completion(c) => return Ok(c),
            MockResponse::Error(e) => return Err(e),
            MockResponse::Delay(duration, inner) => {
                tokio::time::sleep(duration).await;
                current = *inner;
            }
        }
    }
}
