//! OpenAI-compatible chat completions client.
//!
//! Works against any endpoint speaking the `/chat/completions` dialect
//! (Hugging Face router, LM Studio, vLLM, OpenAI). Non-streaming; the engine
//! applies its own deadline around each call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use lumen_core::errors::GatewayError;
use lumen_core::ids::ToolCallId;
use lumen_core::provider::{
    Completion, CompletionRequest, ReasoningClient, ToolCallRequest, ToolDefinition,
};
use lumen_core::security::ApiKey;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<ApiKey>,
    pub temperature: f64,
}

pub struct OpenAiCompatClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiCompatClient {
    pub fn new(config: OpenAiConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent("Lumen/0.1")
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [
                { "role": "user", "content": request.prompt }
            ],
        });

        if !request.tools.is_empty() {
            let tools: Vec<serde_json::Value> = request.tools.iter().map(tool_to_openai).collect();
            body["tools"] = serde_json::Value::Array(tools);
            body["tool_choice"] = serde_json::json!("auto");
        }

        body
    }
}

fn tool_to_openai(tool: &ToolDefinition) -> serde_json::Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters
        }
    })
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ChatToolCall>,
}

#[derive(Debug, Deserialize)]
struct ChatToolCall {
    id: Option<String>,
    function: ChatFunction,
}

#[derive(Debug, Deserialize)]
struct ChatFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Turn a decoded response into a `Completion`. Only the first choice and
/// its first tool call are used.
fn parse_response(response: ChatResponse) -> Result<Completion, GatewayError> {
    let message = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .ok_or_else(|| GatewayError::MalformedResponse("response has no choices".into()))?;

    let tool_call = message.tool_calls.into_iter().next().map(|tc| {
        let arguments = serde_json::from_str(&tc.function.arguments)
            .unwrap_or(serde_json::Value::String(tc.function.arguments));
        ToolCallRequest {
            id: tc.id.map(ToolCallId::from_raw).unwrap_or_default(),
            name: tc.function.name,
            arguments,
        }
    });

    Ok(Completion {
        text: message.content.unwrap_or_default(),
        tool_call,
    })
}

#[async_trait]
impl ReasoningClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        "openai-compat"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(model = %self.config.model, tools = request.tools.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, GatewayError> {
        let api_key = self.config.api_key.as_ref().ok_or_else(|| {
            GatewayError::MissingCredentials("reasoning API token is not configured".into())
        })?;

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key.expose())
            .json(&self.build_request_body(request))
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "reasoning endpoint returned an error");
            return Err(GatewayError::from_status(status.as_u16(), body));
        }

        let decoded: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        parse_response(decoded)
    }
}

/// The only client-side deadline is the connect timeout, so a reqwest
/// timeout is reported against it.
fn send_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout(CONNECT_TIMEOUT)
    } else {
        GatewayError::NetworkError(e.to_string())
    }
}
