//! Collaborator contracts consumed by the engine.
//!
//! `SearchProvider` backs the web and image branches as well as evidence
//! gathering for the reasoning pipeline. `ReasoningClient` is the language
//! model. Both are network-bound and may fail or stall; callers wrap every
//! call in [`crate::errors::with_deadline`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::GatewayError;
use crate::ids::ToolCallId;

/// A ranked web snippet as returned by a search provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WebHit {
    pub title: String,
    pub url: Option<String>,
    pub snippet: String,
    pub score: Option<f64>,
}

/// An image reference as returned by a search provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHit {
    pub title: Option<String>,
    pub url: String,
    pub thumbnail: Option<String>,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn text_search(&self, query: &str, bound: usize) -> Result<Vec<WebHit>, GatewayError>;

    async fn image_search(&self, query: &str, bound: usize)
        -> Result<Vec<ImageHit>, GatewayError>;
}

/// A function tool the model may ask to call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Clone, Debug, Default)]
pub struct CompletionRequest {
    pub prompt: String,
    pub tools: Vec<ToolDefinition>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            tools: Vec::new(),
        }
    }

    pub fn with_tool(mut self, tool: ToolDefinition) -> Self {
        self.tools.push(tool);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: ToolCallId,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// What the model produced: text, optionally alongside a tool-call request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub tool_call: Option<ToolCallRequest>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_call: None,
        }
    }

    pub fn tool_call(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            text: String::new(),
            tool_call: Some(ToolCallRequest {
                id: ToolCallId::new(),
                name: name.into(),
                arguments,
            }),
        }
    }

    pub fn requests_tool(&self) -> bool {
        self.tool_call.is_some()
    }
}

#[async_trait]
pub trait ReasoningClient: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_constructors() {
        let plain = Completion::text("hi");
        assert!(!plain.requests_tool());
        assert_eq!(plain.text, "hi");

        let call = Completion::tool_call("web_search", serde_json::json!({"query": "rust"}));
        assert!(call.requests_tool());
        let tc = call.tool_call.unwrap();
        assert_eq!(tc.name, "web_search");
        assert_eq!(tc.arguments["query"], "rust");
    }

    #[test]
    fn request_builder_collects_tools() {
        let req = CompletionRequest::new("prompt").with_tool(ToolDefinition {
            name: "web_search".into(),
            description: "search".into(),
            parameters: serde_json::json!({"type": "object"}),
        });
        assert_eq!(req.prompt, "prompt");
        assert_eq!(req.tools.len(), 1);
    }
}
