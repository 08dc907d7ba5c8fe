//! Settings tree. Every section has compiled defaults so a partial user file
//! only needs to name what it changes.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LumenSettings {
    pub server: ServerSettings,
    pub search: SearchSettings,
    pub reasoning: ReasoningSettings,
    pub pipeline: PipelineSettings,
    pub logging: LoggingSettings,
}

impl LumenSettings {
    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.evidence_snippets == 0 {
            return Err(SettingsError::InvalidValue(
                "pipeline.evidenceSnippets must be at least 1".into(),
            ));
        }
        if self.search.timeout_ms == 0 || self.reasoning.timeout_ms == 0 {
            return Err(SettingsError::InvalidValue("timeouts must be non-zero".into()));
        }
        if self.reasoning.base_url.trim().is_empty() {
            return Err(SettingsError::InvalidValue("reasoning.baseUrl is empty".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Capacity of the session event broadcast channel.
    pub event_buffer: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            event_buffer: 1024,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchSettings {
    /// Name of the env var holding the search API key.
    pub api_key_env: String,
    pub timeout_ms: u64,
    /// Default result bound for queries that do not set one.
    pub default_bound: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_key_env: "BRAVE_SEARCH_API_KEY".to_string(),
            timeout_ms: 15_000,
            default_bound: 6,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReasoningSettings {
    /// OpenAI-compatible base URL (`/chat/completions` is appended).
    pub base_url: String,
    pub model: String,
    /// Name of the env var holding the bearer token.
    pub api_key_env: String,
    pub timeout_ms: u64,
    pub temperature: f64,
}

impl Default for ReasoningSettings {
    fn default() -> Self {
        Self {
            base_url: "https://router.huggingface.co/v1".to_string(),
            model: "Qwen/Qwen3-Coder-30B-A3B-Instruct:nebius".to_string(),
            api_key_env: "HF_TOKEN".to_string(),
            timeout_ms: 120_000,
            temperature: 0.4,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    /// Web snippets used to ground the draft.
    pub evidence_snippets: usize,
    pub max_takeaways: usize,
    pub max_followups: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            evidence_snippets: 5,
            max_takeaways: 5,
            max_followups: 4,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    /// `json` or `pretty`.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}
