use std::time::Duration;

use lumen_core::errors::GatewayError;
use lumen_core::ids::SessionId;
use lumen_core::session::{BranchFailure, FailureKind};

/// Errors surfaced to callers of the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("{0}")]
    Internal(String),
}

/// Terminal failure of the reasoning draft. Critique failures never surface
/// here; they fall back to the draft.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("reasoning upstream failed: {0}")]
    Upstream(String),

    #[error("reasoning timed out after {0:?}")]
    Timeout(Duration),
}

impl From<GatewayError> for PipelineError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Timeout(d) => Self::Timeout(d),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl PipelineError {
    pub fn to_failure(&self) -> BranchFailure {
        match self {
            Self::Upstream(_) => BranchFailure::new(FailureKind::Upstream, self.to_string()),
            Self::Timeout(_) => BranchFailure::new(FailureKind::Timeout, self.to_string()),
        }
    }
}
