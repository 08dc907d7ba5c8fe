//! Query orchestration: per-tab session registry, the three result branches,
//! and the draft-then-critique reasoning pipeline.

pub mod critique;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod registry;

pub use error::{EngineError, PipelineError};
pub use orchestrator::{OrchestratorConfig, QueryOrchestrator, SubmissionHandle};
pub use pipeline::{PipelineConfig, ReflexivePipeline};
pub use registry::{Applied, SessionRegistry};
