//! Fans one query out to the web, image and reasoning branches.
//!
//! Each branch runs as its own task and publishes into its own slot through
//! the registry. Branches never wait on each other; a failure or timeout in
//! one leaves the others untouched.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn, Instrument};

use lumen_core::errors::with_deadline;
use lumen_core::ids::{SessionId, SubmissionToken};
use lumen_core::provider::SearchProvider;
use lumen_core::query::{Query, SearchMode, DEFAULT_RESULT_BOUND};
use lumen_core::results::{BranchResults, ImageResult, SearchResult};
use lumen_core::session::{BranchFailure, BranchKind, Outcome};

use crate::error::EngineError;
use crate::pipeline::ReflexivePipeline;
use crate::registry::{Applied, SessionRegistry};

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Deadline for each web and image search call.
    pub search_timeout: Duration,
    /// Bound used by `submit_query`.
    pub default_bound: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            search_timeout: Duration::from_secs(15),
            default_bound: DEFAULT_RESULT_BOUND,
        }
    }
}

/// A launched submission. Dropping it detaches the branches; they still run
/// to completion and publish if still current.
pub struct SubmissionHandle {
    pub session_id: SessionId,
    pub token: SubmissionToken,
    tasks: Vec<JoinHandle<()>>,
}

impl SubmissionHandle {
    /// Wait for every branch to finish (published or discarded).
    pub async fn join(self) {
        for (result, branch) in join_all(self.tasks).await.into_iter().zip(BranchKind::ALL) {
            if let Err(e) = result {
                warn!(session_id = %self.session_id, branch = branch.as_str(), error = %e, "branch task panicked");
            }
        }
    }
}

#[derive(Clone)]
pub struct QueryOrchestrator {
    registry: SessionRegistry,
    search: Arc<dyn SearchProvider>,
    pipeline: Arc<ReflexivePipeline>,
    config: OrchestratorConfig,
}

impl QueryOrchestrator {
    pub fn new(
        registry: SessionRegistry,
        search: Arc<dyn SearchProvider>,
        pipeline: Arc<ReflexivePipeline>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            registry,
            search,
            pipeline,
            config,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Start a submission on `session_id`.
    ///
    /// Blank queries are ignored (`Ok(None)`, nothing changes). The slots are
    /// reset to pending before this returns. Must be called from within a
    /// tokio runtime.
    pub fn submit(
        &self,
        session_id: &SessionId,
        query: Query,
    ) -> Result<Option<SubmissionHandle>, EngineError> {
        if query.is_blank() {
            debug!(session_id = %session_id, "blank query ignored");
            return Ok(None);
        }

        let token = self.registry.begin_submission(session_id, &query)?;
        let query = Arc::new(query);

        let tasks = vec![
            self.spawn_web(session_id.clone(), token, Arc::clone(&query)),
            self.spawn_images(session_id.clone(), token, Arc::clone(&query)),
            self.spawn_ai(session_id.clone(), token, query),
        ];

        Ok(Some(SubmissionHandle {
            session_id: session_id.clone(),
            token,
            tasks,
        }))
    }

    /// Fire-and-observe form: results arrive through the registry.
    pub fn submit_query(
        &self,
        session_id: &SessionId,
        text: &str,
        mode: SearchMode,
    ) -> Result<Option<SubmissionToken>, EngineError> {
        let query = Query::new(text, mode).with_bound(self.config.default_bound);
        Ok(self.submit(session_id, query)?.map(|handle| handle.token))
    }

    fn spawn_web(
        &self,
        session_id: SessionId,
        token: SubmissionToken,
        query: Arc<Query>,
    ) -> JoinHandle<()> {
        let registry = self.registry.clone();
        let search = Arc::clone(&self.search);
        let timeout = self.config.search_timeout;
        let span = tracing::info_span!("branch", branch = "web", session_id = %session_id, submission = %token);

        tokio::spawn(
            async move {
                let bound = query.bound();
                let started = Instant::now();
                let outcome =
                    match with_deadline(timeout, search.text_search(query.text_trimmed(), bound)).await {
                        Ok(hits) => Outcome::Succeeded(BranchResults::new(
                            hits.into_iter()
                                .take(bound)
                                .map(SearchResult::from_web_hit)
                                .collect(),
                            elapsed_ms(started),
                        )),
                        Err(e) => {
                            warn!(error = %e, kind = e.error_kind(), "web search failed");
                            Outcome::Failed(BranchFailure::from_provider(&e))
                        }
                    };
                report(registry.apply_web(&session_id, token, outcome));
            }
            .instrument(span),
        )
    }

    fn spawn_images(
        &self,
        session_id: SessionId,
        token: SubmissionToken,
        query: Arc<Query>,
    ) -> JoinHandle<()> {
        let registry = self.registry.clone();
        let search = Arc::clone(&self.search);
        let timeout = self.config.search_timeout;
        let span = tracing::info_span!("branch", branch = "images", session_id = %session_id, submission = %token);

        tokio::spawn(
            async move {
                let bound = query.bound();
                let started = Instant::now();
                let outcome =
                    match with_deadline(timeout, search.image_search(query.text_trimmed(), bound)).await {
                        Ok(hits) => Outcome::Succeeded(BranchResults::new(
                            hits.into_iter()
                                .filter_map(ImageResult::from_image_hit)
                                .take(bound)
                                .collect(),
                            elapsed_ms(started),
                        )),
                        Err(e) => {
                            warn!(error = %e, kind = e.error_kind(), "image search failed");
                            Outcome::Failed(BranchFailure::from_provider(&e))
                        }
                    };
                report(registry.apply_images(&session_id, token, outcome));
            }
            .instrument(span),
        )
    }

    fn spawn_ai(
        &self,
        session_id: SessionId,
        token: SubmissionToken,
        query: Arc<Query>,
    ) -> JoinHandle<()> {
        let registry = self.registry.clone();
        let pipeline = Arc::clone(&self.pipeline);
        let span = tracing::info_span!("branch", branch = "ai", session_id = %session_id, submission = %token);

        tokio::spawn(
            async move {
                let outcome = match pipeline.run(&query).await {
                    Ok(answer) => Outcome::Succeeded(answer),
                    Err(e) => {
                        warn!(error = %e, "reasoning pipeline failed");
                        Outcome::Failed(e.to_failure())
                    }
                };
                report(registry.apply_ai(&session_id, token, outcome));
            }
            .instrument(span),
        )
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn report(applied: Applied) {
    if applied == Applied::Stale {
        debug!("superseded result dropped");
    }
}
