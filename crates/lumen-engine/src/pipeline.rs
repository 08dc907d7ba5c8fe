//! Reflexive answer pipeline: a grounded draft followed by a self-critique.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use lumen_core::errors::with_deadline;
use lumen_core::provider::{CompletionRequest, ReasoningClient, SearchProvider};
use lumen_core::query::Query;
use lumen_core::results::{ReflexiveAnswer, SearchResult};

use crate::critique::{parse_critique, Critique};
use crate::error::PipelineError;
use crate::prompts::{critique_prompt, draft_prompt, search_tool, SEARCH_TOOL_NAME};

/// The draft pass may fetch evidence on the model's request at most this often.
const MAX_EVIDENCE_ROUND_TRIPS: u32 = 1;

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub evidence_snippets: usize,
    pub max_takeaways: usize,
    pub max_followups: usize,
    pub search_timeout: Duration,
    pub call_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            evidence_snippets: 5,
            max_takeaways: 5,
            max_followups: 4,
            search_timeout: Duration::from_secs(15),
            call_timeout: Duration::from_secs(120),
        }
    }
}

pub struct ReflexivePipeline {
    reasoner: Arc<dyn ReasoningClient>,
    search: Arc<dyn SearchProvider>,
    config: PipelineConfig,
}

impl ReflexivePipeline {
    pub fn new(
        reasoner: Arc<dyn ReasoningClient>,
        search: Arc<dyn SearchProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            reasoner,
            search,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run draft and critique for one query. Only a failed draft is an error.
    #[instrument(skip_all, fields(mode = query.mode().as_str(), model = self.reasoner.model()))]
    pub async fn run(&self, query: &Query) -> Result<ReflexiveAnswer, PipelineError> {
        let start = Instant::now();
        let text = query.text_trimmed();

        let mut evidence = if query.mode().wants_evidence() {
            self.fetch_evidence(text).await
        } else {
            Vec::new()
        };

        let draft = self.draft(text, &mut evidence).await?;
        let critique = self.critique(text, &draft).await;

        let (summary, key_takeaways, followup_questions, refined_query) = match critique {
            Some(c) => {
                let Critique {
                    final_answer,
                    key_takeaways,
                    followups,
                    refined_query,
                } = c;
                let summary = if final_answer.is_empty() {
                    draft
                } else {
                    final_answer
                };
                (summary, key_takeaways, followups, refined_query)
            }
            None => (draft, Vec::new(), Vec::new(), None),
        };

        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(latency_ms, evidence = evidence.len(), "reflexive answer ready");

        Ok(ReflexiveAnswer {
            refined_query: refined_query.unwrap_or_else(|| text.to_string()),
            summary,
            key_takeaways,
            followup_questions,
            latency_ms,
            evidence,
        })
    }

    /// Fetch grounding snippets. Failures degrade to no evidence.
    async fn fetch_evidence(&self, query: &str) -> Vec<SearchResult> {
        let bound = self.config.evidence_snippets;
        match with_deadline(self.config.search_timeout, self.search.text_search(query, bound)).await
        {
            Ok(hits) => hits
                .into_iter()
                .take(bound)
                .map(SearchResult::from_web_hit)
                .collect(),
            Err(e) => {
                warn!(error = %e, kind = e.error_kind(), "evidence fetch failed, continuing without");
                Vec::new()
            }
        }
    }

    async fn draft(
        &self,
        query: &str,
        evidence: &mut Vec<SearchResult>,
    ) -> Result<String, PipelineError> {
        let mut round_trips = 0u32;
        loop {
            let tool_available = round_trips < MAX_EVIDENCE_ROUND_TRIPS;
            let mut request = CompletionRequest::new(draft_prompt(query, &evidence[..], tool_available));
            if tool_available {
                request = request.with_tool(search_tool());
            }

            let completion =
                with_deadline(self.config.call_timeout, self.reasoner.complete(&request)).await?;

            match completion.tool_call {
                Some(call) if tool_available && call.name == SEARCH_TOOL_NAME => {
                    round_trips += 1;
                    let search_query = call
                        .arguments
                        .get("query")
                        .and_then(|v| v.as_str())
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .unwrap_or(query);
                    debug!(search_query, "model requested evidence");
                    for result in self.fetch_evidence(search_query).await {
                        if !evidence.iter().any(|e| e.url.is_some() && e.url == result.url) {
                            evidence.push(result);
                        }
                    }
                }
                Some(call) => {
                    debug!(tool = %call.name, "tool request after round-trip limit, using text");
                    return Ok(completion.text);
                }
                None => return Ok(completion.text),
            }
        }
    }

    async fn critique(&self, query: &str, draft: &str) -> Option<Critique> {
        let request = CompletionRequest::new(critique_prompt(
            query,
            draft,
            self.config.max_takeaways,
            self.config.max_followups,
        ));
        match with_deadline(self.config.call_timeout, self.reasoner.complete(&request)).await {
            Ok(completion) => {
                let parsed = parse_critique(
                    &completion.text,
                    self.config.max_takeaways,
                    self.config.max_followups,
                );
                if parsed.is_none() {
                    warn!("critique output was not JSON, keeping draft");
                }
                parsed
            }
            Err(e) => {
                warn!(error = %e, kind = e.error_kind(), "critique failed, keeping draft");
                None
            }
        }
    }
}
