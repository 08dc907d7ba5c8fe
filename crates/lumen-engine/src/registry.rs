//! Per-tab session registry.
//!
//! All session mutation funnels through one mutex. Branch tasks never hold
//! session memory; they carry `(SessionId, SubmissionToken)` and publish
//! through `apply_*`, which drops the write when the session has moved on to
//! a newer submission or no longer exists.
//!
//! Events are sent while the lock is held, so subscribers see them in the
//! same order as the state changes they describe.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info};

use lumen_core::events::SessionEvent;
use lumen_core::ids::{SessionId, SubmissionToken};
use lumen_core::query::Query;
use lumen_core::results::{BranchResults, ImageResult, ReflexiveAnswer, SearchResult};
use lumen_core::session::{BranchKind, Outcome, SessionState, SessionSummary, SubView};

use crate::error::EngineError;

/// Result of publishing a branch outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    Applied,
    /// A newer submission owns the slots, or the session was closed.
    Stale,
}

struct Entry {
    state: SessionState,
    submission: Option<SubmissionToken>,
}

struct Inner {
    /// Insertion order: oldest first.
    entries: Vec<Entry>,
    active: SessionId,
    last_token: SubmissionToken,
}

impl Inner {
    fn position(&self, id: &SessionId) -> Option<usize> {
        self.entries.iter().position(|e| &e.state.id == id)
    }

    fn entry_mut(&mut self, id: &SessionId) -> Result<&mut Entry, EngineError> {
        self.entries
            .iter_mut()
            .find(|e| &e.state.id == id)
            .ok_or_else(|| EngineError::SessionNotFound(id.clone()))
    }

    fn entry(&self, id: &SessionId) -> Result<&Entry, EngineError> {
        self.entries
            .iter()
            .find(|e| &e.state.id == id)
            .ok_or_else(|| EngineError::SessionNotFound(id.clone()))
    }

    fn push_new(&mut self) -> SessionId {
        let id = SessionId::new();
        self.entries.push(Entry {
            state: SessionState::new(id.clone()),
            submission: None,
        });
        id
    }
}

#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<Mutex<Inner>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionRegistry {
    /// Create a registry holding one fresh, active session.
    pub fn new(event_buffer: usize) -> Self {
        let (events, _rx) = broadcast::channel(event_buffer.max(1));
        let id = SessionId::new();
        let inner = Inner {
            entries: vec![Entry {
                state: SessionState::new(id.clone()),
                submission: None,
            }],
            active: id,
            last_token: SubmissionToken::new(0),
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Callers hold the `inner` lock. `broadcast::Sender::send` never blocks.
    fn emit(&self, event: SessionEvent) {
        // No subscribers is normal (headless use, tests).
        let _ = self.events.send(event);
    }

    /// Open a new tab and make it active.
    pub fn create_session(&self) -> SessionId {
        let mut inner = self.inner.lock();
        let id = inner.push_new();
        inner.active = id.clone();
        self.emit(SessionEvent::SessionCreated {
            session_id: id.clone(),
        });
        self.emit(SessionEvent::ActiveChanged {
            session_id: id.clone(),
        });
        drop(inner);
        info!(session_id = %id, "session created");
        id
    }

    /// Close a tab. If it was active, the next younger tab becomes active,
    /// else the next older one, else a fresh tab is opened.
    pub fn close_session(&self, id: &SessionId) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        let idx = inner
            .position(id)
            .ok_or_else(|| EngineError::SessionNotFound(id.clone()))?;
        let _ = inner.entries.remove(idx);
        self.emit(SessionEvent::SessionClosed {
            session_id: id.clone(),
        });

        if &inner.active == id {
            let neighbour = inner
                .entries
                .get(idx)
                .or_else(|| idx.checked_sub(1).and_then(|prev| inner.entries.get(prev)))
                .map(|e| e.state.id.clone());
            let next = match neighbour {
                Some(next) => next,
                None => {
                    let fresh = inner.push_new();
                    self.emit(SessionEvent::SessionCreated {
                        session_id: fresh.clone(),
                    });
                    fresh
                }
            };
            inner.active = next.clone();
            self.emit(SessionEvent::ActiveChanged { session_id: next });
        }
        drop(inner);

        info!(session_id = %id, "session closed");
        Ok(())
    }

    pub fn set_active(&self, id: &SessionId) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        let _ = inner.entry(id)?;
        if &inner.active != id {
            inner.active = id.clone();
            self.emit(SessionEvent::ActiveChanged {
                session_id: id.clone(),
            });
        }
        Ok(())
    }

    pub fn active_id(&self) -> SessionId {
        self.inner.lock().active.clone()
    }

    /// Snapshot of the active session.
    pub fn active(&self) -> SessionState {
        let inner = self.inner.lock();
        inner
            .entries
            .iter()
            .find(|e| e.state.id == inner.active)
            .or_else(|| inner.entries.last())
            .map(|e| e.state.clone())
            .unwrap_or_else(|| SessionState::new(inner.active.clone()))
    }

    /// Snapshot of one session.
    pub fn read(&self, id: &SessionId) -> Result<SessionState, EngineError> {
        Ok(self.inner.lock().entry(id)?.state.clone())
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.inner.lock().position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Tab strip listing, oldest first.
    pub fn list(&self) -> Vec<SessionSummary> {
        let inner = self.inner.lock();
        inner
            .entries
            .iter()
            .map(|e| e.state.summary(e.state.id == inner.active))
            .collect()
    }

    /// Show a page in place of the result list, or clear it with `None`.
    pub fn set_preview(&self, id: &SessionId, url: Option<String>) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        inner.entry_mut(id)?.state.preview_url = url;
        self.emit(SessionEvent::ViewChanged {
            session_id: id.clone(),
        });
        Ok(())
    }

    pub fn set_sub_view(&self, id: &SessionId, view: SubView) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        inner.entry_mut(id)?.state.sub_view = view;
        self.emit(SessionEvent::ViewChanged {
            session_id: id.clone(),
        });
        Ok(())
    }

    /// Reset all slots to pending and issue the token that now owns them.
    pub fn begin_submission(
        &self,
        id: &SessionId,
        query: &Query,
    ) -> Result<SubmissionToken, EngineError> {
        let mut inner = self.inner.lock();
        let token = inner.last_token.next();
        let entry = inner.entry_mut(id)?;
        entry.state.reset_for(query);
        entry.submission = Some(token);
        inner.last_token = token;
        self.emit(SessionEvent::QueryStarted {
            session_id: id.clone(),
            submission: token,
            query: query.text_trimmed().to_string(),
        });
        drop(inner);

        info!(session_id = %id, submission = %token, mode = query.mode().as_str(), "submission started");
        Ok(token)
    }

    pub fn apply_web(
        &self,
        id: &SessionId,
        token: SubmissionToken,
        outcome: Outcome<BranchResults<SearchResult>>,
    ) -> Applied {
        let succeeded = outcome.succeeded().is_some();
        self.apply(id, token, BranchKind::Web, succeeded, |s| s.web = Some(outcome))
    }

    pub fn apply_images(
        &self,
        id: &SessionId,
        token: SubmissionToken,
        outcome: Outcome<BranchResults<ImageResult>>,
    ) -> Applied {
        let succeeded = outcome.succeeded().is_some();
        self.apply(id, token, BranchKind::Images, succeeded, |s| {
            s.images = Some(outcome)
        })
    }

    pub fn apply_ai(
        &self,
        id: &SessionId,
        token: SubmissionToken,
        outcome: Outcome<ReflexiveAnswer>,
    ) -> Applied {
        let succeeded = outcome.succeeded().is_some();
        self.apply(id, token, BranchKind::Ai, succeeded, |s| s.ai = Some(outcome))
    }

    fn apply(
        &self,
        id: &SessionId,
        token: SubmissionToken,
        branch: BranchKind,
        succeeded: bool,
        write: impl FnOnce(&mut SessionState),
    ) -> Applied {
        let mut inner = self.inner.lock();
        let Ok(entry) = inner.entry_mut(id) else {
            debug!(session_id = %id, submission = %token, branch = branch.as_str(), "session closed, result discarded");
            return Applied::Stale;
        };
        if entry.submission != Some(token) {
            debug!(session_id = %id, submission = %token, branch = branch.as_str(), "stale result discarded");
            return Applied::Stale;
        }
        write(&mut entry.state);
        if entry.state.all_failed() {
            entry.state.last_error = Some(format!(
                "all sources failed for \"{}\"",
                entry.state.title
            ));
        }
        self.emit(SessionEvent::BranchUpdated {
            session_id: id.clone(),
            submission: token,
            branch,
            succeeded,
        });
        drop(inner);

        debug!(session_id = %id, submission = %token, branch = branch.as_str(), succeeded, "branch applied");
        Applied::Applied
    }
}
