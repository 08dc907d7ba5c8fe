//! Per-tab view model.
//!
//! A session holds three independently-owned outcome slots. A slot is `None`
//! until the first submission, `Some(Pending)` while its branch is in flight,
//! then `Succeeded` or `Failed`. Slots are only written through the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::GatewayError;
use crate::ids::SessionId;
use crate::query::Query;
use crate::results::{truncate_chars, BranchResults, ImageResult, ReflexiveAnswer, SearchResult};

pub const DEFAULT_TITLE: &str = "New tab";
const MAX_TITLE_CHARS: usize = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchKind {
    Web,
    Images,
    Ai,
}

impl BranchKind {
    pub const ALL: [BranchKind; 3] = [BranchKind::Web, BranchKind::Images, BranchKind::Ai];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Images => "images",
            Self::Ai => "ai",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Provider,
    Upstream,
    Timeout,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl BranchFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failure of a search call. Timeouts keep their own kind.
    pub fn from_provider(err: &GatewayError) -> Self {
        if err.is_timeout() {
            Self::new(FailureKind::Timeout, err.to_string())
        } else {
            Self::new(FailureKind::Provider, err.to_string())
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Pending,
    Succeeded(T),
    Failed(BranchFailure),
}

impl<T> Outcome<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn succeeded(&self) -> Option<&T> {
        match self {
            Self::Succeeded(v) => Some(v),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&BranchFailure> {
        match self {
            Self::Failed(f) => Some(f),
            _ => None,
        }
    }
}

/// Which region of the tab the consumer is looking at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubView {
    #[default]
    All,
    Web,
    Images,
    Ai,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub id: SessionId,
    pub title: String,
    pub sub_view: SubView,
    pub query: Option<Query>,
    pub web: Option<Outcome<BranchResults<SearchResult>>>,
    pub images: Option<Outcome<BranchResults<ImageResult>>>,
    pub ai: Option<Outcome<ReflexiveAnswer>>,
    /// When set, the consumer shows this page instead of the result list.
    pub preview_url: Option<String>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            title: DEFAULT_TITLE.to_string(),
            sub_view: SubView::default(),
            query: None,
            web: None,
            images: None,
            ai: None,
            preview_url: None,
            last_error: None,
            created_at: Utc::now(),
        }
    }

    /// Put every slot back to pending for a fresh submission.
    pub fn reset_for(&mut self, query: &Query) {
        self.title = truncate_chars(query.text_trimmed(), MAX_TITLE_CHARS);
        self.query = Some(query.clone());
        self.web = Some(Outcome::Pending);
        self.images = Some(Outcome::Pending);
        self.ai = Some(Outcome::Pending);
        self.preview_url = None;
        self.last_error = None;
    }

    pub fn is_loading(&self) -> bool {
        self.web.as_ref().is_some_and(Outcome::is_pending)
            || self.images.as_ref().is_some_and(Outcome::is_pending)
            || self.ai.as_ref().is_some_and(Outcome::is_pending)
    }

    pub fn all_failed(&self) -> bool {
        self.web.as_ref().is_some_and(Outcome::is_failed)
            && self.images.as_ref().is_some_and(Outcome::is_failed)
            && self.ai.as_ref().is_some_and(Outcome::is_failed)
    }

    pub fn shows_preview(&self) -> bool {
        self.preview_url.is_some()
    }

    pub fn summary(&self, active: bool) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            active,
            loading: self.is_loading(),
        }
    }
}

/// Compact listing entry for a tab strip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub active: bool,
    pub loading: bool,
}
