use serde::{Deserialize, Serialize};

use crate::ids::{SessionId, SubmissionToken};
use crate::session::BranchKind;

/// Session lifecycle events published by the registry after each mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    #[serde(rename = "session_created")]
    SessionCreated { session_id: SessionId },

    #[serde(rename = "session_closed")]
    SessionClosed { session_id: SessionId },

    #[serde(rename = "active_changed")]
    ActiveChanged { session_id: SessionId },

    /// Slots were reset to pending; branches are about to launch.
    #[serde(rename = "query_started")]
    QueryStarted {
        session_id: SessionId,
        submission: SubmissionToken,
        query: String,
    },

    #[serde(rename = "branch_updated")]
    BranchUpdated {
        session_id: SessionId,
        submission: SubmissionToken,
        branch: BranchKind,
        succeeded: bool,
    },

    /// Preview URL, sub-view or title changed.
    #[serde(rename = "view_changed")]
    ViewChanged { session_id: SessionId },
}

impl SessionEvent {
    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::SessionCreated { session_id }
            | Self::SessionClosed { session_id }
            | Self::ActiveChanged { session_id }
            | Self::QueryStarted { session_id, .. }
            | Self::BranchUpdated { session_id, .. }
            | Self::ViewChanged { session_id } => session_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionCreated { .. } => "session_created",
            Self::SessionClosed { .. } => "session_closed",
            Self::ActiveChanged { .. } => "active_changed",
            Self::QueryStarted { .. } => "query_started",
            Self::BranchUpdated { .. } => "branch_updated",
            Self::ViewChanged { .. } => "view_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_type_matches_event_type() {
        let events = vec![
            SessionEvent::SessionCreated { session_id: SessionId::new() },
            SessionEvent::QueryStarted {
                session_id: SessionId::new(),
                submission: SubmissionToken::new(1),
                query: "rust".into(),
            },
            SessionEvent::BranchUpdated {
                session_id: SessionId::new(),
                submission: SubmissionToken::new(1),
                branch: BranchKind::Images,
                succeeded: false,
            },
        ];
        for event in &events {
            let json = serde_json::to_value(event).unwrap();
            assert_eq!(json["type"], event.event_type());
        }
    }

    #[test]
    fn session_id_accessor() {
        let id = SessionId::new();
        let event = SessionEvent::ViewChanged { session_id: id.clone() };
        assert_eq!(event.session_id(), &id);
    }
}
