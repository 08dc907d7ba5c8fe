use serde::{Deserialize, Serialize};

pub const DEFAULT_RESULT_BOUND: usize = 6;
pub const MAX_RESULT_BOUND: usize = 50;

/// Which source the consumer wants emphasized. Never changes the shape of
/// what a submission produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    All,
    Web,
    Ai,
    Insights,
}

impl SearchMode {
    /// Whether the reasoning draft should be grounded on web snippets.
    pub fn wants_evidence(self) -> bool {
        !matches!(self, Self::Ai)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Web => "web",
            Self::Ai => "ai",
            Self::Insights => "insights",
        }
    }
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "web" => Ok(Self::Web),
            "ai" => Ok(Self::Ai),
            "insights" => Ok(Self::Insights),
            other => Err(format!("unknown search mode: {other}")),
        }
    }
}

/// One user query. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    text: String,
    mode: SearchMode,
    bound: usize,
}

impl Query {
    pub fn new(text: impl Into<String>, mode: SearchMode) -> Self {
        Self {
            text: text.into(),
            mode,
            bound: DEFAULT_RESULT_BOUND,
        }
    }

    /// Override the result-count bound, clamped to `1..=MAX_RESULT_BOUND`.
    pub fn with_bound(mut self, bound: usize) -> Self {
        self.bound = bound.clamp(1, MAX_RESULT_BOUND);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn text_trimmed(&self) -> &str {
        self.text.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.text_trimmed().is_empty()
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn bound(&self) -> usize {
        self.bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_detection_trims() {
        assert!(Query::new("", SearchMode::All).is_blank());
        assert!(Query::new(" \t\n", SearchMode::All).is_blank());
        assert!(!Query::new("  rust  ", SearchMode::All).is_blank());
        assert_eq!(Query::new("  rust  ", SearchMode::All).text_trimmed(), "rust");
    }

    #[test]
    fn bound_is_clamped() {
        assert_eq!(Query::new("q", SearchMode::All).bound(), DEFAULT_RESULT_BOUND);
        assert_eq!(Query::new("q", SearchMode::All).with_bound(0).bound(), 1);
        assert_eq!(Query::new("q", SearchMode::All).with_bound(500).bound(), MAX_RESULT_BOUND);
    }

    #[test]
    fn mode_parsing_and_evidence() {
        assert_eq!("Insights".parse::<SearchMode>().unwrap(), SearchMode::Insights);
        assert!("images".parse::<SearchMode>().is_err());
        assert!(SearchMode::All.wants_evidence());
        assert!(SearchMode::Web.wants_evidence());
        assert!(SearchMode::Insights.wants_evidence());
        assert!(!SearchMode::Ai.wants_evidence());
    }

    #[test]
    fn mode_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&SearchMode::Insights).unwrap(), r#""insights""#);
        let parsed: SearchMode = serde_json::from_str(r#""ai""#).unwrap();
        assert_eq!(parsed, SearchMode::Ai);
    }
}
