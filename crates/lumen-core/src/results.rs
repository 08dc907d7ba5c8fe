use serde::{Deserialize, Serialize};

use crate::provider::{ImageHit, WebHit};

/// Longest snippet kept on a result, in characters.
pub const MAX_SNIPPET_CHARS: usize = 500;

/// Where a result came from. Fixed when the result is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    Web,
    AiDerived,
    Fused,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub snippet: String,
    provenance: Provenance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl SearchResult {
    pub fn new(
        title: impl Into<String>,
        url: Option<String>,
        snippet: &str,
        provenance: Provenance,
        score: Option<f64>,
    ) -> Self {
        Self {
            title: title.into(),
            url,
            snippet: truncate_chars(snippet, MAX_SNIPPET_CHARS),
            provenance,
            score,
        }
    }

    /// Build a `web`-tagged result from a provider hit.
    pub fn from_web_hit(hit: WebHit) -> Self {
        let title = if hit.title.trim().is_empty() {
            hit.url.clone().unwrap_or_else(|| "Result".to_string())
        } else {
            hit.title
        };
        Self::new(title, hit.url, &hit.snippet, Provenance::Web, hit.score)
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResult {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    provenance: Provenance,
}

impl ImageResult {
    /// Build a `web`-tagged image from a provider hit. Hits without any usable
    /// URL (neither full image nor thumbnail) yield `None`.
    pub fn from_image_hit(hit: ImageHit) -> Option<Self> {
        let url = non_empty(Some(hit.url)).or_else(|| non_empty(hit.thumbnail.clone()))?;
        Some(Self {
            url,
            thumbnail: non_empty(hit.thumbnail),
            title: non_empty(hit.title),
            provenance: Provenance::Web,
        })
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }
}

/// Final output of the reflexive pipeline for one submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReflexiveAnswer {
    pub refined_query: String,
    pub summary: String,
    pub key_takeaways: Vec<String>,
    pub followup_questions: Vec<String>,
    pub latency_ms: u64,
    /// Web snippets the draft was grounded on.
    #[serde(default)]
    pub evidence: Vec<SearchResult>,
}

/// A search branch's hits together with how long the lookup took.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BranchResults<T> {
    pub results: Vec<T>,
    pub latency_ms: u64,
}

impl<T> BranchResults<T> {
    pub fn new(results: Vec<T>, latency_ms: u64) -> Self {
        Self { results, latency_ms }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_hit_gets_web_provenance_and_truncated_snippet() {
        let hit = WebHit {
            title: "Rust".into(),
            url: Some("https://rust-lang.org".into()),
            snippet: "é".repeat(600),
            score: Some(0.5),
        };
        let result = SearchResult::from_web_hit(hit);
        assert_eq!(result.provenance(), Provenance::Web);
        assert_eq!(result.snippet.chars().count(), MAX_SNIPPET_CHARS);
        assert_eq!(result.score, Some(0.5));
    }

    #[test]
    fn web_hit_title_falls_back_to_url_then_placeholder() {
        let with_url = SearchResult::from_web_hit(WebHit {
            title: " ".into(),
            url: Some("https://example.com".into()),
            snippet: "s".into(),
            score: None,
        });
        assert_eq!(with_url.title, "https://example.com");

        let bare = SearchResult::from_web_hit(WebHit {
            title: String::new(),
            url: None,
            snippet: "s".into(),
            score: None,
        });
        assert_eq!(bare.title, "Result");
    }

    #[test]
    fn image_hit_falls_back_to_thumbnail() {
        let img = ImageResult::from_image_hit(ImageHit {
            title: Some("Eiffel".into()),
            url: String::new(),
            thumbnail: Some("https://t/1.jpg".into()),
        })
        .unwrap();
        assert_eq!(img.url, "https://t/1.jpg");
        assert_eq!(img.provenance(), Provenance::Web);

        let none = ImageResult::from_image_hit(ImageHit {
            title: None,
            url: String::new(),
            thumbnail: None,
        });
        assert!(none.is_none());
    }

    #[test]
    fn provenance_serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&Provenance::AiDerived).unwrap(), r#""ai-derived""#);
        assert_eq!(serde_json::to_string(&Provenance::Fused).unwrap(), r#""fused""#);
    }

    #[test]
    fn truncate_short_string_untouched() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
    }

    #[test]
    fn branch_results_serialize_with_latency() {
        let image = ImageResult::from_image_hit(ImageHit {
            title: None,
            url: "https://i/1.png".into(),
            thumbnail: None,
        })
        .unwrap();
        let payload = BranchResults::new(vec![image], 42);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["latency_ms"], 42);
        assert_eq!(json["results"][0]["url"], "https://i/1.png");
        assert_eq!(payload.len(), 1);
        assert!(BranchResults::<SearchResult>::new(Vec::new(), 0).is_empty());
    }
}
