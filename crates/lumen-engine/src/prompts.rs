//! Prompt text for the draft and critique passes.

use lumen_core::provider::ToolDefinition;
use lumen_core::results::SearchResult;

pub const SEARCH_TOOL_NAME: &str = "web_search";

const NO_EVIDENCE: &str = "(no web evidence available)";

/// The single tool offered to the model during the draft pass.
pub fn search_tool() -> ToolDefinition {
    ToolDefinition {
        name: SEARCH_TOOL_NAME.to_string(),
        description: "Search the web and return short text snippets relevant to the query."
            .to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            }
        }),
    }
}

/// Render evidence as a numbered list of snippets.
pub fn format_evidence(evidence: &[SearchResult]) -> String {
    if evidence.is_empty() {
        return NO_EVIDENCE.to_string();
    }
    evidence
        .iter()
        .enumerate()
        .map(|(i, r)| match &r.url {
            Some(url) => format!("{}. {} ({url})\n   {}", i + 1, r.title, r.snippet),
            None => format!("{}. {}\n   {}", i + 1, r.title, r.snippet),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn draft_prompt(query: &str, evidence: &[SearchResult], tool_available: bool) -> String {
    let tool_line = if tool_available {
        "If the evidence is insufficient you may call the web_search tool once."
    } else {
        "Answer with what you have; no further searches are possible."
    };
    format!(
        "You are a search assistant. Answer the user's query clearly and concisely, \
         using the web evidence where it is relevant. {tool_line}\n\n\
         User query: {query}\n\n\
         Web evidence:\n{}",
        format_evidence(evidence)
    )
}

pub fn critique_prompt(
    query: &str,
    draft: &str,
    max_takeaways: usize,
    max_followups: usize,
) -> String {
    format!(
        "You are reviewing a draft answer to a search query. Check it for errors \
         and unsupported claims, then produce an improved final answer. Also give \
         at most {max_takeaways} short key takeaways and at most {max_followups} \
         follow-up questions. If a better phrasing of the query exists, include it \
         as refined_query.\n\n\
         Respond only with JSON with keys: final_answer, key_takeaways, followups, \
         refined_query.\n\n\
         User query: {query}\n\n\
         Draft answer:\n{draft}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::results::Provenance;

    #[test]
    fn empty_evidence_placeholder() {
        assert_eq!(format_evidence(&[]), NO_EVIDENCE);
        assert!(draft_prompt("q", &[], true).contains(NO_EVIDENCE));
    }

    #[test]
    fn evidence_is_numbered() {
        let evidence = vec![
            SearchResult::new("Paris", Some("https://a".into()), "capital", Provenance::Web, None),
            SearchResult::new("France", None, "country", Provenance::Web, None),
        ];
        let text = format_evidence(&evidence);
        assert!(text.starts_with("1. Paris (https://a)"));
        assert!(text.contains("2. France\n   country"));
    }

    #[test]
    fn critique_prompt_names_keys_and_limits() {
        let p = critique_prompt("capital of France", "Paris.", 5, 4);
        assert!(p.contains("final_answer"));
        assert!(p.contains("at most 5"));
        assert!(p.contains("at most 4"));
        assert!(p.contains("Paris."));
    }

    #[test]
    fn tool_schema_requires_query() {
        let tool = search_tool();
        assert_eq!(tool.name, SEARCH_TOOL_NAME);
        assert_eq!(tool.parameters["required"][0], "query");
    }
}
