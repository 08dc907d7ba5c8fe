//! Parsing of the critique pass output.
//!
//! The model is asked for a JSON object but frequently wraps it in a Markdown
//! code fence or surrounds it with prose. Anything that does not yield an
//! object is reported as `None` and the caller keeps the draft.

use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Critique {
    pub final_answer: String,
    pub key_takeaways: Vec<String>,
    pub followups: Vec<String>,
    pub refined_query: Option<String>,
}

/// Remove a surrounding ```` ``` ```` / ```` ```json ```` fence, if present.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn parse_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str(text) {
        return Some(map);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn string_list(value: Option<&Value>, max: usize) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(max)
        .map(str::to_string)
        .collect()
}

fn trimmed_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse critique output, bounding both lists.
pub fn parse_critique(raw: &str, max_takeaways: usize, max_followups: usize) -> Option<Critique> {
    let map = parse_object(strip_code_fences(raw))?;
    Some(Critique {
        final_answer: trimmed_string(map.get("final_answer")).unwrap_or_default(),
        key_takeaways: string_list(map.get("key_takeaways"), max_takeaways),
        followups: string_list(map.get("followups"), max_followups),
        refined_query: trimmed_string(map.get("refined_query")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json() {
        let c = parse_critique(
            r#"{"final_answer": "Paris is the capital of France.", "key_takeaways": ["Paris is the capital"], "followups": []}"#,
            5,
            4,
        )
        .unwrap();
        assert_eq!(c.final_answer, "Paris is the capital of France.");
        assert_eq!(c.key_takeaways, vec!["Paris is the capital"]);
        assert!(c.followups.is_empty());
        assert!(c.refined_query.is_none());
    }

    #[test]
    fn fenced_json() {
        let raw = "```json\n{\"final_answer\": \"ok\", \"refined_query\": \"capital city of France\"}\n```";
        let c = parse_critique(raw, 5, 4).unwrap();
        assert_eq!(c.final_answer, "ok");
        assert_eq!(c.refined_query.as_deref(), Some("capital city of France"));
    }

    #[test]
    fn json_inside_prose() {
        let raw = "Here you go:\n{\"final_answer\": \"ok\"}\nHope that helps.";
        assert_eq!(parse_critique(raw, 5, 4).unwrap().final_answer, "ok");
    }

    #[test]
    fn lists_are_bounded_and_cleaned() {
        let raw = r#"{"final_answer": "a",
            "key_takeaways": ["1", " ", "2", 3, "4", "5", "6", "7"],
            "followups": ["a?", "b?", "c?", "d?", "e?"]}"#;
        let c = parse_critique(raw, 5, 4).unwrap();
        assert_eq!(c.key_takeaways, vec!["1", "2", "4", "5", "6"]);
        assert_eq!(c.followups.len(), 4);
    }

    #[test]
    fn unparsable_is_none() {
        assert!(parse_critique("Paris is the capital.", 5, 4).is_none());
        assert!(parse_critique("[1, 2]", 5, 4).is_none());
        assert!(parse_critique("", 5, 4).is_none());
    }

    #[test]
    fn strip_fences_without_info_string() {
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }
}
