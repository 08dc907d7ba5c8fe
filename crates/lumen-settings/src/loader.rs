//! Reads `settings.json`, overlays it on the compiled defaults and then
//! applies `LUMEN_*` environment overrides.
//!
//! The overlay walks objects key by key. Anything that is not an object on
//! both sides (arrays, scalars) is taken from the file as a whole; `null` in
//! the file leaves the default in place.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::LumenSettings;

/// `$LUMEN_SETTINGS` if set, otherwise `~/.lumen/settings.json`.
pub fn settings_path() -> PathBuf {
    if let Some(explicit) = env_string("LUMEN_SETTINGS") {
        return PathBuf::from(explicit);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".lumen").join("settings.json")
}

pub fn load_settings() -> Result<LumenSettings> {
    load_settings_from_path(&settings_path())
}

/// No file at `path` means defaults plus environment. A file that does not
/// parse, or values that fail validation, are errors rather than silently
/// ignored.
pub fn load_settings_from_path(path: &Path) -> Result<LumenSettings> {
    let mut merged = serde_json::to_value(LumenSettings::default())?;

    if path.exists() {
        debug!(?path, "reading settings file");
        let overlay: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        merged = deep_merge(merged, overlay);
    } else {
        debug!(?path, "no settings file, using defaults");
    }

    let mut settings: LumenSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Overlay `overlay` onto `base`.
pub fn deep_merge(mut base: Value, overlay: Value) -> Value {
    overlay_into(&mut base, overlay);
    base
}

fn overlay_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map.into_iter().filter(|(_, v)| !v.is_null()) {
                match base_map.get_mut(&key) {
                    Some(existing) => overlay_into(existing, value),
                    None => {
                        let _ = base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Out-of-range or unparsable numbers are logged and skipped.
pub fn apply_env_overrides(settings: &mut LumenSettings) {
    if let Some(v) = env_string("LUMEN_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env_in_range("LUMEN_PORT", 1..=u16::MAX) {
        settings.server.port = v;
    }

    if let Some(v) = env_in_range("LUMEN_SEARCH_TIMEOUT_MS", 100..=600_000) {
        settings.search.timeout_ms = v;
    }
    if let Some(v) = env_string("LUMEN_SEARCH_KEY_ENV") {
        settings.search.api_key_env = v;
    }

    if let Some(v) = env_string("LUMEN_REASONING_URL") {
        settings.reasoning.base_url = v;
    }
    if let Some(v) = env_string("LUMEN_REASONING_MODEL") {
        settings.reasoning.model = v;
    }
    if let Some(v) = env_in_range("LUMEN_REASONING_TIMEOUT_MS", 100..=600_000) {
        settings.reasoning.timeout_ms = v;
    }

    if let Some(v) = env_in_range("LUMEN_EVIDENCE_SNIPPETS", 1..=20) {
        settings.pipeline.evidence_snippets = v;
    }

    if let Some(v) = env_string("LUMEN_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env_string("LUMEN_LOG_FORMAT") {
        settings.logging.format = v;
    }
}

/// `Some` only when `raw` parses and lands inside `range`.
pub fn parse_in_range<T>(raw: &str, range: RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    raw.trim().parse().ok().filter(|n| range.contains(n))
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_in_range<T>(name: &str, range: RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    let raw = std::env::var(name).ok()?;
    let parsed = parse_in_range(&raw, range);
    if parsed.is_none() {
        tracing::warn!(key = name, value = %raw, "ignoring out-of-range env override");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lumen-settings-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn overlay_keeps_sibling_defaults() {
        let defaults = serde_json::json!({
            "search": {"defaultBound": 6, "timeoutMs": 15000},
            "logging": {"level": "info"}
        });
        let file = serde_json::json!({"search": {"timeoutMs": 4000}, "extra": true});
        let merged = deep_merge(defaults, file);
        assert_eq!(merged["search"]["timeoutMs"], 4000);
        assert_eq!(merged["search"]["defaultBound"], 6);
        assert_eq!(merged["logging"]["level"], "info");
        assert_eq!(merged["extra"], true);
    }

    #[test]
    fn overlay_swaps_lists_and_skips_nulls() {
        let defaults = serde_json::json!({"modules": ["engine", "server"], "model": "qwen"});
        let file = serde_json::json!({"modules": ["engine"], "model": null});
        let merged = deep_merge(defaults, file);
        assert_eq!(merged["modules"], serde_json::json!(["engine"]));
        assert_eq!(merged["model"], "qwen");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("lumen-settings-does-not-exist/settings.json");
        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.pipeline.evidence_snippets, 5);
        assert_eq!(settings.search.api_key_env, "BRAVE_SEARCH_API_KEY");
    }

    #[test]
    fn file_values_override_defaults() {
        let path = temp_file(
            "override",
            r#"{"reasoning": {"model": "local-model", "timeoutMs": 5000}, "pipeline": {"maxTakeaways": 3}}"#,
        );
        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.reasoning.model, "local-model");
        assert_eq!(settings.reasoning.timeout_ms, 5000);
        assert_eq!(settings.reasoning.api_key_env, "HF_TOKEN");
        assert_eq!(settings.pipeline.max_takeaways, 3);
        assert_eq!(settings.pipeline.max_followups, 4);
    }

    #[test]
    fn invalid_json_is_error() {
        let path = temp_file("invalid", "{not json");
        assert!(matches!(load_settings_from_path(&path), Err(SettingsError::Json(_))));
    }

    #[test]
    fn invalid_value_is_error() {
        let path = temp_file("zero", r#"{"pipeline": {"evidenceSnippets": 0}}"#);
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    #[test]
    fn env_numbers_must_fit_their_range() {
        assert_eq!(parse_in_range::<u16>("8080", 1..=u16::MAX), Some(8080));
        assert_eq!(parse_in_range::<u16>("0", 1..=u16::MAX), None);
        assert_eq!(parse_in_range::<u64>(" 250 ", 100..=600_000), Some(250));
        assert_eq!(parse_in_range::<u64>("fast", 100..=600_000), None);
        assert_eq!(parse_in_range::<usize>("21", 1..=20), None);
    }
}
