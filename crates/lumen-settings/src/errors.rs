use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Parsed fine but failed `LumenSettings::validate`.
    #[error("invalid setting: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(SettingsError::Json(json).to_string().starts_with("settings file is not valid JSON"));

        let err = SettingsError::InvalidValue("pipeline.maxFollowups must be at least 1".into());
        assert_eq!(err.to_string(), "invalid setting: pipeline.maxFollowups must be at least 1");
    }

    #[test]
    fn unreadable_file_converts() {
        let err: SettingsError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, SettingsError::Io(_)));
    }
}
