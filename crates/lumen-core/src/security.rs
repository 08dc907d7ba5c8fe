use secrecy::{ExposeSecret, SecretString};

/// Wraps an API key with secrecy protection (zeroized on drop, redacted in Debug).
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }

    /// Read a key from the environment; empty values count as unset.
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(Self::new)
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_is_redacted() {
        let key = ApiKey::new("hf_secret_123");
        let dbg = format!("{key:?}");
        assert!(!dbg.contains("hf_secret_123"));
        assert!(dbg.contains("REDACTED"));
        assert_eq!(key.expose(), "hf_secret_123");
    }

    #[test]
    fn missing_env_is_none() {
        assert!(ApiKey::from_env("LUMEN_TEST_DEFINITELY_UNSET_KEY").is_none());
    }
}
