//! # lumen-settings
//!
//! Configuration with layered sources:
//! 1. **Compiled defaults**: [`LumenSettings::default()`]
//! 2. **User file**: `~/.lumen/settings.json` (or `$LUMEN_SETTINGS`), deep-merged
//! 3. **Environment variables**: `LUMEN_*` overrides (highest priority)

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<LumenSettings> = OnceLock::new();

/// Get the global settings instance, loading it on first access. Falls back
/// to compiled defaults if loading fails.
pub fn get_settings() -> &'static LumenSettings {
    SETTINGS.get_or_init(|| match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            LumenSettings::default()
        }
    })
}

/// Initialize the global settings with a specific value.
///
/// Returns the value back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: LumenSettings) -> std::result::Result<(), LumenSettings> {
    SETTINGS.set(settings)
}
