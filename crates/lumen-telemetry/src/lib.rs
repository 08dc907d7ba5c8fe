use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

/// Output format for the stdout log layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// Per-module level overrides (e.g. "lumen_engine" => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            format: LogFormat::Json,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to reload log filter: {0}")]
    Reload(String),
}

/// Keeps the live filter handle so levels can be changed at runtime.
pub struct TelemetryGuard {
    base_level: Level,
    module_levels: Arc<RwLock<Vec<(String, Level)>>>,
    handle: Option<reload::Handle<EnvFilter, Registry>>,
}

impl TelemetryGuard {
    /// Change the log level for a specific module at runtime.
    pub fn set_module_level(&self, module: &str, level: Level) -> Result<(), TelemetryError> {
        let filter_str = {
            let mut levels = self.module_levels.write();
            if let Some(entry) = levels.iter_mut().find(|(m, _)| m == module) {
                entry.1 = level;
            } else {
                levels.push((module.to_string(), level));
            }
            filter_directives(self.base_level, &levels)
        };

        if let Some(handle) = &self.handle {
            handle
                .reload(EnvFilter::new(filter_str))
                .map_err(|e| TelemetryError::Reload(e.to_string()))?;
        }
        Ok(())
    }

    /// Get current per-module log level overrides.
    pub fn module_levels(&self) -> Vec<(String, Level)> {
        self.module_levels.read().clone()
    }
}

/// Initialize the telemetry subsystem. Call once at startup; later calls
/// leave the first subscriber in place.
pub fn init_telemetry(config: TelemetryConfig) -> TelemetryGuard {
    let filter_str = filter_directives(config.log_level, &config.module_levels);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));
    let (filter_layer, handle) = reload::Layer::new(env_filter);

    let json_layer = (config.format == LogFormat::Json).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
    });
    let pretty_layer = (config.format == LogFormat::Pretty)
        .then(|| tracing_subscriber::fmt::layer().with_target(true));

    let installed = tracing_subscriber::registry()
        .with(filter_layer)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()
        .is_ok();

    if !installed {
        tracing::debug!("lumen-telemetry: global subscriber already installed");
    }

    TelemetryGuard {
        base_level: config.log_level,
        module_levels: Arc::new(RwLock::new(config.module_levels)),
        handle: installed.then_some(handle),
    }
}

/// Build an `EnvFilter` directive string from a base level and overrides.
pub fn filter_directives(base: Level, modules: &[(String, Level)]) -> String {
    let mut filter_str = base.to_string().to_lowercase();
    for (module, level) in modules {
        filter_str.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
    }
    filter_str
}
