//! # lumen
//!
//! Lumen search binary: wires settings, telemetry, providers and the engine,
//! then either serves the RPC/WebSocket API or answers one query.

#![deny(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use lumen_core::query::{Query, SearchMode};
use lumen_core::security::ApiKey;
use lumen_engine::{
    OrchestratorConfig, PipelineConfig, QueryOrchestrator, ReflexivePipeline, SessionRegistry,
};
use lumen_llm::{OpenAiCompatClient, OpenAiConfig};
use lumen_search::BraveSearchProvider;
use lumen_server::{HandlerState, ServerConfig};
use lumen_settings::LumenSettings;
use lumen_telemetry::{init_telemetry, LogFormat, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "lumen", about = "Multi-source search with a reflexive answer pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the RPC and WebSocket API.
    Serve {
        /// Host to bind (overrides settings).
        #[arg(long)]
        host: Option<String>,

        /// Port to bind, 0 for auto-assign (overrides settings).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one query and print the finished session as JSON.
    Ask {
        query: String,

        /// all, web, ai or insights.
        #[arg(long, default_value = "all")]
        mode: SearchMode,

        /// Maximum web and image results.
        #[arg(long)]
        max_results: Option<usize>,
    },
}

fn telemetry_config(settings: &LumenSettings) -> TelemetryConfig {
    TelemetryConfig {
        log_level: settings.logging.level.parse().unwrap_or(tracing::Level::INFO),
        module_levels: Vec::new(),
        format: settings.logging.format.parse().unwrap_or(LogFormat::Json),
    }
}

fn build_orchestrator(settings: &LumenSettings) -> QueryOrchestrator {
    let search_timeout = Duration::from_millis(settings.search.timeout_ms);

    let search_key = ApiKey::from_env(&settings.search.api_key_env);
    if search_key.is_none() {
        tracing::warn!(env = %settings.search.api_key_env, "search API key not set; web and image branches will fail");
    }
    let search = Arc::new(BraveSearchProvider::new(search_key, search_timeout));

    let reasoning_key = ApiKey::from_env(&settings.reasoning.api_key_env);
    if reasoning_key.is_none() {
        tracing::warn!(env = %settings.reasoning.api_key_env, "reasoning token not set; AI branch will fail");
    }
    let reasoner = Arc::new(OpenAiCompatClient::new(OpenAiConfig {
        base_url: settings.reasoning.base_url.clone(),
        model: settings.reasoning.model.clone(),
        api_key: reasoning_key,
        temperature: settings.reasoning.temperature,
    }));

    let pipeline = ReflexivePipeline::new(
        reasoner,
        search.clone(),
        PipelineConfig {
            evidence_snippets: settings.pipeline.evidence_snippets,
            max_takeaways: settings.pipeline.max_takeaways,
            max_followups: settings.pipeline.max_followups,
            search_timeout,
            call_timeout: Duration::from_millis(settings.reasoning.timeout_ms),
        },
    );

    QueryOrchestrator::new(
        SessionRegistry::new(settings.server.event_buffer),
        search,
        Arc::new(pipeline),
        OrchestratorConfig {
            search_timeout,
            default_bound: settings.search.default_bound,
        },
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = lumen_settings::load_settings().context("failed to load settings")?;
    let _ = lumen_settings::init_settings(loaded);
    let settings = lumen_settings::get_settings();
    let telemetry = Arc::new(init_telemetry(telemetry_config(settings)));
    let orchestrator = build_orchestrator(settings);

    match cli.command {
        Command::Serve { host, port } => {
            let config = ServerConfig {
                host: host.unwrap_or_else(|| settings.server.host.clone()),
                port: port.unwrap_or(settings.server.port),
                ..Default::default()
            };
            let state = Arc::new(
                HandlerState::new(orchestrator, settings.search.default_bound)
                    .with_telemetry(telemetry),
            );
            let handle = lumen_server::start(config, state)
                .await
                .context("failed to start server")?;
            tracing::info!(port = handle.port, "Lumen ready");

            tokio::select! {
                () = handle.wait() => {}
                res = tokio::signal::ctrl_c() => {
                    res.context("failed to listen for ctrl+c")?;
                    tracing::info!("Shutting down");
                }
            }
        }
        Command::Ask {
            query,
            mode,
            max_results,
        } => {
            let session_id = orchestrator.registry().active_id();
            let query = Query::new(query, mode)
                .with_bound(max_results.unwrap_or(settings.search.default_bound));
            match orchestrator.submit(&session_id, query)? {
                Some(handle) => handle.join().await,
                None => anyhow::bail!("query is empty"),
            }
            let state = orchestrator.registry().read(&session_id)?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
    }

    Ok(())
}
