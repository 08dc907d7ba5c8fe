//! RPC method handlers.

use std::sync::Arc;
use std::time::Instant;

use lumen_core::ids::SessionId;
use lumen_core::query::{Query, SearchMode};
use lumen_core::session::SubView;
use lumen_engine::{EngineError, QueryOrchestrator, SessionRegistry};
use lumen_telemetry::TelemetryGuard;

use crate::rpc::{self, RpcResponse};

/// Shared state available to all RPC handlers.
pub struct HandlerState {
    pub orchestrator: QueryOrchestrator,
    pub default_bound: usize,
    pub telemetry: Option<Arc<TelemetryGuard>>,
    started_at: Instant,
}

impl HandlerState {
    pub fn new(orchestrator: QueryOrchestrator, default_bound: usize) -> Self {
        Self {
            orchestrator,
            default_bound,
            telemetry: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_telemetry(mut self, telemetry: Arc<TelemetryGuard>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn registry(&self) -> &SessionRegistry {
        self.orchestrator.registry()
    }
}

/// Dispatch an RPC method to its handler.
pub async fn dispatch(
    state: &Arc<HandlerState>,
    method: &str,
    params: &serde_json::Value,
    id: Option<serde_json::Value>,
) -> RpcResponse {
    let params = rpc::normalize_params(params);

    match method {
        "search.submit" => search_submit(state, &params, id),

        "session.create" => session_create(state, id),
        "session.close" => session_close(state, &params, id),
        "session.activate" => session_activate(state, &params, id),
        "session.active" => session_active(state, id),
        "session.get" => session_get(state, &params, id),
        "session.list" => session_list(state, id),
        "session.preview" => session_preview(state, &params, id),
        "session.view" => session_view(state, &params, id),

        "system.ping" | "health" => health(state, id),
        "system.setLogLevel" => set_log_level(state, &params, id),

        _ => RpcResponse::method_not_found(id, method),
    }
}

fn engine_error(id: Option<serde_json::Value>, err: &EngineError) -> RpcResponse {
    match err {
        EngineError::SessionNotFound(_) => RpcResponse::error(id, rpc::SESSION_NOT_FOUND, err.to_string()),
        _ => RpcResponse::internal_error(id, err.to_string()),
    }
}

fn to_json<T: serde::Serialize>(id: Option<serde_json::Value>, value: &T) -> RpcResponse {
    match serde_json::to_value(value) {
        Ok(v) => RpcResponse::success(id, v),
        Err(e) => RpcResponse::internal_error(id, e.to_string()),
    }
}

/// `session_id` when given, else the active session.
fn target_session(state: &HandlerState, params: &serde_json::Value) -> SessionId {
    rpc::optional_str(params, "session_id")
        .map(SessionId::from_raw)
        .unwrap_or_else(|| state.registry().active_id())
}

// ── Search ──

fn search_submit(
    state: &Arc<HandlerState>,
    params: &serde_json::Value,
    id: Option<serde_json::Value>,
) -> RpcResponse {
    let text = match rpc::require_str(params, "query") {
        Ok(s) => s,
        Err(e) => return RpcResponse::invalid_params(id, e),
    };
    let mode = match rpc::optional_str(params, "mode").map(str::parse::<SearchMode>) {
        None => SearchMode::default(),
        Some(Ok(mode)) => mode,
        Some(Err(e)) => return RpcResponse::invalid_params(id, e),
    };
    let bound = rpc::optional_u64(params, "max_results")
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(state.default_bound);

    let session_id = target_session(state, params);
    let query = Query::new(text, mode).with_bound(bound);

    match state.orchestrator.submit(&session_id, query) {
        Ok(Some(handle)) => RpcResponse::success(
            id,
            serde_json::json!({
                "submitted": true,
                "session_id": session_id,
                "submission": handle.token,
            }),
        ),
        Ok(None) => RpcResponse::success(
            id,
            serde_json::json!({ "submitted": false, "session_id": session_id }),
        ),
        Err(e) => engine_error(id, &e),
    }
}

// ── Sessions ──

fn session_create(state: &Arc<HandlerState>, id: Option<serde_json::Value>) -> RpcResponse {
    let session_id = state.registry().create_session();
    match state.registry().read(&session_id) {
        Ok(session) => to_json(id, &session),
        Err(e) => engine_error(id, &e),
    }
}

fn session_close(
    state: &Arc<HandlerState>,
    params: &serde_json::Value,
    id: Option<serde_json::Value>,
) -> RpcResponse {
    let session_id = match rpc::require_str(params, "session_id") {
        Ok(s) => SessionId::from_raw(s),
        Err(e) => return RpcResponse::invalid_params(id, e),
    };
    match state.registry().close_session(&session_id) {
        Ok(()) => RpcResponse::success(
            id,
            serde_json::json!({
                "closed": true,
                "active_session_id": state.registry().active_id(),
            }),
        ),
        Err(e) => engine_error(id, &e),
    }
}

fn session_activate(
    state: &Arc<HandlerState>,
    params: &serde_json::Value,
    id: Option<serde_json::Value>,
) -> RpcResponse {
    let session_id = match rpc::require_str(params, "session_id") {
        Ok(s) => SessionId::from_raw(s),
        Err(e) => return RpcResponse::invalid_params(id, e),
    };
    match state.registry().set_active(&session_id) {
        Ok(()) => RpcResponse::success(id, serde_json::json!({ "active_session_id": session_id })),
        Err(e) => engine_error(id, &e),
    }
}

fn session_active(state: &Arc<HandlerState>, id: Option<serde_json::Value>) -> RpcResponse {
    to_json(id, &state.registry().active())
}

fn session_get(
    state: &Arc<HandlerState>,
    params: &serde_json::Value,
    id: Option<serde_json::Value>,
) -> RpcResponse {
    let session_id = match rpc::require_str(params, "session_id") {
        Ok(s) => SessionId::from_raw(s),
        Err(e) => return RpcResponse::invalid_params(id, e),
    };
    match state.registry().read(&session_id) {
        Ok(session) => to_json(id, &session),
        Err(e) => engine_error(id, &e),
    }
}

fn session_list(state: &Arc<HandlerState>, id: Option<serde_json::Value>) -> RpcResponse {
    let sessions = state.registry().list();
    match serde_json::to_value(&sessions) {
        Ok(list) => RpcResponse::success(id, serde_json::json!({ "sessions": list })),
        Err(e) => RpcResponse::internal_error(id, e.to_string()),
    }
}

fn session_preview(
    state: &Arc<HandlerState>,
    params: &serde_json::Value,
    id: Option<serde_json::Value>,
) -> RpcResponse {
    let session_id = target_session(state, params);
    let url = rpc::optional_str(params, "url")
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string);
    match state.registry().set_preview(&session_id, url) {
        Ok(()) => match state.registry().read(&session_id) {
            Ok(session) => to_json(id, &session),
            Err(e) => engine_error(id, &e),
        },
        Err(e) => engine_error(id, &e),
    }
}

fn session_view(
    state: &Arc<HandlerState>,
    params: &serde_json::Value,
    id: Option<serde_json::Value>,
) -> RpcResponse {
    let view: SubView = match params.get("sub_view").cloned().map(serde_json::from_value) {
        Some(Ok(view)) => view,
        Some(Err(e)) => return RpcResponse::invalid_params(id, format!("invalid sub_view: {e}")),
        None => return RpcResponse::invalid_params(id, "Missing required parameter: sub_view"),
    };
    let session_id = target_session(state, params);
    match state.registry().set_sub_view(&session_id, view) {
        Ok(()) => RpcResponse::success(id, serde_json::json!({ "sub_view": view })),
        Err(e) => engine_error(id, &e),
    }
}

// ── System ──

fn health(state: &Arc<HandlerState>, id: Option<serde_json::Value>) -> RpcResponse {
    RpcResponse::success(
        id,
        serde_json::json!({
            "status": "ok",
            "uptime_secs": state.started_at.elapsed().as_secs(),
            "sessions": state.registry().len(),
        }),
    )
}

fn set_log_level(
    state: &Arc<HandlerState>,
    params: &serde_json::Value,
    id: Option<serde_json::Value>,
) -> RpcResponse {
    let Some(telemetry) = &state.telemetry else {
        return RpcResponse::internal_error(id, "telemetry not initialized");
    };
    let module = match rpc::require_str(params, "module") {
        Ok(m) => m,
        Err(e) => return RpcResponse::invalid_params(id, e),
    };
    let level = match rpc::require_str(params, "level").map(str::parse::<tracing::Level>) {
        Ok(Ok(level)) => level,
        Ok(Err(_)) => return RpcResponse::invalid_params(id, "level must be trace|debug|info|warn|error"),
        Err(e) => return RpcResponse::invalid_params(id, e),
    };
    match telemetry.set_module_level(module, level) {
        Ok(()) => RpcResponse::success(
            id,
            serde_json::json!({ "module": module, "level": level.to_string().to_lowercase() }),
        ),
        Err(e) => RpcResponse::internal_error(id, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_engine::{OrchestratorConfig, PipelineConfig, ReflexivePipeline};
    use lumen_llm::{MockReasoner, MockResponse};
    use lumen_search::{web_hit, MockSearchProvider};
    use lumen_telemetry::{init_telemetry, TelemetryConfig};

    fn handler_state() -> HandlerState {
        let search = Arc::new(
            MockSearchProvider::new().with_web_hits(vec![web_hit("Rust", "https://rust-lang.org", "lang")]),
        );
        let reasoner = Arc::new(MockReasoner::with_handler(|_, _| MockResponse::text("answer")));
        let pipeline = ReflexivePipeline::new(reasoner, search.clone(), PipelineConfig::default());
        let orchestrator = QueryOrchestrator::new(
            SessionRegistry::new(64),
            search,
            Arc::new(pipeline),
            OrchestratorConfig::default(),
        );
        HandlerState::new(orchestrator, 6)
    }

    fn setup() -> Arc<HandlerState> {
        Arc::new(handler_state())
    }

    async fn call(state: &Arc<HandlerState>, method: &str, params: serde_json::Value) -> serde_json::Value {
        let resp = dispatch(state, method, &params, Some(serde_json::json!(1))).await;
        serde_json::to_value(&resp).unwrap()
    }

    #[tokio::test]
    async fn unknown_method() {
        let state = setup();
        let resp = call(&state, "foo.bar", serde_json::json!({})).await;
        assert_eq!(resp["success"], false);
        assert_eq!(resp["error"]["code"], "METHOD_NOT_FOUND");
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let state = setup();
        let resp = call(&state, "system.ping", serde_json::json!({})).await;
        assert_eq!(resp["result"]["status"], "ok");
        assert_eq!(resp["result"]["sessions"], 1);
    }

    #[tokio::test]
    async fn submit_then_read_session() {
        let state = setup();
        let resp = call(&state, "search.submit", serde_json::json!({"query": "rust", "mode": "web"})).await;
        assert_eq!(resp["result"]["submitted"], true);
        let session_id = resp["result"]["session_id"].as_str().unwrap().to_string();

        let mut events = state.registry().subscribe();
        let sid = SessionId::from_raw(session_id.clone());
        while state.registry().read(&sid).unwrap().is_loading() {
            let _ = events.recv().await;
        }

        let resp = call(&state, "session.get", serde_json::json!({"sessionId": session_id})).await;
        assert_eq!(resp["result"]["title"], "rust");
        assert_eq!(resp["result"]["web"]["status"], "succeeded");
        assert_eq!(resp["result"]["web"]["value"]["results"][0]["provenance"], "web");
        assert!(resp["result"]["web"]["value"]["latency_ms"].is_u64());
        assert_eq!(resp["result"]["ai"]["value"]["summary"], "answer");
    }

    #[tokio::test]
    async fn blank_submit_is_not_an_error() {
        let state = setup();
        let resp = call(&state, "search.submit", serde_json::json!({"query": "  "})).await;
        assert_eq!(resp["success"], true);
        assert_eq!(resp["result"]["submitted"], false);
    }

    #[tokio::test]
    async fn submit_rejects_bad_mode_and_unknown_session() {
        let state = setup();
        let resp = call(&state, "search.submit", serde_json::json!({"query": "q", "mode": "videos"})).await;
        assert_eq!(resp["error"]["code"], "INVALID_PARAMS");

        let resp = call(
            &state,
            "search.submit",
            serde_json::json!({"query": "q", "session_id": "sess_missing"}),
        )
        .await;
        assert_eq!(resp["error"]["code"], "SESSION_NOT_FOUND");
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let state = setup();
        let created = call(&state, "session.create", serde_json::json!({})).await;
        let new_id = created["result"]["id"].as_str().unwrap().to_string();

        let list = call(&state, "session.list", serde_json::json!({})).await;
        let sessions = list["result"]["sessions"].as_array().unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[1]["active"], true);

        let active = call(&state, "session.active", serde_json::json!({})).await;
        assert_eq!(active["result"]["id"], new_id.as_str());

        let first_id = sessions[0]["id"].as_str().unwrap().to_string();
        let resp = call(&state, "session.activate", serde_json::json!({"session_id": first_id})).await;
        assert_eq!(resp["result"]["active_session_id"], first_id.as_str());

        let resp = call(&state, "session.close", serde_json::json!({"session_id": new_id})).await;
        assert_eq!(resp["result"]["closed"], true);
        assert_eq!(resp["result"]["active_session_id"], first_id.as_str());

        let resp = call(&state, "session.close", serde_json::json!({"session_id": new_id})).await;
        assert_eq!(resp["error"]["code"], "SESSION_NOT_FOUND");
    }

    #[tokio::test]
    async fn preview_and_view() {
        let state = setup();
        let resp = call(&state, "session.preview", serde_json::json!({"url": "https://rust-lang.org"})).await;
        assert_eq!(resp["result"]["preview_url"], "https://rust-lang.org");

        let resp = call(&state, "session.preview", serde_json::json!({"url": null})).await;
        assert!(resp["result"]["preview_url"].is_null());

        let resp = call(&state, "session.view", serde_json::json!({"subView": "images"})).await;
        assert_eq!(resp["result"]["sub_view"], "images");

        let resp = call(&state, "session.view", serde_json::json!({"sub_view": "maps"})).await;
        assert_eq!(resp["error"]["code"], "INVALID_PARAMS");
    }

    #[tokio::test]
    async fn set_log_level_requires_telemetry() {
        let state = setup();
        let resp = call(
            &state,
            "system.setLogLevel",
            serde_json::json!({"module": "lumen_engine", "level": "debug"}),
        )
        .await;
        assert_eq!(resp["error"]["code"], "INTERNAL_ERROR");

        let guard = Arc::new(init_telemetry(TelemetryConfig::default()));
        let state = Arc::new(handler_state().with_telemetry(Arc::clone(&guard)));
        let resp = call(
            &state,
            "system.setLogLevel",
            serde_json::json!({"module": "lumen_engine", "level": "debug"}),
        )
        .await;
        assert_eq!(resp["result"]["level"], "debug");
        assert_eq!(guard.module_levels()[0].0, "lumen_engine");

        let resp = call(
            &state,
            "system.setLogLevel",
            serde_json::json!({"module": "lumen_engine", "level": "loud"}),
        )
        .await;
        assert_eq!(resp["error"]["code"], "INVALID_PARAMS");
    }
}
