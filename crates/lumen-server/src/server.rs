use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use lumen_core::events::SessionEvent;

use crate::handlers::{self, HandlerState};
use crate::rpc::{RpcRequest, RpcResponse};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Server configuration.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Per-connection outbound queue for RPC responses.
    pub max_send_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_send_queue: 256,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub handler_state: Arc<HandlerState>,
    pub max_send_queue: usize,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/rpc", post(rpc_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve. Port 0 picks a free port; the bound one is on the handle.
pub async fn start(
    config: ServerConfig,
    handler_state: Arc<HandlerState>,
) -> Result<ServerHandle, std::io::Error> {
    let app_state = AppState {
        handler_state,
        max_send_queue: config.max_send_queue,
    };

    let router = build_router(app_state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(host = %config.host, port = local_addr.port(), "Lumen server started");

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "server exited");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        server,
    })
}

/// Handle returned by `start()`; owns the serving task.
pub struct ServerHandle {
    pub port: u16,
    server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Run until the server task ends.
    pub async fn wait(self) {
        if let Err(e) = self.server.await {
            tracing::error!(error = %e, "server task failed");
        }
    }

    pub fn abort(&self) {
        self.server.abort();
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// One request per HTTP call.
async fn rpc_handler(State(state): State<AppState>, body: String) -> Json<RpcResponse> {
    Json(handle_raw(&state.handler_state, &body).await)
}

async fn handle_raw(state: &Arc<HandlerState>, raw: &str) -> RpcResponse {
    let request: RpcRequest = match serde_json::from_str(raw) {
        Ok(req) => req,
        Err(_) => return RpcResponse::parse_error(),
    };
    let params = request.params.unwrap_or(serde_json::json!({}));
    tracing::debug!(method = %request.method, "rpc request");
    handlers::dispatch(state, &request.method, &params, request.id).await
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Serve one WebSocket client: RPC requests in, responses and session events out.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (resp_tx, mut resp_rx) = mpsc::channel::<String>(state.max_send_queue.max(1));
    let mut events = state.handler_state.registry().subscribe();
    tracing::info!("WebSocket client connected");

    // Writer: responses, forwarded events, heartbeat pings.
    let writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        let _ = ping_interval.tick().await;

        loop {
            let outbound = tokio::select! {
                msg = resp_rx.recv() => match msg {
                    Some(text) => WsMessage::Text(text.into()),
                    None => break,
                },
                event = events.recv() => match event {
                    Ok(event) => match serialize_event(&event) {
                        Some(text) => WsMessage::Text(text.into()),
                        None => continue,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "WebSocket client lagged, dropped events");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = ping_interval.tick() => WsMessage::Ping(Vec::new().into()),
            };
            if ws_tx.send(outbound).await.is_err() {
                break;
            }
        }
    });

    // Reader: dispatch each text frame as an RPC request.
    let handler_state = Arc::clone(&state.handler_state);
    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                WsMessage::Text(text) => {
                    let response = handle_raw(&handler_state, text.as_str()).await;
                    if let Ok(json) = serde_json::to_string(&response) {
                        if resp_tx.try_send(json).is_err() {
                            tracing::warn!("send queue full, dropping response");
                        }
                    }
                }
                WsMessage::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = writer => {},
        _ = reader => {},
    }
    tracing::info!("WebSocket client disconnected");
}

/// Event frames carry `"type"` plus the event fields; RPC responses never do.
pub fn serialize_event(event: &SessionEvent) -> Option<String> {
    serde_json::to_string(event).ok()
}
