use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use weaver_core::completion::Completion;
use weaver_core::{ComposeContext, Composer, Envelope};

/// System prompt for the single-turn chat endpoint.
pub const CHAT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant for this website.";

/// Chat reply when the completion service fails.
pub const CHAT_APOLOGY: &str = "Sorry, the assistant is unavailable. Please try again later.";

const COMPOSE_DEMO: &str = "(demo GET) POST { user_input: \"...\" } to /api/compose";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    composer: Composer,
    completion: Arc<dyn Completion>,
}

impl AppState {
    pub fn new(composer: Composer, completion: Arc<dyn Completion>) -> Self {
        Self {
            composer,
            completion,
        }
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ComposeRequest {
    #[serde(default)]
    pub user_input: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub context: ComposeContext,
}

impl ComposeRequest {
    /// `user_input` if it has text, else `message`.
    fn text(&self) -> &str {
        self.user_input
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| self.message.as_deref().map(str::trim))
            .unwrap_or("")
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/compose", get(compose_demo).post(compose))
        .route("/api/chat", get(chat_demo).post(chat))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("weaver serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("weaver serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn compose_demo() -> Json<Envelope> {
    Json(Envelope::markdown(COMPOSE_DEMO))
}

/// Compose endpoint. Always answers 200 with an envelope; a body that is
/// not a JSON object is treated as an empty request.
async fn compose(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let request_id = Uuid::new_v4();
    let request: ComposeRequest = serde_json::from_slice(&body).unwrap_or_else(|e| {
        tracing::debug!(%request_id, error = %e, "compose body is not a request object");
        ComposeRequest::default()
    });

    let text = request.text();
    tracing::info!(
        %request_id,
        chars = text.len(),
        has_last_table = request.context.last_table.is_some(),
        "compose request"
    );
    let envelope = state.composer.compose(text, &request.context).await;
    tracing::info!(%request_id, mode = ?envelope.mode, "compose response");

    ([("x-request-id", request_id.to_string())], Json(envelope))
}

async fn chat_demo(Query(query): Query<ChatQuery>) -> Json<ChatResponse> {
    let q = query.q.as_deref().map(str::trim).unwrap_or("");
    let shown = if q.is_empty() { "Send a POST to /api/chat" } else { q };
    Json(ChatResponse {
        reply: format!("(demo GET) You said: {shown}"),
    })
}

async fn chat(State(state): State<AppState>, body: Bytes) -> Json<ChatResponse> {
    let request_id = Uuid::new_v4();
    let request: ChatRequest = serde_json::from_slice(&body).unwrap_or_default();
    let message = request.message.as_deref().map(str::trim).unwrap_or("");
    if message.is_empty() {
        return Json(ChatResponse {
            reply: "Please enter a message.".to_string(),
        });
    }

    let reply = match state.completion.generate(message, CHAT_SYSTEM_PROMPT).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(%request_id, error = %e, "chat completion failed");
            CHAT_APOLOGY.to_string()
        }
    };
    Json(ChatResponse { reply })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
