use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;

use crate::cache::SnapshotCache;
use crate::chat::{ChatBackend, DynChatBackend};
use crate::query;
use crate::snapshot::Snapshot;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<SnapshotCache>,
    pub chat: DynChatBackend,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/news", get(get_news))
        .route("/api/refresh", post(refresh_news))
        .route("/api/status", get(get_status))
        .route("/api/chat", post(chat))
        .route("/api/events", get(events))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct NewsResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Arc<Snapshot>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl NewsResponse {
    fn ok(data: Arc<Snapshot>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Current snapshot under the quick TTL. Only a cold start with no prior
/// successful computation reports unavailable.
async fn get_news(State(state): State<AppState>) -> impl IntoResponse {
    match state.cache.get_quick().await {
        Ok(snap) => (StatusCode::OK, Json(NewsResponse::ok(snap))),
        Err(e) => {
            tracing::warn!(error = ?e, "news read failed with no cached snapshot");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(NewsResponse::err("news data unavailable yet; try a refresh")),
            )
        }
    }
}

/// Forced recomputation, deduplicated by the cache's single-flight lock.
async fn refresh_news(State(state): State<AppState>) -> impl IntoResponse {
    match state.cache.get(true).await {
        Ok(snap) => (StatusCode::OK, Json(NewsResponse::ok(snap))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(NewsResponse::err(format!("refresh failed: {e}"))),
        ),
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    last_computed_at: Option<chrono::DateTime<chrono::Utc>>,
    institutions_tracked: u32,
    cached_data: bool,
    is_refreshing: bool,
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let status = state.cache.status();
    Json(StatusResponse {
        status: "online",
        cached_data: status.last_computed_at.is_some(),
        last_computed_at: status.last_computed_at,
        institutions_tracked: status.institutions_tracked,
        is_refreshing: status.is_refreshing,
    })
}

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Chat over the current snapshot. The generative backend is optional: when
/// it is disabled or errors, the rule-based answerer replies instead. Reads
/// never trigger a recomputation here.
async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> impl IntoResponse {
    let message = body.message.trim().to_string();
    if message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ChatResponse {
                success: false,
                response: None,
                error: Some("no message provided".into()),
            }),
        );
    }

    let Some(snapshot) = state.cache.peek() else {
        return (
            StatusCode::OK,
            Json(ChatResponse {
                success: true,
                response: Some(
                    "I don't have any news data loaded yet. Please refresh the data first."
                        .into(),
                ),
                error: None,
            }),
        );
    };

    let context = query::chat_context(&snapshot);
    let reply = match state.chat.reply(&context, &message).await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(
                backend = state.chat.name(),
                error = ?e,
                "chat backend unavailable; using snapshot answerer"
            );
            query::answer(&snapshot, &message)
        }
    };

    (
        StatusCode::OK,
        Json(ChatResponse {
            success: true,
            response: Some(reply),
            error: None,
        }),
    )
}

/// Push adapter: streams each newly installed snapshot as a `news_update`
/// SSE event. Payload shape matches the `data` field of `GET /api/news`.
async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.cache.broadcaster().subscribe();
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(snap) => match Event::default().event("news_update").json_data(&*snap) {
                    Ok(ev) => return Some((Ok::<_, Infallible>(ev), rx)),
                    Err(e) => {
                        tracing::warn!(error = ?e, "snapshot serialization for SSE failed");
                        continue;
                    }
                },
                // A lagged subscriber just misses updates; it sees the
                // latest snapshot on its next read.
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
