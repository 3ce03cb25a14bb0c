//! WebSocket upgrade handler for live score viewers.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Upgrade to WebSocket
//! 2. Register the viewer
//! 3. Forward queued snapshots until the queue closes or the socket fails
//! 4. Remove the viewer

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::domain::foundation::Timestamp;

use super::registry::ViewerRegistry;

/// State required for viewer handling.
#[derive(Clone)]
pub struct ViewerState {
    /// Registry of connected viewers.
    pub registry: Arc<ViewerRegistry>,

    /// When this server started.
    pub started_at: Timestamp,
}

impl ViewerState {
    pub fn new(registry: Arc<ViewerRegistry>) -> Self {
        Self {
            registry,
            started_at: Timestamp::now(),
        }
    }
}

/// Handle WebSocket upgrade requests from viewers.
///
/// Routes: `GET /` and `GET /ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ViewerState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established viewer connection.
///
/// Runs for the lifetime of the connection. The viewer never sends anything
/// meaningful; inbound frames are only read to notice a close or an error.
async fn handle_socket(socket: WebSocket, state: ViewerState) {
    let (mut sender, mut receiver) = socket.split();
    let (viewer_id, mut queue) = state.registry.join().await;

    tracing::info!(viewer_id = %viewer_id, "Viewer connected");

    // Forward queued snapshots to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = queue.recv().await {
            if let Err(e) = sender.send(Message::Text(frame.to_string())).await {
                tracing::debug!(viewer_id = %viewer_id, "Send error, closing connection: {}", e);
                return;
            }
        }
        // Queue closed by the server: say goodbye.
        let _ = sender.send(Message::Close(None)).await;
    });

    // Watch inbound frames for close/error
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    tracing::debug!(viewer_id = %viewer_id, "Viewer sent close frame");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(viewer_id = %viewer_id, "Receive error: {}", e);
                    break;
                }
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.registry.leave(&viewer_id).await;
    tracing::info!(viewer_id = %viewer_id, "Viewer disconnected");
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    viewers: usize,
    started_at: Timestamp,
}

/// Report liveness and the number of connected viewers.
///
/// Route: `GET /health`
pub async fn health_handler(State(state): State<ViewerState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        viewers: state.registry.viewer_count().await,
        started_at: state.started_at,
    })
}

/// Create axum router for the viewer endpoints.
pub fn viewer_router(state: ViewerState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
