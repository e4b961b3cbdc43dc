//! WebSocket streaming of cluster events
//!
//! A client connects to `/onboarding?cluster=<name>` or `/detachment?cluster=<name>`
//! and receives the cluster's event history, then every new event, as JSON text
//! frames.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{stream::StreamExt, SinkExt};
use ocm_onboard_common::OnboardingEvent;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::state::AppState;

const HEARTBEAT_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub cluster: Option<String>,
}

/// WebSocket routes, relative to the WebSocket prefix
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/onboarding", get(ws_handler))
        .route("/detachment", get(ws_handler))
        .with_state(state)
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let cluster = query
        .cluster
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::missing_field("cluster"))?;

    info!(cluster = %cluster, "WebSocket connection request");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, cluster)))
}

/// Stream backlog then live events for one cluster until either side goes away
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, cluster: String) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading the backlog so nothing falls in between
    let mut rx = state.store.subscribe();
    let mut backlog = state.store.events(&cluster).await;

    for event in &backlog {
        if send_event(&mut sender, event).await.is_err() {
            return;
        }
    }

    let mut heartbeat =
        tokio::time::interval(tokio::time::Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            event = rx.recv() => {
                match event {
                    Ok(event) if event.cluster_name == cluster => {
                        // Appended between subscribe and backlog read: already sent
                        if let Some(pos) = backlog.iter().position(|e| *e == event) {
                            backlog.remove(pos);
                            continue;
                        }
                        if send_event(&mut sender, &event).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(cluster = %cluster, skipped, "WebSocket client lagging, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Text(text))) => {
                        debug!(cluster = %cluster, "Ignoring client message: {}", text);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(cluster = %cluster, "WebSocket receive error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    info!(cluster = %cluster, "WebSocket connection closed");
}

async fn send_event<S>(sender: &mut S, event: &OnboardingEvent) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let text = serde_json::to_string(event).map_err(|_| ())?;
    sender.send(Message::Text(text)).await.map_err(|_| ())
}
