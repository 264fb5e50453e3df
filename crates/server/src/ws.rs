//! WebSocket handler for the per-user push channel.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use questline_shared::PushEvent;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub user_id: i64,
    pub token: Option<String>,
}

/// Upgrade handler for `GET /api/ws?user_id=&token=`.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, (StatusCode, String)> {
    if let Some(expected) = &state.config.push_token {
        if params.token.as_deref() != Some(expected.as_str()) {
            tracing::warn!(user_id = params.user_id, "push channel auth failed");
            return Err((StatusCode::UNAUTHORIZED, "invalid push token".to_string()));
        }
    }

    tracing::info!(user_id = params.user_id, "push channel authenticated");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, params.user_id, state)))
}

/// Pump one authenticated push connection: forward the user's events and
/// emit heartbeats on the configured cadence so the client's watchdog stays
/// quiet. The first heartbeat goes out immediately after the upgrade.
async fn handle_socket(socket: WebSocket, user_id: i64, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.subscribe(user_id).await;
    let mut heartbeat = tokio::time::interval(state.config.heartbeat_interval);

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if send_event(&mut sender, &PushEvent::heartbeat()).await.is_err() {
                    break;
                }
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id, skipped, "push channel lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // The channel is one-way; inbound frames are ignored.
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!(user_id, "push channel closed");
}

async fn send_event(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: &PushEvent,
) -> Result<(), ()> {
    let json = serde_json::to_string(event).map_err(|_| ())?;
    sender.send(Message::Text(json.into())).await.map_err(|_| ())
}
