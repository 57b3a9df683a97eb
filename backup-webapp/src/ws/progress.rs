//! Streams every published progress snapshot to a websocket client, so a UI
//! can subscribe instead of polling `/progress`.

use crate::state::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use backup_engine::ProgressSnapshot;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::debug;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_progress_socket(socket, state))
}

fn encode(snapshot: &ProgressSnapshot) -> Option<String> {
    serde_json::to_string(snapshot).ok()
}

async fn handle_progress_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.engine.tracker().subscribe();

    let mut send_task = tokio::spawn(async move {
        // Current state first, then one message per change.
        loop {
            let msg = encode(&rx.borrow_and_update());
            if let Some(msg) = msg {
                if sender.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    });

    // Incoming messages are ignored; the loop only notices the close.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    debug!("Progress websocket closed");
}
