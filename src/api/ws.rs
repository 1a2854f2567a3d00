//! Websocket push channel
//!
//! Each connection registers a subscriber with the publisher and relays its
//! messages as JSON text frames. Inbound frames are ignored; a closed or
//! failing socket unregisters the subscriber.

use super::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

/// GET /ws - upgrade to the push channel
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| client_loop(socket, state))
}

async fn client_loop(socket: WebSocket, state: AppState) {
    let (id, mut messages) = state.publisher.register();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            message = messages.recv() => {
                let Some(message) = message else { break };
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("push message serialization failed: {}", e);
                        continue;
                    }
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    // Client chatter is ignored; only liveness matters
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
        }
    }

    state.publisher.unregister(id);
    debug!("websocket subscriber {} disconnected", id);
}
