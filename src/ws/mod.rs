pub mod handlers;

use crate::protocol::ServerMessage;
use crate::state::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One task per connection: pump outbound messages from the player's
/// channel and dispatch inbound frames until either side closes.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let player_id = ulid::Ulid::new().to_string();
    tracing::debug!(player_id = %player_id, "websocket connected");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.register_connection(&player_id, tx).await;

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                let Some(msg) = outbound else { break };
                match serde_json::to_string(&msg) {
                    Ok(json) => {
                        if ws_tx.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(player_id = %player_id, error = %e, "failed to encode message");
                    }
                }
            }
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str(&text) {
                            Ok(msg) => handlers::handle_message(msg, &player_id, &state).await,
                            Err(e) => {
                                tracing::debug!(player_id = %player_id, error = %e, "unparseable frame");
                                Some(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("could not parse message: {e}"),
                                })
                            }
                        };
                        if let Some(reply) = reply {
                            state.send_to(&player_id, reply).await;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong/binary ignored
                    Some(Err(e)) => {
                        tracing::debug!(player_id = %player_id, error = %e, "websocket error");
                        break;
                    }
                }
            }
        }
    }

    state.remove_connection(&player_id).await;
    state.handle_disconnect(&player_id).await;
    tracing::debug!(player_id = %player_id, "websocket disconnected");
}
