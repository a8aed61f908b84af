pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;

use crate::broadcast::PlayerConn;
use crate::error::GameError;
use crate::protocol::{GameCommand, ServerMessage, SocketMessage};
use crate::state::{AppState, Room};
use crate::types::PlayerId;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// WebSocket upgrade handler. The session is checked before upgrading.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let Some(token) = params.token else {
        return GameError::InvalidToken.into_response();
    };
    let (room, player_id) = match state.resolve(&token).await {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::info!("Refusing WebSocket connection: {}", e);
            return e.into_response();
        }
    };

    tracing::info!("WebSocket connection request from {} in room {}", player_id, room.id);
    ws.on_upgrade(move |socket| handle_socket(socket, state, token, room, player_id))
}

async fn send(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            true
        }
    }
}

/// Handle one player's connection until either side closes it
async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    token: String,
    room: Arc<Room>,
    player_id: PlayerId,
) {
    let (mut sender, mut receiver) = socket.split();
    let (conn, mut rx) = PlayerConn::new(player_id.clone());
    let conn_id = conn.id.clone();

    if let Err(e) = room.attach(conn).await {
        tracing::warn!("Could not attach {} to room {}: {}", player_id, room.id, e);
        send(&mut sender, &ServerMessage::from(&e)).await;
        return;
    }

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(msg) => {
                        if !send(&mut sender, &msg).await {
                            tracing::error!("Failed to write to {}", player_id);
                            break;
                        }
                    }
                    None => {
                        // Replaced by a newer connection, or the room is gone
                        tracing::debug!("Outbound queue of {} closed", conn_id);
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message from {}: {}", player_id, text);
                        let reply = handle_text(&state, &token, &text).await;
                        if !send(&mut sender, &reply).await {
                            tracing::error!("Failed to send response");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed by {}", player_id);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    room.detach(&player_id, &conn_id).await;
}

/// Answer one inbound socket message
async fn handle_text(state: &AppState, token: &str, text: &str) -> ServerMessage {
    let envelope = match serde_json::from_str::<SocketMessage>(text) {
        Ok(SocketMessage::Ping) => return ServerMessage::Pong,
        Ok(SocketMessage::Command(envelope)) => envelope,
        Err(e) => {
            tracing::warn!("Failed to parse socket message: {}", e);
            return ServerMessage::Error {
                code: "PARSE_ERROR".to_string(),
                msg: format!("Invalid message format: {}", e),
            };
        }
    };

    let name = envelope.command.clone();
    let result = match GameCommand::try_from(envelope) {
        Ok(command) => state.execute(token, command).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(reply) => ServerMessage::CommandResult {
            command: name,
            reply,
        },
        Err(e) => {
            tracing::debug!("Command {} failed: {}", name, e);
            ServerMessage::from(&e)
        }
    }
}
