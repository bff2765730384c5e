use crate::error::GameError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{AppState, LeaveOutcome};
use crate::types::PlayerId;
use std::sync::Arc;

fn error_reply(e: GameError) -> ServerMessage {
    ServerMessage::Error {
        code: e.code().to_string(),
        msg: e.to_string(),
    }
}

/// Dispatch one decoded client message. The return value, if any, goes
/// back to the sender only; broadcasts happen inside the state methods.
pub async fn handle_message(
    msg: ClientMessage,
    player_id: &PlayerId,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::CreateRoom { username } => {
            let (room_id, display_name) = state.create_room(player_id, username).await;
            let room = state.room_snapshot(&room_id).await?;
            Some(ServerMessage::RoomJoined {
                player_id: player_id.clone(),
                room_id,
                display_name,
                is_host: true,
                room,
            })
        }

        ClientMessage::JoinRoom { room_id, username } => {
            match state.join_room(player_id, username, &room_id).await {
                Ok((display_name, room)) => {
                    state
                        .broadcast_to_players(
                            &room.players,
                            &ServerMessage::RoomUpdate { room: room.clone() },
                            Some(player_id),
                        )
                        .await;
                    Some(ServerMessage::RoomJoined {
                        player_id: player_id.clone(),
                        room_id,
                        display_name,
                        is_host: false,
                        room,
                    })
                }
                Err(e) => Some(ServerMessage::JoinFailed {
                    reason: e.to_string(),
                }),
            }
        }

        ClientMessage::LeaveRoom { room_id } => {
            match state.leave_room(&room_id, player_id).await {
                Ok(LeaveOutcome::Left { room, .. }) => {
                    state
                        .broadcast_to_players(
                            &room.players,
                            &ServerMessage::RoomUpdate { room: room.clone() },
                            None,
                        )
                        .await;
                    None
                }
                Ok(LeaveOutcome::RoomDeleted) => None,
                Err(e) => Some(error_reply(e)),
            }
        }

        ClientMessage::SendMessage { room_id, text } => state
            .send_chat(&room_id, player_id, text)
            .await
            .err()
            .map(error_reply),

        ClientMessage::StartGame { room_id } => state
            .start_game(&room_id, player_id)
            .await
            .err()
            .map(error_reply),

        ClientMessage::SubmitResponse { room_id, text } => state
            .submit_response(&room_id, player_id, &text)
            .await
            .err()
            .map(error_reply),

        ClientMessage::SubmitVote { room_id, response_id } => state
            .submit_vote(&room_id, player_id, &response_id)
            .await
            .err()
            .map(error_reply),

        ClientMessage::NextRound { room_id } => state
            .next_round(&room_id, player_id)
            .await
            .err()
            .map(error_reply),
    }
}
