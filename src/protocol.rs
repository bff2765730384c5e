use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Client -> server messages. A frame that fails to decode into one of
/// these variants is a protocol error and never reaches the game core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    CreateRoom {
        username: String,
    },
    JoinRoom {
        room_id: RoomId,
        username: String,
    },
    SendMessage {
        room_id: RoomId,
        text: String,
    },
    LeaveRoom {
        room_id: RoomId,
    },
    StartGame {
        room_id: RoomId,
    },
    SubmitResponse {
        room_id: RoomId,
        text: String,
    },
    SubmitVote {
        room_id: RoomId,
        response_id: ResponseId,
    },
    NextRound {
        room_id: RoomId,
    },
}

/// Server -> client messages. Every game message embeds a full room
/// snapshot so clients can resynchronize without separate queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    RoomJoined {
        player_id: PlayerId,
        room_id: RoomId,
        display_name: String,
        is_host: bool,
        room: Room,
    },
    RoomUpdate {
        room: Room,
    },
    ChatMessage {
        sender_id: PlayerId,
        sender_display_name: String,
        text: String,
    },
    JoinFailed {
        reason: String,
    },
    GameStarted {
        room: Room,
    },
    /// Sent individually, not broadcast: the role is secret
    RoundSetup {
        room: Room,
        target_player_name: String,
        prompt_sender_name: String,
        your_role: RoundRole,
    },
    PromptDisplay {
        room: Room,
        prompt_text: String,
        target_player_name: String,
    },
    ResponseSubmitted {
        room: Room,
        all_submitted: bool,
    },
    /// Responses stripped to id and text for anonymous voting
    VotingPhase {
        room: Room,
        responses: Vec<VotingResponse>,
    },
    VoteSubmitted {
        room: Room,
        all_voted: bool,
    },
    /// Full responses with authorship and vote counts restored
    RevealPhase {
        room: Room,
        responses: Vec<GameResponse>,
        votes: Vec<Vote>,
    },
    ScoringPhase {
        room: Room,
        scores: HashMap<PlayerId, RoundScore>,
        round_summary: HashMap<String, String>,
    },
    RoundComplete {
        room: Room,
    },
    GameFinished {
        room: Room,
        final_scores: HashMap<PlayerId, u32>,
        winner: Player,
    },
    Error {
        code: String,
        msg: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_decodes_camel_case_fields() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"join_room","roomId":"ABCD","username":"andrew"}"#)
                .unwrap();
        match msg {
            ClientMessage::JoinRoom { room_id, username } => {
                assert_eq!(room_id, "ABCD");
                assert_eq!(username, "andrew");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"type":"hack_room"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"type":"join_room","roomId":"ABCD"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_phase_serializes_camel_case() {
        let json = serde_json::to_string(&GamePhase::RoundSetup).unwrap();
        assert_eq!(json, r#""roundSetup""#);
    }
}
