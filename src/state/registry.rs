use super::{response, vote, AppState};
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::types::*;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Room code character set, chosen to avoid visually ambiguous glyphs
/// (no I/L/O/S)
const ROOM_CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRTUVWXYZ";
const ROOM_CODE_LENGTH: usize = 4;
/// Regeneration bound before falling back to a globally unique id
const ROOM_CODE_ATTEMPTS: usize = 100;

/// Display name pool, assigned in order, skipping names already in use
const DISPLAY_NAMES: &[&str] = &[
    "Otter", "Giraffe", "Panda", "Walrus", "Falcon", "Tiger", "Koala", "Hawk", "Lynx", "Beaver",
    "Puffin", "Gecko", "Marmot", "Heron", "Badger", "Wombat",
];
/// Not unique, handed out once the pool is exhausted
const FALLBACK_DISPLAY_NAME: &str = "Player";

fn generate_room_code() -> RoomId {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LENGTH)
        .map(|_| ROOM_CODE_CHARS[rng.random_range(0..ROOM_CODE_CHARS.len())] as char)
        .collect()
}

fn assign_display_name(players: &[Player]) -> String {
    let used: HashSet<&str> = players.iter().filter_map(|p| p.display_name.as_deref()).collect();
    DISPLAY_NAMES
        .iter()
        .find(|name| !used.contains(**name))
        .unwrap_or(&FALLBACK_DISPLAY_NAME)
        .to_string()
}

/// What `leave_room` did to the room
#[derive(Debug)]
pub enum LeaveOutcome {
    /// Last player left, room destroyed
    RoomDeleted,
    Left {
        room: Room,
        /// True when a departing role-holder forced the round back to lobby
        round_aborted: bool,
    },
}

impl AppState {
    /// Create a room with the caller as host. Infallible: codes fall back
    /// to a ULID if the short-code space is somehow exhausted.
    pub async fn create_room(&self, host_id: &PlayerId, username: String) -> (RoomId, String) {
        let mut rooms = self.rooms.write().await;

        let mut room_id = None;
        for _ in 0..ROOM_CODE_ATTEMPTS {
            let code = generate_room_code();
            if !rooms.contains_key(&code) {
                room_id = Some(code);
                break;
            }
        }
        let room_id = room_id.unwrap_or_else(|| ulid::Ulid::new().to_string());

        let display_name = assign_display_name(&[]);
        let host = Player {
            id: host_id.clone(),
            username,
            display_name: Some(display_name.clone()),
            is_host: true,
            points: 0,
        };
        let room = Room {
            id: room_id.clone(),
            host_id: host_id.clone(),
            players: vec![host],
            state: GamePhase::Lobby,
            current_round: 0,
            max_rounds: self.max_rounds,
            current_prompt: None,
            current_round_data: None,
            rounds: Vec::new(),
            round_epoch: 0,
        };

        rooms.insert(room_id.clone(), Arc::new(Mutex::new(room)));
        tracing::info!(room_id = %room_id, host_id = %host_id, "room created");

        (room_id, display_name)
    }

    /// Add a player to a live room and assign them a display name.
    pub async fn join_room(
        &self,
        player_id: &PlayerId,
        username: String,
        room_id: &RoomId,
    ) -> GameResult<(String, Room)> {
        let room = self.get_room(room_id).await.ok_or(GameError::RoomNotFound)?;
        let mut room = room.lock().await;

        let display_name = assign_display_name(&room.players);
        room.players.push(Player {
            id: player_id.clone(),
            username,
            display_name: Some(display_name.clone()),
            is_host: false,
            points: 0,
        });
        tracing::info!(room_id = %room_id, player_id = %player_id, "player joined");

        Ok((display_name, room.clone()))
    }

    /// Remove a player. The host role moves to a random remaining player,
    /// the room is deleted when it empties, and a round that lost its
    /// target, sender or real impersonator is aborted back to the lobby.
    /// A surviving round re-checks completion, since the leaver may have
    /// been the last pending responder or voter.
    pub async fn leave_room(
        self: &Arc<Self>,
        room_id: &RoomId,
        player_id: &PlayerId,
    ) -> GameResult<LeaveOutcome> {
        let room_arc = self.get_room(room_id).await.ok_or(GameError::RoomNotFound)?;
        let mut room = room_arc.lock().await;

        let idx = room
            .players
            .iter()
            .position(|p| p.id == *player_id)
            .ok_or(GameError::PlayerNotInRoom)?;
        let leaving = room.players.remove(idx);

        if room.players.is_empty() {
            drop(room);
            self.rooms.write().await.remove(room_id);
            tracing::info!(room_id = %room_id, "last player left, room deleted");
            return Ok(LeaveOutcome::RoomDeleted);
        }

        if leaving.is_host {
            let mut rng = rand::rng();
            let new_host = rng.random_range(0..room.players.len());
            room.players[new_host].is_host = true;
            room.host_id = room.players[new_host].id.clone();
            tracing::info!(room_id = %room_id, new_host = %room.host_id, "host reassigned");
        }

        let round_aborted = match &room.current_round_data {
            Some(round)
                if round.target_player_id == *player_id
                    || round.prompt_sender_id == *player_id
                    || round.real_impersonator_id == *player_id =>
            {
                tracing::warn!(
                    room_id = %room_id,
                    player_id = %player_id,
                    "round role-holder left, resetting room to lobby"
                );
                room.reset_to_lobby();
                true
            }
            _ => false,
        };

        // The leaver may have been the last outstanding submitter; the
        // submit paths only check completion on submission, so re-check
        // here and drive the same advance they would.
        let mut open_voting = None;
        let mut reveal = None;
        if !round_aborted {
            let round_phase = room.current_round_data.as_ref().map(|r| r.state);
            match round_phase {
                Some(GamePhase::Responding) if response::all_responses_submitted(&room) => {
                    room.transition_phase(GamePhase::Voting)?;
                    if let Some(round) = room.current_round_data.as_ref() {
                        open_voting = Some(
                            round.responses.iter().map(VotingResponse::from).collect::<Vec<_>>(),
                        );
                    }
                }
                Some(GamePhase::Voting) if vote::all_votes_submitted(&room) => {
                    room.transition_phase(GamePhase::Reveal)?;
                    if let Some(round) = room.current_round_data.as_ref() {
                        reveal =
                            Some((round.responses.clone(), round.votes.clone(), room.round_epoch));
                    }
                }
                _ => {}
            }
        }

        let snapshot = room.clone();
        drop(room);

        if let Some(responses) = open_voting {
            tracing::info!(room_id = %room_id, "last pending responder left, voting open");
            self.broadcast_to_players(
                &snapshot.players,
                &ServerMessage::VotingPhase {
                    room: snapshot.clone(),
                    responses,
                },
                None,
            )
            .await;
        } else if let Some((responses, votes, epoch)) = reveal {
            tracing::info!(room_id = %room_id, "last pending voter left, revealing");
            self.broadcast_to_players(
                &snapshot.players,
                &ServerMessage::RevealPhase {
                    room: snapshot.clone(),
                    responses,
                    votes,
                },
                None,
            )
            .await;
            self.spawn_scoring_timer(room_id, epoch);
        }

        Ok(LeaveOutcome::Left {
            room: snapshot,
            round_aborted,
        })
    }

    /// Room the player currently belongs to, if any
    pub async fn find_room_of_player(&self, player_id: &PlayerId) -> Option<RoomId> {
        let rooms = self.rooms.read().await;
        for (room_id, room) in rooms.iter() {
            if room.lock().await.players.iter().any(|p| p.id == *player_id) {
                return Some(room_id.clone());
            }
        }
        None
    }

    /// A dropped connection counts as leaving whichever room the player
    /// was in; the remaining players get a room update.
    pub async fn handle_disconnect(self: &Arc<Self>, player_id: &PlayerId) {
        let Some(room_id) = self.find_room_of_player(player_id).await else {
            return;
        };

        match self.leave_room(&room_id, player_id).await {
            Ok(LeaveOutcome::Left { room, .. }) => {
                self.broadcast_to_players(
                    &room.players,
                    &ServerMessage::RoomUpdate { room: room.clone() },
                    Some(player_id),
                )
                .await;
            }
            Ok(LeaveOutcome::RoomDeleted) => {}
            Err(e) => {
                tracing::warn!(room_id = %room_id, player_id = %player_id, error = %e, "disconnect cleanup failed");
            }
        }
    }

    /// Relay a chat message to the whole room, sender included.
    pub async fn send_chat(
        &self,
        room_id: &RoomId,
        sender_id: &PlayerId,
        text: String,
    ) -> GameResult<()> {
        let room_arc = self.get_room(room_id).await.ok_or(GameError::RoomNotFound)?;
        let (players, sender) = {
            let room = room_arc.lock().await;
            let sender = room.player(sender_id).cloned().ok_or(GameError::PlayerNotInRoom)?;
            (room.players.clone(), sender)
        };

        self.broadcast_to_players(
            &players,
            &ServerMessage::ChatMessage {
                sender_id: sender.id.clone(),
                sender_display_name: sender.name().to_string(),
                text,
            },
            None,
        )
        .await;

        Ok(())
    }
}
