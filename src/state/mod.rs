mod registry;
mod response;
mod round;
mod score;
mod vote;

pub use registry::LeaveOutcome;
pub use response::{all_responses_submitted, process_response, validate_response, MAX_RESPONSE_CHARS};
pub use round::{
    assign_roles, is_valid_phase_transition, RoundRoles, MIN_PLAYERS, PROMPT_DELAY,
    REVEAL_DELAY, ROUND_SETUP_DELAY,
};
pub use score::{calculate_round_scores, check_game_completion, resolve_winner};
pub use vote::{all_votes_submitted, process_vote};

use crate::config::DEFAULT_MAX_ROUNDS;
use crate::protocol::ServerMessage;
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};

/// Outbound channel to one connected player
pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

/// Shared application state: the room registry and the connection
/// directory. Each room sits behind its own mutex so every mutation of a
/// given room is serialized; rooms never contend with each other.
pub struct AppState {
    pub rooms: RwLock<HashMap<RoomId, Arc<Mutex<Room>>>>,
    pub connections: RwLock<HashMap<PlayerId, PlayerSender>>,
    /// Rounds per game for rooms created on this server
    pub max_rounds: u32,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_max_rounds(DEFAULT_MAX_ROUNDS)
    }

    pub fn with_max_rounds(max_rounds: u32) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            connections: RwLock::new(HashMap::new()),
            max_rounds,
        }
    }

    /// Handle to a live room, or None if the code doesn't map to one
    pub async fn get_room(&self, room_id: &RoomId) -> Option<Arc<Mutex<Room>>> {
        self.rooms.read().await.get(room_id).cloned()
    }

    /// Clone of a room's current state
    pub async fn room_snapshot(&self, room_id: &RoomId) -> Option<Room> {
        let room = self.get_room(room_id).await?;
        let snapshot = room.lock().await.clone();
        Some(snapshot)
    }

    pub async fn register_connection(&self, player_id: &PlayerId, sender: PlayerSender) {
        self.connections
            .write()
            .await
            .insert(player_id.clone(), sender);
    }

    pub async fn remove_connection(&self, player_id: &PlayerId) {
        self.connections.write().await.remove(player_id);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
