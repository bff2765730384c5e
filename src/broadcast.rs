//! Fan-out of server messages over the connection directory.
//!
//! Broadcasts take a cloned player list, never a room guard, so no room
//! lock is held while messages are queued.

use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::{Player, PlayerId, RoomId};

impl AppState {
    /// Queue a message for one player. A missing or closed channel means
    /// the player disconnected; that's not an error here.
    pub async fn send_to(&self, player_id: &PlayerId, msg: ServerMessage) {
        let connections = self.connections.read().await;
        match connections.get(player_id) {
            Some(sender) => {
                if sender.send(msg).is_err() {
                    tracing::debug!(player_id = %player_id, "send to closed connection dropped");
                }
            }
            None => {
                tracing::debug!(player_id = %player_id, "no connection for player, message dropped");
            }
        }
    }

    /// Queue a message for every listed player, optionally skipping one
    /// (usually the actor who triggered the broadcast).
    pub async fn broadcast_to_players(
        &self,
        players: &[Player],
        msg: &ServerMessage,
        exclude: Option<&PlayerId>,
    ) {
        let connections = self.connections.read().await;
        for player in players {
            if exclude.is_some_and(|ex| *ex == player.id) {
                continue;
            }
            match connections.get(&player.id) {
                Some(sender) => {
                    if sender.send(msg.clone()).is_err() {
                        tracing::debug!(player_id = %player.id, "send to closed connection dropped");
                    }
                }
                None => {
                    tracing::debug!(player_id = %player.id, "no connection for player, message dropped");
                }
            }
        }
    }

    /// Broadcast to a room's current members. A vanished room is a logged
    /// no-op.
    pub async fn broadcast_to_room(
        &self,
        room_id: &RoomId,
        msg: &ServerMessage,
        exclude: Option<&PlayerId>,
    ) {
        let Some(room) = self.room_snapshot(room_id).await else {
            tracing::warn!(room_id = %room_id, "broadcast to unknown room dropped");
            return;
        };
        self.broadcast_to_players(&room.players, msg, exclude).await;
    }
}
