use super::{response, score, AppState};
use crate::error::{GameError, GameResult};
use crate::prompts;
use crate::protocol::ServerMessage;
use crate::types::*;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Minimum players for a round: a target plus at least two impersonators
pub const MIN_PLAYERS: usize = 3;

/// Fixed delays for the timed auto-advances
pub const ROUND_SETUP_DELAY: Duration = Duration::from_secs(3);
pub const PROMPT_DELAY: Duration = Duration::from_secs(2);
pub const REVEAL_DELAY: Duration = Duration::from_secs(5);

/// Role assignment for one round
#[derive(Debug, Clone)]
pub struct RoundRoles {
    pub target_player_id: PlayerId,
    pub prompt_sender_id: PlayerId,
    pub real_impersonator_id: PlayerId,
    pub fake_responder_ids: Vec<PlayerId>,
}

/// Pick the prompt sender and real impersonator uniformly at random from
/// the non-target players. Everyone but the target and the impersonator
/// ends up a fake responder (the sender writes a fake too).
pub fn assign_roles(players: &[Player], target_player_id: &PlayerId) -> GameResult<RoundRoles> {
    let candidates: Vec<&Player> = players.iter().filter(|p| p.id != *target_player_id).collect();
    if players.len() < MIN_PLAYERS || candidates.len() < MIN_PLAYERS - 1 {
        return Err(GameError::InsufficientPlayers {
            needed: MIN_PLAYERS,
            have: players.len(),
        });
    }

    let mut rng = rand::rng();
    let prompt_sender_id = candidates[rng.random_range(0..candidates.len())].id.clone();

    let impersonator_pool: Vec<&&Player> = candidates
        .iter()
        .filter(|p| p.id != prompt_sender_id)
        .collect();
    let real_impersonator_id =
        impersonator_pool[rng.random_range(0..impersonator_pool.len())].id.clone();

    let fake_responder_ids = candidates
        .iter()
        .filter(|p| p.id != real_impersonator_id)
        .map(|p| p.id.clone())
        .collect();

    Ok(RoundRoles {
        target_player_id: target_player_id.clone(),
        prompt_sender_id,
        real_impersonator_id,
        fake_responder_ids,
    })
}

/// Check if a phase transition is valid
pub fn is_valid_phase_transition(from: GamePhase, to: GamePhase) -> bool {
    use GamePhase::*;

    matches!(
        (from, to),
        (Lobby, RoundSetup)
            | (RoundSetup, Prompt)
            | (Prompt, Responding)
            | (Responding, Voting)
            | (Voting, Reveal)
            | (Reveal, Scoring)
            | (Scoring, RoundSetup)
            | (Scoring, Finished)
    )
}

impl Room {
    /// Apply a phase transition, updating the room state and the active
    /// round's mirror together. Rejected transitions leave both untouched.
    pub fn transition_phase(&mut self, to: GamePhase) -> GameResult<()> {
        let from = self.state;
        if !is_valid_phase_transition(from, to) {
            return Err(GameError::InvalidTransition { from, to });
        }
        self.state = to;
        if let Some(round) = self.current_round_data.as_mut() {
            round.state = to;
        }
        Ok(())
    }

    /// Set up round `round_number`: round-robin target, random roles, and
    /// a freshly generated prompt. On failure the caller rolls the room
    /// back to the lobby.
    pub fn initialize_round(&mut self, round_number: u32) -> GameResult<RoundRoles> {
        if self.players.len() < MIN_PLAYERS {
            return Err(GameError::InsufficientPlayers {
                needed: MIN_PLAYERS,
                have: self.players.len(),
            });
        }

        // Every player is targeted once per full cycle of the player list
        let target_player_id =
            self.players[(round_number as usize - 1) % self.players.len()].id.clone();
        let roles = assign_roles(&self.players, &target_player_id)?;

        let target_name = self.player_name(&roles.target_player_id);
        let sender_name = self.player_name(&roles.prompt_sender_id);
        let prompt = prompts::generate_prompt(&target_name, &sender_name);

        let round = Round {
            id: ulid::Ulid::new().to_string(),
            round_number,
            prompt: prompt.clone(),
            target_player_id: roles.target_player_id.clone(),
            prompt_sender_id: roles.prompt_sender_id.clone(),
            real_impersonator_id: roles.real_impersonator_id.clone(),
            responses: Vec::new(),
            votes: Vec::new(),
            state: self.state,
        };

        self.current_round = round_number;
        self.current_prompt = Some(prompt);
        self.current_round_data = Some(round);
        self.round_epoch += 1;

        Ok(roles)
    }
}

impl AppState {
    /// Host starts the game: lobby -> roundSetup with round 1 initialized.
    /// Broadcasts `game_started`, sends each player their secret role, and
    /// schedules the roundSetup -> prompt advance.
    pub async fn start_game(
        self: &Arc<Self>,
        room_id: &RoomId,
        player_id: &PlayerId,
    ) -> GameResult<()> {
        let room_arc = self.get_room(room_id).await.ok_or(GameError::RoomNotFound)?;

        let (snapshot, roles, epoch) = {
            let mut room = room_arc.lock().await;
            if room.host_id != *player_id {
                return Err(GameError::NotHost);
            }
            if room.state != GamePhase::Lobby {
                return Err(GameError::WrongPhase { actual: room.state });
            }

            room.transition_phase(GamePhase::RoundSetup)?;
            match room.initialize_round(1) {
                Ok(roles) => (room.clone(), roles, room.round_epoch),
                Err(e) => {
                    room.reset_to_lobby();
                    return Err(e);
                }
            }
        };

        tracing::info!(room_id = %room_id, "game started");
        self.broadcast_to_players(
            &snapshot.players,
            &ServerMessage::GameStarted { room: snapshot.clone() },
            None,
        )
        .await;
        self.send_round_setup_messages(&snapshot, &roles).await;
        self.spawn_prompt_timer(room_id, epoch);

        Ok(())
    }

    /// Host advances past a scored round: either the next round starts or
    /// the game finishes with a winner.
    pub async fn next_round(
        self: &Arc<Self>,
        room_id: &RoomId,
        player_id: &PlayerId,
    ) -> GameResult<()> {
        let room_arc = self.get_room(room_id).await.ok_or(GameError::RoomNotFound)?;

        let mut finished: Option<(HashMap<PlayerId, u32>, Player)> = None;
        let mut new_round: Option<(RoundRoles, u64)> = None;

        let snapshot = {
            let mut room = room_arc.lock().await;
            if room.host_id != *player_id {
                return Err(GameError::NotHost);
            }
            if room.state != GamePhase::Scoring {
                return Err(GameError::WrongPhase { actual: room.state });
            }

            if score::check_game_completion(&room) {
                room.transition_phase(GamePhase::Finished)?;
                let Some(winner) = score::resolve_winner(&room.players).cloned() else {
                    return Err(GameError::InsufficientPlayers { needed: 1, have: 0 });
                };
                let final_scores = room.players.iter().map(|p| (p.id.clone(), p.points)).collect();
                finished = Some((final_scores, winner));
            } else {
                room.transition_phase(GamePhase::RoundSetup)?;
                let round_number = room.current_round + 1;
                match room.initialize_round(round_number) {
                    Ok(roles) => new_round = Some((roles, room.round_epoch)),
                    Err(e) => {
                        room.reset_to_lobby();
                        let rolled_back = room.clone();
                        drop(room);
                        self.broadcast_to_players(
                            &rolled_back.players,
                            &ServerMessage::RoomUpdate { room: rolled_back.clone() },
                            None,
                        )
                        .await;
                        return Err(e);
                    }
                }
            }
            room.clone()
        };

        if let Some((final_scores, winner)) = finished {
            tracing::info!(room_id = %room_id, winner = %winner.id, "game finished");
            self.broadcast_to_players(
                &snapshot.players,
                &ServerMessage::GameFinished {
                    room: snapshot.clone(),
                    final_scores,
                    winner,
                },
                None,
            )
            .await;
        } else if let Some((roles, epoch)) = new_round {
            tracing::info!(room_id = %room_id, round = snapshot.current_round, "next round started");
            self.broadcast_to_players(
                &snapshot.players,
                &ServerMessage::RoundComplete { room: snapshot.clone() },
                None,
            )
            .await;
            self.send_round_setup_messages(&snapshot, &roles).await;
            self.spawn_prompt_timer(room_id, epoch);
        }

        Ok(())
    }

    /// Each player learns the round cast and their own secret role
    async fn send_round_setup_messages(&self, room: &Room, roles: &RoundRoles) {
        let target_player_name = room.player_name(&roles.target_player_id);
        let prompt_sender_name = room.player_name(&roles.prompt_sender_id);

        for player in &room.players {
            let your_role = if player.id == roles.real_impersonator_id {
                RoundRole::RealImpersonator
            } else if player.id == roles.target_player_id {
                RoundRole::None
            } else {
                RoundRole::FakeResponder
            };

            self.send_to(
                &player.id,
                ServerMessage::RoundSetup {
                    room: room.clone(),
                    target_player_name: target_player_name.clone(),
                    prompt_sender_name: prompt_sender_name.clone(),
                    your_role,
                },
            )
            .await;
        }
    }

    fn spawn_prompt_timer(self: &Arc<Self>, room_id: &RoomId, epoch: u64) {
        let state = Arc::clone(self);
        let room_id = room_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ROUND_SETUP_DELAY).await;
            state.advance_to_prompt(&room_id, epoch).await;
        });
    }

    fn spawn_responding_timer(self: &Arc<Self>, room_id: &RoomId, epoch: u64) {
        let state = Arc::clone(self);
        let room_id = room_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(PROMPT_DELAY).await;
            state.advance_to_responding(&room_id, epoch).await;
        });
    }

    pub(super) fn spawn_scoring_timer(self: &Arc<Self>, room_id: &RoomId, epoch: u64) {
        let state = Arc::clone(self);
        let room_id = room_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(REVEAL_DELAY).await;
            state.advance_to_scoring(&room_id, epoch).await;
        });
    }

    /// Re-validate a pending timed advance. Returns the room only when it
    /// still exists, the round hasn't been superseded, and the phase is
    /// the one the timer was scheduled from.
    async fn room_if_timer_current(
        &self,
        room_id: &RoomId,
        epoch: u64,
        expected: GamePhase,
    ) -> Option<Arc<tokio::sync::Mutex<Room>>> {
        let Some(room_arc) = self.get_room(room_id).await else {
            tracing::debug!(room_id = %room_id, "scheduled advance for deleted room, skipping");
            return None;
        };
        {
            let room = room_arc.lock().await;
            if room.round_epoch != epoch
                || room.state != expected
                || room.current_round_data.is_none()
            {
                tracing::debug!(room_id = %room_id, phase = ?room.state, "stale scheduled advance, skipping");
                return None;
            }
        }
        Some(room_arc)
    }

    /// Timed roundSetup -> prompt: show the prompt to everyone, then
    /// schedule the advance into responding.
    pub async fn advance_to_prompt(self: &Arc<Self>, room_id: &RoomId, epoch: u64) {
        let Some(room_arc) = self.room_if_timer_current(room_id, epoch, GamePhase::RoundSetup).await
        else {
            return;
        };

        let snapshot = {
            let mut room = room_arc.lock().await;
            // Re-check under the lock; the phase may have moved since
            if room.round_epoch != epoch || room.transition_phase(GamePhase::Prompt).is_err() {
                return;
            }
            room.clone()
        };

        let (prompt_text, target_player_name) = match snapshot.current_round_data.as_ref() {
            Some(round) => (round.prompt.clone(), snapshot.player_name(&round.target_player_id)),
            None => return,
        };

        self.broadcast_to_players(
            &snapshot.players,
            &ServerMessage::PromptDisplay {
                room: snapshot.clone(),
                prompt_text,
                target_player_name,
            },
            None,
        )
        .await;
        self.spawn_responding_timer(room_id, epoch);
    }

    /// Timed prompt -> responding: clients open their response inputs.
    pub async fn advance_to_responding(self: &Arc<Self>, room_id: &RoomId, epoch: u64) {
        let Some(room_arc) = self.room_if_timer_current(room_id, epoch, GamePhase::Prompt).await
        else {
            return;
        };

        let snapshot = {
            let mut room = room_arc.lock().await;
            if room.round_epoch != epoch || room.transition_phase(GamePhase::Responding).is_err() {
                return;
            }
            room.clone()
        };

        self.broadcast_to_players(
            &snapshot.players,
            &ServerMessage::RoomUpdate { room: snapshot.clone() },
            None,
        )
        .await;
    }

    /// Timed reveal -> scoring: compute round scores, credit cumulative
    /// totals, archive the round, and broadcast the breakdown.
    pub async fn advance_to_scoring(self: &Arc<Self>, room_id: &RoomId, epoch: u64) {
        let Some(room_arc) = self.room_if_timer_current(room_id, epoch, GamePhase::Reveal).await
        else {
            return;
        };

        let (snapshot, scores, round_summary) = {
            let mut room = room_arc.lock().await;
            if room.round_epoch != epoch || room.state != GamePhase::Reveal {
                return;
            }
            let Some(round) = room.current_round_data.clone() else {
                return;
            };
            if room.transition_phase(GamePhase::Scoring).is_err() {
                return;
            }

            let scores = score::calculate_round_scores(&round, &room.players);
            for player in room.players.iter_mut() {
                if let Some(earned) = scores.get(&player.id) {
                    player.points += earned.points_earned;
                }
            }

            let round_summary = score::round_summary(&room, &round);

            // The round only enters the history once scoring is done
            let mut completed = round;
            completed.state = GamePhase::Scoring;
            room.rounds.push(completed);
            room.current_round_data = None;

            (room.clone(), scores, round_summary)
        };

        tracing::info!(room_id = %room_id, round = snapshot.current_round, "round scored");
        self.broadcast_to_players(
            &snapshot.players,
            &ServerMessage::ScoringPhase {
                room: snapshot.clone(),
                scores,
                round_summary,
            },
            None,
        )
        .await;
    }

    /// Store a player's response. When the last non-target player has
    /// submitted, the room moves to voting and everyone receives the
    /// anonymized response list.
    pub async fn submit_response(
        &self,
        room_id: &RoomId,
        player_id: &PlayerId,
        text: &str,
    ) -> GameResult<()> {
        let room_arc = self.get_room(room_id).await.ok_or(GameError::RoomNotFound)?;

        let (snapshot, all_submitted, voting_responses) = {
            let mut room = room_arc.lock().await;
            response::process_response(&mut room, player_id, text)?;

            let all_submitted = response::all_responses_submitted(&room);
            let mut voting_responses = None;
            if all_submitted {
                room.transition_phase(GamePhase::Voting)?;
                if let Some(round) = room.current_round_data.as_ref() {
                    voting_responses =
                        Some(round.responses.iter().map(VotingResponse::from).collect::<Vec<_>>());
                }
            }
            (room.clone(), all_submitted, voting_responses)
        };

        self.broadcast_to_players(
            &snapshot.players,
            &ServerMessage::ResponseSubmitted {
                room: snapshot.clone(),
                all_submitted,
            },
            None,
        )
        .await;

        if let Some(responses) = voting_responses {
            tracing::info!(room_id = %room_id, "all responses in, voting open");
            self.broadcast_to_players(
                &snapshot.players,
                &ServerMessage::VotingPhase {
                    room: snapshot.clone(),
                    responses,
                },
                None,
            )
            .await;
        }

        Ok(())
    }

    /// Record a player's vote. When the last non-target player has voted,
    /// the room moves to reveal (full responses restored) and the scoring
    /// advance is scheduled.
    pub async fn submit_vote(
        self: &Arc<Self>,
        room_id: &RoomId,
        voter_id: &PlayerId,
        response_id: &ResponseId,
    ) -> GameResult<()> {
        let room_arc = self.get_room(room_id).await.ok_or(GameError::RoomNotFound)?;

        let (snapshot, all_voted, reveal, epoch) = {
            let mut room = room_arc.lock().await;
            let all_voted = super::vote::process_vote(&mut room, voter_id, response_id)?;

            let mut reveal = None;
            if all_voted {
                room.transition_phase(GamePhase::Reveal)?;
                if let Some(round) = room.current_round_data.as_ref() {
                    reveal = Some((round.responses.clone(), round.votes.clone()));
                }
            }
            (room.clone(), all_voted, reveal, room.round_epoch)
        };

        self.broadcast_to_players(
            &snapshot.players,
            &ServerMessage::VoteSubmitted {
                room: snapshot.clone(),
                all_voted,
            },
            None,
        )
        .await;

        if let Some((responses, votes)) = reveal {
            tracing::info!(room_id = %room_id, "all votes in, revealing");
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

        Ok(())
    }
}
