use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type PlayerId = String;
pub type RoomId = String;
pub type RoundId = String;
pub type ResponseId = String;

/// Phase of a game. The room's `state` field is the canonical copy; the
/// in-progress round mirrors it (both are only written by
/// `Room::transition_phase`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    Lobby,
    RoundSetup,
    Prompt,
    Responding,
    Voting,
    Reveal,
    Scoring,
    Finished,
}

/// A player's secret role for one round, sent individually in `round_setup`.
/// The impersonated target holds no role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundRole {
    RealImpersonator,
    FakeResponder,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    /// Client-supplied account name
    pub username: String,
    /// Server-assigned alias, unique within the room
    pub display_name: Option<String>,
    pub is_host: bool,
    /// Cumulative points, never decreases within a game
    pub points: u32,
}

impl Player {
    /// Display name with username fallback
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// 4-character join code
    pub id: RoomId,
    pub host_id: PlayerId,
    /// Insertion order is join order; round-robin targeting depends on it
    pub players: Vec<Player>,
    pub state: GamePhase,
    /// 1-based round counter, 0 before the game starts
    pub current_round: u32,
    pub max_rounds: u32,
    /// Cache of the active round's prompt text
    pub current_prompt: Option<String>,
    /// The in-progress round. Never serialized into room snapshots so
    /// response authorship cannot leak during voting.
    #[serde(skip)]
    pub current_round_data: Option<Round>,
    /// Completed rounds, appended after scoring
    #[serde(skip)]
    pub rounds: Vec<Round>,
    /// Bumped on every round initialization and lobby reset; scheduled
    /// phase advances carry the epoch they were created under and no-op
    /// when it has moved on.
    #[serde(skip)]
    pub round_epoch: u64,
}

impl Room {
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == *id)
    }

    /// Display name of a room member, empty if they already left
    pub fn player_name(&self, id: &PlayerId) -> String {
        self.player(id).map(|p| p.name().to_string()).unwrap_or_default()
    }

    /// Recovery path for failed round starts and mid-round role-holder
    /// departures: back to the lobby with all round state cleared.
    pub fn reset_to_lobby(&mut self) {
        self.state = GamePhase::Lobby;
        self.current_round = 0;
        self.current_prompt = None;
        self.current_round_data = None;
        self.round_epoch += 1;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub id: RoundId,
    pub round_number: u32,
    pub prompt: String,
    /// The player being impersonated; submits nothing this round
    pub target_player_id: PlayerId,
    /// The player whose name appears as the prompt's fictional sender
    pub prompt_sender_id: PlayerId,
    /// The player secretly writing the one genuine response
    pub real_impersonator_id: PlayerId,
    pub responses: Vec<GameResponse>,
    pub votes: Vec<Vote>,
    /// Mirror of the room phase, kept in sync by `Room::transition_phase`
    pub state: GamePhase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResponse {
    pub id: ResponseId,
    pub player_id: PlayerId,
    pub text: String,
    /// True iff authored by the round's real impersonator
    pub is_real: bool,
    /// Always equals the number of votes referencing this response
    pub vote_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub voter_id: PlayerId,
    pub response_id: ResponseId,
}

/// Anonymized projection of a response for the voting phase. A separate
/// type rather than a nulled-out `GameResponse`, so authorship and
/// `is_real` cannot be sent by accident.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingResponse {
    pub id: ResponseId,
    pub text: String,
}

impl From<&GameResponse> for VotingResponse {
    fn from(r: &GameResponse) -> Self {
        Self {
            id: r.id.clone(),
            text: r.text.clone(),
        }
    }
}

/// Points a player earned in one round, with a human-readable breakdown
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoundScore {
    pub points_earned: u32,
    pub reason: String,
}

impl RoundScore {
    pub fn add(&mut self, points: u32, reason: &str) {
        self.points_earned += points;
        if !self.reason.is_empty() {
            self.reason.push_str("; ");
        }
        self.reason.push_str(reason);
    }
}
