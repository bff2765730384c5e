use crate::error::{GameError, GameResult};
use crate::types::*;

/// Upper bound on a response, in characters
pub const MAX_RESPONSE_CHARS: usize = 200;

/// Check that `player_id` may submit `text` right now. Rejections never
/// touch room state.
pub fn validate_response(room: &Room, player_id: &PlayerId, text: &str) -> GameResult<()> {
    let round = room.current_round_data.as_ref().ok_or(GameError::NoActiveRound)?;

    if round.state != GamePhase::Responding {
        return Err(GameError::WrongPhase { actual: round.state });
    }
    if room.player(player_id).is_none() {
        return Err(GameError::PlayerNotInRoom);
    }
    if round.target_player_id == *player_id {
        return Err(GameError::TargetCannotAct);
    }
    if round.responses.iter().any(|r| r.player_id == *player_id) {
        return Err(GameError::DuplicateResponse);
    }

    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_RESPONSE_CHARS {
        return Err(GameError::InvalidResponseText);
    }

    Ok(())
}

/// Validate and store a response. `is_real` is derived here and never
/// taken from the client.
pub fn process_response(
    room: &mut Room,
    player_id: &PlayerId,
    text: &str,
) -> GameResult<GameResponse> {
    validate_response(room, player_id, text)?;

    // validate_response proved the round exists
    let Some(round) = room.current_round_data.as_mut() else {
        return Err(GameError::NoActiveRound);
    };

    let response = GameResponse {
        id: ulid::Ulid::new().to_string(),
        player_id: player_id.clone(),
        text: text.trim().to_string(),
        is_real: round.real_impersonator_id == *player_id,
        vote_count: 0,
    };
    round.responses.push(response.clone());
    tracing::debug!(room_id = %room.id, player_id = %player_id, "response stored");

    Ok(response)
}

/// True once every current player except the target has a response in.
/// Evaluated against present membership, so a mid-round leaver can't wedge
/// the round open.
pub fn all_responses_submitted(room: &Room) -> bool {
    let Some(round) = room.current_round_data.as_ref() else {
        return false;
    };

    let expected: Vec<&PlayerId> = room
        .players
        .iter()
        .filter(|p| p.id != round.target_player_id)
        .map(|p| &p.id)
        .collect();

    !expected.is_empty()
        && expected
            .iter()
            .all(|id| round.responses.iter().any(|r| r.player_id == **id))
}
