use crate::error::{GameError, GameResult};
use crate::types::*;

/// Record a vote and increment the chosen response's tally in one step
/// under the caller's room lock. Returns true once voting is complete.
pub fn process_vote(
    room: &mut Room,
    voter_id: &PlayerId,
    response_id: &ResponseId,
) -> GameResult<bool> {
    if room.player(voter_id).is_none() {
        return Err(GameError::PlayerNotInRoom);
    }

    {
        let round = room.current_round_data.as_mut().ok_or(GameError::NoActiveRound)?;

        if round.state != GamePhase::Voting {
            return Err(GameError::WrongPhase { actual: round.state });
        }
        if round.target_player_id == *voter_id {
            return Err(GameError::TargetCannotAct);
        }
        if round.votes.iter().any(|v| v.voter_id == *voter_id) {
            return Err(GameError::DuplicateVote);
        }

        let response = round
            .responses
            .iter_mut()
            .find(|r| r.id == *response_id)
            .ok_or(GameError::UnknownResponse)?;
        response.vote_count += 1;

        round.votes.push(Vote {
            voter_id: voter_id.clone(),
            response_id: response_id.clone(),
        });
    }
    tracing::debug!(room_id = %room.id, voter_id = %voter_id, "vote stored");

    Ok(all_votes_submitted(room))
}

/// True once every current player except the target has voted
pub fn all_votes_submitted(room: &Room) -> bool {
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
            .all(|id| round.votes.iter().any(|v| v.voter_id == **id))
}
