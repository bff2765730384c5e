use crate::types::*;
use std::collections::HashMap;

/// Per-round score breakdown. Every non-target player gets an entry, zero
/// or not, so clients can render a complete table.
///
/// - real impersonator: 2 points per correct vote their real response
///   drew, plus 1 per wrong vote cast this round
/// - fake authors: 1 point per vote their fake collected
/// - voters who found the real response (other than the impersonator
///   voting for themselves): 1 point
pub fn calculate_round_scores(
    round: &Round,
    players: &[Player],
) -> HashMap<PlayerId, RoundScore> {
    let mut scores: HashMap<PlayerId, RoundScore> = players
        .iter()
        .filter(|p| p.id != round.target_player_id)
        .map(|p| (p.id.clone(), RoundScore::default()))
        .collect();

    let Some(real) = round.responses.iter().find(|r| r.is_real) else {
        // Round reached scoring without a real response; nobody scores
        tracing::warn!(round_id = %round.id, "no real response at scoring time");
        return scores;
    };

    let correct = round.votes.iter().filter(|v| v.response_id == real.id).count() as u32;
    let wrong = round.votes.len() as u32 - correct;

    if let Some(entry) = scores.get_mut(&round.real_impersonator_id) {
        entry.add(
            2 * correct + wrong,
            &format!("real response drew {correct} correct and {wrong} wrong votes"),
        );
    }

    for response in round.responses.iter().filter(|r| !r.is_real) {
        if response.vote_count > 0 {
            if let Some(entry) = scores.get_mut(&response.player_id) {
                entry.add(
                    response.vote_count,
                    &format!("fooled {} voters", response.vote_count),
                );
            }
        }
    }

    for vote in &round.votes {
        if vote.response_id == real.id && vote.voter_id != round.real_impersonator_id {
            if let Some(entry) = scores.get_mut(&vote.voter_id) {
                entry.add(1, "spotted the real response");
            }
        }
    }

    scores
}

/// True once the configured number of rounds has been played
pub fn check_game_completion(room: &Room) -> bool {
    room.current_round >= room.max_rounds
}

/// Highest cumulative points wins; ties go to whoever joined first.
pub fn resolve_winner(players: &[Player]) -> Option<&Player> {
    let mut winner: Option<&Player> = None;
    for player in players {
        match winner {
            Some(best) if player.points <= best.points => {}
            _ => winner = Some(player),
        }
    }
    winner
}

/// Human-readable recap of who was who, shown alongside the score table
pub fn round_summary(room: &Room, round: &Round) -> HashMap<String, String> {
    HashMap::from([
        ("prompt".to_string(), round.prompt.clone()),
        ("targetPlayer".to_string(), room.player_name(&round.target_player_id)),
        ("promptSender".to_string(), room.player_name(&round.prompt_sender_id)),
        (
            "realImpersonator".to_string(),
            room.player_name(&round.real_impersonator_id),
        ),
    ])
}
