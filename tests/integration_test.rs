use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use whotexted::protocol::{ClientMessage, ServerMessage};
use whotexted::state::{AppState, PROMPT_DELAY, REVEAL_DELAY, ROUND_SETUP_DELAY};
use whotexted::types::{GamePhase, RoundRole};
use whotexted::ws::handlers::handle_message;

async fn connect(state: &Arc<AppState>, id: &str) -> mpsc::UnboundedReceiver<ServerMessage> {
    let (tx, rx) = mpsc::unbounded_channel();
    state.register_connection(&id.to_string(), tx).await;
    rx
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut msgs = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        msgs.push(msg);
    }
    msgs
}

/// End-to-end integration test for a complete two-round game
#[tokio::test(start_paused = true)]
async fn test_full_game_flow() {
    let state = Arc::new(AppState::with_max_rounds(2));

    let host = "h1".to_string();
    let p2 = "p2".to_string();
    let p3 = "p3".to_string();

    let mut host_rx = connect(&state, &host).await;
    let mut p2_rx = connect(&state, &p2).await;
    let mut p3_rx = connect(&state, &p3).await;

    // 1. Host creates a room
    let reply = handle_message(
        ClientMessage::CreateRoom { username: "andrew".to_string() },
        &host,
        &state,
    )
    .await;
    let Some(ServerMessage::RoomJoined { room_id, is_host: true, .. }) = reply else {
        panic!("expected room_joined for host, got {reply:?}");
    };

    // 2. Two more players join
    for (id, name) in [(&p2, "blake"), (&p3, "casey")] {
        let reply = handle_message(
            ClientMessage::JoinRoom {
                room_id: room_id.clone(),
                username: name.to_string(),
            },
            id,
            &state,
        )
        .await;
        assert!(
            matches!(reply, Some(ServerMessage::RoomJoined { is_host: false, .. })),
            "join failed for {id}"
        );
    }

    // 3. Lobby chat reaches everyone, sender included
    let reply = handle_message(
        ClientMessage::SendMessage {
            room_id: room_id.clone(),
            text: "ready?".to_string(),
        },
        &p2,
        &state,
    )
    .await;
    assert!(reply.is_none());
    assert!(drain(&mut p2_rx)
        .iter()
        .any(|m| matches!(m, ServerMessage::ChatMessage { text, .. } if text == "ready?")));

    // 4. A non-host cannot start the game
    let reply = handle_message(
        ClientMessage::StartGame { room_id: room_id.clone() },
        &p2,
        &state,
    )
    .await;
    let Some(ServerMessage::Error { code, .. }) = reply else {
        panic!("expected error frame, got {reply:?}");
    };
    assert_eq!(code, "NOT_HOST");

    // 5. Host starts the game
    let reply = handle_message(
        ClientMessage::StartGame { room_id: room_id.clone() },
        &host,
        &state,
    )
    .await;
    assert!(reply.is_none(), "start_game failed: {reply:?}");

    let room = state.room_snapshot(&room_id).await.unwrap();
    assert_eq!(room.state, GamePhase::RoundSetup);
    assert_eq!(room.current_round, 1);
    let round = room.current_round_data.clone().unwrap();
    // Round 1 targets the first joiner
    assert_eq!(round.target_player_id, host);

    // 6. Each player got game_started plus a round_setup with their secret role
    let host_msgs = drain(&mut host_rx);
    assert!(host_msgs.iter().any(|m| matches!(m, ServerMessage::GameStarted { .. })));
    let Some(ServerMessage::RoundSetup { your_role, .. }) = host_msgs
        .iter()
        .find(|m| matches!(m, ServerMessage::RoundSetup { .. }))
    else {
        panic!("host got no round_setup");
    };
    assert_eq!(*your_role, RoundRole::None);

    for (rx, id) in [(&mut p2_rx, &p2), (&mut p3_rx, &p3)] {
        let msgs = drain(rx);
        let Some(ServerMessage::RoundSetup { your_role, .. }) = msgs
            .iter()
            .find(|m| matches!(m, ServerMessage::RoundSetup { .. }))
        else {
            panic!("{id} got no round_setup");
        };
        let expected = if &round.real_impersonator_id == id {
            RoundRole::RealImpersonator
        } else {
            RoundRole::FakeResponder
        };
        assert_eq!(*your_role, expected);
    }

    // 7. Timed advances: roundSetup -> prompt -> responding
    tokio::time::sleep(ROUND_SETUP_DELAY + Duration::from_millis(50)).await;
    assert_eq!(state.room_snapshot(&room_id).await.unwrap().state, GamePhase::Prompt);
    assert!(drain(&mut p3_rx)
        .iter()
        .any(|m| matches!(m, ServerMessage::PromptDisplay { .. })));

    tokio::time::sleep(PROMPT_DELAY + Duration::from_millis(50)).await;
    assert_eq!(state.room_snapshot(&room_id).await.unwrap().state, GamePhase::Responding);

    // 8. The target may not respond
    let reply = handle_message(
        ClientMessage::SubmitResponse {
            room_id: room_id.clone(),
            text: "it is me".to_string(),
        },
        &host,
        &state,
    )
    .await;
    let Some(ServerMessage::Error { code, .. }) = reply else {
        panic!("expected error frame, got {reply:?}");
    };
    assert_eq!(code, "TARGET_CANNOT_ACT");

    // 9. Both non-target players respond; voting opens on the last one
    for (id, text) in [(&p2, "haha what hoodie"), (&p3, "omg sorry, coming to get it")] {
        let reply = handle_message(
            ClientMessage::SubmitResponse {
                room_id: room_id.clone(),
                text: text.to_string(),
            },
            id,
            &state,
        )
        .await;
        assert!(reply.is_none(), "submit_response failed: {reply:?}");
    }

    let host_msgs = drain(&mut host_rx);
    let Some(ServerMessage::VotingPhase { responses, .. }) = host_msgs
        .iter()
        .find(|m| matches!(m, ServerMessage::VotingPhase { .. }))
    else {
        panic!("voting never opened");
    };
    assert_eq!(responses.len(), 2);
    assert_eq!(state.room_snapshot(&room_id).await.unwrap().state, GamePhase::Voting);

    // 10. Impersonator votes wrong on purpose, the other player finds the
    // real response: impersonator earns 2*1+1=3, the other 1+1=2
    let round = state
        .room_snapshot(&room_id)
        .await
        .unwrap()
        .current_round_data
        .clone()
        .unwrap();
    let real_id = round.responses.iter().find(|r| r.is_real).unwrap().id.clone();
    let fake_id = round.responses.iter().find(|r| !r.is_real).unwrap().id.clone();
    let impersonator = round.real_impersonator_id.clone();
    let faker = if impersonator == p2 { p3.clone() } else { p2.clone() };

    for (voter, choice) in [(&impersonator, &fake_id), (&faker, &real_id)] {
        let reply = handle_message(
            ClientMessage::SubmitVote {
                room_id: room_id.clone(),
                response_id: choice.clone(),
            },
            voter,
            &state,
        )
        .await;
        assert!(reply.is_none(), "submit_vote failed: {reply:?}");
    }

    // 11. Reveal restores authorship, then the timed advance scores the round
    assert_eq!(state.room_snapshot(&room_id).await.unwrap().state, GamePhase::Reveal);
    let p2_msgs = drain(&mut p2_rx);
    let Some(ServerMessage::RevealPhase { responses, votes, .. }) = p2_msgs
        .iter()
        .find(|m| matches!(m, ServerMessage::RevealPhase { .. }))
    else {
        panic!("reveal never broadcast");
    };
    assert!(responses.iter().any(|r| r.is_real));
    assert_eq!(votes.len(), 2);

    tokio::time::sleep(REVEAL_DELAY + Duration::from_millis(50)).await;
    let room = state.room_snapshot(&room_id).await.unwrap();
    assert_eq!(room.state, GamePhase::Scoring);
    assert!(room.current_round_data.is_none());

    let points_of = |room: &whotexted::types::Room, id: &str| {
        room.players.iter().find(|p| p.id == id).unwrap().points
    };
    assert_eq!(points_of(&room, &impersonator), 3);
    assert_eq!(points_of(&room, &faker), 2);
    assert_eq!(points_of(&room, &host), 0);

    let p3_msgs = drain(&mut p3_rx);
    let Some(ServerMessage::ScoringPhase { scores, round_summary, .. }) = p3_msgs
        .iter()
        .find(|m| matches!(m, ServerMessage::ScoringPhase { .. }))
    else {
        panic!("scoring never broadcast");
    };
    assert_eq!(scores[&impersonator].points_earned, 3);
    assert!(round_summary.contains_key("prompt"));

    // 12. Round 2: same flow, target rotates to the second joiner
    let reply = handle_message(
        ClientMessage::NextRound { room_id: room_id.clone() },
        &host,
        &state,
    )
    .await;
    assert!(reply.is_none(), "next_round failed: {reply:?}");

    let room = state.room_snapshot(&room_id).await.unwrap();
    assert_eq!(room.current_round, 2);
    let round2 = room.current_round_data.clone().unwrap();
    assert_eq!(round2.target_player_id, p2);

    tokio::time::sleep(ROUND_SETUP_DELAY + PROMPT_DELAY + Duration::from_millis(100)).await;
    assert_eq!(state.room_snapshot(&room_id).await.unwrap().state, GamePhase::Responding);

    for (id, text) in [(&host, "who is this"), (&p3, "new phone sorry")] {
        handle_message(
            ClientMessage::SubmitResponse {
                room_id: room_id.clone(),
                text: text.to_string(),
            },
            id,
            &state,
        )
        .await;
    }

    let round2 = state
        .room_snapshot(&room_id)
        .await
        .unwrap()
        .current_round_data
        .clone()
        .unwrap();
    let real_id = round2.responses.iter().find(|r| r.is_real).unwrap().id.clone();
    for voter in [&host, &p3] {
        handle_message(
            ClientMessage::SubmitVote {
                room_id: room_id.clone(),
                response_id: real_id.clone(),
            },
            voter,
            &state,
        )
        .await;
    }
    tokio::time::sleep(REVEAL_DELAY + Duration::from_millis(50)).await;
    assert_eq!(state.room_snapshot(&room_id).await.unwrap().state, GamePhase::Scoring);

    // 13. Two rounds played, next_round finishes the game
    let reply = handle_message(
        ClientMessage::NextRound { room_id: room_id.clone() },
        &host,
        &state,
    )
    .await;
    assert!(reply.is_none(), "final next_round failed: {reply:?}");

    let room = state.room_snapshot(&room_id).await.unwrap();
    assert_eq!(room.state, GamePhase::Finished);

    let host_msgs = drain(&mut host_rx);
    let Some(ServerMessage::GameFinished { final_scores, winner, .. }) = host_msgs
        .iter()
        .find(|m| matches!(m, ServerMessage::GameFinished { .. }))
    else {
        panic!("game_finished never broadcast");
    };
    assert_eq!(final_scores.len(), 3);
    let best = final_scores.values().max().copied().unwrap();
    assert_eq!(final_scores[&winner.id], best);
    assert_eq!(winner.points, best);
}

/// A disconnect mid-lobby counts as leaving and updates the others
#[tokio::test]
async fn test_disconnect_is_an_implicit_leave() {
    let state = Arc::new(AppState::new());
    let host = "h1".to_string();
    let p2 = "p2".to_string();

    let mut host_rx = connect(&state, &host).await;
    let _p2_rx = connect(&state, &p2).await;

    let reply = handle_message(
        ClientMessage::CreateRoom { username: "a".to_string() },
        &host,
        &state,
    )
    .await;
    let Some(ServerMessage::RoomJoined { room_id, .. }) = reply else {
        panic!("room creation failed");
    };
    handle_message(
        ClientMessage::JoinRoom {
            room_id: room_id.clone(),
            username: "b".to_string(),
        },
        &p2,
        &state,
    )
    .await;
    drain(&mut host_rx);

    state.remove_connection(&p2).await;
    state.handle_disconnect(&p2).await;

    let room = state.room_snapshot(&room_id).await.unwrap();
    assert_eq!(room.players.len(), 1);

    let msgs = drain(&mut host_rx);
    assert!(msgs
        .iter()
        .any(|m| matches!(m, ServerMessage::RoomUpdate { room } if room.players.len() == 1)));
}
