use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use teexid::api::{self, TOKEN_HEADER};
use teexid::broadcast::PlayerConn;
use teexid::config::{GameConfig, RoomRules};
use teexid::error::GameError;
use teexid::protocol::{
    CardPayload, CommandReply, GameCommand, JoinRequest, ServerMessage, StoryPayload,
};
use teexid::state::{AppState, Room};
use teexid::types::{CardId, PlayerId, RoomState, TurnPhase};
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

fn test_state(max_score: u32) -> AppState {
    AppState::new(GameConfig {
        rules: RoomRules {
            max_score,
            ..RoomRules::default()
        },
        session_secret: Some("integration".to_string()),
        ..GameConfig::default()
    })
}

struct Seat {
    id: PlayerId,
    token: String,
    rx: UnboundedReceiver<ServerMessage>,
}

async fn join(state: &AppState, id: &str, name: &str) -> Seat {
    let joined = state
        .join_room(
            JoinRequest {
                player_id: id.to_string(),
                player_name: name.to_string(),
                room_name: "Lantern Hall".to_string(),
            },
            None,
        )
        .await
        .expect("join should succeed");

    let (room, _) = state.resolve(&joined.room_token).await.unwrap();
    let (conn, rx) = PlayerConn::new(id);
    room.attach(conn).await.unwrap();

    Seat {
        id: id.to_string(),
        token: joined.room_token,
        rx,
    }
}

fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

async fn room_of(state: &AppState, seat: &Seat) -> Arc<Room> {
    state.resolve(&seat.token).await.unwrap().0
}

async fn hand(state: &AppState, seat: &Seat) -> Vec<CardId> {
    room_of(state, seat).await.game().await.players[&seat.id]
        .hand
        .clone()
}

/// Play one turn where every guesser finds the story card
async fn play_turn(state: &AppState, seats: &[Seat]) {
    let room = room_of(state, &seats[0]).await;
    let teller = room
        .game()
        .await
        .current_turn()
        .map(|t| t.story_player_id.clone())
        .unwrap();
    let teller_seat = seats.iter().find(|s| s.id == teller).unwrap();

    let story_card = hand(state, teller_seat).await[0];
    state
        .execute(
            &teller_seat.token,
            GameCommand::SubmitStory(StoryPayload {
                story: "the last train home".to_string(),
                card_id: story_card,
            }),
        )
        .await
        .unwrap();

    for seat in seats.iter().filter(|s| s.id != teller) {
        let card = hand(state, seat).await[0];
        state
            .execute(&seat.token, GameCommand::SubmitCard(CardPayload { card_id: card }))
            .await
            .unwrap();
    }

    for seat in seats.iter().filter(|s| s.id != teller) {
        state
            .execute(&seat.token, GameCommand::Vote(CardPayload { card_id: story_card }))
            .await
            .unwrap();
    }
}

/// End-to-end game: join, ready, start, play until someone wins
#[tokio::test]
async fn test_full_game_flow() {
    let state = test_state(4);
    let mut seats = vec![
        join(&state, "p1", "Alice").await,
        join(&state, "p2", "Bob").await,
        join(&state, "p3", "Carol").await,
    ];

    for seat in &seats {
        state.execute(&seat.token, GameCommand::Ready).await.unwrap();
    }
    state.execute(&seats[0].token, GameCommand::Start).await.unwrap();
    for seat in seats.iter_mut() {
        drain(&mut seat.rx);
    }

    for seat in &seats {
        assert_eq!(hand(&state, seat).await.len(), 5);
    }

    // All-correct turns give the guessers 2 each; p3 guesses twice and reaches 4
    let mut turns = 0;
    loop {
        play_turn(&state, &seats).await;
        turns += 1;
        let room = room_of(&state, &seats[0]).await;
        if room.game().await.state == RoomState::Ended {
            break;
        }
        assert!(turns < 10, "game never ended");
    }
    assert_eq!(turns, 2);

    let room = room_of(&state, &seats[0]).await;
    {
        let game = room.game().await;
        assert_eq!(game.winner.as_deref(), Some("p3"));
        assert_eq!(game.players["p1"].score, 2);
        assert_eq!(game.players["p2"].score, 2);
        assert_eq!(game.players["p3"].score, 4);
    }

    // Every seat saw both turn results and ended on a snapshot with the winner
    for seat in seats.iter_mut() {
        let msgs = drain(&mut seat.rx);
        let results = msgs
            .iter()
            .filter(|m| matches!(m, ServerMessage::OnTurnResult(_)))
            .count();
        assert_eq!(results, 2);

        match msgs.last() {
            Some(ServerMessage::OnRoomStateUpdated(view)) => {
                assert_eq!(view.room_state, RoomState::Ended);
                assert_eq!(view.turn_state, TurnPhase::Scoring);
                assert_eq!(view.winner_id.as_deref(), Some("p3"));
                assert!(view.story_card.is_some());
            }
            other => panic!("Unexpected last message {:?}", other),
        }
    }

    match state
        .execute(&seats[1].token, GameCommand::FetchHistory)
        .await
        .unwrap()
    {
        CommandReply::History { turns } => {
            assert_eq!(turns.len(), 2);
            let tellers: Vec<&str> = turns.iter().map(|t| t.story_player_id.as_str()).collect();
            assert_eq!(tellers, vec!["p1", "p2"]);
            assert!(turns.iter().all(|t| t.votes.len() == 2));
        }
        other => panic!("Unexpected reply {:?}", other),
    }
}

#[tokio::test]
async fn test_reconnect_restores_hand() {
    let state = test_state(30);
    let alice = join(&state, "p1", "Alice").await;
    let bob = join(&state, "p2", "Bob").await;
    for seat in [&alice, &bob] {
        state.execute(&seat.token, GameCommand::Ready).await.unwrap();
    }
    state.execute(&alice.token, GameCommand::Start).await.unwrap();
    let before = hand(&state, &bob).await;

    // Bob comes back over HTTP with his old session, then opens a new socket
    let again = state
        .join_room(
            JoinRequest {
                player_id: "p2".to_string(),
                player_name: "Bob".to_string(),
                room_name: "lantern hall".to_string(),
            },
            Some(&bob.token),
        )
        .await
        .unwrap();
    assert_eq!(again.players.len(), 2);
    assert_eq!(again.state.cards, before);
    assert_eq!(again.state.room_state, RoomState::PlayingGame);

    let room = room_of(&state, &bob).await;
    let (conn, mut rx) = PlayerConn::new("p2");
    room.attach(conn).await.unwrap();
    match drain(&mut rx).as_slice() {
        [ServerMessage::OnPlayersUpdated(_), ServerMessage::OnRoomStateUpdated(view)] => {
            assert_eq!(view.cards, before);
        }
        other => panic!("Unexpected messages {:?}", other),
    }

    // The old socket's queue is closed
    let mut old_rx = bob.rx;
    drain(&mut old_rx);
    assert!(old_rx.recv().await.is_none());
}

#[tokio::test]
async fn test_concurrent_votes_score_once() {
    let state = test_state(30);
    let seats = vec![
        join(&state, "p1", "Alice").await,
        join(&state, "p2", "Bob").await,
        join(&state, "p3", "Carol").await,
        join(&state, "p4", "Dan").await,
    ];
    for seat in &seats {
        state.execute(&seat.token, GameCommand::Ready).await.unwrap();
    }
    state.execute(&seats[0].token, GameCommand::Start).await.unwrap();

    let story_card = hand(&state, &seats[0]).await[0];
    state
        .execute(
            &seats[0].token,
            GameCommand::SubmitStory(StoryPayload {
                story: "salt".to_string(),
                card_id: story_card,
            }),
        )
        .await
        .unwrap();
    for seat in &seats[1..] {
        let card = hand(&state, seat).await[0];
        state
            .execute(&seat.token, GameCommand::SubmitCard(CardPayload { card_id: card }))
            .await
            .unwrap();
    }

    let mut tasks = Vec::new();
    for seat in &seats[1..] {
        let state = state.clone();
        let token = seat.token.clone();
        tasks.push(tokio::spawn(async move {
            state
                .execute(&token, GameCommand::Vote(CardPayload { card_id: story_card }))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let room = room_of(&state, &seats[0]).await;
    let game = room.game().await;
    assert_eq!(game.history().len(), 1);
    assert_eq!(game.turns.len(), 2);
    for id in ["p2", "p3", "p4"] {
        assert_eq!(game.players[id].score, 2);
    }
    assert_eq!(game.players["p1"].score, 0);
}

#[tokio::test]
async fn test_duplicate_actions_rejected() {
    let state = test_state(30);
    let alice = join(&state, "p1", "Alice").await;
    let bob = join(&state, "p2", "Bob").await;
    let carol = join(&state, "p3", "Carol").await;
    for seat in [&alice, &bob, &carol] {
        state.execute(&seat.token, GameCommand::Ready).await.unwrap();
    }
    state.execute(&alice.token, GameCommand::Start).await.unwrap();

    let story_card = hand(&state, &alice).await[0];
    state
        .execute(
            &alice.token,
            GameCommand::SubmitStory(StoryPayload {
                story: "rain".to_string(),
                card_id: story_card,
            }),
        )
        .await
        .unwrap();

    let bob_hand = hand(&state, &bob).await;
    state
        .execute(&bob.token, GameCommand::SubmitCard(CardPayload { card_id: bob_hand[0] }))
        .await
        .unwrap();
    assert_eq!(
        state
            .execute(&bob.token, GameCommand::SubmitCard(CardPayload { card_id: bob_hand[1] }))
            .await,
        Err(GameError::AlreadySubmitted)
    );

    let carol_card = hand(&state, &carol).await[0];
    state
        .execute(&carol.token, GameCommand::SubmitCard(CardPayload { card_id: carol_card }))
        .await
        .unwrap();

    // Bob can't vote for his own card
    assert_eq!(
        state
            .execute(&bob.token, GameCommand::Vote(CardPayload { card_id: bob_hand[0] }))
            .await,
        Err(GameError::InvalidVote(bob_hand[0]))
    );
    state
        .execute(&bob.token, GameCommand::Vote(CardPayload { card_id: carol_card }))
        .await
        .unwrap();
    assert_eq!(
        state
            .execute(&bob.token, GameCommand::Vote(CardPayload { card_id: story_card }))
            .await,
        Err(GameError::AlreadyVoted)
    );
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header(TOKEN_HEADER, token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_http_join_and_command() {
    let state = test_state(30);
    let app = api::router(state.clone());

    let response = app
        .clone()
        .oneshot(post(
            "/join_room",
            None,
            json!({"playerId": "p1", "playerName": "Alice", "roomName": "Attic"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let joined = body_json(response).await;
    assert_eq!(joined["roomId"], "attic");
    assert_eq!(joined["ownerId"], "p1");
    assert_eq!(joined["roomState"], "waiting");
    assert_eq!(joined["turnState"], "not_started");
    let token = joined["roomToken"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(post("/game_command", Some(&token), json!({"command": "ready"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({}));

    let response = app
        .clone()
        .oneshot(post("/game_command", Some(&token), json!({"command": "start"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "NOT_ENOUGH_PLAYERS");

    let response = app
        .clone()
        .oneshot(post("/game_command", Some(&token), json!({"command": "juggle"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "UNKNOWN_COMMAND");
}

#[tokio::test]
async fn test_http_errors() {
    let state = test_state(30);
    let app = api::router(state.clone());

    let response = app
        .clone()
        .oneshot(post("/game_command", None, json!({"command": "ready"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(post(
            "/join_room",
            None,
            json!({"playerId": "p1", "playerName": "", "roomName": "attic"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_ARGUMENT");

    let response = app
        .clone()
        .oneshot(post(
            "/join_room",
            None,
            json!({"playerId": "p1", "playerName": "Alice", "roomName": "attic"}),
        ))
        .await
        .unwrap();
    let token = body_json(response).await["roomToken"]
        .as_str()
        .unwrap()
        .to_string();

    state.rooms.remove("attic").await;
    let response = app
        .clone()
        .oneshot(post("/game_command", Some(&token), json!({"command": "ready"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
