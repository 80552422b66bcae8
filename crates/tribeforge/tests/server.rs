//! Integration tests for the server, handler, and full connection flow.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tribeforge::prelude::*;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server with an in-memory database on a random port.
async fn start_server() -> String {
    start_server_with(LobbyConfig::default()).await
}

async fn start_server_with(lobby_config: LobbyConfig) -> String {
    let server = TribeforgeServer::builder()
        .bind("127.0.0.1:0")
        .database(":memory:")
        .lobby_config(lobby_config)
        .build()
        .await
        .expect("server should build");

    let addr = server.local_addr().expect("should have local addr").to_string();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, payload: ClientMessage) {
    let bytes = serde_json::to_string(&Envelope::new(0, 0, payload)).expect("encode");
    ws.send(Message::text(bytes)).await.expect("send");
}

async fn recv(ws: &mut ClientWs) -> ServerMessage {
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("reply in time")
        .expect("stream open")
        .expect("frame");
    let env: Envelope<ServerMessage> =
        serde_json::from_slice(&msg.into_data()).expect("decode");
    env.payload
}

async fn request(ws: &mut ClientWs, payload: ClientMessage) -> ServerMessage {
    send(ws, payload).await;
    recv(ws).await
}

/// Sends `Hello` and returns `(player_id, token, name)` from `Welcome`.
async fn hello(ws: &mut ClientWs, token: Option<&str>) -> (PlayerId, String, String) {
    let reply = request(
        ws,
        ClientMessage::Hello {
            token: token.map(str::to_string),
        },
    )
    .await;
    match reply {
        ServerMessage::Welcome {
            player_id,
            token,
            name,
        } => (player_id, token, name),
        other => panic!("expected Welcome, got {other:?}"),
    }
}

async fn open_game(ws: &mut ClientWs, game_id: Option<&str>) -> GameView {
    let reply = request(
        ws,
        ClientMessage::OpenGame {
            game_id: game_id.map(GameId::from),
        },
    )
    .await;
    match reply {
        ServerMessage::GameOpened { view } => view,
        other => panic!("expected GameOpened, got {other:?}"),
    }
}

fn error_code(reply: ServerMessage) -> u16 {
    match reply {
        ServerMessage::Error { code, .. } => code,
        other => panic!("expected Error, got {other:?}"),
    }
}

// =========================================================================
// Identification
// =========================================================================

#[tokio::test]
async fn test_hello_without_token_issues_new_player() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let (player_id, token, name) = hello(&mut ws, None).await;

    assert_eq!(token.len(), 32);
    assert_eq!(player_id.as_str(), token);
    assert_eq!(name, "New Player");
}

#[tokio::test]
async fn test_hello_with_token_resumes_player() {
    let addr = start_server().await;

    let mut first = connect(&addr).await;
    let (_, token, _) = hello(&mut first, None).await;
    let reply = request(&mut first, ClientMessage::SetName { name: "Ada".into() }).await;
    assert_eq!(reply, ServerMessage::NameChanged { name: "Ada".into() });
    drop(first);

    let mut second = connect(&addr).await;
    let (player_id, again, name) = hello(&mut second, Some(&token)).await;
    assert_eq!(again, token);
    assert_eq!(player_id, PlayerId(token));
    assert_eq!(name, "Ada");
}

#[tokio::test]
async fn test_first_message_must_be_hello() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let reply = request(&mut ws, ClientMessage::GetProfile).await;

    assert_eq!(error_code(reply), 400);
}

#[tokio::test]
async fn test_second_hello_is_rejected() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, None).await;

    let reply = request(&mut ws, ClientMessage::Hello { token: None }).await;

    assert_eq!(error_code(reply), 400);
}

// =========================================================================
// Requests
// =========================================================================

#[tokio::test]
async fn test_heartbeat_echoes_client_time() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, None).await;

    let reply = request(&mut ws, ClientMessage::Heartbeat { client_time: 12345 }).await;

    assert!(matches!(
        reply,
        ServerMessage::HeartbeatAck { client_time: 12345, .. }
    ));
}

#[tokio::test]
async fn test_set_name_blank_is_400_and_keeps_name() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, Some("p1")).await;

    let reply = request(&mut ws, ClientMessage::SetName { name: "  ".into() }).await;
    assert_eq!(error_code(reply), 400);

    let reply = request(&mut ws, ClientMessage::GetProfile).await;
    assert_eq!(reply, ServerMessage::Profile { name: "New Player".into() });
}

#[tokio::test]
async fn test_open_game_without_id_creates_fresh_game() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, None).await;

    let view = open_game(&mut ws, None).await;

    assert_eq!(view.game_id.as_str().len(), 16);
    assert_eq!(view.config.bots.total(), 8);
    assert_eq!(view.players.len(), 1);
    assert_eq!(view.players[0].name, "New Player");
}

#[tokio::test]
async fn test_two_players_share_a_game_and_bots_shrink() {
    let addr = start_server().await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;
    hello(&mut alice, Some("alice")).await;
    hello(&mut bob, Some("bob")).await;
    request(&mut alice, ClientMessage::SetName { name: "Alice".into() }).await;
    request(&mut bob, ClientMessage::SetName { name: "Bob".into() }).await;

    let first = open_game(&mut alice, Some("shared")).await;
    let second = open_game(&mut bob, Some("shared")).await;
    let again = open_game(&mut alice, Some("shared")).await;

    assert_eq!(first.config.bots.total(), 8);
    assert_eq!(second.config.bots.total(), 7);
    assert_eq!(second.config.map_type, first.config.map_type);
    assert_eq!(second.config.map_size, first.config.map_size);
    assert_eq!(again, second, "reopening as a member changes nothing");

    let names: Vec<_> = second.players.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Alice", "Bob"]);
}

#[tokio::test]
async fn test_get_game_does_not_join() {
    let addr = start_server().await;
    let mut owner = connect(&addr).await;
    let mut viewer = connect(&addr).await;
    hello(&mut owner, Some("owner")).await;
    hello(&mut viewer, Some("viewer")).await;
    open_game(&mut owner, Some("g1")).await;

    let reply = request(&mut viewer, ClientMessage::GetGame { game_id: GameId::from("g1") }).await;
    let ServerMessage::Game { view } = reply else {
        panic!("expected Game, got {reply:?}");
    };
    assert_eq!(view.players.len(), 1);

    let reply = request(&mut viewer, ClientMessage::ListMyGames).await;
    assert_eq!(reply, ServerMessage::MyGames { game_ids: Vec::new() });
}

#[tokio::test]
async fn test_get_unknown_game_is_404() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, None).await;

    let reply = request(&mut ws, ClientMessage::GetGame { game_id: GameId::from("nope") }).await;

    assert_eq!(error_code(reply), 404);
}

#[tokio::test]
async fn test_blank_game_id_is_400() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, None).await;

    let reply = request(
        &mut ws,
        ClientMessage::OpenGame {
            game_id: Some(GameId::from(" ")),
        },
    )
    .await;

    assert_eq!(error_code(reply), 400);
}

#[tokio::test]
async fn test_regenerate_keeps_members_and_seat_total() {
    let addr = start_server_with(LobbyConfig { total_seats: 5 }).await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, Some("p1")).await;
    let opened = open_game(&mut ws, Some("g1")).await;

    let reply = request(&mut ws, ClientMessage::Regenerate { game_id: GameId::from("g1") }).await;
    let ServerMessage::Regenerated { view } = reply else {
        panic!("expected Regenerated, got {reply:?}");
    };

    assert_eq!(view.config.bots.total(), 4);
    assert_eq!(view.players.len(), 1);
    assert_eq!(view.players[0].name, opened.players[0].name);
}

#[tokio::test]
async fn test_regenerate_unknown_game_is_404() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, None).await;

    let reply = request(&mut ws, ClientMessage::Regenerate { game_id: GameId::from("nope") }).await;

    assert_eq!(error_code(reply), 404);
}

#[tokio::test]
async fn test_list_my_games() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, None).await;
    open_game(&mut ws, Some("a")).await;
    open_game(&mut ws, Some("b")).await;

    let reply = request(&mut ws, ClientMessage::ListMyGames).await;

    assert_eq!(
        reply,
        ServerMessage::MyGames {
            game_ids: vec![GameId::from("a"), GameId::from("b")]
        }
    );
}

#[tokio::test]
async fn test_randomize_draws_from_selection_without_storing() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, None).await;

    let reply = request(
        &mut ws,
        ClientMessage::Randomize {
            players: 4,
            map_types: vec![MapType::Continents],
            map_sizes: vec![MapSize::Normal],
            tribes: vec![Tribe::Vengir, Tribe::Cymanti],
            difficulties: vec![Difficulty::Normal],
        },
    )
    .await;
    let ServerMessage::Randomized { setup } = reply else {
        panic!("expected Randomized, got {reply:?}");
    };

    assert_eq!(setup.config.map_type, MapType::Continents);
    assert_eq!(setup.config.map_size, MapSize::Normal);
    assert!(setup.config.bots.total() <= 5);
    assert_eq!(setup.config.bots.normal, setup.config.bots.total());
    assert_eq!(setup.tribes.len(), 4);
    assert!(setup.tribes.iter().all(|t| [Tribe::Vengir, Tribe::Cymanti].contains(t)));

    let reply = request(&mut ws, ClientMessage::ListMyGames).await;
    assert_eq!(reply, ServerMessage::MyGames { game_ids: Vec::new() });
}

#[tokio::test]
async fn test_randomize_with_empty_selection_is_400() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, None).await;

    let reply = request(
        &mut ws,
        ClientMessage::Randomize {
            players: 2,
            map_types: vec![MapType::Pangea],
            map_sizes: Vec::new(),
            tribes: vec![Tribe::Imperius],
            difficulties: vec![Difficulty::Easy],
        },
    )
    .await;

    let ServerMessage::Error { code, message } = reply else {
        panic!("expected Error, got {reply:?}");
    };
    assert_eq!(code, 400);
    assert!(message.contains("map sizes"), "{message}");
}

#[tokio::test]
async fn test_randomize_with_unknown_value_is_400() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, None).await;

    ws.send(Message::text(
        r#"{"seq":1,"timestamp":0,"payload":{"type":"Randomize","players":1,
            "map_types":["Pangea"],"map_sizes":["Tiny"],"tribes":["Romans"],
            "difficulties":["Easy"]}}"#,
    ))
    .await
    .expect("send");

    assert_eq!(error_code(recv(&mut ws).await), 400);
}

// =========================================================================
// Connection handling
// =========================================================================

#[tokio::test]
async fn test_garbage_frame_gets_400_and_connection_survives() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, None).await;

    ws.send(Message::text("not json")).await.expect("send");
    assert_eq!(error_code(recv(&mut ws).await), 400);

    let reply = request(&mut ws, ClientMessage::Heartbeat { client_time: 1 }).await;
    assert!(matches!(reply, ServerMessage::HeartbeatAck { .. }));
}

#[tokio::test]
async fn test_reply_sequence_numbers_increase() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let mut seqs = Vec::new();
    for payload in [
        ClientMessage::Hello { token: None },
        ClientMessage::GetProfile,
        ClientMessage::ListMyGames,
    ] {
        let bytes = serde_json::to_string(&Envelope::new(0, 0, payload)).unwrap();
        ws.send(Message::text(bytes)).await.unwrap();
        let msg = ws.next().await.unwrap().unwrap();
        let env: Envelope<ServerMessage> = serde_json::from_slice(&msg.into_data()).unwrap();
        seqs.push(env.seq);
    }

    assert_eq!(seqs, [0, 1, 2]);
}

#[tokio::test]
async fn test_disconnect_closes_connection() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    hello(&mut ws, None).await;

    send(&mut ws, ClientMessage::Disconnect { reason: "bye".into() }).await;

    let result = tokio::time::timeout(Duration::from_secs(2), ws.next()).await;
    match result {
        Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Ok(Some(Err(_))) => {}
        other => panic!("expected close, got {other:?}"),
    }
}

#[tokio::test]
async fn test_run_until_stops_and_closes_database() {
    let dir = std::env::temp_dir().join(format!("tribeforge-server-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let db = dir.join("lobby.db");
    let _ = std::fs::remove_file(&db);

    let server = TribeforgeServer::builder()
        .bind("127.0.0.1:0")
        .database(&db)
        .build()
        .await
        .unwrap();
    let addr = server.local_addr().unwrap().to_string();
    let (stop, stopped) = oneshot::channel::<()>();
    let running = tokio::spawn(server.run_until(async {
        let _ = stopped.await;
    }));

    let mut ws = connect(&addr).await;
    hello(&mut ws, Some("keeper")).await;
    open_game(&mut ws, Some("kept")).await;

    stop.send(()).unwrap();
    running.await.unwrap().unwrap();

    // Everything written before shutdown is visible to a fresh server.
    let server = TribeforgeServer::builder()
        .bind("127.0.0.1:0")
        .database(&db)
        .build()
        .await
        .unwrap();
    let view = server.lobby().game_view(&GameId::from("kept")).await.unwrap();
    assert_eq!(view.players.len(), 1);
    assert_eq!(view.config.bots.total(), 8);

    drop(server);
    let _ = std::fs::remove_dir_all(&dir);
}
