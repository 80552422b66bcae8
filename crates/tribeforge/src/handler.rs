//! Per-connection handler: identification and request routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive `Hello` → resolve or issue the player token
//!   2. Create the player on first contact → send `Welcome`
//!   3. Loop: receive a request → call the lobby → send the reply

use std::sync::Arc;
use std::time::{Duration, Instant};

use tribeforge_lobby::generator::{generate_game_id, generate_player_token};
use tribeforge_lobby::{Lobby, LobbyError};
use tribeforge_protocol::{
    ClientMessage, Codec, Envelope, GameId, PlayerId, ProtocolError,
    Selection, ServerMessage,
};

use crate::TribeforgeError;
use crate::server::ServerState;
use crate::transport::WsConnection;

/// How long a new connection may take to send `Hello`.
pub const HELLO_TIMEOUT: Duration = Duration::from_secs(5);

/// How long an identified connection may stay silent.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Outgoing side of one connection: numbers and encodes replies.
struct Outbox<'a, C: Codec> {
    conn: &'a WsConnection,
    codec: &'a C,
    seq: u64,
    start: Instant,
}

impl<C: Codec> Outbox<'_, C> {
    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    async fn send(&mut self, payload: ServerMessage) -> Result<(), TribeforgeError> {
        let envelope = Envelope::new(self.seq, self.elapsed_ms(), payload);
        self.seq += 1;
        let bytes = self.codec.encode(&envelope)?;
        self.conn.send(bytes).await?;
        Ok(())
    }

    /// Reports `err` to the client as an `Error` frame.
    async fn send_error(&mut self, err: &TribeforgeError) -> Result<(), TribeforgeError> {
        self.send(ServerMessage::Error {
            code: err.status_code(),
            message: err.to_string(),
        })
        .await
    }
}

/// What to do after a request has been handled.
enum Step {
    Reply(ServerMessage),
    Close,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WsConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), TribeforgeError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer(), "handling new connection");

    let mut out = Outbox {
        conn: &conn,
        codec: &state.codec,
        seq: 0,
        start: Instant::now(),
    };

    let player_id = match identify(&conn, &state, &mut out).await {
        Ok(player_id) => player_id,
        Err(e) => {
            conn.close().await;
            return Err(e);
        }
    };
    tracing::debug!(%conn_id, %player_id, "player identified");

    loop {
        let data = match tokio::time::timeout(IDLE_TIMEOUT, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::debug!(%player_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::debug!(%player_id, "connection idle, dropping");
                break;
            }
        };

        let envelope: Envelope<ClientMessage> = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                out.send_error(&TribeforgeError::from(e)).await?;
                continue;
            }
        };

        match dispatch(&state, &player_id, envelope.payload, out.elapsed_ms()).await {
            Ok(Step::Reply(reply)) => out.send(reply).await?,
            Ok(Step::Close) => break,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "request failed");
                out.send_error(&e).await?;
            }
        }
    }

    conn.close().await;
    Ok(())
}

/// Waits for `Hello`, makes sure the player exists, and sends `Welcome`.
async fn identify<C: Codec>(
    conn: &WsConnection,
    state: &ServerState<C>,
    out: &mut Outbox<'_, C>,
) -> Result<PlayerId, TribeforgeError> {
    let data = match tokio::time::timeout(HELLO_TIMEOUT, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before Hello".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("Hello timed out".into()).into());
        }
    };

    let token = match state.codec.decode::<Envelope<ClientMessage>>(&data) {
        Ok(Envelope {
            payload: ClientMessage::Hello { token },
            ..
        }) => token,
        Ok(_) => {
            let err = TribeforgeError::from(ProtocolError::InvalidMessage(
                "first message must be Hello".into(),
            ));
            out.send_error(&err).await?;
            return Err(err);
        }
        Err(e) => {
            let err = TribeforgeError::from(e);
            out.send_error(&err).await?;
            return Err(err);
        }
    };

    let token = match token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => token.to_string(),
        _ => generate_player_token(&mut rand::rng()),
    };
    let player_id = PlayerId(token.clone());

    let name = match welcome_name(&state.lobby, &player_id).await {
        Ok(name) => name,
        Err(e) => {
            let err = TribeforgeError::from(e);
            out.send_error(&err).await?;
            return Err(err);
        }
    };

    out.send(ServerMessage::Welcome {
        player_id: player_id.clone(),
        token,
        name,
    })
    .await?;
    Ok(player_id)
}

/// Creates the player on first contact and returns their display name.
async fn welcome_name(lobby: &Lobby, player_id: &PlayerId) -> Result<String, LobbyError> {
    if lobby.ensure_player(player_id).await? {
        tracing::debug!(%player_id, "issued new player");
    }
    lobby.player_name(player_id).await
}

/// Runs one request against the lobby.
async fn dispatch<C: Codec>(
    state: &ServerState<C>,
    player_id: &PlayerId,
    msg: ClientMessage,
    server_time: u64,
) -> Result<Step, TribeforgeError> {
    let lobby = &state.lobby;
    let reply = match msg {
        ClientMessage::Hello { .. } => {
            return Err(ProtocolError::InvalidMessage(
                "already identified".into(),
            )
            .into());
        }

        ClientMessage::Heartbeat { client_time } => ServerMessage::HeartbeatAck {
            client_time,
            server_time,
        },

        ClientMessage::GetProfile => ServerMessage::Profile {
            name: lobby.player_name(player_id).await?,
        },

        ClientMessage::SetName { name } => ServerMessage::NameChanged {
            name: lobby.set_player_name(player_id, &name).await?,
        },

        ClientMessage::OpenGame { game_id } => {
            let game_id = match game_id {
                Some(id) => checked_game_id(id)?,
                None => GameId(generate_game_id(&mut rand::rng())),
            };
            ServerMessage::GameOpened {
                view: lobby.open_game(&game_id, player_id).await?,
            }
        }

        ClientMessage::GetGame { game_id } => ServerMessage::Game {
            view: lobby.game_view(&checked_game_id(game_id)?).await?,
        },

        ClientMessage::Regenerate { game_id } => ServerMessage::Regenerated {
            view: lobby.regenerate_all(&checked_game_id(game_id)?).await?,
        },

        ClientMessage::ListMyGames => ServerMessage::MyGames {
            game_ids: lobby.player_games(player_id).await?,
        },

        ClientMessage::Randomize {
            players,
            map_types,
            map_sizes,
            tribes,
            difficulties,
        } => ServerMessage::Randomized {
            setup: lobby.randomize(&Selection {
                players,
                map_types,
                map_sizes,
                tribes,
                difficulties,
            })?,
        },

        ClientMessage::Disconnect { reason } => {
            tracing::debug!(%player_id, %reason, "client disconnected");
            return Ok(Step::Close);
        }
    };
    Ok(Step::Reply(reply))
}

/// Rejects blank game ids; surrounding whitespace is dropped.
fn checked_game_id(id: GameId) -> Result<GameId, ProtocolError> {
    let trimmed = id.as_str().trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::InvalidInput {
            kind: "game id",
            value: id.0,
        });
    }
    Ok(GameId::from(trimmed))
}
