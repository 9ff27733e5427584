//! WebSocket server and connection handling.

use crate::host::{GameHost, HostRegistry};
use crate::protocol::{ClientMessage, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use settlers_core::{GameOptions, PlayerId};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
#[derive(Debug, Default)]
pub struct ServerState {
    pub registry: HostRegistry,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Where one connection sits
struct Seat {
    game_id: Uuid,
    seat: PlayerId,
    host: GameHost,
    /// Forwards the game's broadcasts to this connection
    forwarder: JoinHandle<()>,
}

/// Per-connection state
struct Connection {
    id: Uuid,
    outgoing: mpsc::UnboundedSender<ServerMessage>,
    seat: Option<Seat>,
}

impl Connection {
    fn send(&self, msg: ServerMessage) {
        let _ = self.outgoing.send(msg);
    }

    fn leave(&mut self) -> Option<Seat> {
        let seat = self.seat.take()?;
        seat.forwarder.abort();
        Some(seat)
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Settlers server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let mut conn = Connection {
        id: Uuid::new_v4(),
        outgoing: tx,
        seat: None,
    };

    let welcome = ServerMessage::Welcome {
        connection_id: conn.id,
    };
    ws_sender
        .send(Message::Text(serde_json::to_string(&welcome)?.into()))
        .await?;

    // Forward queued messages to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(&mut conn, client_msg, &state).await,
                Err(e) => {
                    warn!("Invalid message from {}: {}", conn.id, e);
                    conn.send(ServerMessage::error(format!("Invalid message: {}", e)));
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", conn.id);
                break;
            }
            Ok(Message::Ping(_)) => conn.send(ServerMessage::Pong),
            Err(e) => {
                error!("WebSocket error from {}: {}", conn.id, e);
                break;
            }
            _ => {}
        }
    }

    handle_disconnect(&mut conn, &state).await;
    send_task.abort();
    info!("Connection closed for {}", conn.id);
    Ok(())
}

/// Handle a client message.
async fn handle_message(conn: &mut Connection, msg: ClientMessage, state: &ServerState) {
    match msg {
        ClientMessage::CreateGame {
            name,
            options,
            seed,
        } => match options.parse::<GameOptions>() {
            Ok(options) => {
                let seed = seed.unwrap_or_else(|| Uuid::new_v4().as_u64_pair().0);
                let (game_id, _) = state.registry.create(&name, options, seed);
                info!(games = state.registry.len(), "hosting");
                conn.send(ServerMessage::GameCreated { game_id });
            }
            Err(e) => conn.send(ServerMessage::error(e)),
        },

        ClientMessage::JoinGame {
            game_id,
            seat,
            player_name,
        } => {
            if conn.seat.is_some() {
                conn.send(ServerMessage::error("Already in a game"));
                return;
            }
            let Some(host) = state.registry.get(&game_id) else {
                conn.send(ServerMessage::error("Game not found"));
                return;
            };
            // Subscribe first so nothing between the join and the forwarder is lost
            let events = host.subscribe();
            match host.join(seat, player_name).await {
                Ok(()) => {
                    let forwarder = spawn_forwarder(events, conn.outgoing.clone());
                    conn.seat = Some(Seat {
                        game_id,
                        seat,
                        host,
                        forwarder,
                    });
                    conn.send(ServerMessage::JoinedGame { game_id, seat });
                }
                Err(e) => conn.send(ServerMessage::error(e)),
            }
        }

        ClientMessage::LeaveGame => match conn.leave() {
            Some(seat) => {
                if let Err(e) = seat.host.leave(seat.seat).await {
                    warn!(game = %seat.game_id, seat = seat.seat, error = %e, "leave failed");
                }
                remove_if_abandoned(&seat, state).await;
                conn.send(ServerMessage::LeftGame);
            }
            None => conn.send(ServerMessage::error("Not in a game")),
        },

        ClientMessage::StartGame => {
            let Some(seat) = &conn.seat else {
                conn.send(ServerMessage::error("Not in a game"));
                return;
            };
            if let Err(e) = seat.host.start().await {
                conn.send(ServerMessage::error(e));
            }
        }

        ClientMessage::GameAction { action } => {
            let Some(seat) = &conn.seat else {
                conn.send(ServerMessage::error("Not in a game"));
                return;
            };
            let reply = match seat.host.apply(seat.seat, action).await {
                Ok(events) => ServerMessage::ActionResult {
                    success: true,
                    events,
                    error: None,
                },
                Err(e) => ServerMessage::ActionResult {
                    success: false,
                    events: vec![],
                    error: Some(e.to_string()),
                },
            };
            conn.send(reply);
        }

        ClientMessage::ForceEndTurn => {
            let Some(seat) = &conn.seat else {
                conn.send(ServerMessage::error("Not in a game"));
                return;
            };
            if let Err(e) = seat.host.force_end_turn().await {
                conn.send(ServerMessage::error(e));
            }
        }

        ClientMessage::GetState => {
            let Some(seat) = &conn.seat else {
                conn.send(ServerMessage::error("Not in a game"));
                return;
            };
            let msg = match seat.host.snapshot().await {
                Ok(game) => match serde_json::to_value(&game) {
                    Ok(state) => ServerMessage::GameState { state },
                    Err(e) => ServerMessage::error(e),
                },
                Err(e) => ServerMessage::error(e),
            };
            conn.send(msg);
        }

        ClientMessage::ListGames => {
            let games = state.registry.summaries().await;
            conn.send(ServerMessage::GameList { games });
        }

        ClientMessage::Ping => conn.send(ServerMessage::Pong),
    }
}

fn spawn_forwarder(
    mut events: broadcast::Receiver<crate::host::HostEvent>,
    outgoing: mpsc::UnboundedSender<ServerMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if outgoing.send(ServerMessage::Broadcast { event }).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "connection fell behind on game events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Handle player disconnect.
///
/// A seat in a game that has not started is given up; once play is under
/// way the seat is kept and the turn is forced along if it was theirs.
async fn handle_disconnect(conn: &mut Connection, state: &ServerState) {
    let Some(seat) = conn.leave() else {
        return;
    };
    let Ok(game) = seat.host.snapshot().await else {
        return;
    };
    if game.state().is_active() {
        if game.current_player() == Some(seat.seat) {
            if let Err(e) = seat.host.force_end_turn().await {
                warn!(game = %seat.game_id, seat = seat.seat, error = %e, "could not force end of turn");
            }
        }
    } else {
        if let Err(e) = seat.host.leave(seat.seat).await {
            warn!(game = %seat.game_id, seat = seat.seat, error = %e, "leave failed");
        }
        remove_if_abandoned(&seat, state).await;
    }
}

/// Drop a game that never started once its last player is gone.
async fn remove_if_abandoned(seat: &Seat, state: &ServerState) {
    let Ok(game) = seat.host.snapshot().await else {
        return;
    };
    if !game.state().is_active() && game.occupied_seats().is_empty() {
        state.registry.remove(&seat.game_id).await;
        info!(game = %seat.game_id, remaining = state.registry.len(), "abandoned game removed");
    }
}
