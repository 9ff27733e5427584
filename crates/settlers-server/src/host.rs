//! Single-writer game hosting.
//!
//! Each [`GameHost`] owns one [`Game`] inside a tokio task. Callers send
//! [`HostCommand`]s over an mpsc channel and get the result back on a oneshot;
//! the task applies commands strictly in arrival order and broadcasts what
//! happened to every subscriber.

use dashmap::DashMap;
use settlers_core::{Game, GameAction, GameError, GameEvent, GameOptions, GameState, PlayerId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Pending commands per host before senders wait
const COMMAND_BUFFER: usize = 64;

/// Broadcast backlog per subscriber before the oldest messages drop
const BROADCAST_BUFFER: usize = 256;

#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error("Game host has shut down")]
    Closed,
}

type Reply<T> = oneshot::Sender<Result<T, GameError>>;

/// Requests handled by the host task
#[derive(Debug)]
pub enum HostCommand {
    Join {
        seat: PlayerId,
        name: String,
        reply: Reply<()>,
    },
    Leave {
        seat: PlayerId,
        reply: Reply<()>,
    },
    SetRobot {
        seat: PlayerId,
        robot: bool,
        reply: Reply<()>,
    },
    Start {
        reply: Reply<()>,
    },
    Apply {
        player: PlayerId,
        action: GameAction,
        reply: Reply<Vec<GameEvent>>,
    },
    ForceEndTurn {
        reply: Reply<Vec<GameEvent>>,
    },
    Snapshot {
        reply: oneshot::Sender<Game>,
    },
    Shutdown,
}

/// What subscribers hear
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum HostEvent {
    PlayerJoined { seat: PlayerId, name: String },
    PlayerLeft { seat: PlayerId },
    Started { first_player: Option<PlayerId> },
    Game { event: GameEvent },
    /// A unanimous vote replaced the game with a fresh board
    BoardReset { first_player: Option<PlayerId> },
}

/// Handle to a running host task. Cheap to clone.
#[derive(Debug, Clone)]
pub struct GameHost {
    commands: mpsc::Sender<HostCommand>,
    events: broadcast::Sender<HostEvent>,
}

impl GameHost {
    /// Spawn a task that owns `game` until every handle is dropped or
    /// [`GameHost::shutdown`] is called.
    pub fn spawn(game: Game) -> Self {
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let (events, _) = broadcast::channel(BROADCAST_BUFFER);
        tokio::spawn(run(game, rx, events.clone()));
        Self { commands, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> HostCommand,
    ) -> Result<T, HostError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| HostError::Closed)?;
        Ok(rx.await.map_err(|_| HostError::Closed)??)
    }

    pub async fn join(&self, seat: PlayerId, name: impl Into<String>) -> Result<(), HostError> {
        let name = name.into();
        self.request(|reply| HostCommand::Join { seat, name, reply })
            .await
    }

    pub async fn leave(&self, seat: PlayerId) -> Result<(), HostError> {
        self.request(|reply| HostCommand::Leave { seat, reply }).await
    }

    pub async fn set_robot(&self, seat: PlayerId, robot: bool) -> Result<(), HostError> {
        self.request(|reply| HostCommand::SetRobot { seat, robot, reply })
            .await
    }

    pub async fn start(&self) -> Result<(), HostError> {
        self.request(|reply| HostCommand::Start { reply }).await
    }

    pub async fn apply(
        &self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, HostError> {
        self.request(|reply| HostCommand::Apply {
            player,
            action,
            reply,
        })
        .await
    }

    /// Cut the current turn short, e.g. when a player times out.
    pub async fn force_end_turn(&self) -> Result<Vec<GameEvent>, HostError> {
        self.request(|reply| HostCommand::ForceEndTurn { reply })
            .await
    }

    /// A copy of the game as it stands
    pub async fn snapshot(&self) -> Result<Game, HostError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(HostCommand::Snapshot { reply })
            .await
            .map_err(|_| HostError::Closed)?;
        rx.await.map_err(|_| HostError::Closed)
    }

    pub async fn shutdown(&self) {
        let _ = self.commands.send(HostCommand::Shutdown).await;
    }
}

async fn run(
    mut game: Game,
    mut commands: mpsc::Receiver<HostCommand>,
    events: broadcast::Sender<HostEvent>,
) {
    info!(game = game.name(), "game host started");
    while let Some(command) = commands.recv().await {
        match command {
            HostCommand::Join { seat, name, reply } => {
                let result = game.add_player(&name, seat);
                if result.is_ok() {
                    let _ = events.send(HostEvent::PlayerJoined { seat, name });
                }
                let _ = reply.send(result);
            }
            HostCommand::Leave { seat, reply } => {
                let result = game.remove_player(seat);
                if result.is_ok() {
                    let _ = events.send(HostEvent::PlayerLeft { seat });
                }
                let _ = reply.send(result);
            }
            HostCommand::SetRobot { seat, robot, reply } => {
                let _ = reply.send(game.set_robot(seat, robot));
            }
            HostCommand::Start { reply } => {
                let result = game.start_game();
                if result.is_ok() {
                    let _ = events.send(HostEvent::Started {
                        first_player: game.first_player(),
                    });
                }
                let _ = reply.send(result);
            }
            HostCommand::Apply {
                player,
                action,
                reply,
            } => {
                let result = game.apply_action(player, action);
                if let Ok(produced) = &result {
                    publish(&events, produced);
                    let accepted = produced
                        .iter()
                        .any(|e| matches!(e, GameEvent::ResetVoteDecided { accepted: true }));
                    if accepted {
                        reset_board(&mut game, &events);
                    }
                }
                let _ = reply.send(result);
            }
            HostCommand::ForceEndTurn { reply } => {
                let result = game.apply_force_end_turn();
                if let Ok(produced) = &result {
                    publish(&events, produced);
                }
                let _ = reply.send(result);
            }
            HostCommand::Snapshot { reply } => {
                let _ = reply.send(game.clone());
            }
            HostCommand::Shutdown => break,
        }
    }
    info!(game = game.name(), state = ?game.state(), "game host stopped");
}

fn publish(events: &broadcast::Sender<HostEvent>, produced: &[GameEvent]) {
    for event in produced {
        // No subscribers is fine
        let _ = events.send(HostEvent::Game {
            event: event.clone(),
        });
    }
}

/// Swap in a fresh copy of the game and start it again.
fn reset_board(game: &mut Game, events: &broadcast::Sender<HostEvent>) {
    let mut fresh = game.reset_as_copy();
    if let Err(e) = fresh.start_game() {
        warn!(game = game.name(), error = %e, "could not restart after board reset");
    }
    debug!(game = game.name(), old_state = ?game.old_state(), "board reset");
    *game = fresh;
    let _ = events.send(HostEvent::BoardReset {
        first_player: game.first_player(),
    });
}

/// Summary of a hosted game for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSummary {
    pub id: Uuid,
    pub name: String,
    pub state: GameState,
    pub seated: usize,
    pub max_players: u8,
}

/// All games hosted by this process
#[derive(Debug, Default)]
pub struct HostRegistry {
    hosts: DashMap<Uuid, GameHost>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and spawn a new game; returns its id.
    pub fn create(&self, name: &str, options: GameOptions, seed: u64) -> (Uuid, GameHost) {
        let id = Uuid::new_v4();
        let host = GameHost::spawn(Game::new(name, options, seed));
        self.hosts.insert(id, host.clone());
        info!(%id, name, %options, "game created");
        (id, host)
    }

    pub fn get(&self, id: &Uuid) -> Option<GameHost> {
        self.hosts.get(id).map(|h| h.clone())
    }

    /// Stop and forget a game
    pub async fn remove(&self, id: &Uuid) -> bool {
        match self.hosts.remove(id) {
            Some((_, host)) => {
                host.shutdown().await;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Listing of every game still answering
    pub async fn summaries(&self) -> Vec<GameSummary> {
        let hosts: Vec<(Uuid, GameHost)> = self
            .hosts
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        let mut out = Vec::new();
        for (id, host) in hosts {
            if let Ok(game) = host.snapshot().await {
                out.push(GameSummary {
                    id,
                    name: game.name().to_string(),
                    state: game.state(),
                    seated: game.occupied_seats().len(),
                    max_players: game.options().max_players,
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_player_host(seed: u64) -> GameHost {
        GameHost::spawn(Game::new("host-test", GameOptions::default(), seed))
    }

    #[tokio::test]
    async fn test_commands_apply_in_order() {
        let host = two_player_host(1);
        host.join(0, "alice").await.unwrap();
        host.join(1, "bob").await.unwrap();
        host.start().await.unwrap();

        let game = host.snapshot().await.unwrap();
        assert_eq!(game.state(), GameState::Start1A);
        assert_eq!(game.occupied_seats(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_game_errors_come_back() {
        let host = two_player_host(2);
        host.join(0, "alice").await.unwrap();
        let err = host.join(1, "alice").await.unwrap_err();
        assert!(matches!(err, HostError::Game(GameError::AlreadySeated)));

        let err = host.apply(0, GameAction::RollDice).await.unwrap_err();
        assert!(matches!(err, HostError::Game(GameError::NotYourTurn)));
    }

    #[tokio::test]
    async fn test_subscribers_see_events() {
        let host = two_player_host(3);
        let mut rx = host.subscribe();
        host.join(0, "alice").await.unwrap();
        host.join(1, "bob").await.unwrap();
        host.start().await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            HostEvent::PlayerJoined {
                seat: 0,
                name: "alice".to_string(),
            }
        );
        assert!(matches!(rx.recv().await.unwrap(), HostEvent::PlayerJoined { seat: 1, .. }));
        assert!(matches!(rx.recv().await.unwrap(), HostEvent::Started { first_player: Some(_) }));

        let game = host.snapshot().await.unwrap();
        let cp = game.current_player().unwrap();
        let node = *game.player(cp).unwrap().potential_settlements().iter().next().unwrap();
        let events = host
            .apply(cp, GameAction::PlaceSettlement { node })
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            rx.recv().await.unwrap(),
            HostEvent::Game { event: GameEvent::PieceBuilt { .. } }
        ));
    }

    #[tokio::test]
    async fn test_unanimous_vote_resets_board() {
        let host = two_player_host(4);
        host.join(0, "alice").await.unwrap();
        host.join(1, "bob").await.unwrap();
        host.start().await.unwrap();

        host.apply(0, GameAction::RequestReset).await.unwrap();
        let events = host
            .apply(1, GameAction::ResetVote { yes: true })
            .await
            .unwrap();
        assert!(events.contains(&GameEvent::ResetVoteDecided { accepted: true }));

        let game = host.snapshot().await.unwrap();
        assert!(game.is_from_board_reset());
        assert_eq!(game.state(), GameState::Start1A);
        assert_eq!(game.player(1).unwrap().name, "bob");
    }

    #[tokio::test]
    async fn test_shutdown_closes_host() {
        let host = two_player_host(5);
        host.shutdown().await;
        let err = host.join(0, "late").await.unwrap_err();
        assert!(matches!(err, HostError::Closed));
    }

    #[tokio::test]
    async fn test_registry() {
        let registry = HostRegistry::new();
        let (id, host) = registry.create("listed", GameOptions::default(), 9);
        host.join(0, "alice").await.unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.get(&id).is_some());
        let summaries = registry.summaries().await;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].seated, 1);
        assert_eq!(summaries[0].state, GameState::Ready);

        assert!(registry.remove(&id).await);
        assert!(registry.is_empty());
        assert!(!registry.remove(&id).await);
    }
}
