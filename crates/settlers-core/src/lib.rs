//! Settlers - an authoritative game engine for a hex-based settlers game
//!
//! This crate provides the core game logic, including:
//! - Hex/node/edge coordinate systems for two board encodings
//! - Board representation with terrain, dice numbers, ports and pieces
//! - Player state, resources and development cards
//! - Game state machine with full rule enforcement
//!
//! # Architecture
//!
//! The engine is a plain value mutated through `&mut self`. It never blocks
//! and never reaches for global state: all randomness comes from a seeded
//! RNG owned by each [`Game`]. Hosts serialize access to a game and feed it
//! [`GameAction`]s.
//!
//! # Modules
//!
//! - [`topology`]: The `Topology` trait and the `Grid` dispatcher
//! - [`diagonal`]: The classic 4-player board encoding
//! - [`rowcol`]: The large 6-player board encoding
//! - [`layout`]: Fixed land, dice-path and port data per encoding
//! - [`board`]: Game board representation
//! - [`resources`]: Resource types and counted resource sets
//! - [`player`]: Player state, placement sets and development cards
//! - [`options`]: Per-game rule options
//! - [`game`]: Game state machine
//! - [`actions`]: Player intents, resulting events and dispatch

pub mod actions;
pub mod board;
pub mod diagonal;
pub mod game;
pub mod layout;
pub mod options;
pub mod player;
pub mod resources;
pub mod rowcol;
pub mod topology;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent};
pub use board::{Board, BoardError, HexType, Piece, PieceKind, PlayerId, PortType};
pub use game::{
    ForceEndTurnKind, ForceEndTurnResult, Game, GameError, GameState, MoveRobberResult, Placement,
    ResetVote, RollResult, SeatState, MAX_PLAYERS,
};
pub use options::{GameOptions, OptionsError};
pub use player::{DevCardType, Player, TradeOffer};
pub use resources::{Resource, ResourceSet};
pub use topology::{Coord, Encoding, Facing, Grid, Topology};
