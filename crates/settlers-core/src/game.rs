//! Core game state machine.
//!
//! This module contains:
//! - `GameState`, the phases a game moves through
//! - `Game`: seats, players, board, deck, awards, and every rule-checked operation
//! - Forced end-of-turn and board-reset voting
//!
//! Most operations come in pairs. `can_x` answers whether `x` is legal right
//! now; `x` runs the same check before changing anything and returns a
//! [`GameError`] when it fails.

use crate::board::{Board, BoardError, HexType, Piece, PieceKind, PlayerId, PortType};
use crate::options::GameOptions;
use crate::player::{DevCardType, Player, TradeOffer};
use crate::resources::{costs, Resource, ResourceSet};
use crate::topology::{Coord, Topology};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, trace};

/// Seats in every game; `PL` limits how many may be occupied
pub const MAX_PLAYERS: usize = 6;

/// Minimum road length for Longest Road
const MIN_LONGEST_ROAD: u32 = 5;

/// Minimum knights for Largest Army
const MIN_LARGEST_ARMY: u32 = 3;

/// Hand size above which a rolled 7 forces a discard
const DISCARD_LIMIT: i32 = 7;

/// Game phase. Declaration order matters: phases compare by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GameState {
    /// Created, nobody seated yet
    New,
    /// At least one player seated, not started
    Ready,
    /// Initial placement, first settlement
    Start1A,
    /// Initial placement, first road
    Start1B,
    /// Initial placement, second settlement
    Start2A,
    /// Initial placement, second road
    Start2B,
    /// Turn started, dice not rolled
    Play,
    /// Dice rolled; build, trade or end the turn
    Play1,
    PlacingRoad,
    PlacingSettlement,
    PlacingCity,
    PlacingRobber,
    /// First free road from a road-building card
    PlacingFreeRoad1,
    /// Second (or only) free road from a road-building card
    PlacingFreeRoad2,
    WaitingForDiscards,
    /// Robber moved next to several players; pick one to rob
    WaitingForChoice,
    WaitingForDiscovery,
    WaitingForMonopoly,
    Over,
    /// This game was replaced by a board reset
    ResetOld,
}

impl GameState {
    pub fn is_initial_placement(self) -> bool {
        (GameState::Start1A..=GameState::Start2B).contains(&self)
    }

    /// Between the first placement and the end of the game
    pub fn is_active(self) -> bool {
        (GameState::Start1A..GameState::Over).contains(&self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeatState {
    Vacant,
    Occupied,
}

/// One seat's answer to a board-reset request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetVote {
    None,
    Yes,
    No,
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Invalid action for current state")]
    InvalidState,

    #[error("Invalid placement location")]
    InvalidLocation,

    #[error("Cannot afford this")]
    CannotAfford,

    #[error("No pieces remaining")]
    NoPiecesRemaining,

    #[error("No development cards left in deck")]
    EmptyDeck,

    #[error("Don't have that card")]
    NoSuchCard,

    #[error("Already played a development card this turn")]
    CardAlreadyPlayed,

    #[error("Invalid trade")]
    InvalidTrade,

    #[error("Trading between players is disabled")]
    TradingDisabled,

    #[error("Invalid discard")]
    InvalidDiscard,

    #[error("Cannot rob that player")]
    InvalidVictim,

    #[error("Seat is vacant")]
    SeatVacant,

    #[error("No such seat")]
    InvalidSeat,

    #[error("Seat is locked")]
    SeatLocked,

    #[error("Game is full")]
    GameFull,

    #[error("Already sitting in this game")]
    AlreadySeated,

    #[error("Already voted")]
    AlreadyVoted,

    #[error("A reset vote is in progress")]
    VoteInProgress,

    #[error("No reset vote in progress")]
    NoVoteInProgress,

    #[error("Already asked for a reset this turn")]
    AlreadyAskedReset,

    #[error("Game is over")]
    GameOver,

    #[error("Board setup failed: {0}")]
    Board(#[from] BoardError),
}

/// What a committed placement changed besides the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub piece: Piece,
    /// Resources granted by a second initial settlement
    pub starting_resources: Option<ResourceSet>,
    /// Players whose longest road was recomputed, in seat order
    pub longest_road_recomputed: Vec<PlayerId>,
}

/// Outcome of a dice roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    pub dice: (u8, u8),
    pub total: u8,
    /// Resources each seat received; seats that got nothing are absent
    pub income: BTreeMap<PlayerId, ResourceSet>,
    /// Seats that must discard after a 7
    pub must_discard: Vec<PlayerId>,
}

/// Outcome of moving the robber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRobberResult {
    pub from: Option<Coord>,
    /// Players next to the new hex who could be robbed
    pub victims: Vec<PlayerId>,
    /// Card taken when there was exactly one victim
    pub loot: Option<Resource>,
}

/// What a forced end of turn had to undo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForceEndTurnKind {
    /// Nothing to undo; the turn can end
    None,
    /// Initial placement skipped; the next player places
    SkipStartAdv,
    /// Initial placement skipped; the previous player places
    SkipStartAdvBack,
    /// Last initial placement skipped; normal play begins with `end_turn`
    SkipStartTurn,
    /// A bought piece or free road went unplaced; resources (if any) refunded
    ResourcesReturnedUnplace,
    /// Robber left in place
    UnplaceRobber,
    /// Current player discarded at random; nobody else is waiting
    ResourceDiscard,
    /// Current player discarded at random; others still need to discard
    ResourceDiscardWait,
    /// A pending choice was dropped
    LostChoice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceEndTurnResult {
    pub kind: ForceEndTurnKind,
    /// Refunded or discarded resources
    pub resources: Option<ResourceSet>,
    /// `resources` were lost rather than returned
    pub is_loss: bool,
    /// Development card handed back to the player
    pub dev_card: Option<DevCardType>,
}

impl ForceEndTurnResult {
    fn new(kind: ForceEndTurnKind) -> Self {
        Self {
            kind,
            resources: None,
            is_loss: false,
            dev_card: None,
        }
    }

    fn with_resources(mut self, resources: ResourceSet, is_loss: bool) -> Self {
        self.resources = Some(resources);
        self.is_loss = is_loss;
        self
    }

    fn with_card(mut self, card: DevCardType) -> Self {
        self.dev_card = Some(card);
        self
    }
}

/// The complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    name: String,
    options: GameOptions,
    seats: [SeatState; MAX_PLAYERS],
    seat_locks: [bool; MAX_PLAYERS],
    /// One entry per seat, vacant or not
    players: Vec<Player>,
    board: Board,
    state: GameState,
    /// State to return to after the robber, a free road, or a card choice
    old_state: GameState,
    current_player: Option<PlayerId>,
    first_player: Option<PlayerId>,
    last_player: Option<PlayerId>,
    dice: Option<(u8, u8)>,
    deck: Vec<DevCardType>,
    largest_army: Option<PlayerId>,
    longest_road: Option<PlayerId>,
    winner: Option<PlayerId>,
    turn_count: u32,
    round_count: u32,
    forcing_end_turn: bool,
    placing_robber_for_knight: bool,
    all_original_players: bool,
    reset_requester: Option<PlayerId>,
    reset_votes: [ResetVote; MAX_PLAYERS],
    reset_votes_waiting: u32,
    is_from_board_reset: bool,
    #[serde(skip, default = "unseeded_rng")]
    rng: StdRng,
}

fn unseeded_rng() -> StdRng {
    StdRng::seed_from_u64(0)
}

impl Game {
    /// Create a game with every seat vacant. All randomness comes from `seed`.
    pub fn new(name: impl Into<String>, options: GameOptions, seed: u64) -> Self {
        let board = Board::new(options.encoding());
        let players = (0..MAX_PLAYERS)
            .map(|pn| Player::new(pn as PlayerId, &board))
            .collect();
        Self {
            name: name.into(),
            options,
            seats: [SeatState::Vacant; MAX_PLAYERS],
            seat_locks: [false; MAX_PLAYERS],
            players,
            board,
            state: GameState::New,
            old_state: GameState::New,
            current_player: None,
            first_player: None,
            last_player: None,
            dice: None,
            deck: Vec::new(),
            largest_army: None,
            longest_road: None,
            winner: None,
            turn_count: 0,
            round_count: 0,
            forcing_end_turn: false,
            placing_robber_for_knight: false,
            all_original_players: true,
            reset_requester: None,
            reset_votes: [ResetVote::None; MAX_PLAYERS],
            reset_votes_waiting: 0,
            is_from_board_reset: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    // ==================== Accessors ====================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &GameOptions {
        &self.options
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn old_state(&self) -> GameState {
        self.old_state
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Direct board access, for hosts rebuilding a position
    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn player(&self, pn: PlayerId) -> Option<&Player> {
        self.players.get(pn as usize)
    }

    /// Direct player access, for hosts rebuilding a position
    pub fn player_mut(&mut self, pn: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(pn as usize)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn current_player(&self) -> Option<PlayerId> {
        self.current_player
    }

    pub fn first_player(&self) -> Option<PlayerId> {
        self.first_player
    }

    pub fn last_player(&self) -> Option<PlayerId> {
        self.last_player
    }

    /// The dice of this turn, if rolled
    pub fn dice(&self) -> Option<(u8, u8)> {
        self.dice
    }

    /// Sum of this turn's dice, or 0 before the roll
    pub fn dice_total(&self) -> u8 {
        self.dice.map_or(0, |(a, b)| a + b)
    }

    pub fn deck_remaining(&self) -> usize {
        self.deck.len()
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    /// Normal-play rounds so far, counting the current one; 0 during initial placement
    pub fn round_count(&self) -> u32 {
        self.round_count
    }

    pub fn longest_road_player(&self) -> Option<PlayerId> {
        self.longest_road
    }

    pub fn largest_army_player(&self) -> Option<PlayerId> {
        self.largest_army
    }

    pub fn is_forcing_end_turn(&self) -> bool {
        self.forcing_end_turn
    }

    pub fn is_placing_robber_for_knight(&self) -> bool {
        self.placing_robber_for_knight
    }

    pub fn is_from_board_reset(&self) -> bool {
        self.is_from_board_reset
    }

    /// False once anyone has joined after the game started
    pub fn all_original_players(&self) -> bool {
        self.all_original_players
    }

    /// Points everyone can see
    pub fn public_vp(&self, pn: PlayerId) -> u32 {
        self.player(pn).map_or(0, |p| {
            p.public_vp(self.longest_road == Some(pn), self.largest_army == Some(pn))
        })
    }

    /// Public points plus held VP cards
    pub fn total_vp(&self, pn: PlayerId) -> u32 {
        self.player(pn).map_or(0, |p| {
            p.total_vp(self.longest_road == Some(pn), self.largest_army == Some(pn))
        })
    }

    // ==================== Seats ====================

    fn seat_index(pn: PlayerId) -> Result<usize, GameError> {
        let i = pn as usize;
        if i < MAX_PLAYERS {
            Ok(i)
        } else {
            Err(GameError::InvalidSeat)
        }
    }

    pub fn is_seat_vacant(&self, pn: PlayerId) -> bool {
        Self::seat_index(pn).map_or(true, |i| self.seats[i] == SeatState::Vacant)
    }

    pub fn is_seat_locked(&self, pn: PlayerId) -> bool {
        Self::seat_index(pn).map_or(false, |i| self.seat_locks[i])
    }

    pub fn lock_seat(&mut self, pn: PlayerId) -> Result<(), GameError> {
        self.seat_locks[Self::seat_index(pn)?] = true;
        Ok(())
    }

    pub fn unlock_seat(&mut self, pn: PlayerId) -> Result<(), GameError> {
        self.seat_locks[Self::seat_index(pn)?] = false;
        Ok(())
    }

    /// Occupied seats, in seat order
    pub fn occupied_seats(&self) -> Vec<PlayerId> {
        (0..MAX_PLAYERS as PlayerId)
            .filter(|&pn| !self.is_seat_vacant(pn))
            .collect()
    }

    /// Seats still open under the `PL` limit
    pub fn available_seat_count(&self) -> usize {
        (self.options.max_players as usize).saturating_sub(self.occupied_seats().len())
    }

    fn seated_player(&self, pn: PlayerId) -> Result<&Player, GameError> {
        let i = Self::seat_index(pn)?;
        if self.seats[i] == SeatState::Vacant {
            return Err(GameError::SeatVacant);
        }
        Ok(&self.players[i])
    }

    /// Seat a player by name
    pub fn add_player(&mut self, name: &str, pn: PlayerId) -> Result<(), GameError> {
        let i = Self::seat_index(pn)?;
        if self.state >= GameState::Over {
            return Err(GameError::GameOver);
        }
        if self.seat_locks[i] {
            return Err(GameError::SeatLocked);
        }
        if self.seats[i] == SeatState::Vacant && self.available_seat_count() == 0 {
            return Err(GameError::GameFull);
        }
        let elsewhere = self
            .occupied_seats()
            .into_iter()
            .any(|other| other != pn && self.players[other as usize].name == name);
        if elsewhere {
            return Err(GameError::AlreadySeated);
        }

        self.players[i].name = name.to_string();
        self.seats[i] = SeatState::Occupied;
        if self.state == GameState::New {
            self.state = GameState::Ready;
        } else if self.state.is_active() {
            self.all_original_players = false;
        }
        debug!(game = %self.name, seat = pn, name, "player seated");
        Ok(())
    }

    pub fn remove_player(&mut self, pn: PlayerId) -> Result<(), GameError> {
        self.seated_player(pn)?;
        let i = pn as usize;
        self.players[i].name.clear();
        self.players[i].robot = false;
        self.seats[i] = SeatState::Vacant;
        debug!(game = %self.name, seat = pn, "player left");
        Ok(())
    }

    pub fn set_robot(&mut self, pn: PlayerId, robot: bool) -> Result<(), GameError> {
        self.seated_player(pn)?;
        self.players[pn as usize].robot = robot;
        Ok(())
    }

    /// Next occupied seat after `from`, forward or backward, wrapping.
    /// Returns `from` itself when it is the only occupied seat.
    fn next_seat(&self, from: PlayerId, forward: bool) -> Option<PlayerId> {
        let n = MAX_PLAYERS as i32;
        (1..=n)
            .map(|step| {
                let offset = if forward { step } else { -step };
                (from as i32 + offset).rem_euclid(n) as PlayerId
            })
            .find(|&pn| !self.is_seat_vacant(pn))
    }

    /// Move the turn to the next occupied seat. With nobody else seated the
    /// game is over.
    fn advance_turn(&mut self, forward: bool) -> bool {
        self.forcing_end_turn = false;
        let Some(cp) = self.current_player else {
            return false;
        };
        match self.next_seat(cp, forward) {
            Some(next) if next != cp => {
                self.current_player = Some(next);
                true
            }
            _ => {
                self.state = GameState::Over;
                false
            }
        }
    }

    /// The first player places first; the last player is the seat before them.
    pub fn set_first_player(&mut self, pn: PlayerId) {
        self.first_player = Some(pn);
        self.last_player = self.next_seat(pn, false);
    }

    /// Hand the turn to `pn`. A player already at the target wins here.
    pub fn set_current_player(&mut self, pn: PlayerId) {
        self.current_player = Some(pn);
        if self.total_vp(pn) >= self.options.victory_points {
            self.check_for_winner();
        }
    }

    fn check_current(&self, pn: PlayerId) -> Result<(), GameError> {
        if self.state >= GameState::Over {
            return Err(GameError::GameOver);
        }
        if self.current_player != Some(pn) {
            return Err(GameError::NotYourTurn);
        }
        Ok(())
    }

    fn check_state(&self, expected: GameState) -> Result<(), GameError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(GameError::InvalidState)
        }
    }

    // ==================== Starting ====================

    pub fn can_start_game(&self) -> bool {
        matches!(self.state, GameState::New | GameState::Ready) && !self.occupied_seats().is_empty()
    }

    /// Lay out the board, shuffle the deck, and pick a random first player.
    pub fn start_game(&mut self) -> Result<(), GameError> {
        if !self.can_start_game() {
            return Err(GameError::InvalidState);
        }
        self.board
            .generate_layout(self.options.break_clumps, &mut self.rng)?;

        self.deck = DevCardType::standard_deck();
        self.deck.shuffle(&mut self.rng);

        let seated = self.occupied_seats();
        let first = *seated.choose(&mut self.rng).ok_or(GameError::SeatVacant)?;
        self.set_first_player(first);
        self.current_player = Some(first);
        self.state = GameState::Start1A;
        debug!(game = %self.name, first, seats = seated.len(), "game started");
        Ok(())
    }

    // ==================== Placement ====================

    pub fn can_put_piece(&self, pn: PlayerId, kind: PieceKind, coord: Coord) -> bool {
        self.check_put_piece(pn, kind, coord).is_ok()
    }

    fn check_put_piece(&self, pn: PlayerId, kind: PieceKind, coord: Coord) -> Result<(), GameError> {
        self.check_current(pn)?;
        let player = self.seated_player(pn)?;
        let expected = match self.state {
            GameState::Start1A | GameState::Start2A | GameState::PlacingSettlement => {
                PieceKind::Settlement
            }
            GameState::Start1B
            | GameState::Start2B
            | GameState::PlacingRoad
            | GameState::PlacingFreeRoad1
            | GameState::PlacingFreeRoad2 => PieceKind::Road,
            GameState::PlacingCity => PieceKind::City,
            _ => return Err(GameError::InvalidState),
        };
        if kind != expected {
            return Err(GameError::InvalidState);
        }

        let remaining = match kind {
            PieceKind::Road => player.roads_remaining,
            PieceKind::Settlement => player.settlements_remaining,
            PieceKind::City => player.cities_remaining,
        };
        if remaining == 0 {
            return Err(GameError::NoPiecesRemaining);
        }

        let legal = match kind {
            PieceKind::Road => {
                player.is_potential_road(coord)
                    && (!self.state.is_initial_placement()
                        || player.last_settlement.map_or(false, |node| {
                            self.board.grid().is_edge_adjacent_to_node(node, coord)
                        }))
            }
            PieceKind::Settlement => player.is_potential_settlement(coord),
            PieceKind::City => player.is_potential_city(coord),
        };
        if !legal {
            return Err(GameError::InvalidLocation);
        }
        Ok(())
    }

    /// Place a piece for the current player and advance the game state.
    pub fn put_piece(
        &mut self,
        pn: PlayerId,
        kind: PieceKind,
        coord: Coord,
    ) -> Result<Placement, GameError> {
        self.check_put_piece(pn, kind, coord)?;
        let placement = self.place_piece(Piece::new(kind, pn, coord));
        self.advance_state_after_put_piece();
        Ok(placement)
    }

    /// Record a piece with all of its side effects except the state change.
    ///
    /// No legality check is made; hosts use this to rebuild positions.
    pub fn place_piece(&mut self, piece: Piece) -> Placement {
        for player in &mut self.players {
            player.put_piece(&piece, &self.board);
        }
        if piece.kind == PieceKind::City {
            let settlement = Piece::new(PieceKind::Settlement, piece.owner, piece.coord);
            for player in &mut self.players {
                player.remove_piece(&settlement, &self.board);
            }
        }
        self.board.put_piece(piece);
        trace!(?piece, state = ?self.state, "piece placed");

        let owner = piece.owner as usize;
        let mut placement = Placement {
            piece,
            starting_resources: None,
            longest_road_recomputed: Vec::new(),
        };

        if self.state == GameState::Start2A && piece.kind == PieceKind::Settlement {
            let mut gained = ResourceSet::new();
            for hex in self.board.grid().adjacent_hexes_to_node(piece.coord) {
                if let Some(resource) = self.board.hex_type(hex).and_then(|t| t.resource()) {
                    gained.add_one(1, resource);
                }
            }
            self.players[owner].resources.add(&gained);
            placement.starting_resources = Some(gained);
        }

        if self.state == GameState::Start2B && piece.kind == PieceKind::Road {
            let player = &mut self.players[owner];
            player.clear_potential_settlements();
            player.rederive_potential_settlements(&self.board);
        }

        match piece.kind {
            PieceKind::Road => {
                self.update_longest_road(piece.owner);
                placement.longest_road_recomputed.push(piece.owner);
            }
            PieceKind::Settlement => {
                // A new settlement may have cut through someone's road network
                let edges = self.board.grid().adjacent_edges_to_node(piece.coord);
                let severed: Vec<PlayerId> = (0..MAX_PLAYERS as PlayerId)
                    .filter(|&pn| pn != piece.owner)
                    .filter(|&pn| {
                        edges
                            .iter()
                            .filter(|&&e| self.board.road_at(e).map_or(false, |r| r.owner == pn))
                            .count()
                            == 2
                    })
                    .collect();
                for &pn in &severed {
                    self.update_longest_road(pn);
                }
                placement.longest_road_recomputed = severed;
            }
            PieceKind::City => {}
        }

        self.check_for_winner();
        placement
    }

    fn advance_state_after_put_piece(&mut self) {
        let Some(cp) = self.current_player else {
            return;
        };
        let before = self.state;
        match self.state {
            GameState::Start1A => self.state = GameState::Start1B,
            GameState::Start1B => {
                if self.next_seat(cp, true) == self.first_player {
                    self.state = GameState::Start2A;
                } else if self.advance_turn(true) {
                    self.state = GameState::Start1A;
                }
            }
            GameState::Start2A => self.state = GameState::Start2B,
            GameState::Start2B => {
                if self.next_seat(cp, false) == self.last_player {
                    self.state = GameState::Play;
                    self.update_at_turn();
                } else if self.advance_turn(false) {
                    self.state = GameState::Start2A;
                }
            }
            GameState::PlacingRoad | GameState::PlacingSettlement | GameState::PlacingCity => {
                self.state = GameState::Play1;
            }
            GameState::PlacingFreeRoad1 => {
                let player = &self.players[cp as usize];
                self.state = if player.roads_remaining > 0 && player.has_potential_road() {
                    GameState::PlacingFreeRoad2
                } else {
                    self.old_state
                };
            }
            GameState::PlacingFreeRoad2 => self.state = self.old_state,
            _ => {}
        }
        trace!(from = ?before, to = ?self.state, current = ?self.current_player, "state advanced");
    }

    /// Take back the current player's last initial settlement.
    pub fn can_undo_put_init_settlement(&self) -> bool {
        matches!(self.state, GameState::Start1B | GameState::Start2B)
            && self
                .current_player
                .and_then(|cp| self.players[cp as usize].last_settlement)
                .is_some()
    }

    /// Remove the settlement just placed in START1B/START2B and go back to
    /// placing it. Resources it granted are taken back.
    pub fn undo_put_init_settlement(&mut self) -> Result<Piece, GameError> {
        if !self.can_undo_put_init_settlement() {
            return Err(GameError::InvalidState);
        }
        let cp = self.current_player.ok_or(GameError::InvalidState)?;
        let node = self.players[cp as usize]
            .last_settlement
            .ok_or(GameError::InvalidState)?;
        let piece = Piece::new(PieceKind::Settlement, cp, node);
        self.board.remove_piece(&piece);
        for player in &mut self.players {
            player.undo_put_settlement(&piece, &self.board);
        }
        if self.state == GameState::Start2B {
            self.players[cp as usize].resources.clear();
            self.state = GameState::Start2A;
        } else {
            self.state = GameState::Start1A;
        }
        debug!(player = cp, node = format_args!("{:#x}", node), "initial settlement undone");
        Ok(piece)
    }

    // ==================== Turns ====================

    /// Start-of-turn bookkeeping for the current player
    fn update_at_turn(&mut self) {
        self.dice = None;
        if let Some(cp) = self.current_player {
            self.players[cp as usize].dev_cards.age();
        }
        self.reset_vote_clear();
        if self.state == GameState::Play {
            self.turn_count += 1;
            if self.current_player == self.first_player {
                self.round_count += 1;
            }
        }
    }

    pub fn can_end_turn(&self, pn: PlayerId) -> bool {
        self.current_player == Some(pn) && self.state == GameState::Play1
    }

    /// Pass the turn to the next seat.
    ///
    /// A player who reached the target on someone else's turn wins here.
    pub fn end_turn(&mut self) -> Result<(), GameError> {
        self.check_state(GameState::Play1)?;
        self.state = GameState::Play;
        for player in &mut self.players {
            player.current_offer = None;
        }
        if !self.advance_turn(true) {
            return Ok(());
        }
        self.update_at_turn();
        let Some(cp) = self.current_player else {
            return Ok(());
        };
        self.players[cp as usize].played_dev_card = false;
        if self.total_vp(cp) >= self.options.victory_points {
            self.check_for_winner();
        }
        debug!(game = %self.name, current = cp, turn = self.turn_count, round = self.round_count, "turn started");
        Ok(())
    }

    /// Only the current player can win.
    pub fn check_for_winner(&mut self) -> Option<PlayerId> {
        if self.winner.is_some() {
            return self.winner;
        }
        let cp = self.current_player?;
        if self.total_vp(cp) >= self.options.victory_points {
            self.state = GameState::Over;
            self.winner = Some(cp);
            debug!(game = %self.name, winner = cp, vp = self.total_vp(cp), "game won");
        }
        self.winner
    }

    // ==================== Forced end of turn ====================

    /// Undo whatever the current player is in the middle of so the turn can end.
    ///
    /// Afterwards the state is PLAY1 (call [`Game::end_turn`]), an initial
    /// placement state for the next player, or WAITING_FOR_DISCARDS when
    /// other players still owe a discard.
    pub fn force_end_turn(&mut self) -> Result<ForceEndTurnResult, GameError> {
        if !self.state.is_active() {
            return Err(GameError::InvalidState);
        }
        let cp = self.current_player.ok_or(GameError::InvalidState)?;
        self.forcing_end_turn = true;
        debug!(game = %self.name, player = cp, state = ?self.state, "forcing end of turn");

        let result = match self.state {
            GameState::Start1A | GameState::Start1B => self.force_end_turn_start_state(true),
            GameState::Start2A | GameState::Start2B => self.force_end_turn_start_state(false),
            GameState::Play => {
                self.state = GameState::Play1;
                ForceEndTurnResult::new(ForceEndTurnKind::None)
            }
            GameState::Play1 => ForceEndTurnResult::new(ForceEndTurnKind::None),
            GameState::PlacingRoad | GameState::PlacingSettlement | GameState::PlacingCity => {
                let refund = self.cancel_build(cp, self.state)?;
                ForceEndTurnResult::new(ForceEndTurnKind::ResourcesReturnedUnplace)
                    .with_resources(refund, false)
            }
            GameState::PlacingRobber => {
                self.state = GameState::Play1;
                let result = ForceEndTurnResult::new(ForceEndTurnKind::UnplaceRobber);
                if self.placing_robber_for_knight {
                    self.placing_robber_for_knight = false;
                    self.players[cp as usize].dev_cards.add_old(DevCardType::Knight);
                    result.with_card(DevCardType::Knight)
                } else {
                    result
                }
            }
            GameState::PlacingFreeRoad1 | GameState::PlacingFreeRoad2 => {
                self.state = GameState::Play1;
                ForceEndTurnResult::new(ForceEndTurnKind::ResourcesReturnedUnplace)
            }
            GameState::WaitingForDiscards => self.force_end_turn_discard(cp)?,
            GameState::WaitingForChoice => {
                self.state = GameState::Play1;
                ForceEndTurnResult::new(ForceEndTurnKind::LostChoice)
            }
            GameState::WaitingForDiscovery | GameState::WaitingForMonopoly => {
                let card = if self.state == GameState::WaitingForDiscovery {
                    DevCardType::Discovery
                } else {
                    DevCardType::Monopoly
                };
                self.state = GameState::Play1;
                self.players[cp as usize].dev_cards.add_old(card);
                ForceEndTurnResult::new(ForceEndTurnKind::LostChoice).with_card(card)
            }
            _ => return Err(GameError::InvalidState),
        };
        Ok(result)
    }

    fn force_end_turn_start_state(&mut self, forward: bool) -> ForceEndTurnResult {
        let cp = self.current_player;
        if self.can_undo_put_init_settlement() {
            // Leaves START1A/START2A; the unfinished settlement is gone
            let _ = self.undo_put_init_settlement();
        }
        self.state = if forward {
            GameState::Start1B
        } else {
            GameState::Start2B
        };
        self.advance_state_after_put_piece();

        let kind = if self.current_player == cp {
            if forward {
                // Last seat of the first round: go back round the table
                self.state = GameState::Start2A;
                self.advance_turn(false);
                ForceEndTurnKind::SkipStartAdvBack
            } else {
                self.state = GameState::Play1;
                ForceEndTurnKind::SkipStartTurn
            }
        } else if forward {
            ForceEndTurnKind::SkipStartAdv
        } else {
            ForceEndTurnKind::SkipStartAdvBack
        };
        ForceEndTurnResult::new(kind)
    }

    fn force_end_turn_discard(&mut self, cp: PlayerId) -> Result<ForceEndTurnResult, GameError> {
        let player = &self.players[cp as usize];
        let discards = if player.needs_discard {
            let hand = player.resources;
            discard_pick_random(&hand, hand.total() / 2, &mut self.rng)
        } else {
            ResourceSet::new()
        };
        self.commit_discard(cp, &discards);
        let kind = if self.state == GameState::WaitingForDiscards {
            ForceEndTurnKind::ResourceDiscardWait
        } else {
            ForceEndTurnKind::ResourceDiscard
        };
        Ok(ForceEndTurnResult::new(kind).with_resources(discards, true))
    }

    // ==================== Dice ====================

    pub fn can_roll_dice(&self, pn: PlayerId) -> bool {
        self.current_player == Some(pn) && self.state == GameState::Play
    }

    /// 7s are rerolled during the first `N7` rounds
    fn ok_to_roll_seven(&self) -> bool {
        self.options
            .no_sevens_rounds
            .map_or(true, |n| self.round_count > n)
    }

    /// Roll for the current player and pay out, or start the robber sequence on a 7.
    pub fn roll_dice(&mut self) -> Result<RollResult, GameError> {
        self.check_state(GameState::Play)?;
        let (d1, d2) = loop {
            let d1: u8 = self.rng.gen_range(1..=6);
            let d2: u8 = self.rng.gen_range(1..=6);
            if d1 + d2 != 7 || self.ok_to_roll_seven() {
                break (d1, d2);
            }
        };
        let total = d1 + d2;
        self.dice = Some((d1, d2));

        let mut result = RollResult {
            dice: (d1, d2),
            total,
            income: BTreeMap::new(),
            must_discard: Vec::new(),
        };
        let seated = self.occupied_seats();

        if total == 7 {
            for &pn in &seated {
                let player = &mut self.players[pn as usize];
                if player.resources.total() > DISCARD_LIMIT {
                    player.needs_discard = true;
                    result.must_discard.push(pn);
                }
            }
            if result.must_discard.is_empty() {
                self.old_state = GameState::Play1;
                self.placing_robber_for_knight = false;
                self.state = GameState::PlacingRobber;
            } else {
                self.state = GameState::WaitingForDiscards;
            }
        } else {
            for &pn in &seated {
                let income = self.players[pn as usize].resources_from_roll(&self.board, total);
                if !income.is_empty() {
                    self.players[pn as usize].resources.add(&income);
                    result.income.insert(pn, income);
                }
            }
            self.state = GameState::Play1;
        }
        debug!(game = %self.name, total, state = ?self.state, "dice rolled");
        Ok(result)
    }

    // ==================== Discards ====================

    pub fn can_discard(&self, pn: PlayerId, discards: &ResourceSet) -> bool {
        self.check_discard(pn, discards).is_ok()
    }

    fn check_discard(&self, pn: PlayerId, discards: &ResourceSet) -> Result<(), GameError> {
        self.check_state(GameState::WaitingForDiscards)?;
        let player = self.seated_player(pn)?;
        let well_formed =
            Resource::ALL.iter().all(|&r| discards.get(r) >= 0) && discards.unknown == 0;
        if !player.needs_discard
            || !well_formed
            || discards.total() != player.resources.total() / 2
            || !player.resources.contains(discards)
        {
            return Err(GameError::InvalidDiscard);
        }
        Ok(())
    }

    /// Discard half a hand after a 7. Once nobody else owes a discard, the
    /// robber must move.
    pub fn discard(&mut self, pn: PlayerId, discards: &ResourceSet) -> Result<(), GameError> {
        self.check_discard(pn, discards)?;
        self.commit_discard(pn, discards);
        Ok(())
    }

    fn commit_discard(&mut self, pn: PlayerId, discards: &ResourceSet) {
        let player = &mut self.players[pn as usize];
        player.resources.subtract(discards);
        player.needs_discard = false;

        if self.players.iter().any(|p| p.needs_discard) {
            self.state = GameState::WaitingForDiscards;
            return;
        }
        self.old_state = GameState::Play1;
        self.placing_robber_for_knight = false;
        self.state = if self.forcing_end_turn {
            GameState::Play1
        } else {
            GameState::PlacingRobber
        };
    }

    /// Discard at random for a player who is not the current player, e.g. one
    /// who left or timed out.
    pub fn player_discard_random(&mut self, pn: PlayerId) -> Result<ResourceSet, GameError> {
        self.check_state(GameState::WaitingForDiscards)?;
        if self.current_player == Some(pn) {
            return Err(GameError::InvalidDiscard);
        }
        let player = self.seated_player(pn)?;
        if !player.needs_discard {
            return Err(GameError::InvalidDiscard);
        }
        let hand = player.resources;
        let discards = discard_pick_random(&hand, hand.total() / 2, &mut self.rng);
        self.commit_discard(pn, &discards);
        Ok(discards)
    }

    // ==================== Robber ====================

    pub fn can_move_robber(&self, pn: PlayerId, hex: Coord) -> bool {
        self.check_move_robber(pn, hex).is_ok()
    }

    fn check_move_robber(&self, pn: PlayerId, hex: Coord) -> Result<(), GameError> {
        self.check_current(pn)?;
        self.check_state(GameState::PlacingRobber)?;
        if self.board.robber_hex() == Some(hex) {
            return Err(GameError::InvalidLocation);
        }
        match self.board.hex_type(hex) {
            Some(HexType::Land(_)) => Ok(()),
            Some(HexType::Desert) if !self.options.robber_not_desert => Ok(()),
            _ => Err(GameError::InvalidLocation),
        }
    }

    /// Move the robber and rob when there is exactly one candidate.
    pub fn move_robber(&mut self, pn: PlayerId, hex: Coord) -> Result<MoveRobberResult, GameError> {
        self.check_move_robber(pn, hex)?;
        let from = self.board.robber_hex();
        self.board.set_robber_hex(hex, true);
        self.placing_robber_for_knight = false;

        let victims = self.possible_victims();
        let loot = match victims.as_slice() {
            [] => {
                self.state = self.old_state;
                None
            }
            [victim] => self.steal_from(*victim),
            _ => {
                self.state = GameState::WaitingForChoice;
                None
            }
        };
        debug!(player = pn, hex = format_args!("{:#x}", hex), victims = victims.len(), "robber moved");
        Ok(MoveRobberResult {
            from,
            victims,
            loot,
        })
    }

    /// Owners of settlements or cities touching a hex
    pub fn players_on_hex(&self, hex: Coord) -> Vec<PlayerId> {
        self.board.players_on_hex(hex)
    }

    /// Players next to the robber who hold at least one card
    pub fn possible_victims(&self) -> Vec<PlayerId> {
        let Some(hex) = self.board.robber_hex() else {
            return Vec::new();
        };
        self.players_on_hex(hex)
            .into_iter()
            .filter(|&pn| Some(pn) != self.current_player)
            .filter(|&pn| !self.is_seat_vacant(pn))
            .filter(|&pn| self.players[pn as usize].resources.total() > 0)
            .collect()
    }

    pub fn can_choose_player(&self, victim: PlayerId) -> bool {
        self.state == GameState::WaitingForChoice && self.possible_victims().contains(&victim)
    }

    /// Rob one of several candidates
    pub fn choose_player(&mut self, victim: PlayerId) -> Result<Resource, GameError> {
        if !self.can_choose_player(victim) {
            return Err(GameError::InvalidVictim);
        }
        self.steal_from(victim).ok_or(GameError::InvalidVictim)
    }

    fn steal_from(&mut self, victim: PlayerId) -> Option<Resource> {
        self.state = self.old_state;
        let cp = self.current_player?;
        let stolen = self.players[victim as usize]
            .resources
            .take_random(&mut self.rng)?;
        self.players[cp as usize].resources.add_one(1, stolen);
        trace!(thief = cp, victim, ?stolen, "resource stolen");
        Some(stolen)
    }

    // ==================== Trading ====================

    /// Post an offer; only one per player.
    pub fn set_trade_offer(&mut self, pn: PlayerId, mut offer: TradeOffer) -> Result<(), GameError> {
        self.seated_player(pn)?;
        if self.options.no_trading {
            return Err(GameError::TradingDisabled);
        }
        self.check_state(GameState::Play1)?;
        offer.from = pn;
        self.players[pn as usize].current_offer = Some(offer);
        Ok(())
    }

    pub fn clear_trade_offer(&mut self, pn: PlayerId) -> Result<(), GameError> {
        self.seated_player(pn)?;
        self.players[pn as usize].current_offer = None;
        Ok(())
    }

    pub fn can_make_trade(&self, offering: PlayerId, accepting: PlayerId) -> bool {
        self.check_make_trade(offering, accepting).is_ok()
    }

    fn check_make_trade(&self, offering: PlayerId, accepting: PlayerId) -> Result<(), GameError> {
        self.check_state(GameState::Play1)?;
        if self.options.no_trading {
            return Err(GameError::TradingDisabled);
        }
        let offerer = self.seated_player(offering)?;
        let acceptor = self.seated_player(accepting)?;
        if offering == accepting {
            return Err(GameError::InvalidTrade);
        }
        if self.current_player != Some(offering) && self.current_player != Some(accepting) {
            return Err(GameError::NotYourTurn);
        }
        let offer = offerer.current_offer.as_ref().ok_or(GameError::InvalidTrade)?;
        if !offer.to.is_empty() && !offer.to.contains(&accepting) {
            return Err(GameError::InvalidTrade);
        }
        if offer.give.total() <= 0 || offer.get.total() <= 0 {
            return Err(GameError::InvalidTrade);
        }
        if !offerer.resources.contains(&offer.give) || !acceptor.resources.contains(&offer.get) {
            return Err(GameError::CannotAfford);
        }
        Ok(())
    }

    /// Execute the offering player's current offer with `accepting`.
    pub fn make_trade(&mut self, offering: PlayerId, accepting: PlayerId) -> Result<TradeOffer, GameError> {
        self.check_make_trade(offering, accepting)?;
        let offer = self.players[offering as usize]
            .current_offer
            .take()
            .ok_or(GameError::InvalidTrade)?;

        let from = &mut self.players[offering as usize].resources;
        from.subtract(&offer.give);
        from.add(&offer.get);
        let to = &mut self.players[accepting as usize].resources;
        to.subtract(&offer.get);
        to.add(&offer.give);
        debug!(offering, accepting, give = %offer.give.friendly_string(), get = %offer.get.friendly_string(), "trade made");
        Ok(offer)
    }

    pub fn can_make_bank_trade(&self, pn: PlayerId, give: &ResourceSet, get: &ResourceSet) -> bool {
        self.check_bank_trade(pn, give, get).is_ok()
    }

    fn check_bank_trade(&self, pn: PlayerId, give: &ResourceSet, get: &ResourceSet) -> Result<(), GameError> {
        self.check_current(pn)?;
        self.check_state(GameState::Play1)?;
        let player = self.seated_player(pn)?;

        let non_negative = |set: &ResourceSet| {
            Resource::ALL.iter().all(|&r| set.get(r) >= 0) && set.unknown == 0
        };
        if !non_negative(give) || !non_negative(get) || give.total() < 2 || get.total() <= 0 {
            return Err(GameError::InvalidTrade);
        }
        if !player.resources.contains(give) {
            return Err(GameError::CannotAfford);
        }

        let groups = match give.total() / get.total() {
            4 if Resource::ALL.iter().all(|&r| give.get(r) % 4 == 0) => give.total() / 4,
            3 if player.has_port(PortType::Misc)
                && Resource::ALL.iter().all(|&r| give.get(r) % 3 == 0) =>
            {
                give.total() / 3
            }
            2 if Resource::ALL.iter().all(|&r| {
                let n = give.get(r);
                n == 0 || (n % 2 == 0 && player.has_port(PortType::for_resource(r)))
            }) =>
            {
                give.total() / 2
            }
            _ => return Err(GameError::InvalidTrade),
        };
        if groups != get.total() {
            return Err(GameError::InvalidTrade);
        }
        Ok(())
    }

    /// Trade with the bank at 4:1, or 3:1 / 2:1 through a port.
    pub fn make_bank_trade(&mut self, pn: PlayerId, give: &ResourceSet, get: &ResourceSet) -> Result<(), GameError> {
        self.check_bank_trade(pn, give, get)?;
        let hand = &mut self.players[pn as usize].resources;
        hand.subtract(give);
        hand.add(get);
        Ok(())
    }

    // ==================== Building ====================

    fn check_could_build(&self, pn: PlayerId, kind: PieceKind) -> Result<(), GameError> {
        let player = self.seated_player(pn)?;
        let (cost, remaining, has_spot) = match kind {
            PieceKind::Road => (costs::ROAD, player.roads_remaining, player.has_potential_road()),
            PieceKind::Settlement => (
                costs::SETTLEMENT,
                player.settlements_remaining,
                player.has_potential_settlement(),
            ),
            PieceKind::City => (costs::CITY, player.cities_remaining, player.has_potential_city()),
        };
        if !player.resources.contains(&cost) {
            return Err(GameError::CannotAfford);
        }
        if remaining == 0 {
            return Err(GameError::NoPiecesRemaining);
        }
        if !has_spot {
            return Err(GameError::InvalidLocation);
        }
        Ok(())
    }

    pub fn could_build_road(&self, pn: PlayerId) -> bool {
        self.check_could_build(pn, PieceKind::Road).is_ok()
    }

    pub fn could_build_settlement(&self, pn: PlayerId) -> bool {
        self.check_could_build(pn, PieceKind::Settlement).is_ok()
    }

    pub fn could_build_city(&self, pn: PlayerId) -> bool {
        self.check_could_build(pn, PieceKind::City).is_ok()
    }

    pub fn could_buy_dev_card(&self, pn: PlayerId) -> bool {
        self.seated_player(pn)
            .map_or(false, |p| p.resources.contains(&costs::DEV_CARD))
            && !self.deck.is_empty()
    }

    /// Pay for a piece and enter the matching PLACING state
    fn buy_piece(&mut self, pn: PlayerId, kind: PieceKind) -> Result<(), GameError> {
        self.check_current(pn)?;
        self.check_state(GameState::Play1)?;
        self.check_could_build(pn, kind)?;
        let (cost, state) = match kind {
            PieceKind::Road => (costs::ROAD, GameState::PlacingRoad),
            PieceKind::Settlement => (costs::SETTLEMENT, GameState::PlacingSettlement),
            PieceKind::City => (costs::CITY, GameState::PlacingCity),
        };
        self.players[pn as usize].resources.subtract(&cost);
        self.state = state;
        Ok(())
    }

    pub fn buy_road(&mut self, pn: PlayerId) -> Result<(), GameError> {
        self.buy_piece(pn, PieceKind::Road)
    }

    pub fn buy_settlement(&mut self, pn: PlayerId) -> Result<(), GameError> {
        self.buy_piece(pn, PieceKind::Settlement)
    }

    pub fn buy_city(&mut self, pn: PlayerId) -> Result<(), GameError> {
        self.buy_piece(pn, PieceKind::City)
    }

    /// Draw from the deck; the card is new until the next turn.
    pub fn buy_dev_card(&mut self, pn: PlayerId) -> Result<DevCardType, GameError> {
        self.check_current(pn)?;
        self.check_state(GameState::Play1)?;
        let player = self.seated_player(pn)?;
        if !player.resources.contains(&costs::DEV_CARD) {
            return Err(GameError::CannotAfford);
        }
        let card = self.deck.pop().ok_or(GameError::EmptyDeck)?;
        let player = &mut self.players[pn as usize];
        player.resources.subtract(&costs::DEV_CARD);
        player.dev_cards.add_new(card);
        self.check_for_winner();
        Ok(card)
    }

    /// Refund a bought piece and return to PLAY1
    fn cancel_build(&mut self, pn: PlayerId, placing: GameState) -> Result<ResourceSet, GameError> {
        self.check_current(pn)?;
        self.check_state(placing)?;
        let refund = match placing {
            GameState::PlacingRoad => costs::ROAD,
            GameState::PlacingSettlement => costs::SETTLEMENT,
            GameState::PlacingCity => costs::CITY,
            _ => return Err(GameError::InvalidState),
        };
        self.players[pn as usize].resources.add(&refund);
        self.state = GameState::Play1;
        Ok(refund)
    }

    pub fn cancel_build_road(&mut self, pn: PlayerId) -> Result<ResourceSet, GameError> {
        self.cancel_build(pn, GameState::PlacingRoad)
    }

    pub fn cancel_build_settlement(&mut self, pn: PlayerId) -> Result<ResourceSet, GameError> {
        self.cancel_build(pn, GameState::PlacingSettlement)
    }

    pub fn cancel_build_city(&mut self, pn: PlayerId) -> Result<ResourceSet, GameError> {
        self.cancel_build(pn, GameState::PlacingCity)
    }

    // ==================== Development cards ====================

    fn check_play_card(&self, pn: PlayerId, card: DevCardType) -> Result<(), GameError> {
        self.check_current(pn)?;
        if !matches!(self.state, GameState::Play | GameState::Play1) {
            return Err(GameError::InvalidState);
        }
        let player = self.seated_player(pn)?;
        if player.played_dev_card {
            return Err(GameError::CardAlreadyPlayed);
        }
        if !player.dev_cards.has_old(card) {
            return Err(GameError::NoSuchCard);
        }
        if card == DevCardType::RoadBuilding && player.roads_remaining == 0 {
            return Err(GameError::NoPiecesRemaining);
        }
        Ok(())
    }

    fn take_card_to_play(&mut self, pn: PlayerId, card: DevCardType) -> Result<(), GameError> {
        self.check_play_card(pn, card)?;
        let player = &mut self.players[pn as usize];
        player.dev_cards.take_old(card);
        player.played_dev_card = true;
        self.old_state = self.state;
        Ok(())
    }

    pub fn can_play_knight(&self, pn: PlayerId) -> bool {
        self.check_play_card(pn, DevCardType::Knight).is_ok()
    }

    pub fn can_play_road_building(&self, pn: PlayerId) -> bool {
        self.check_play_card(pn, DevCardType::RoadBuilding).is_ok()
    }

    pub fn can_play_discovery(&self, pn: PlayerId) -> bool {
        self.check_play_card(pn, DevCardType::Discovery).is_ok()
    }

    pub fn can_play_monopoly(&self, pn: PlayerId) -> bool {
        self.check_play_card(pn, DevCardType::Monopoly).is_ok()
    }

    /// Count a knight toward Largest Army, then move the robber.
    pub fn play_knight(&mut self, pn: PlayerId) -> Result<(), GameError> {
        self.take_card_to_play(pn, DevCardType::Knight)?;
        self.players[pn as usize].knights_played += 1;
        self.update_largest_army();
        if self.check_for_winner().is_some() {
            return Ok(());
        }
        self.placing_robber_for_knight = true;
        self.state = GameState::PlacingRobber;
        Ok(())
    }

    pub fn play_road_building(&mut self, pn: PlayerId) -> Result<(), GameError> {
        self.take_card_to_play(pn, DevCardType::RoadBuilding)?;
        self.state = if self.players[pn as usize].roads_remaining > 1 {
            GameState::PlacingFreeRoad1
        } else {
            GameState::PlacingFreeRoad2
        };
        Ok(())
    }

    pub fn play_discovery(&mut self, pn: PlayerId) -> Result<(), GameError> {
        self.take_card_to_play(pn, DevCardType::Discovery)?;
        self.state = GameState::WaitingForDiscovery;
        Ok(())
    }

    pub fn play_monopoly(&mut self, pn: PlayerId) -> Result<(), GameError> {
        self.take_card_to_play(pn, DevCardType::Monopoly)?;
        self.state = GameState::WaitingForMonopoly;
        Ok(())
    }

    pub fn can_do_discovery_action(&self, pick: &ResourceSet) -> bool {
        self.state == GameState::WaitingForDiscovery
            && pick.total() == 2
            && pick.unknown == 0
            && Resource::ALL.iter().all(|&r| pick.get(r) >= 0)
    }

    /// Take the two picked resources from the bank
    pub fn do_discovery_action(&mut self, pn: PlayerId, pick: &ResourceSet) -> Result<(), GameError> {
        self.check_current(pn)?;
        if !self.can_do_discovery_action(pick) {
            return Err(GameError::InvalidState);
        }
        self.players[pn as usize].resources.add(pick);
        self.state = self.old_state;
        Ok(())
    }

    pub fn can_do_monopoly_action(&self) -> bool {
        self.state == GameState::WaitingForMonopoly
    }

    /// Collect every card of one resource from the other players.
    ///
    /// Returns the amount taken from each seat that had any.
    pub fn do_monopoly_action(
        &mut self,
        pn: PlayerId,
        resource: Resource,
    ) -> Result<BTreeMap<PlayerId, i32>, GameError> {
        self.check_current(pn)?;
        if !self.can_do_monopoly_action() {
            return Err(GameError::InvalidState);
        }
        let mut taken = BTreeMap::new();
        for other in self.occupied_seats() {
            if other == pn {
                continue;
            }
            let hand = &mut self.players[other as usize].resources;
            let amount = hand.get(resource);
            if amount > 0 {
                hand.set(resource, 0);
                taken.insert(other, amount);
            }
        }
        let total: i32 = taken.values().sum();
        self.players[pn as usize].resources.add_one(total, resource);
        self.state = self.old_state;
        Ok(taken)
    }

    // ==================== Awards ====================

    /// Largest Army goes to whoever has strictly more knights than the holder
    /// (or at least three, with no holder).
    pub fn update_largest_army(&mut self) {
        let mut size = self
            .largest_army
            .map_or(MIN_LARGEST_ARMY - 1, |pn| self.players[pn as usize].knights_played);
        let previous = self.largest_army;
        for player in &self.players {
            if player.knights_played > size {
                size = player.knights_played;
                self.largest_army = Some(player.number);
            }
        }
        if previous != self.largest_army {
            debug!(?previous, current = ?self.largest_army, knights = size, "largest army changed");
        }
    }

    /// Recompute one player's longest road and re-decide the award.
    ///
    /// A lone leader at 5 or more takes it. On a tie at the top the holder
    /// keeps it if tied; otherwise nobody holds it.
    pub fn update_longest_road(&mut self, pn: PlayerId) {
        let length = self.players[pn as usize].calc_longest_road(&self.board);
        trace!(player = pn, length, "longest road recomputed");

        let max = self
            .players
            .iter()
            .map(|p| p.longest_road_length)
            .max()
            .unwrap_or(0);
        let leaders: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| p.longest_road_length == max)
            .map(|p| p.number)
            .collect();

        let previous = self.longest_road;
        self.longest_road = if max < MIN_LONGEST_ROAD {
            None
        } else if let [only] = leaders.as_slice() {
            Some(*only)
        } else {
            previous.filter(|holder| leaders.contains(holder))
        };
        if previous != self.longest_road {
            debug!(?previous, current = ?self.longest_road, length = max, "longest road changed");
        }
    }

    // ==================== Board reset ====================

    pub fn reset_vote_active(&self) -> bool {
        self.reset_requester.is_some() && self.reset_votes_waiting > 0
    }

    pub fn reset_requester(&self) -> Option<PlayerId> {
        self.reset_requester
    }

    pub fn reset_vote(&self, pn: PlayerId) -> ResetVote {
        Self::seat_index(pn).map_or(ResetVote::None, |i| self.reset_votes[i])
    }

    /// Ask every other human seat to agree to a board reset.
    ///
    /// Returns how many votes are awaited; 0 means the vote is already decided.
    pub fn reset_vote_begin(&mut self, requester: PlayerId) -> Result<u32, GameError> {
        let player = self.seated_player(requester)?;
        if player.asked_board_reset {
            return Err(GameError::AlreadyAskedReset);
        }
        if self.reset_vote_active() {
            return Err(GameError::VoteInProgress);
        }

        self.reset_requester = Some(requester);
        self.reset_votes = [ResetVote::None; MAX_PLAYERS];
        self.reset_votes[requester as usize] = ResetVote::Yes;
        self.reset_votes_waiting = self
            .occupied_seats()
            .into_iter()
            .filter(|&pn| pn != requester && !self.players[pn as usize].robot)
            .count() as u32;
        if self.state >= GameState::Play && self.state < GameState::Over {
            self.players[requester as usize].asked_board_reset = true;
        }
        debug!(game = %self.name, requester, waiting = self.reset_votes_waiting, "reset vote started");
        Ok(self.reset_votes_waiting)
    }

    /// Record one seat's vote. Returns true once every vote is in.
    pub fn reset_vote_register(&mut self, pn: PlayerId, yes: bool) -> Result<bool, GameError> {
        if !self.reset_vote_active() {
            return Err(GameError::NoVoteInProgress);
        }
        let player = self.seated_player(pn)?;
        if player.robot {
            return Err(GameError::InvalidSeat);
        }
        if self.reset_votes[pn as usize] != ResetVote::None {
            return Err(GameError::AlreadyVoted);
        }
        self.reset_votes[pn as usize] = if yes { ResetVote::Yes } else { ResetVote::No };
        self.reset_votes_waiting -= 1;

        let complete = self.reset_votes_waiting == 0;
        if complete && !self.reset_vote_result()? {
            self.reset_requester = None;
        }
        Ok(complete)
    }

    /// True when nobody voted no. Errors while votes are outstanding.
    pub fn reset_vote_result(&self) -> Result<bool, GameError> {
        if self.reset_votes_waiting > 0 {
            return Err(GameError::VoteInProgress);
        }
        Ok(!self.reset_votes.contains(&ResetVote::No))
    }

    pub fn reset_vote_clear(&mut self) {
        self.reset_requester = None;
        self.reset_votes_waiting = 0;
        self.reset_votes = [ResetVote::None; MAX_PLAYERS];
        for player in &mut self.players {
            player.asked_board_reset = false;
        }
    }

    /// A fresh game with the same name, options and human players.
    ///
    /// Robot seats come back vacant; seats that were vacant are locked.
    /// This game becomes RESET_OLD.
    pub fn reset_as_copy(&mut self) -> Game {
        let seed = self.rng.gen();
        let mut copy = Game::new(self.name.clone(), self.options, seed);
        copy.is_from_board_reset = true;

        for i in 0..MAX_PLAYERS {
            copy.seat_locks[i] = self.seat_locks[i];
            let old = &self.players[i];
            if self.seats[i] == SeatState::Occupied && !old.robot {
                copy.seats[i] = SeatState::Occupied;
                copy.players[i].name = old.name.clone();
                copy.players[i].face_id = old.face_id;
            } else if self.seats[i] == SeatState::Vacant {
                copy.seat_locks[i] = true;
            }
        }
        if !copy.occupied_seats().is_empty() {
            copy.state = GameState::Ready;
        }

        self.old_state = self.state;
        self.state = GameState::ResetOld;
        debug!(game = %self.name, seats = copy.occupied_seats().len(), "board reset");
        copy
    }
}

/// Pick `count` cards uniformly at random from `hand`.
pub fn discard_pick_random<R: Rng>(hand: &ResourceSet, count: i32, rng: &mut R) -> ResourceSet {
    let mut remaining = *hand;
    let mut picked = ResourceSet::new();
    for _ in 0..count {
        match remaining.take_random(rng) {
            Some(resource) => picked.add_one(1, resource),
            None => break,
        }
    }
    picked
}
