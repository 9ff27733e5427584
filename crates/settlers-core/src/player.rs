//! Per-seat player state.
//!
//! This module contains:
//! - `Player`, with resources, remaining pieces and placement sets
//! - Development card types and the new/old card hand
//! - `TradeOffer`
//! - Longest-road search and roll income
//!
//! Placement sets are kept incrementally: every piece placed by anyone is
//! fed to every player's [`Player::update_potentials`] before the board
//! stores it.

use crate::board::{Board, Piece, PieceKind, PlayerId, PortType};
use crate::resources::ResourceSet;
use crate::topology::{Coord, Topology};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Roads each player starts with
pub const MAX_ROADS: u32 = 15;
/// Settlements each player starts with
pub const MAX_SETTLEMENTS: u32 = 5;
/// Cities each player starts with
pub const MAX_CITIES: u32 = 4;

/// Development card types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DevCardType {
    /// Move the robber, counts toward largest army
    Knight,
    /// Place two free roads
    RoadBuilding,
    /// Take any two resources from the bank
    Discovery,
    /// Take every card of one resource from all opponents
    Monopoly,
    Capitol,
    Library,
    University,
    Temple,
    Tower,
}

impl DevCardType {
    pub const ALL: [DevCardType; 9] = [
        DevCardType::Knight,
        DevCardType::RoadBuilding,
        DevCardType::Discovery,
        DevCardType::Monopoly,
        DevCardType::Capitol,
        DevCardType::Library,
        DevCardType::University,
        DevCardType::Temple,
        DevCardType::Tower,
    ];

    /// Victory-point cards are never played; they count while held.
    pub fn is_victory_point(self) -> bool {
        matches!(
            self,
            DevCardType::Capitol
                | DevCardType::Library
                | DevCardType::University
                | DevCardType::Temple
                | DevCardType::Tower
        )
    }

    /// The 25-card deck, unshuffled
    pub fn standard_deck() -> Vec<DevCardType> {
        let mut deck = Vec::with_capacity(25);
        deck.extend(std::iter::repeat(DevCardType::Knight).take(14));
        deck.extend(std::iter::repeat(DevCardType::RoadBuilding).take(2));
        deck.extend(std::iter::repeat(DevCardType::Monopoly).take(2));
        deck.extend(std::iter::repeat(DevCardType::Discovery).take(2));
        deck.extend([
            DevCardType::Capitol,
            DevCardType::Library,
            DevCardType::University,
            DevCardType::Temple,
            DevCardType::Tower,
        ]);
        deck
    }
}

/// Development cards held by a player.
///
/// Cards bought this turn are `new` and cannot be played until the
/// player's next turn, when they age into `old`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevCardHand {
    pub new: Vec<DevCardType>,
    pub old: Vec<DevCardType>,
}

impl DevCardHand {
    pub fn add_new(&mut self, card: DevCardType) {
        self.new.push(card);
    }

    pub fn add_old(&mut self, card: DevCardType) {
        self.old.push(card);
    }

    pub fn old_count(&self, card: DevCardType) -> usize {
        self.old.iter().filter(|&&c| c == card).count()
    }

    pub fn has_old(&self, card: DevCardType) -> bool {
        self.old.contains(&card)
    }

    /// Remove one old card of a type; false if none held
    pub fn take_old(&mut self, card: DevCardType) -> bool {
        match self.old.iter().position(|&c| c == card) {
            Some(i) => {
                self.old.remove(i);
                true
            }
            None => false,
        }
    }

    /// Make every new card playable
    pub fn age(&mut self) {
        self.old.append(&mut self.new);
    }

    pub fn total(&self) -> usize {
        self.new.len() + self.old.len()
    }

    /// VP cards held, new or old
    pub fn victory_points(&self) -> u32 {
        self.new
            .iter()
            .chain(&self.old)
            .filter(|c| c.is_victory_point())
            .count() as u32
    }
}

/// An open offer to trade with one or more players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOffer {
    pub from: PlayerId,
    /// Seats the offer is made to
    pub to: BTreeSet<PlayerId>,
    /// What the offering player gives
    pub give: ResourceSet,
    /// What the offering player wants back
    pub get: ResourceSet,
}

/// A single player's state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub number: PlayerId,
    pub name: String,
    pub robot: bool,
    pub face_id: u32,
    pub resources: ResourceSet,

    pub roads_remaining: u32,
    pub settlements_remaining: u32,
    pub cities_remaining: u32,

    legal_roads: BTreeSet<Coord>,
    legal_settlements: BTreeSet<Coord>,
    potential_roads: BTreeSet<Coord>,
    potential_settlements: BTreeSet<Coord>,
    potential_cities: BTreeSet<Coord>,
    ports: BTreeSet<PortType>,

    /// 1 per settlement, 2 per city
    pub building_vp: u32,
    pub longest_road_length: u32,
    pub knights_played: u32,
    pub dev_cards: DevCardHand,
    pub played_dev_card: bool,
    pub needs_discard: bool,
    pub asked_board_reset: bool,
    pub current_offer: Option<TradeOffer>,
    pub last_settlement: Option<Coord>,
    pub last_road: Option<Coord>,
}

impl Player {
    /// A fresh player: every land node is a potential settlement for initial placement.
    pub fn new(number: PlayerId, board: &Board) -> Self {
        let legal_settlements = board.land_nodes().clone();
        Self {
            number,
            name: String::new(),
            robot: false,
            face_id: 1,
            resources: ResourceSet::new(),
            roads_remaining: MAX_ROADS,
            settlements_remaining: MAX_SETTLEMENTS,
            cities_remaining: MAX_CITIES,
            legal_roads: board.legal_road_edges().clone(),
            potential_settlements: legal_settlements.clone(),
            legal_settlements,
            potential_roads: BTreeSet::new(),
            potential_cities: BTreeSet::new(),
            ports: BTreeSet::new(),
            building_vp: 0,
            longest_road_length: 0,
            knights_played: 0,
            dev_cards: DevCardHand::default(),
            played_dev_card: false,
            needs_discard: false,
            asked_board_reset: false,
            current_offer: None,
            last_settlement: None,
            last_road: None,
        }
    }

    // ==================== Placement sets ====================

    pub fn is_legal_road(&self, edge: Coord) -> bool {
        self.legal_roads.contains(&edge)
    }

    pub fn is_legal_settlement(&self, node: Coord) -> bool {
        self.legal_settlements.contains(&node)
    }

    pub fn is_potential_road(&self, edge: Coord) -> bool {
        self.potential_roads.contains(&edge)
    }

    pub fn is_potential_settlement(&self, node: Coord) -> bool {
        self.potential_settlements.contains(&node)
    }

    pub fn is_potential_city(&self, node: Coord) -> bool {
        self.potential_cities.contains(&node)
    }

    pub fn potential_roads(&self) -> &BTreeSet<Coord> {
        &self.potential_roads
    }

    pub fn potential_settlements(&self) -> &BTreeSet<Coord> {
        &self.potential_settlements
    }

    pub fn potential_cities(&self) -> &BTreeSet<Coord> {
        &self.potential_cities
    }

    pub fn has_potential_road(&self) -> bool {
        !self.potential_roads.is_empty()
    }

    pub fn has_potential_settlement(&self) -> bool {
        !self.potential_settlements.is_empty()
    }

    pub fn has_potential_city(&self) -> bool {
        !self.potential_cities.is_empty()
    }

    pub fn clear_potential_settlements(&mut self) {
        self.potential_settlements.clear();
    }

    pub fn set_potential_settlements(&mut self, nodes: impl IntoIterator<Item = Coord>) {
        self.potential_settlements = nodes.into_iter().collect();
    }

    /// Rebuild potential settlements from the ends of our roads: legal nodes
    /// not occupied by an opponent.
    pub fn rederive_potential_settlements(&mut self, board: &Board) {
        let grid = board.grid();
        let nodes: BTreeSet<Coord> = board
            .roads()
            .filter(|r| r.owner == self.number)
            .flat_map(|r| grid.adjacent_nodes_to_edge(r.coord))
            .filter(|&n| self.is_legal_settlement(n) && !self.is_blocked_at(n, board))
            .collect();
        self.potential_settlements = nodes;
    }

    /// Whether an opponent's settlement or city sits on `node`
    fn is_blocked_at(&self, node: Coord, board: &Board) -> bool {
        board
            .settlement_or_city_at(node)
            .map_or(false, |p| p.owner != self.number)
    }

    fn owns_road_at(&self, edge: Coord, board: &Board) -> bool {
        board.road_at(edge).map_or(false, |r| r.owner == self.number)
    }

    /// Update placement sets for a piece that is about to go on the board.
    ///
    /// Must run before [`Board::put_piece`] stores `piece`.
    pub fn update_potentials(&mut self, piece: &Piece, board: &Board) {
        let grid = board.grid();
        let ours = piece.owner == self.number;
        let id = piece.coord;

        match piece.kind {
            PieceKind::Road => {
                self.potential_roads.remove(&id);
                self.legal_roads.remove(&id);
                if !ours {
                    return;
                }
                for node in grid.adjacent_nodes_to_edge(id) {
                    if self.is_blocked_at(node, board) {
                        continue;
                    }
                    for edge in grid.adjacent_edges_to_node(node) {
                        if self.legal_roads.contains(&edge) {
                            self.potential_roads.insert(edge);
                        }
                    }
                    if self.legal_settlements.contains(&node) {
                        self.potential_settlements.insert(node);
                    }
                }
            }
            PieceKind::Settlement => {
                for node in std::iter::once(id).chain(grid.adjacent_nodes_to_node(id)) {
                    self.potential_settlements.remove(&node);
                    self.legal_settlements.remove(&node);
                }

                if ours {
                    self.potential_cities.insert(id);
                    for edge in grid.adjacent_edges_to_node(id) {
                        if self.legal_roads.contains(&edge) {
                            self.potential_roads.insert(edge);
                        }
                    }
                    return;
                }

                // An opponent settling here cuts off our potential roads that
                // were only reachable through this node.
                for edge in grid.adjacent_edges_to_node(id) {
                    if !self.potential_roads.contains(&edge) {
                        continue;
                    }
                    let far = grid.other_node_of_edge(edge, id);
                    let still_connected = grid
                        .adjacent_edges_to_node(far)
                        .into_iter()
                        .any(|e| e != edge && self.owns_road_at(e, board));
                    if !still_connected {
                        self.potential_roads.remove(&edge);
                    }
                }
            }
            PieceKind::City => {
                self.potential_cities.remove(&id);
            }
        }
    }

    // ==================== Pieces ====================

    /// Record a piece placed by anyone: placement sets always update,
    /// counts and VP only for our own pieces.
    ///
    /// Placing a city does not return the settlement; the caller removes
    /// it with [`Player::remove_piece`].
    pub fn put_piece(&mut self, piece: &Piece, board: &Board) {
        if piece.owner == self.number {
            match piece.kind {
                PieceKind::Road => {
                    self.roads_remaining = self.roads_remaining.saturating_sub(1);
                    self.last_road = Some(piece.coord);
                }
                PieceKind::Settlement => {
                    self.settlements_remaining = self.settlements_remaining.saturating_sub(1);
                    self.building_vp += 1;
                    self.last_settlement = Some(piece.coord);
                    if let Some(port) = board.port_at_node(piece.coord) {
                        self.ports.insert(port);
                    }
                }
                PieceKind::City => {
                    self.cities_remaining = self.cities_remaining.saturating_sub(1);
                    self.building_vp += 2;
                }
            }
        }
        self.update_potentials(piece, board);
    }

    /// Take one of our pieces back into stock.
    ///
    /// For a road, the edge becomes placeable again and neighbouring potential
    /// roads are rechecked for a remaining connection.
    pub fn remove_piece(&mut self, piece: &Piece, board: &Board) {
        if piece.owner != self.number {
            return;
        }
        match piece.kind {
            PieceKind::Road => {
                self.roads_remaining += 1;
                self.remove_road_potentials(piece.coord, board);
            }
            PieceKind::Settlement => {
                self.settlements_remaining += 1;
                self.building_vp = self.building_vp.saturating_sub(1);
            }
            PieceKind::City => {
                self.cities_remaining += 1;
                self.building_vp = self.building_vp.saturating_sub(2);
            }
        }
    }

    fn remove_road_potentials(&mut self, edge: Coord, board: &Board) {
        let grid = board.grid();
        let own_roads: BTreeSet<Coord> = board
            .roads()
            .filter(|r| r.owner == self.number && r.coord != edge)
            .map(|r| r.coord)
            .collect();
        let own_road_at = |e: Coord| own_roads.contains(&e);

        for node in grid.adjacent_nodes_to_edge(edge) {
            let touched = grid.adjacent_edges_to_node(node).into_iter().any(own_road_at);
            if !touched {
                self.potential_settlements.remove(&node);
            }
        }

        self.potential_roads.insert(edge);
        self.legal_roads.insert(edge);

        for adj in grid.adjacent_edges_to_edge(edge) {
            if !self.potential_roads.contains(&adj) {
                continue;
            }
            let connected = grid.adjacent_nodes_to_edge(adj).into_iter().any(|node| {
                !self.is_blocked_at(node, board)
                    && grid
                        .adjacent_edges_to_node(node)
                        .into_iter()
                        .any(|e| e != adj && own_road_at(e))
            });
            if !connected {
                self.potential_roads.remove(&adj);
            }
        }
    }

    /// Undo an initial settlement that the board no longer holds.
    ///
    /// Legality of the node and its neighbours is restored where no other
    /// building forbids it. Runs for every player.
    pub fn undo_put_settlement(&mut self, piece: &Piece, board: &Board) {
        let grid = board.grid();
        let id = piece.coord;

        for node in std::iter::once(id).chain(grid.adjacent_nodes_to_node(id)) {
            let crowded = std::iter::once(node)
                .chain(grid.adjacent_nodes_to_node(node))
                .any(|n| board.settlement_or_city_at(n).is_some());
            if board.is_node_on_land(node) && !crowded {
                self.legal_settlements.insert(node);
                self.potential_settlements.insert(node);
            }
        }

        if piece.owner != self.number {
            return;
        }
        self.remove_piece(piece, board);
        self.potential_cities.remove(&id);
        if self.last_settlement == Some(id) {
            self.last_settlement = None;
        }
        for edge in grid.adjacent_edges_to_node(id) {
            let far = grid.other_node_of_edge(edge, id);
            let reachable = grid
                .adjacent_edges_to_node(far)
                .into_iter()
                .any(|e| self.owns_road_at(e, board))
                || board.settlement_or_city_at(far).map_or(false, |p| p.owner == self.number);
            if !reachable {
                self.potential_roads.remove(&edge);
            }
        }
        self.ports = board
            .pieces_of(self.number)
            .filter(|p| p.kind.is_building())
            .filter_map(|p| board.port_at_node(p.coord))
            .collect();
    }

    // ==================== Ports ====================

    pub fn has_port(&self, port: PortType) -> bool {
        self.ports.contains(&port)
    }

    pub fn ports(&self) -> &BTreeSet<PortType> {
        &self.ports
    }

    pub fn set_port_flag(&mut self, port: PortType, on: bool) {
        if on {
            self.ports.insert(port);
        } else {
            self.ports.remove(&port);
        }
    }

    // ==================== Scoring ====================

    /// Points everyone can see: buildings and awards
    pub fn public_vp(&self, has_longest_road: bool, has_largest_army: bool) -> u32 {
        self.building_vp + 2 * has_longest_road as u32 + 2 * has_largest_army as u32
    }

    /// Public points plus held VP cards
    pub fn total_vp(&self, has_longest_road: bool, has_largest_army: bool) -> u32 {
        self.public_vp(has_longest_road, has_largest_army) + self.dev_cards.victory_points()
    }

    /// Resources this player collects when `roll` comes up.
    pub fn resources_from_roll(&self, board: &Board, roll: u8) -> ResourceSet {
        let grid = board.grid();
        let mut income = ResourceSet::new();
        for piece in board.pieces_of(self.number) {
            let amount = match piece.kind {
                PieceKind::Settlement => 1,
                PieceKind::City => 2,
                PieceKind::Road => continue,
            };
            for hex in grid.adjacent_hexes_to_node(piece.coord) {
                if board.robber_hex() == Some(hex) || board.number_on_hex(hex) != Some(roll) {
                    continue;
                }
                if let Some(resource) = board.hex_type(hex).and_then(|t| t.resource()) {
                    income.add_one(amount, resource);
                }
            }
        }
        income
    }

    /// Longest simple path through our roads, in edges.
    ///
    /// A path may start at, but not pass through, a node holding an
    /// opponent's settlement or city. The result is also stored in
    /// `longest_road_length`.
    pub fn calc_longest_road(&mut self, board: &Board) -> u32 {
        let grid = board.grid();
        let mut links: BTreeMap<Coord, Vec<(Coord, Coord)>> = BTreeMap::new();
        for road in board.roads().filter(|r| r.owner == self.number) {
            let [a, b] = grid.adjacent_nodes_to_edge(road.coord);
            links.entry(a).or_default().push((road.coord, b));
            links.entry(b).or_default().push((road.coord, a));
        }

        let mut longest = 0;
        for &start in links.keys() {
            let mut pending: Vec<(Coord, u32, Vec<Coord>)> = vec![(start, 0, Vec::new())];
            while let Some((node, len, used)) = pending.pop() {
                longest = longest.max(len);
                if len > 0 && self.is_blocked_at(node, board) {
                    continue;
                }
                for &(edge, next) in links.get(&node).into_iter().flatten() {
                    if !used.contains(&edge) {
                        let mut path = used.clone();
                        path.push(edge);
                        pending.push((next, len + 1, path));
                    }
                }
            }
        }

        self.longest_road_length = longest;
        longest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::HexType;
    use crate::resources::Resource;
    use crate::topology::Encoding;

    fn place(board: &mut Board, players: &mut [Player], piece: Piece) {
        for p in players.iter_mut() {
            p.put_piece(&piece, board);
        }
        board.put_piece(piece);
    }

    fn setup() -> (Board, Vec<Player>) {
        let board = Board::new(Encoding::Diagonal);
        let players = (0..2).map(|pn| Player::new(pn, &board)).collect();
        (board, players)
    }

    #[test]
    fn test_new_player_defaults() {
        let (board, players) = setup();
        let p = &players[0];
        assert_eq!(p.roads_remaining, 15);
        assert_eq!(p.settlements_remaining, 5);
        assert_eq!(p.cities_remaining, 4);
        assert_eq!(p.potential_settlements().len(), 54);
        assert!(!p.has_potential_road());
        assert!(p.is_legal_road(0x56));
        assert_eq!(board.pieces().len(), 0);
    }

    #[test]
    fn test_deck_composition() {
        let deck = DevCardType::standard_deck();
        assert_eq!(deck.len(), 25);
        assert_eq!(deck.iter().filter(|&&c| c == DevCardType::Knight).count(), 14);
        assert_eq!(deck.iter().filter(|c| c.is_victory_point()).count(), 5);
    }

    #[test]
    fn test_settlement_potentials() {
        let (mut board, mut players) = setup();
        place(&mut board, &mut players, Piece::new(PieceKind::Settlement, 0, 0x67));

        let me = &players[0];
        assert!(me.is_potential_city(0x67));
        for edge in [0x56, 0x67, 0x66] {
            assert!(me.is_potential_road(edge), "edge {:#x}", edge);
        }
        for p in &players {
            for node in [0x67, 0x56, 0x78, 0x76] {
                assert!(!p.is_legal_settlement(node));
                assert!(!p.is_potential_settlement(node));
            }
        }
        assert!(!players[1].has_potential_city());
        assert!(!players[1].has_potential_road());
        assert_eq!(me.building_vp, 1);
        assert_eq!(me.settlements_remaining, 4);
    }

    #[test]
    fn test_road_extends_potentials() {
        let (mut board, mut players) = setup();
        players[0].clear_potential_settlements();
        place(&mut board, &mut players, Piece::new(PieceKind::Road, 0, 0x67));

        let me = &players[0];
        assert!(!me.is_potential_road(0x67));
        assert!(!players[1].is_legal_road(0x67));
        assert!(me.is_potential_road(0x56));
        assert!(me.is_potential_road(0x78));
        assert!(me.is_potential_settlement(0x67));
        assert!(me.is_potential_settlement(0x78));
    }

    #[test]
    fn test_opponent_settlement_blocks_road_end() {
        let (mut board, mut players) = setup();
        players[0].clear_potential_settlements();
        place(&mut board, &mut players, Piece::new(PieceKind::Road, 0, 0x67));
        assert!(players[0].is_potential_road(0x78));
        assert!(players[0].is_potential_road(0x68));

        place(&mut board, &mut players, Piece::new(PieceKind::Settlement, 1, 0x78));
        let me = &players[0];
        assert!(!me.is_potential_road(0x78));
        assert!(!me.is_potential_road(0x68));
        assert!(me.is_potential_road(0x56));
        assert!(me.is_potential_road(0x66));
        assert!(!me.is_potential_settlement(0x78));
    }

    #[test]
    fn test_city_upgrade_counts() {
        let (mut board, mut players) = setup();
        place(&mut board, &mut players, Piece::new(PieceKind::Settlement, 0, 0x67));
        place(&mut board, &mut players, Piece::new(PieceKind::City, 0, 0x67));
        let settlement = Piece::new(PieceKind::Settlement, 0, 0x67);
        for p in players.iter_mut() {
            p.remove_piece(&settlement, &board);
        }
        let me = &players[0];
        assert_eq!(me.building_vp, 2);
        assert_eq!(me.settlements_remaining, 5);
        assert_eq!(me.cities_remaining, 3);
        assert!(!me.is_potential_city(0x67));
    }

    #[test]
    fn test_remove_road_restores_edge() {
        let (mut board, mut players) = setup();
        players[0].clear_potential_settlements();
        let road = Piece::new(PieceKind::Road, 0, 0x67);
        place(&mut board, &mut players, road);
        board.remove_piece(&road);
        players[0].remove_piece(&road, &board);

        let me = &players[0];
        assert_eq!(me.roads_remaining, 15);
        assert!(me.is_legal_road(0x67));
        assert!(!me.is_potential_road(0x56));
        assert!(!me.is_potential_settlement(0x78));
    }

    #[test]
    fn test_undo_initial_settlement() {
        let (mut board, mut players) = setup();
        let settlement = Piece::new(PieceKind::Settlement, 0, 0x67);
        place(&mut board, &mut players, settlement);
        board.remove_piece(&settlement);
        for p in players.iter_mut() {
            p.undo_put_settlement(&settlement, &board);
        }
        for p in &players {
            assert!(p.is_potential_settlement(0x67));
            assert!(p.is_legal_settlement(0x56));
        }
        assert_eq!(players[0].building_vp, 0);
        assert!(!players[0].has_potential_road());
        assert!(!players[0].has_potential_city());
    }

    #[test]
    fn test_resources_from_roll() {
        let (mut board, mut players) = setup();
        board.set_hex_type(0x55, HexType::Land(Resource::Clay));
        board.set_number(0x55, Some(8));
        place(&mut board, &mut players, Piece::new(PieceKind::Settlement, 0, 0x56));
        place(&mut board, &mut players, Piece::new(PieceKind::City, 1, 0x76));

        assert_eq!(players[0].resources_from_roll(&board, 8), ResourceSet::single(Resource::Clay, 1));
        assert_eq!(players[1].resources_from_roll(&board, 8), ResourceSet::single(Resource::Clay, 2));
        assert!(players[0].resources_from_roll(&board, 6).is_empty());

        board.set_robber_hex(0x55, false);
        assert!(players[0].resources_from_roll(&board, 8).is_empty());
    }

    #[test]
    fn test_longest_road_chain() {
        let (mut board, mut players) = setup();
        for edge in [0x45, 0x56, 0x67, 0x78, 0x89] {
            place(&mut board, &mut players, Piece::new(PieceKind::Road, 0, edge));
        }
        assert_eq!(players[0].calc_longest_road(&board), 5);
        assert_eq!(players[0].longest_road_length, 5);
        assert_eq!(players[1].calc_longest_road(&board), 0);
    }

    #[test]
    fn test_longest_road_cut_by_opponent() {
        let (mut board, mut players) = setup();
        for edge in [0x45, 0x56, 0x67, 0x78, 0x89] {
            place(&mut board, &mut players, Piece::new(PieceKind::Road, 0, edge));
        }
        place(&mut board, &mut players, Piece::new(PieceKind::Settlement, 1, 0x67));
        assert_eq!(players[0].calc_longest_road(&board), 3);
    }

    #[test]
    fn test_longest_road_own_settlement_does_not_cut() {
        let (mut board, mut players) = setup();
        for edge in [0x45, 0x56, 0x67, 0x78] {
            place(&mut board, &mut players, Piece::new(PieceKind::Road, 0, edge));
        }
        place(&mut board, &mut players, Piece::new(PieceKind::Settlement, 0, 0x67));
        assert_eq!(players[0].calc_longest_road(&board), 4);
    }

    #[test]
    fn test_victory_points() {
        let (mut board, mut players) = setup();
        place(&mut board, &mut players, Piece::new(PieceKind::Settlement, 0, 0x67));
        let me = &mut players[0];
        me.dev_cards.add_new(DevCardType::Library);
        assert_eq!(me.public_vp(false, false), 1);
        assert_eq!(me.total_vp(false, false), 2);
        assert_eq!(me.total_vp(true, true), 6);
    }

    #[test]
    fn test_dev_cards_age() {
        let mut hand = DevCardHand::default();
        hand.add_new(DevCardType::Knight);
        assert!(!hand.has_old(DevCardType::Knight));
        hand.age();
        assert!(hand.has_old(DevCardType::Knight));
        assert!(hand.take_old(DevCardType::Knight));
        assert!(!hand.take_old(DevCardType::Knight));
        assert_eq!(hand.total(), 0);
    }

    #[test]
    fn test_port_flag_from_settlement() {
        let mut board = Board::new(Encoding::Diagonal);
        let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(11);
        board.generate_layout(None, &mut rng).unwrap();
        let port = board.ports()[0];
        let mut player = Player::new(0, &board);
        let piece = Piece::new(PieceKind::Settlement, 0, port.nodes[0]);
        player.put_piece(&piece, &board);
        board.put_piece(piece);
        assert!(player.has_port(port.kind));
    }
}
