//! Board state: terrain, dice numbers, ports, the robber and placed pieces.
//!
//! This module contains:
//! - Hex, port and piece types
//! - `Board`, which owns the layout and every piece on it
//! - Layout generation with resource-clump and port-clump avoidance
//!
//! All adjacency goes through the board's [`Grid`]; the board never looks
//! inside a coordinate itself.

use crate::layout::{LayoutTemplate, DICE_NUMBERS, PORT_KINDS, TERRAIN};
use crate::resources::Resource;
use crate::topology::{Coord, Encoding, Facing, Grid, Topology, NO_VALUE};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;
use tracing::{debug, warn};

/// Seat number of a player
pub type PlayerId = u8;

/// Reshuffles of the land before giving up on the clump rule
const MAX_LAND_ATTEMPTS: usize = 1000;

/// Reshuffles of the ports before giving up on the clump rule
const MAX_PORT_ATTEMPTS: usize = 100;

/// Fatal layout problems.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BoardError {
    #[error("All port types are the same; port clumps cannot be broken up")]
    UniformPorts,

    #[error("No hex type at land coordinate {0:#x}")]
    InvalidHexType(Coord),
}

/// Port trade bonus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PortType {
    /// 3:1 for any resource
    Misc,
    Clay,
    Ore,
    Sheep,
    Wheat,
    Wood,
}

impl PortType {
    pub const ALL: [PortType; 6] = [
        PortType::Misc,
        PortType::Clay,
        PortType::Ore,
        PortType::Sheep,
        PortType::Wheat,
        PortType::Wood,
    ];

    /// Wire code: 0 for misc, then the resource code
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn for_resource(resource: Resource) -> Self {
        match resource {
            Resource::Clay => PortType::Clay,
            Resource::Ore => PortType::Ore,
            Resource::Sheep => PortType::Sheep,
            Resource::Wheat => PortType::Wheat,
            Resource::Wood => PortType::Wood,
        }
    }

    /// The resource a 2:1 port takes, `None` for misc
    pub fn resource(self) -> Option<Resource> {
        Resource::from_code(self.code())
    }

    /// Cards given per card received
    pub fn ratio(self) -> i32 {
        match self {
            PortType::Misc => 3,
            _ => 2,
        }
    }
}

/// What occupies a hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HexType {
    Water,
    Desert,
    Land(Resource),
    /// Water hex showing a port, facing toward land
    Port { kind: PortType, facing: Facing },
}

impl HexType {
    /// Legacy integer form: water 0, resources 1..=5, desert 6,
    /// misc port `6 + facing`, resource port `(facing << 4) + resource`.
    pub fn code(self) -> i32 {
        match self {
            HexType::Water => 0,
            HexType::Land(r) => r.code(),
            HexType::Desert => 6,
            HexType::Port {
                kind: PortType::Misc,
                facing,
            } => 6 + facing.value(),
            HexType::Port { kind, facing } => (facing.value() << 4) + kind.code(),
        }
    }

    /// Land or desert
    pub fn is_land(self) -> bool {
        matches!(self, HexType::Land(_) | HexType::Desert)
    }

    pub fn resource(self) -> Option<Resource> {
        match self {
            HexType::Land(r) => Some(r),
            _ => None,
        }
    }
}

/// Kind of playing piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PieceKind {
    Road,
    Settlement,
    City,
}

impl PieceKind {
    /// Settlements and cities sit on nodes; roads on edges
    pub fn is_building(self) -> bool {
        !matches!(self, PieceKind::Road)
    }
}

/// A piece on the board.
///
/// Two pieces are equal when kind and coordinate match, whoever owns them.
#[derive(Debug, Clone, Copy, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub owner: PlayerId,
    pub coord: Coord,
}

impl Piece {
    pub fn new(kind: PieceKind, owner: PlayerId, coord: Coord) -> Self {
        Self { kind, owner, coord }
    }
}

impl PartialEq for Piece {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.coord == other.coord
    }
}

/// A placed port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub kind: PortType,
    pub edge: Coord,
    pub facing: Facing,
    pub nodes: [Coord; 2],
}

/// The complete game board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    grid: Grid,
    /// Type of every hex, water included
    hexes: BTreeMap<Coord, HexType>,
    /// Dice numbers of producing hexes
    numbers: BTreeMap<Coord, u8>,
    robber_hex: Option<Coord>,
    previous_robber_hex: Option<Coord>,
    /// Every piece on the board, in placement order
    pieces: Vec<Piece>,
    land_hexes: Vec<Coord>,
    land_nodes: BTreeSet<Coord>,
    land_edges: BTreeSet<Coord>,
    ports: Vec<Port>,
    node_ports: BTreeMap<Coord, PortType>,
}

impl Board {
    /// An empty board: all water except the template's land, which starts as desert.
    pub fn new(encoding: Encoding) -> Self {
        let grid = Grid::new(encoding);
        let template = LayoutTemplate::for_encoding(encoding);

        let mut hexes: BTreeMap<Coord, HexType> = grid
            .hex_coords()
            .into_iter()
            .map(|h| (h, HexType::Water))
            .collect();
        let mut land_nodes = BTreeSet::new();
        let mut land_edges = BTreeSet::new();
        for &hex in &template.land_hexes {
            hexes.insert(hex, HexType::Desert);
            land_nodes.extend(grid.adjacent_nodes_to_hex(hex));
            land_edges.extend(grid.adjacent_edges_to_hex(hex));
        }

        Self {
            grid,
            hexes,
            numbers: BTreeMap::new(),
            robber_hex: None,
            previous_robber_hex: None,
            pieces: Vec::new(),
            land_hexes: template.land_hexes,
            land_nodes,
            land_edges,
            ports: Vec::new(),
            node_ports: BTreeMap::new(),
        }
    }

    /// Adjacency queries for this board's encoding
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn encoding(&self) -> Encoding {
        self.grid.encoding()
    }

    // ==================== Layout generation ====================

    /// Lay out terrain, dice numbers, the robber and ports.
    ///
    /// With `break_clumps = Some(k)`, terrain is reshuffled until no group of
    /// `k` or more same-resource hexes touch, and ports until no run of `k`
    /// or more 3:1 (or 2:1) ports sit next to each other around the coast.
    pub fn generate_layout<R: Rng>(
        &mut self,
        break_clumps: Option<u32>,
        rng: &mut R,
    ) -> Result<(), BoardError> {
        let template = LayoutTemplate::for_encoding(self.encoding());
        let mut terrain = TERRAIN.to_vec();

        let mut attempts = 0;
        loop {
            attempts += 1;
            let path = template
                .dice_paths
                .choose(rng)
                .cloned()
                .unwrap_or_else(|| template.land_hexes.clone());
            terrain.shuffle(rng);
            self.place_land(&terrain, &path, &DICE_NUMBERS);

            let clumped = match break_clumps {
                Some(k) => self.has_resource_clump(k)?,
                None => false,
            };
            if !clumped {
                break;
            }
            if attempts >= MAX_LAND_ATTEMPTS {
                warn!(attempts, "giving up on breaking resource clumps");
                break;
            }
        }
        debug!(attempts, robber = ?self.robber_hex, "land laid out");

        let kinds = shuffle_ports(break_clumps, rng)?;
        self.place_ports(&template, &kinds);
        Ok(())
    }

    /// Assign terrain along `path`; the desert takes the robber and no number.
    pub fn place_land(&mut self, terrain: &[Option<Resource>], path: &[Coord], numbers: &[u8]) {
        let mut next_number = numbers.iter();
        for (&hex, &kind) in path.iter().zip(terrain) {
            match kind {
                Some(resource) => {
                    self.hexes.insert(hex, HexType::Land(resource));
                    match next_number.next() {
                        Some(&n) => self.numbers.insert(hex, n),
                        None => self.numbers.remove(&hex),
                    };
                }
                None => {
                    self.hexes.insert(hex, HexType::Desert);
                    self.numbers.remove(&hex);
                    self.robber_hex = Some(hex);
                }
            }
        }
    }

    /// Whether any connected group of same-resource land hexes has `clump_size` or more members.
    ///
    /// Desert is never part of a clump. Sizes below 3 never count as clumped.
    pub fn has_resource_clump(&self, clump_size: u32) -> Result<bool, BoardError> {
        if clump_size < 3 {
            return Ok(false);
        }
        let mut unvisited: BTreeSet<Coord> = self.land_hexes.iter().copied().collect();
        while let Some(start) = unvisited.pop_first() {
            let kind = self.hex_type(start).ok_or(BoardError::InvalidHexType(start))?;
            if !matches!(kind, HexType::Land(_)) {
                continue;
            }

            let mut size = 1;
            let mut queue = VecDeque::from([start]);
            while let Some(hex) = queue.pop_front() {
                for neighbour in self.adjacent_hexes_to_hex(hex, false) {
                    if self.hex_type(neighbour) == Some(kind) && unvisited.remove(&neighbour) {
                        size += 1;
                        queue.push_back(neighbour);
                    }
                }
            }
            if size >= clump_size {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn place_ports(&mut self, template: &LayoutTemplate, kinds: &[PortType]) {
        self.ports.clear();
        self.node_ports.clear();
        for (slot, &kind) in template.port_slots.iter().zip(kinds) {
            let nodes = self.grid.adjacent_nodes_to_edge(slot.edge);
            if let Some(hex) = slot.hex {
                self.hexes.insert(
                    hex,
                    HexType::Port {
                        kind,
                        facing: slot.facing,
                    },
                );
            }
            for node in nodes {
                self.node_ports.insert(node, kind);
            }
            self.ports.push(Port {
                kind,
                edge: slot.edge,
                facing: slot.facing,
                nodes,
            });
        }
    }

    // ==================== Hex queries ====================

    /// Type of a hex, `None` if the coordinate is not a hex of this board
    pub fn hex_type(&self, hex: Coord) -> Option<HexType> {
        self.hexes.get(&hex).copied()
    }

    /// Legacy integer hex type, [`NO_VALUE`] off the board
    pub fn hex_type_code(&self, hex: Coord) -> i32 {
        self.hex_type(hex).map_or(NO_VALUE, HexType::code)
    }

    pub fn set_hex_type(&mut self, hex: Coord, kind: HexType) {
        if self.hexes.contains_key(&hex) {
            self.hexes.insert(hex, kind);
        }
    }

    /// Dice number on a hex; `None` for desert, water and off-board coordinates
    pub fn number_on_hex(&self, hex: Coord) -> Option<u8> {
        self.numbers.get(&hex).copied()
    }

    /// Legacy integer dice number: 0 when the hex has none, [`NO_VALUE`] off the board
    pub fn number_code(&self, hex: Coord) -> i32 {
        if !self.hexes.contains_key(&hex) {
            return NO_VALUE;
        }
        self.number_on_hex(hex).map_or(0, i32::from)
    }

    pub fn set_number(&mut self, hex: Coord, number: Option<u8>) {
        match number {
            Some(n) => self.numbers.insert(hex, n),
            None => self.numbers.remove(&hex),
        };
    }

    pub fn is_land_hex(&self, hex: Coord) -> bool {
        self.hex_type(hex).map_or(false, HexType::is_land)
    }

    /// Hexes that may hold land, in coordinate order
    pub fn land_hexes(&self) -> &[Coord] {
        &self.land_hexes
    }

    /// Neighbouring hexes; with `include_water` false, only land and desert.
    pub fn adjacent_hexes_to_hex(&self, hex: Coord, include_water: bool) -> Vec<Coord> {
        self.grid
            .adjacent_hexes_to_hex(hex)
            .into_iter()
            .filter(|&h| include_water || self.is_land_hex(h))
            .collect()
    }

    // ==================== Robber ====================

    pub fn robber_hex(&self) -> Option<Coord> {
        self.robber_hex
    }

    pub fn previous_robber_hex(&self) -> Option<Coord> {
        self.previous_robber_hex
    }

    /// Move the robber; with `remember_previous`, the old hex stays readable.
    pub fn set_robber_hex(&mut self, hex: Coord, remember_previous: bool) {
        self.previous_robber_hex = if remember_previous {
            self.robber_hex
        } else {
            None
        };
        self.robber_hex = Some(hex);
    }

    // ==================== Nodes, edges, ports ====================

    /// Whether a node touches at least one land hex of the layout
    pub fn is_node_on_land(&self, node: Coord) -> bool {
        self.land_nodes.contains(&node)
    }

    pub fn land_nodes(&self) -> &BTreeSet<Coord> {
        &self.land_nodes
    }

    /// Edges where a road may ever be built
    pub fn legal_road_edges(&self) -> &BTreeSet<Coord> {
        &self.land_edges
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn port_at_node(&self, node: Coord) -> Option<PortType> {
        self.node_ports.get(&node).copied()
    }

    /// Nodes carrying a given port type
    pub fn port_nodes(&self, kind: PortType) -> Vec<Coord> {
        self.node_ports
            .iter()
            .filter(|(_, &k)| k == kind)
            .map(|(&n, _)| n)
            .collect()
    }

    // ==================== Pieces ====================

    /// Place a piece; a city replaces the settlement on its node.
    pub fn put_piece(&mut self, piece: Piece) {
        if piece.kind == PieceKind::City {
            self.remove_piece(&Piece::new(PieceKind::Settlement, piece.owner, piece.coord));
        }
        self.pieces.push(piece);
    }

    /// Remove the piece matching `piece` by kind and coordinate.
    pub fn remove_piece(&mut self, piece: &Piece) -> bool {
        match self.pieces.iter().position(|p| p == piece) {
            Some(i) => {
                self.pieces.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn pieces_of_kind(&self, kind: PieceKind) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces.iter().filter(move |p| p.kind == kind)
    }

    pub fn roads(&self) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces_of_kind(PieceKind::Road)
    }

    pub fn settlements(&self) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces_of_kind(PieceKind::Settlement)
    }

    pub fn cities(&self) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces_of_kind(PieceKind::City)
    }

    pub fn pieces_of(&self, owner: PlayerId) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces.iter().filter(move |p| p.owner == owner)
    }

    /// Settlement or city on a node
    pub fn settlement_or_city_at(&self, node: Coord) -> Option<&Piece> {
        self.pieces
            .iter()
            .find(|p| p.coord == node && p.kind.is_building())
    }

    pub fn road_at(&self, edge: Coord) -> Option<&Piece> {
        self.roads().find(|p| p.coord == edge)
    }

    /// Owners of settlements or cities touching a hex, in seat order
    pub fn players_on_hex(&self, hex: Coord) -> Vec<PlayerId> {
        let corners = self.grid.adjacent_nodes_to_hex(hex);
        let owners: BTreeSet<PlayerId> = self
            .pieces
            .iter()
            .filter(|p| p.kind.is_building() && corners.contains(&p.coord))
            .map(|p| p.owner)
            .collect();
        owners.into_iter().collect()
    }
}

/// Shuffle the port kinds.
///
/// With clump breaking, runs of same-class ports (3:1 vs 2:1) are counted
/// around the coast, wrapping from the last slot to the first.
fn shuffle_ports<R: Rng>(break_clumps: Option<u32>, rng: &mut R) -> Result<Vec<PortType>, BoardError> {
    let mut kinds = PORT_KINDS.to_vec();
    for attempt in 1..=MAX_PORT_ATTEMPTS {
        kinds.shuffle(rng);
        let Some(k) = break_clumps else {
            break;
        };
        if !has_port_clump(&kinds, k as usize)? {
            break;
        }
        if attempt == MAX_PORT_ATTEMPTS {
            warn!(attempt, "giving up on breaking port clumps");
        }
    }
    Ok(kinds)
}

/// Longest circular run of same-class ports reaches `clump_size`.
pub fn has_port_clump(kinds: &[PortType], clump_size: usize) -> Result<bool, BoardError> {
    let generic: Vec<bool> = kinds.iter().map(|&k| k == PortType::Misc).collect();
    let Some(first_change) = (1..generic.len()).find(|&i| generic[i] != generic[0]) else {
        return Err(BoardError::UniformPorts);
    };

    // Start counting at a class boundary so wrap-around runs are seen whole.
    let len = generic.len();
    let mut run = 0;
    for step in 0..len {
        let i = (first_change + step) % len;
        let prev = (i + len - 1) % len;
        run = if step > 0 && generic[i] == generic[prev] {
            run + 1
        } else {
            1
        };
        if run >= clump_size {
            return Ok(true);
        }
    }
    Ok(false)
}
