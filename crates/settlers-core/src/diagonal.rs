//! Diagonal encoding for the classic 4-player board.
//!
//! A coordinate is one byte with two 4-bit axes running diagonally across the
//! board. Hexes have both nibbles odd, '|' edges have both nibbles even, and
//! the mixed-parity values are nodes and '/' or '\' edges. Stepping by
//! 0x01/0x10/0x11 moves along an axis without carrying into the other.

use crate::topology::{Coord, Encoding, Facing, Topology};
use serde::{Deserialize, Serialize};

/// Lowest and highest hex coordinates.
pub const MIN_HEX: Coord = 0x11;
pub const MAX_HEX: Coord = 0xDD;

pub const MIN_NODE: Coord = 0x23;
pub const MAX_NODE: Coord = 0xDC;

pub const MIN_EDGE: Coord = 0x22;
pub const MAX_EDGE: Coord = 0xCC;

/// Diagonal rows of hexes: first coordinate, last coordinate, hex number of the first.
/// Each row steps by 0x22.
const HEX_ROWS: [(Coord, Coord, usize); 7] = [
    (0x17, 0x7D, 0),
    (0x15, 0x9D, 4),
    (0x13, 0xBD, 9),
    (0x11, 0xDD, 15),
    (0x31, 0xDB, 22),
    (0x51, 0xD9, 28),
    (0x71, 0xD7, 33),
];

/// Node offsets from a hex: N, NE, SE, S, SW, NW.
const HEX_NODES: [Coord; 6] = [0x01, 0x12, 0x21, 0x10, -0x01, -0x10];

/// Edge offsets from a hex: NE, E, SE, SW, W, NW.
const HEX_EDGES: [Coord; 6] = [0x01, 0x11, 0x10, -0x01, -0x11, -0x10];

/// Axis deltas (high nibble, low nibble) to the neighbouring hex, by facing.
const HEX_TO_HEX: [(Coord, Coord); 6] = [(0, 2), (2, 2), (2, 0), (0, -2), (-2, -2), (-2, 0)];

/// Offset to the node two steps away, by facing.
const NODE_2_AWAY: [Coord; 6] = [0x02, 0x22, 0x20, -0x02, -0x22, -0x20];

/// The classic board in the diagonal encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagonalGrid;

/// Both nibbles even: a vertical '|' edge. Otherwise a sloped edge.
fn is_vertical_edge(edge: Coord) -> bool {
    ((edge & 0x0F) + (edge >> 4)) % 2 == 0
}

fn high(c: Coord) -> Coord {
    c >> 4
}

fn low(c: Coord) -> Coord {
    c & 0x0F
}

fn in_node_range(node: Coord) -> bool {
    (MIN_NODE..=MAX_NODE).contains(&node)
}

fn in_edge_range(edge: Coord) -> bool {
    (MIN_EDGE..=MAX_EDGE).contains(&edge)
}

/// Whether a node with an even high nibble has a southern neighbour.
fn has_southern(node: Coord) -> bool {
    node < 0x81 || (node - 0x81) % 0x22 != 0
}

/// Whether a node with an odd high nibble has a northern neighbour.
fn has_northern(node: Coord) -> bool {
    node < 0x18 || node > 0x7E || (node - 0x18) % 0x22 != 0
}

impl DiagonalGrid {
    /// Position of a hex in the 37-hex numbering, or `None` for a non-hex.
    pub fn hex_number(hex: Coord) -> Option<usize> {
        if !(MIN_HEX..=MAX_HEX).contains(&hex) {
            return None;
        }
        HEX_ROWS.iter().find_map(|&(first, last, num)| {
            if hex >= first && hex <= last && (hex - first) % 0x22 == 0 {
                Some(num + ((hex - first) / 0x22) as usize)
            } else {
                None
            }
        })
    }

    /// Inverse of [`DiagonalGrid::hex_number`].
    pub fn hex_at_number(num: usize) -> Option<Coord> {
        HEX_ROWS.iter().rev().find_map(|&(first, last, start)| {
            let len = ((last - first) / 0x22) as usize + 1;
            if num >= start && num < start + len {
                Some(first + 0x22 * (num - start) as Coord)
            } else {
                None
            }
        })
    }
}

impl Topology for DiagonalGrid {
    fn encoding(&self) -> Encoding {
        Encoding::Diagonal
    }

    fn hex_coords(&self) -> Vec<Coord> {
        (0..37).filter_map(DiagonalGrid::hex_at_number).collect()
    }

    fn is_hex_coord(&self, hex: Coord) -> bool {
        DiagonalGrid::hex_number(hex).is_some()
    }

    fn is_node_coord(&self, node: Coord) -> bool {
        in_node_range(node) && (high(node) + low(node)) % 2 == 1
    }

    fn is_edge_coord(&self, edge: Coord) -> bool {
        in_edge_range(edge) && !(high(edge) % 2 == 1 && low(edge) % 2 == 1)
    }

    fn adjacent_hex_to_hex(&self, hex: Coord, facing: Facing) -> Option<Coord> {
        if !self.is_hex_coord(hex) {
            return None;
        }
        let (d1, d2) = HEX_TO_HEX[facing.index()];
        let a1 = high(hex) + d1;
        let a2 = low(hex) + d2;
        if !(1..=0xD).contains(&a1) || !(1..=0xD).contains(&a2) {
            return None;
        }
        let other = (a1 << 4) | a2;
        self.is_hex_coord(other).then_some(other)
    }

    fn adjacent_nodes_to_hex(&self, hex: Coord) -> [Coord; 6] {
        HEX_NODES.map(|d| hex + d)
    }

    fn adjacent_edges_to_hex(&self, hex: Coord) -> [Coord; 6] {
        HEX_EDGES.map(|d| hex + d)
    }

    fn adjacent_hexes_to_node(&self, node: Coord) -> Vec<Coord> {
        let candidates = if high(node) % 2 == 0 {
            [node - 0x10, node + 0x10, node - 0x12]
        } else {
            [node - 0x21, node + 0x01, node - 0x01]
        };
        candidates
            .into_iter()
            .filter(|&h| self.is_hex_coord(h))
            .collect()
    }

    fn adjacent_edge_to_node(&self, node: Coord, dir: usize) -> Option<Coord> {
        let even = high(node) % 2 == 0;
        let edge = match dir {
            0 if even || low(node) > 0 => node - 0x11,
            1 if !even || low(node) < 0xD => node,
            2 if even && has_southern(node) && low(node) > 0 => node - 0x01,
            2 if !even && has_northern(node) => node - 0x10,
            _ => return None,
        };
        in_edge_range(edge).then_some(edge)
    }

    fn adjacent_node_to_node(&self, node: Coord, dir: usize) -> Option<Coord> {
        let even = high(node) % 2 == 0;
        let other = match dir {
            0 if low(node) > 0 => node - 0x11,
            1 if low(node) < 0xD => node + 0x11,
            2 if even && has_southern(node) => node + 0x10 - 0x01,
            2 if !even && has_northern(node) => node - 0x10 + 0x01,
            _ => return None,
        };
        in_node_range(other).then_some(other)
    }

    fn adjacent_nodes_to_edge(&self, edge: Coord) -> [Coord; 2] {
        if is_vertical_edge(edge) {
            [edge + 0x01, edge + 0x10]
        } else {
            [edge, edge + 0x11]
        }
    }

    fn adjacent_edges_to_edge(&self, edge: Coord) -> Vec<Coord> {
        let candidates = if is_vertical_edge(edge) {
            [edge - 0x10, edge + 0x01, edge + 0x10, edge - 0x01]
        } else if high(edge) % 2 == 0 {
            [edge - 0x11, edge + 0x01, edge + 0x11, edge - 0x01]
        } else {
            [edge - 0x10, edge + 0x11, edge + 0x10, edge - 0x11]
        };
        candidates.into_iter().filter(|&e| in_edge_range(e)).collect()
    }

    fn adjacent_hex_to_edge(&self, edge: Coord, facing: Facing) -> Option<Coord> {
        use Facing::*;
        let hex = if is_vertical_edge(edge) {
            match facing {
                East => Some(edge + 0x11),
                West if low(edge) != 0 && high(edge) != 0 => Some(edge - 0x11),
                NorthEast | NorthWest if high(edge) != 0 => Some(edge + 0x01 - 0x10),
                SouthEast | SouthWest if low(edge) != 0 => Some(edge - 0x01 + 0x10),
                _ => None,
            }
        } else if high(edge) % 2 == 0 {
            match facing {
                NorthWest if high(edge) != 0 => Some(edge - 0x10),
                SouthEast => Some(edge + 0x10),
                NorthEast | East if low(edge) <= 0xD => Some(edge + 0x12),
                SouthWest | West if high(edge) != 0 && low(edge) >= 2 => Some(edge - 0x12),
                _ => None,
            }
        } else {
            match facing {
                NorthEast => Some(edge + 0x01),
                SouthWest if low(edge) != 0 => Some(edge - 0x01),
                East | SouthEast if high(edge) <= 0xD => Some(edge + 0x21),
                West | NorthWest if low(edge) != 0 && high(edge) >= 2 => Some(edge - 0x21),
                _ => None,
            }
        };
        hex.filter(|&h| self.is_hex_coord(h))
    }

    fn adjacent_hexes_to_edge(&self, edge: Coord) -> Vec<Coord> {
        [
            edge - 0x10,
            edge - 0x01,
            edge - 0x11,
            edge + 0x10,
            edge + 0x01,
            edge + 0x11,
        ]
        .into_iter()
        .filter(|&h| self.is_hex_coord(h) && HEX_EDGES.iter().any(|&d| h + d == edge))
        .collect()
    }

    fn edge_between_adjacent_nodes(&self, a: Coord, b: Coord) -> Option<Coord> {
        let edge = match a - b {
            0x11 => b,
            -0x11 => a,
            0x0F => a - 0x10,
            -0x0F => a - 0x01,
            _ => return None,
        };
        in_edge_range(edge).then_some(edge)
    }

    fn is_edge_adjacent_to_node(&self, node: Coord, edge: Coord) -> bool {
        if !in_edge_range(edge) {
            return false;
        }
        if edge == node || edge == node - 0x11 {
            return true;
        }
        if low(node) % 2 == 1 {
            edge == node - 0x01
        } else {
            edge == node - 0x10
        }
    }

    fn adjacent_node_to_node_2_away(&self, node: Coord, facing: Facing) -> Option<Coord> {
        let other = node + NODE_2_AWAY[facing.index()];
        self.is_node_coord(other).then_some(other)
    }

    fn edge_to_node_2_away(&self, node: Coord, node2: Coord) -> Option<Coord> {
        if !self.is_node_2_away(node, node2) {
            return None;
        }
        let edge = if high(node) % 2 == 0 {
            if node2 == node - 0x02 || node2 == node + 0x20 {
                node - 0x01
            } else if node2 < node {
                node - 0x11
            } else {
                node
            }
        } else if node2 == node - 0x20 || node2 == node + 0x02 {
            node - 0x10
        } else if node2 > node {
            node
        } else {
            node - 0x11
        };
        in_edge_range(edge).then_some(edge)
    }
}
