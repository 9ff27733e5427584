//! Row/column encoding for the large board.
//!
//! A coordinate is `(row << 8) | col`. Hexes sit on odd rows, alternating
//! their column parity every other row. Even rows hold the nodes and the
//! sloped edges between them; odd rows hold the vertical edges between hexes.
//!
//! ```text
//!    row 0:   A   Y   A   Y      (nodes)
//!    row 1:   |  hex  |  hex     (vertical edges and hexes)
//!    row 2:   Y   A   Y   A
//! ```

use crate::topology::{Coord, Encoding, Facing, Topology};
use serde::{Deserialize, Serialize};

/// Default board height in rows.
pub const DEFAULT_HEIGHT: i32 = 16;

/// Default board width in columns.
pub const DEFAULT_WIDTH: i32 = 18;

/// (row, col) deltas to the neighbouring hex, by facing.
const HEX_TO_HEX: [(i32, i32); 6] = [(-2, 1), (0, 2), (2, 1), (2, -1), (0, -2), (-2, -1)];

/// (row, col) deltas from a hex to its corners: N, NE, SE, S, SW, NW.
const HEX_TO_NODE: [(i32, i32); 6] = [(-1, 0), (-1, 1), (1, 1), (1, 0), (1, -1), (-1, -1)];

/// (row, col) deltas from a hex to its sides: NE, E, SE, SW, W, NW.
const HEX_TO_EDGE: [(i32, i32); 6] = [(-1, 0), (0, 1), (1, 0), (1, -1), (0, -1), (-1, -1)];

/// (row, col) deltas to the node two steps away, by facing.
const NODE_2_AWAY: [(i32, i32); 6] = [(-2, 1), (0, 2), (2, 1), (2, -1), (0, -2), (-2, -1)];

/// Orientation of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeShape {
    Vertical,
    Rising,
    Falling,
}

impl EdgeShape {
    /// (row, col) deltas to the four edges sharing an endpoint.
    fn neighbours(self) -> [(i32, i32); 4] {
        match self {
            EdgeShape::Vertical => [(-1, -1), (-1, 0), (1, -1), (1, 0)],
            EdgeShape::Rising => [(0, -1), (1, 0), (-1, 1), (0, 1)],
            EdgeShape::Falling => [(0, -1), (-1, 0), (1, 1), (0, 1)],
        }
    }
}

fn row(c: Coord) -> i32 {
    c >> 8
}

fn col(c: Coord) -> i32 {
    c & 0xFF
}

fn pack(r: i32, c: i32) -> Coord {
    (r << 8) | c
}

fn edge_shape(edge: Coord) -> EdgeShape {
    let (r, c) = (row(edge), col(edge));
    if r % 2 == 1 {
        EdgeShape::Vertical
    } else if c % 2 != (r / 2) % 2 {
        EdgeShape::Rising
    } else {
        EdgeShape::Falling
    }
}

/// A 'Y' node has its stem pointing down; an 'A' node points up.
fn is_y_node(node: Coord) -> bool {
    col(node) % 2 != (row(node) / 2) % 2
}

/// The large board in the row/column encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowColGrid {
    pub height: i32,
    pub width: i32,
}

impl Default for RowColGrid {
    fn default() -> Self {
        Self::new(DEFAULT_HEIGHT, DEFAULT_WIDTH)
    }
}

impl RowColGrid {
    pub fn new(height: i32, width: i32) -> Self {
        Self { height, width }
    }

    /// Pack a row and column into a coordinate.
    pub fn coord(r: i32, c: i32) -> Coord {
        pack(r, c)
    }

    /// Unpack a coordinate into row and column.
    pub fn row_col(coord: Coord) -> (i32, i32) {
        (row(coord), col(coord))
    }

    fn is_hex_in_bounds(&self, r: i32, c: i32) -> bool {
        r > 0 && c > 0 && r < self.height && c < self.width && r % 2 == 1
    }

    fn is_node_in_bounds(&self, r: i32, c: i32) -> bool {
        let (h, w) = (self.height, self.width);
        if r < 0 || r > h || c < 0 || c > w {
            return false;
        }
        if r > 0 && r < h {
            return true;
        }
        if c > 0 && c < w {
            return true;
        }
        // Corners of the top and bottom rows
        if r == 0 {
            c == w && w % 2 == 1
        } else if c == 0 {
            (r / 2) % 2 == 0
        } else {
            w % 2 == (r / 2) % 2
        }
    }

    fn is_edge_in_bounds(&self, r: i32, c: i32) -> bool {
        let (h, w) = (self.height, self.width);
        if c < 0 || r < 0 || r > h {
            return false;
        }
        if r > 0 && r < h {
            return if r % 2 == 0 { c < w } else { c <= w };
        }
        if c == 0 {
            r != 0 && self.is_node_in_bounds(r, 0)
        } else if c < w - 1 {
            true
        } else if c == w - 1 {
            self.is_node_in_bounds(r, c + 1)
        } else {
            false
        }
    }

    fn hex_if_in_bounds(&self, r: i32, c: i32) -> Option<Coord> {
        self.is_hex_coord(pack(r, c)).then(|| pack(r, c))
    }
}

impl Topology for RowColGrid {
    fn encoding(&self) -> Encoding {
        Encoding::RowCol
    }

    fn hex_coords(&self) -> Vec<Coord> {
        let mut hexes = Vec::new();
        for r in (1..self.height).step_by(2) {
            for c in 1..self.width {
                if self.is_hex_coord(pack(r, c)) {
                    hexes.push(pack(r, c));
                }
            }
        }
        hexes
    }

    fn is_hex_coord(&self, hex: Coord) -> bool {
        let (r, c) = (row(hex), col(hex));
        hex >= 0 && self.is_hex_in_bounds(r, c) && c % 2 == (r / 2) % 2
    }

    fn is_node_coord(&self, node: Coord) -> bool {
        node >= 0 && row(node) % 2 == 0 && self.is_node_in_bounds(row(node), col(node))
    }

    fn is_edge_coord(&self, edge: Coord) -> bool {
        let (r, c) = (row(edge), col(edge));
        if edge < 0 || !self.is_edge_in_bounds(r, c) {
            return false;
        }
        // Odd rows alternate hex, vertical edge, hex...
        r % 2 == 0 || c % 2 != (r / 2) % 2
    }

    fn adjacent_hex_to_hex(&self, hex: Coord, facing: Facing) -> Option<Coord> {
        if !self.is_hex_coord(hex) {
            return None;
        }
        let (dr, dc) = HEX_TO_HEX[facing.index()];
        self.hex_if_in_bounds(row(hex) + dr, col(hex) + dc)
    }

    fn adjacent_nodes_to_hex(&self, hex: Coord) -> [Coord; 6] {
        HEX_TO_NODE.map(|(dr, dc)| pack(row(hex) + dr, col(hex) + dc))
    }

    fn adjacent_edges_to_hex(&self, hex: Coord) -> [Coord; 6] {
        HEX_TO_EDGE.map(|(dr, dc)| pack(row(hex) + dr, col(hex) + dc))
    }

    fn adjacent_hexes_to_node(&self, node: Coord) -> Vec<Coord> {
        let (r, c) = (row(node), col(node));
        let (h, w) = (self.height, self.width);
        let mut hexes = Vec::with_capacity(3);
        if is_y_node(node) {
            if r > 1 {
                hexes.push(pack(r - 1, c));
            }
            if r < h - 1 {
                if c > 1 {
                    hexes.push(pack(r + 1, c - 1));
                }
                if c < w - 1 {
                    hexes.push(pack(r + 1, c + 1));
                }
            }
        } else {
            if r < h - 1 {
                hexes.push(pack(r + 1, c));
            }
            if r > 1 {
                if c > 1 {
                    hexes.push(pack(r - 1, c - 1));
                }
                if c < w - 1 {
                    hexes.push(pack(r - 1, c + 1));
                }
            }
        }
        hexes.retain(|&hex| self.is_hex_coord(hex));
        hexes
    }

    fn adjacent_edge_to_node(&self, node: Coord, dir: usize) -> Option<Coord> {
        let (r, c) = (row(node), col(node));
        let (er, ec) = match dir {
            0 => (r, c - 1),
            1 => (r, c),
            2 if is_y_node(node) => (r + 1, c),
            2 => (r - 1, c),
            _ => return None,
        };
        self.is_edge_coord(pack(er, ec)).then(|| pack(er, ec))
    }

    fn adjacent_node_to_node(&self, node: Coord, dir: usize) -> Option<Coord> {
        let (r, c) = (row(node), col(node));
        let (nr, nc) = match dir {
            0 => (r, c - 1),
            1 => (r, c + 1),
            2 if is_y_node(node) => (r + 2, c),
            2 => (r - 2, c),
            _ => return None,
        };
        (nc >= 0 && self.is_node_in_bounds(nr, nc)).then(|| pack(nr, nc))
    }

    fn adjacent_nodes_to_edge(&self, edge: Coord) -> [Coord; 2] {
        if edge_shape(edge) == EdgeShape::Vertical {
            [edge - 0x100, edge + 0x100]
        } else {
            [edge, edge + 1]
        }
    }

    fn adjacent_edges_to_edge(&self, edge: Coord) -> Vec<Coord> {
        let (r, c) = (row(edge), col(edge));
        edge_shape(edge)
            .neighbours()
            .iter()
            .map(|&(dr, dc)| (r + dr, c + dc))
            .filter(|&(er, ec)| er >= 0 && ec >= 0 && self.is_edge_coord(pack(er, ec)))
            .map(|(er, ec)| pack(er, ec))
            .collect()
    }

    fn adjacent_hex_to_edge(&self, edge: Coord, facing: Facing) -> Option<Coord> {
        use Facing::*;
        let (r, c) = (row(edge), col(edge));
        let (hr, hc) = match edge_shape(edge) {
            EdgeShape::Vertical => match facing {
                East => (r, c + 1),
                West => (r, c - 1),
                NorthEast | NorthWest => (r - 2, c),
                SouthEast | SouthWest => (r + 2, c),
            },
            EdgeShape::Rising => match facing {
                NorthWest => (r - 1, c),
                SouthEast => (r + 1, c + 1),
                NorthEast | East => (r - 1, c + 2),
                SouthWest | West => (r + 1, c - 1),
            },
            EdgeShape::Falling => match facing {
                NorthEast => (r - 1, c + 1),
                SouthWest => (r + 1, c),
                East | SouthEast => (r + 1, c + 2),
                West | NorthWest => (r - 1, c - 1),
            },
        };
        if hr > 0 && hr < self.height && hc > 0 && hc < self.width {
            self.hex_if_in_bounds(hr, hc)
        } else {
            None
        }
    }

    fn adjacent_hexes_to_edge(&self, edge: Coord) -> Vec<Coord> {
        let (r, c) = (row(edge), col(edge));
        let (h, w) = (self.height, self.width);
        let candidates = match edge_shape(edge) {
            EdgeShape::Vertical => [
                (c < w - 1).then(|| edge + 1),
                (c > 1).then(|| edge - 1),
            ],
            EdgeShape::Rising => [
                (r > 1 && c > 0).then(|| edge - 0x100),
                (r < h - 1 && c < w - 1).then(|| edge + 0x101),
            ],
            EdgeShape::Falling => [
                (r > 1 && c < w - 1).then(|| edge - 0x100 + 1),
                (r < h - 1 && c > 0).then(|| edge + 0x100),
            ],
        };
        candidates
            .into_iter()
            .flatten()
            .filter(|&hex| self.is_hex_coord(hex))
            .collect()
    }

    fn edge_between_adjacent_nodes(&self, a: Coord, b: Coord) -> Option<Coord> {
        let edge = match b - a {
            0x01 => a,
            -0x01 => b,
            0x200 => a + 0x100,
            -0x200 => a - 0x100,
            _ => return None,
        };
        self.is_edge_coord(edge).then_some(edge)
    }

    fn is_edge_adjacent_to_node(&self, node: Coord, edge: Coord) -> bool {
        if !self.is_edge_coord(edge) {
            return false;
        }
        if edge == node || edge == node - 1 {
            return true;
        }
        if col(edge) != col(node) {
            return false;
        }
        if is_y_node(node) {
            row(edge) == row(node) + 1
        } else {
            row(edge) == row(node) - 1
        }
    }

    fn adjacent_node_to_node_2_away(&self, node: Coord, facing: Facing) -> Option<Coord> {
        let (dr, dc) = NODE_2_AWAY[facing.index()];
        let (r, c) = (row(node) + dr, col(node) + dc);
        (c >= 0 && self.is_node_in_bounds(r, c)).then(|| pack(r, c))
    }

    fn edge_to_node_2_away(&self, node: Coord, node2: Coord) -> Option<Coord> {
        if !self.is_node_2_away(node, node2) {
            return None;
        }
        let (r, c) = (row(node), col(node));
        let (r2, c2) = (row(node2), col(node2));
        let edge = if is_y_node(node) {
            if r2 > r {
                node + 0x100
            } else if c2 < c {
                node - 1
            } else {
                node
            }
        } else if r2 < r {
            node - 0x100
        } else if c2 < c {
            node - 1
        } else {
            node
        };
        self.is_edge_coord(edge).then_some(edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> RowColGrid {
        RowColGrid::default()
    }

    #[test]
    fn test_pack_and_unpack() {
        let c = RowColGrid::coord(7, 5);
        assert_eq!(c, 0x0705);
        assert_eq!(RowColGrid::row_col(c), (7, 5));
    }

    #[test]
    fn test_hex_parity() {
        let g = grid();
        assert!(g.is_hex_coord(0x0705));
        assert!(g.is_hex_coord(0x0506));
        assert!(!g.is_hex_coord(0x0706));
        assert!(!g.is_hex_coord(0x0605));
        assert!(!g.is_hex_coord(0x0000));
    }

    #[test]
    fn test_hex_neighbours() {
        let g = grid();
        let hex = RowColGrid::coord(7, 7);
        assert_eq!(
            g.adjacent_hexes_to_hex(hex),
            vec![0x0508, 0x0709, 0x0908, 0x0906, 0x0705, 0x0506]
        );
    }

    #[test]
    fn test_hex_nodes_and_back() {
        let g = grid();
        let hex = RowColGrid::coord(7, 7);
        let nodes = g.adjacent_nodes_to_hex(hex);
        assert_eq!(nodes, [0x0607, 0x0608, 0x0808, 0x0807, 0x0806, 0x0606]);
        for node in nodes {
            assert!(g.is_node_coord(node));
            assert!(
                g.adjacent_hexes_to_node(node).contains(&hex),
                "node {:#x} should touch hex {:#x}",
                node,
                hex
            );
        }
    }

    #[test]
    fn test_hex_edges_join_its_nodes() {
        let g = grid();
        let hex = RowColGrid::coord(7, 7);
        let nodes = g.adjacent_nodes_to_hex(hex);
        let edges = g.adjacent_edges_to_hex(hex);
        for i in 0..6 {
            let a = nodes[i];
            let b = nodes[(i + 1) % 6];
            assert_eq!(g.edge_between_adjacent_nodes(a, b), Some(edges[i]));
            assert!(g.adjacent_hexes_to_edge(edges[i]).contains(&hex));
        }
    }

    #[test]
    fn test_node_shapes() {
        // North corner of a hex points up, south corner points down.
        assert!(!is_y_node(0x0607));
        assert!(is_y_node(0x0807));
    }

    #[test]
    fn test_vertical_edge() {
        let g = grid();
        let edge = RowColGrid::coord(7, 8);
        assert_eq!(edge_shape(edge), EdgeShape::Vertical);
        assert_eq!(g.adjacent_nodes_to_edge(edge), [0x0608, 0x0808]);
        assert_eq!(g.adjacent_hexes_to_edge(edge), vec![0x0709, 0x0707]);
        assert_eq!(g.adjacent_hex_to_edge(edge, Facing::West), Some(0x0707));
        assert_eq!(g.adjacent_edges_to_edge(edge).len(), 4);
    }

    #[test]
    fn test_edge_neighbours_share_an_endpoint() {
        let g = grid();
        for edge in [0x0708, 0x0606, 0x0607] {
            let ends = g.adjacent_nodes_to_edge(edge);
            for other in g.adjacent_edges_to_edge(edge) {
                let other_ends = g.adjacent_nodes_to_edge(other);
                assert!(
                    other_ends.iter().any(|n| ends.contains(n)),
                    "edge {:#x} and {:#x} should share a node",
                    edge,
                    other
                );
            }
        }
    }

    #[test]
    fn test_node_links_are_consistent() {
        let g = grid();
        for r in (2..12).step_by(2) {
            for c in 2..14 {
                let node = RowColGrid::coord(r, c);
                for dir in 0..3 {
                    let edge = g.adjacent_edge_to_node(node, dir).unwrap();
                    let other = g.adjacent_node_to_node(node, dir).unwrap();
                    assert!(g.adjacent_nodes_to_edge(edge).contains(&other));
                    assert!(g.is_edge_adjacent_to_node(node, edge));
                    assert_eq!(g.edge_between_adjacent_nodes(node, other), Some(edge));
                }
            }
        }
    }

    #[test]
    fn test_two_away() {
        let g = grid();
        let node = RowColGrid::coord(6, 7);
        for facing in Facing::ALL {
            let far = g.adjacent_node_to_node_2_away(node, facing).unwrap();
            let edge = g.edge_to_node_2_away(node, far).unwrap();
            assert!(g.is_edge_adjacent_to_node(node, edge));
            let mid = g.other_node_of_edge(edge, node);
            assert!(g.adjacent_nodes_to_node(mid).contains(&far));
        }
    }

    #[test]
    fn test_rim_node_has_fewer_links() {
        let g = grid();
        assert_eq!(g.adjacent_node_to_node(0x0000, 0), None);
        assert!(g.adjacent_edges_to_node(0x0001).len() < 3);
    }
}
