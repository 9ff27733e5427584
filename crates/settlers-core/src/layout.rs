//! Fixed layout data for each board encoding.
//!
//! A template says where land is, which traversal orders the dice numbers may
//! follow, and where the nine ports sit. Which terrain lands where is decided
//! by [`crate::board::Board::generate_layout`].

use crate::board::PortType;
use crate::diagonal::DiagonalGrid;
use crate::resources::Resource;
use crate::rowcol::RowColGrid;
use crate::topology::{Coord, Encoding, Facing};
use serde::{Deserialize, Serialize};

/// Terrain of the 19 land hexes; `None` is the desert.
pub const TERRAIN: [Option<Resource>; 19] = [
    None,
    Some(Resource::Clay),
    Some(Resource::Clay),
    Some(Resource::Clay),
    Some(Resource::Ore),
    Some(Resource::Ore),
    Some(Resource::Ore),
    Some(Resource::Sheep),
    Some(Resource::Sheep),
    Some(Resource::Sheep),
    Some(Resource::Sheep),
    Some(Resource::Wheat),
    Some(Resource::Wheat),
    Some(Resource::Wheat),
    Some(Resource::Wheat),
    Some(Resource::Wood),
    Some(Resource::Wood),
    Some(Resource::Wood),
    Some(Resource::Wood),
];

/// Dice numbers in the order they are laid along a path.
pub const DICE_NUMBERS: [u8; 18] = [5, 2, 6, 3, 8, 10, 9, 12, 11, 4, 8, 10, 9, 4, 5, 6, 3, 11];

/// Port kinds before shuffling: four 3:1 and one 2:1 per resource.
pub const PORT_KINDS: [PortType; 9] = [
    PortType::Misc,
    PortType::Misc,
    PortType::Misc,
    PortType::Misc,
    PortType::Clay,
    PortType::Ore,
    PortType::Sheep,
    PortType::Wheat,
    PortType::Wood,
];

/// Where a port goes: a coastal edge and the facing from that edge toward land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSlot {
    pub edge: Coord,
    pub facing: Facing,
    /// Water hex drawn as the port, when the encoding has one
    pub hex: Option<Coord>,
}

/// Static shape of a board: land positions, dice paths, port slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutTemplate {
    pub land_hexes: Vec<Coord>,
    pub dice_paths: Vec<Vec<Coord>>,
    pub port_slots: Vec<PortSlot>,
}

/// Dice paths on the diagonal board, as 37-hex numbers spiralling inward.
const DIAGONAL_PATHS: [[usize; 19]; 6] = [
    [29, 30, 31, 26, 20, 13, 7, 6, 5, 10, 16, 23, 24, 25, 19, 12, 11, 17, 18],
    [29, 23, 16, 10, 5, 6, 7, 13, 20, 26, 31, 30, 24, 17, 11, 12, 19, 25, 18],
    [20, 13, 7, 6, 5, 10, 16, 23, 29, 30, 31, 26, 19, 12, 11, 17, 24, 25, 18],
    [20, 26, 31, 30, 29, 23, 16, 10, 5, 6, 7, 13, 19, 25, 24, 17, 11, 12, 18],
    [5, 10, 16, 23, 29, 30, 31, 26, 20, 13, 7, 6, 11, 17, 24, 25, 19, 12, 18],
    [5, 6, 7, 13, 20, 26, 31, 30, 29, 23, 16, 10, 11, 12, 19, 25, 24, 17, 18],
];

/// (hex number, facing, edge) of each port on the diagonal board.
const DIAGONAL_PORTS: [(usize, Facing, Coord); 9] = [
    (0, Facing::SouthEast, 0x27),
    (2, Facing::SouthWest, 0x5A),
    (8, Facing::SouthWest, 0x9C),
    (9, Facing::East, 0x24),
    (21, Facing::West, 0xCC),
    (22, Facing::East, 0x42),
    (32, Facing::NorthWest, 0xC9),
    (33, Facing::NorthEast, 0x72),
    (35, Facing::NorthWest, 0xA5),
];

/// Land hexes of the large board as (row, col), clockwise from the top-left
/// around the rim, then the inner ring, then the centre.
const ROWCOL_SPIRAL: [(i32, i32); 19] = [
    (3, 5),
    (3, 7),
    (3, 9),
    (5, 10),
    (7, 11),
    (9, 10),
    (11, 9),
    (11, 7),
    (11, 5),
    (9, 4),
    (7, 3),
    (5, 4),
    (5, 6),
    (5, 8),
    (7, 9),
    (9, 8),
    (9, 6),
    (7, 5),
    (7, 7),
];

/// (row, col) of each port edge on the large board, with its facing toward land.
const ROWCOL_PORTS: [(i32, i32, Facing); 9] = [
    (2, 4, Facing::SouthEast),
    (2, 9, Facing::SouthWest),
    (5, 11, Facing::West),
    (9, 11, Facing::West),
    (12, 9, Facing::NorthWest),
    (12, 6, Facing::NorthEast),
    (9, 3, Facing::East),
    (6, 2, Facing::SouthEast),
    (4, 3, Facing::SouthEast),
];

impl LayoutTemplate {
    pub fn for_encoding(encoding: Encoding) -> Self {
        match encoding {
            Encoding::Diagonal => Self::diagonal(),
            Encoding::RowCol => Self::row_col(),
        }
    }

    fn diagonal() -> Self {
        let to_coords = |path: &[usize]| -> Vec<Coord> {
            path.iter()
                .filter_map(|&n| DiagonalGrid::hex_at_number(n))
                .collect()
        };
        let mut land_hexes = to_coords(&DIAGONAL_PATHS[0]);
        land_hexes.sort_unstable();
        Self {
            land_hexes,
            dice_paths: DIAGONAL_PATHS.iter().map(|p| to_coords(p)).collect(),
            port_slots: DIAGONAL_PORTS
                .iter()
                .map(|&(num, facing, edge)| PortSlot {
                    edge,
                    facing,
                    hex: DiagonalGrid::hex_at_number(num),
                })
                .collect(),
        }
    }

    fn row_col() -> Self {
        let clockwise: Vec<Coord> = ROWCOL_SPIRAL
            .iter()
            .map(|&(r, c)| RowColGrid::coord(r, c))
            .collect();
        // Same rim and ring, walked the other way round
        let mut counter = Vec::with_capacity(19);
        counter.push(clockwise[0]);
        counter.extend(clockwise[1..12].iter().rev());
        counter.push(clockwise[12]);
        counter.extend(clockwise[13..18].iter().rev());
        counter.push(clockwise[18]);

        let mut land_hexes = clockwise.clone();
        land_hexes.sort_unstable();
        Self {
            land_hexes,
            dice_paths: vec![clockwise, counter],
            port_slots: ROWCOL_PORTS
                .iter()
                .map(|&(r, c, facing)| PortSlot {
                    edge: RowColGrid::coord(r, c),
                    facing,
                    hex: None,
                })
                .collect(),
        }
    }
}
