//! Property-based tests for board topology, layout and resource bookkeeping.

use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use settlers_core::game::discard_pick_random;
use settlers_core::*;

fn encoding() -> impl Strategy<Value = Encoding> {
    prop_oneof![Just(Encoding::Diagonal), Just(Encoding::RowCol)]
}

fn hand() -> impl Strategy<Value = ResourceSet> {
    prop::array::uniform5(0i32..12)
        .prop_map(|[clay, ore, sheep, wheat, wood]| ResourceSet::with_amounts(clay, ore, sheep, wheat, wood))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every corner and side of a land hex points back at it, and node
    /// adjacency is symmetric with a shared edge between neighbours.
    #[test]
    fn prop_adjacency_is_symmetric(enc in encoding(), pick in any::<prop::sample::Index>()) {
        let board = Board::new(enc);
        let grid = board.grid();
        let hex = *pick.get(board.land_hexes());

        for edge in grid.adjacent_edges_to_hex(hex) {
            prop_assert!(grid.adjacent_hexes_to_edge(edge).contains(&hex));
        }
        for node in grid.adjacent_nodes_to_hex(hex) {
            prop_assert!(grid.adjacent_hexes_to_node(node).contains(&hex));
            for other in grid.adjacent_nodes_to_node(node) {
                prop_assert!(grid.adjacent_nodes_to_node(other).contains(&node));

                let edge = grid.edge_between_adjacent_nodes(node, other);
                prop_assert!(edge.is_some());
                let ends = grid.adjacent_nodes_to_edge(edge.unwrap());
                prop_assert!(ends.contains(&node) && ends.contains(&other));
                prop_assert_eq!(grid.other_node_of_edge(edge.unwrap(), node), other);
            }
        }
    }

    /// Hex neighbours are mutual.
    #[test]
    fn prop_hex_neighbours_are_mutual(enc in encoding(), pick in any::<prop::sample::Index>()) {
        let board = Board::new(enc);
        let grid = board.grid();
        let hex = *pick.get(board.land_hexes());

        for facing in Facing::ALL {
            if let Some(next) = grid.adjacent_hex_to_hex(hex, facing) {
                prop_assert_eq!(grid.adjacent_hex_to_hex(next, facing.opposite()), Some(hex));
            }
        }
    }

    /// Breaking clumps leaves no oversized same-resource group.
    #[test]
    fn prop_layout_breaks_clumps(enc in encoding(), clump in 3u32..=5, seed in any::<u64>()) {
        let mut board = Board::new(enc);
        let mut rng = StdRng::seed_from_u64(seed);
        board.generate_layout(Some(clump), &mut rng).unwrap();

        prop_assert!(!board.has_resource_clump(clump).unwrap());
        let deserts = board
            .land_hexes()
            .iter()
            .filter(|&&h| board.hex_type(h) == Some(HexType::Desert))
            .count();
        prop_assert_eq!(deserts, 1);
        prop_assert_eq!(board.hex_type(board.robber_hex().unwrap()), Some(HexType::Desert));
    }

    /// Taking away part of a hand and giving it back restores the hand.
    #[test]
    fn prop_subtract_then_add_restores(held in hand(), wanted in hand()) {
        let mut taken = ResourceSet::new();
        for resource in Resource::ALL {
            taken.set(resource, wanted.get(resource).min(held.get(resource)));
        }
        prop_assert!(held.contains(&taken));

        let mut rest = held;
        rest.subtract(&taken);
        prop_assert!(Resource::ALL.iter().all(|&r| rest.get(r) >= 0));
        prop_assert_eq!(rest.total(), held.total() - taken.total());
        rest.add(&taken);
        prop_assert_eq!(rest, held);
    }

    /// A random discard takes exactly the asked number of cards the player holds.
    #[test]
    fn prop_random_discard_is_drawn_from_hand(held in hand(), half in 0.0f64..=1.0, seed in any::<u64>()) {
        let count = (held.total() as f64 * half) as i32;
        let mut rng = StdRng::seed_from_u64(seed);
        let pick = discard_pick_random(&held, count, &mut rng);

        prop_assert_eq!(pick.total(), count);
        prop_assert!(held.contains(&pick));
    }

    /// With nobody else on the board, more road never means a shorter longest road.
    #[test]
    fn prop_longest_road_never_shrinks(picks in prop::collection::vec(any::<prop::sample::Index>(), 1..15)) {
        let mut game = Game::new("roads", GameOptions::default(), 0);
        game.add_player("builder", 0).unwrap();
        let edges: Vec<Coord> = game.board().legal_road_edges().iter().copied().collect();

        let mut previous = 0;
        for (placed, pick) in picks.iter().enumerate() {
            let edge = *pick.get(&edges);
            if game.board().road_at(edge).is_some() {
                continue;
            }
            game.place_piece(Piece::new(PieceKind::Road, 0, edge));
            let length = game.player(0).unwrap().longest_road_length;
            prop_assert!(length >= previous);
            prop_assert!(length as usize <= placed + 1);
            previous = length;
        }
    }
}
