//! Integration tests for settlers-core
//!
//! These drive whole games through the public action interface.

use pretty_assertions::assert_eq;
use settlers_core::*;
use std::collections::BTreeSet;

// ==================== Helpers ====================

fn seated_game(seats: u8, seed: u64) -> Game {
    let mut game = Game::new("integration", GameOptions::default(), seed);
    for pn in 0..seats {
        game.add_player(&format!("player{}", pn), pn).unwrap();
    }
    game
}

/// A road next to the player's newest settlement
fn road_by_last_settlement(game: &Game, pn: PlayerId) -> Option<Coord> {
    let player = game.player(pn)?;
    let node = player.last_settlement?;
    game.board()
        .grid()
        .adjacent_edges_to_node(node)
        .into_iter()
        .find(|&e| player.is_potential_road(e))
}

/// Run initial placement, letting `choose` pick each settlement node.
fn place_initial(game: &mut Game, mut choose: impl FnMut(&Game, PlayerId) -> Coord) -> Vec<GameEvent> {
    let mut events = Vec::new();
    while game.state().is_initial_placement() {
        let pn = game.current_player().unwrap();
        let action = match game.state() {
            GameState::Start1A | GameState::Start2A => GameAction::PlaceSettlement {
                node: choose(game, pn),
            },
            _ => GameAction::PlaceRoad {
                edge: road_by_last_settlement(game, pn).unwrap(),
            },
        };
        events.extend(game.apply_action(pn, action).unwrap());
    }
    events
}

fn first_potential(game: &Game, pn: PlayerId) -> Coord {
    *game
        .player(pn)
        .unwrap()
        .potential_settlements()
        .iter()
        .next()
        .unwrap()
}

fn game_in_play(seats: u8, seed: u64) -> Game {
    let mut game = seated_game(seats, seed);
    game.start_game().unwrap();
    place_initial(&mut game, first_potential);
    game
}

/// Greedy discard of `count` cards
fn discard_pick(hand: &ResourceSet, count: i32) -> ResourceSet {
    let mut pick = ResourceSet::new();
    let mut left = count;
    for resource in Resource::ALL {
        let take = hand.get(resource).min(left);
        pick.set(resource, take);
        left -= take;
    }
    pick
}

/// Trade surplus for whatever the player holds least of
fn bank_trade(game: &Game, pn: PlayerId, player: &Player) -> Option<(ResourceSet, ResourceSet)> {
    let wanted = Resource::ALL
        .into_iter()
        .min_by_key(|&r| player.resources.get(r))?;
    for resource in Resource::ALL.into_iter().filter(|&r| r != wanted) {
        for ratio in 2..=4 {
            let give = ResourceSet::single(resource, ratio);
            let get = ResourceSet::single(wanted, 1);
            if game.can_make_bank_trade(pn, &give, &get) {
                return Some((give, get));
            }
        }
    }
    None
}

fn main_phase_move(game: &Game, pn: PlayerId, player: &Player) -> GameAction {
    if game.could_build_city(pn) {
        GameAction::BuyCity
    } else if game.could_build_settlement(pn) {
        GameAction::BuySettlement
    } else if game.could_buy_dev_card(pn) {
        GameAction::BuyDevelopmentCard
    } else if game.can_play_road_building(pn) && player.has_potential_road() {
        GameAction::PlayRoadBuilding
    } else if game.can_play_discovery(pn) {
        GameAction::PlayDiscovery
    } else if game.can_play_monopoly(pn) {
        GameAction::PlayMonopoly
    } else if game.could_build_road(pn) {
        GameAction::BuyRoad
    } else if let Some((give, get)) = bank_trade(game, pn, player) {
        GameAction::BankTrade { give, get }
    } else {
        GameAction::EndTurn
    }
}

/// Pick a legal move for whoever the game is waiting on.
fn next_move(game: &Game) -> Option<(PlayerId, GameAction)> {
    if game.state() == GameState::WaitingForDiscards {
        let player = game.players().iter().find(|p| p.needs_discard)?;
        let resources = discard_pick(&player.resources, player.resources.total() / 2);
        return Some((player.number, GameAction::Discard { resources }));
    }

    let pn = game.current_player()?;
    let player = game.player(pn)?;
    let action = match game.state() {
        GameState::Start1A | GameState::Start2A | GameState::PlacingSettlement => {
            GameAction::PlaceSettlement {
                node: *player.potential_settlements().iter().next()?,
            }
        }
        GameState::Start1B | GameState::Start2B => GameAction::PlaceRoad {
            edge: road_by_last_settlement(game, pn)?,
        },
        GameState::PlacingRoad | GameState::PlacingFreeRoad1 | GameState::PlacingFreeRoad2 => {
            GameAction::PlaceRoad {
                edge: *player.potential_roads().iter().next()?,
            }
        }
        GameState::PlacingCity => GameAction::PlaceCity {
            node: *player.potential_cities().iter().next()?,
        },
        GameState::Play if game.can_play_knight(pn) => GameAction::PlayKnight,
        GameState::Play => GameAction::RollDice,
        GameState::Play1 => main_phase_move(game, pn, player),
        GameState::PlacingRobber => GameAction::MoveRobber {
            hex: game
                .board()
                .land_hexes()
                .iter()
                .copied()
                .find(|&h| game.can_move_robber(pn, h))?,
        },
        GameState::WaitingForChoice => GameAction::ChoosePlayer {
            victim: *game.possible_victims().first()?,
        },
        GameState::WaitingForDiscovery => GameAction::DiscoveryPick {
            resources: ResourceSet::with_amounts(0, 1, 0, 1, 0),
        },
        GameState::WaitingForMonopoly => GameAction::MonopolyPick {
            resource: Resource::Wheat,
        },
        _ => return None,
    };
    Some((pn, action))
}

fn check_invariants(game: &Game) {
    let board = game.board();
    for player in game.players() {
        let pn = player.number;
        for resource in Resource::ALL {
            assert!(player.resources.get(resource) >= 0, "player {} owes {:?}", pn, resource);
        }
        let owned = |kind: PieceKind| board.pieces_of(pn).filter(|p| p.kind == kind).count() as u32;
        assert_eq!(player.roads_remaining + owned(PieceKind::Road), 15);
        assert_eq!(player.settlements_remaining + owned(PieceKind::Settlement), 5);
        assert_eq!(player.cities_remaining + owned(PieceKind::City), 4);
        assert!(game.public_vp(pn) <= game.total_vp(pn));
    }
    if let Some(holder) = game.longest_road_player() {
        assert!(game.player(holder).unwrap().longest_road_length >= 5);
    }
    if let Some(holder) = game.largest_army_player() {
        assert!(game.player(holder).unwrap().knights_played >= 3);
    }
    if let Some(winner) = game.winner() {
        assert_eq!(game.state(), GameState::Over);
        assert!(game.total_vp(winner) >= game.options().victory_points);
    }
}

/// Play greedily for at most `max_moves` actions, checking invariants throughout.
fn play_out(seats: u8, seed: u64, max_moves: usize) -> Game {
    let mut game = seated_game(seats, seed);
    game.start_game().unwrap();

    for _ in 0..max_moves {
        if game.state() == GameState::Over {
            break;
        }
        match next_move(&game) {
            Some((pn, action)) => {
                if let Err(e) = game.apply_action(pn, action.clone()) {
                    panic!("{:?} by {} in {:?} rejected: {}", action, pn, game.state(), e);
                }
            }
            None => {
                game.apply_force_end_turn().unwrap();
            }
        }
        check_invariants(&game);
    }
    game
}

// ==================== Setup ====================

#[test]
fn test_initial_placement_through_actions() {
    let mut game = seated_game(4, 3);
    game.start_game().unwrap();
    let events = place_initial(&mut game, first_potential);

    let built = events
        .iter()
        .filter(|e| matches!(e, GameEvent::PieceBuilt { .. }))
        .count();
    let granted = events
        .iter()
        .filter(|e| matches!(e, GameEvent::StartingResources { .. }))
        .count();
    assert_eq!(built, 16);
    assert_eq!(granted, 4);

    assert_eq!(game.state(), GameState::Play);
    assert_eq!(game.current_player(), game.first_player());
    for player in game.players() {
        assert_eq!(player.settlements_remaining, 3);
        assert_eq!(player.roads_remaining, 13);
        assert_eq!(game.total_vp(player.number), 2);
    }
    check_invariants(&game);
}

#[test]
fn test_second_settlement_grants_adjacent_resources() {
    let mut game = seated_game(2, 21);
    game.start_game().unwrap();

    // One clay hex showing 8; everything else is bare
    let robber = game.board().robber_hex();
    let clay_hex = game
        .board()
        .land_hexes()
        .iter()
        .copied()
        .skip(9)
        .find(|&h| Some(h) != robber)
        .unwrap();
    let land: Vec<Coord> = game.board().land_hexes().to_vec();
    for hex in land {
        if hex == clay_hex {
            game.board_mut().set_hex_type(hex, HexType::Land(Resource::Clay));
            game.board_mut().set_number(hex, Some(8));
        } else {
            game.board_mut().set_hex_type(hex, HexType::Desert);
            game.board_mut().set_number(hex, None);
        }
    }

    let grid = game.board().grid().clone();
    let corners = grid.adjacent_nodes_to_hex(clay_hex);
    let mut near_clay: BTreeSet<Coord> = corners.iter().copied().collect();
    for &corner in &corners {
        near_clay.extend(grid.adjacent_nodes_to_node(corner));
    }

    let mut clay_owner = None;
    let events = place_initial(&mut game, |game, pn| {
        let player = game.player(pn).unwrap();
        if game.state() == GameState::Start2A && clay_owner.is_none() {
            clay_owner = Some(pn);
            return *corners
                .iter()
                .find(|&&n| player.is_potential_settlement(n))
                .unwrap();
        }
        *player
            .potential_settlements()
            .iter()
            .find(|&&n| !near_clay.contains(&n))
            .unwrap()
    });

    let clay_owner = clay_owner.unwrap();
    let grants: Vec<(PlayerId, ResourceSet)> = events
        .into_iter()
        .filter_map(|e| match e {
            GameEvent::StartingResources { player, resources } => Some((player, resources)),
            _ => None,
        })
        .collect();
    assert_eq!(grants.len(), 2);
    for (pn, resources) in grants {
        if pn == clay_owner {
            assert_eq!(resources, ResourceSet::single(Resource::Clay, 1));
        } else {
            assert!(resources.is_empty());
        }
    }

    let player = game.player(clay_owner).unwrap();
    assert_eq!(
        player.resources_from_roll(game.board(), 8),
        ResourceSet::single(Resource::Clay, 1)
    );
    assert!(player.resources_from_roll(game.board(), 6).is_empty());
}

// ==================== Dice ====================

#[test]
fn test_seven_requires_discard_above_limit() {
    for seed in 0..300 {
        let mut game = game_in_play(3, seed);
        let cp = game.current_player().unwrap();
        let rich = (cp + 1) % 3;
        let modest = (cp + 2) % 3;
        game.player_mut(cp).unwrap().resources = ResourceSet::with_amounts(1, 1, 1, 0, 0);
        game.player_mut(rich).unwrap().resources = ResourceSet::with_amounts(2, 2, 2, 2, 1);
        game.player_mut(modest).unwrap().resources = ResourceSet::with_amounts(2, 2, 1, 1, 1);

        let events = game.apply_action(cp, GameAction::RollDice).unwrap();
        if game.dice_total() != 7 {
            continue;
        }

        assert_eq!(game.state(), GameState::WaitingForDiscards);
        assert!(events.contains(&GameEvent::DiscardRequired { players: vec![rich] }));
        assert!(game.player(rich).unwrap().needs_discard);
        assert!(!game.player(modest).unwrap().needs_discard);
        assert!(!game.player(cp).unwrap().needs_discard);

        // Half of nine, rounded down
        let three = ResourceSet::with_amounts(1, 1, 1, 0, 0);
        assert!(game
            .apply_action(rich, GameAction::Discard { resources: three })
            .is_err());
        let four = ResourceSet::with_amounts(1, 1, 1, 1, 0);
        let events = game
            .apply_action(rich, GameAction::Discard { resources: four })
            .unwrap();
        assert_eq!(events, vec![GameEvent::CardsDiscarded { player: rich, count: 4 }]);
        assert_eq!(game.player(rich).unwrap().resources.total(), 5);
        assert_eq!(game.state(), GameState::PlacingRobber);
        return;
    }
    panic!("no seed rolled a seven on the first turn");
}

// ==================== Longest road ====================

#[test]
fn test_settlement_severs_longest_road() {
    let mut game = seated_game(3, 8);
    game.start_game().unwrap();
    let builder = game.current_player().unwrap();
    let long = (builder + 1) % 3;
    let short = (builder + 2) % 3;

    // Five roads through node 0x67, and one more road touching it
    for edge in [0x45, 0x56, 0x67, 0x78, 0x89] {
        game.place_piece(Piece::new(PieceKind::Road, long, edge));
    }
    game.place_piece(Piece::new(PieceKind::Road, short, 0x66));
    assert_eq!(game.longest_road_player(), Some(long));
    assert_eq!(game.player(long).unwrap().longest_road_length, 5);
    assert_eq!(game.state(), GameState::Start1A);

    let events = game
        .apply_action(builder, GameAction::PlaceSettlement { node: 0x67 })
        .unwrap();
    assert_eq!(
        events,
        vec![
            GameEvent::PieceBuilt {
                piece: Piece::new(PieceKind::Settlement, builder, 0x67),
            },
            GameEvent::LongestRoadUpdated { player: long, length: 3 },
            GameEvent::LongestRoadChanged {
                previous: Some(long),
                current: None,
                length: 3,
            },
        ]
    );
    assert_eq!(game.longest_road_player(), None);
    assert_eq!(game.player(short).unwrap().longest_road_length, 1);
}

// ==================== Winning ====================

#[test]
fn test_win_waits_for_own_turn() {
    let mut game = game_in_play(2, 13);
    let cp = game.current_player().unwrap();
    let other = 1 - cp;
    for pn in [cp, other] {
        game.player_mut(pn).unwrap().resources.clear();
    }

    game.apply_action(cp, GameAction::RollDice).unwrap();
    game.player_mut(other).unwrap().building_vp = 10;
    assert_eq!(game.winner(), None);

    let events = if game.state() == GameState::Play1 {
        game.apply_action(cp, GameAction::EndTurn).unwrap()
    } else {
        game.apply_force_end_turn().unwrap()
    };
    assert_eq!(game.current_player(), Some(other));
    assert_eq!(game.winner(), Some(other));
    assert_eq!(game.state(), GameState::Over);
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::GameWon { player, .. } if *player == other)));

    assert_eq!(
        game.apply_action(other, GameAction::RollDice),
        Err(GameError::GameOver)
    );
}

// ==================== Full games ====================

#[test]
fn test_greedy_games_keep_invariants() {
    for seed in [1, 2, 3] {
        let game = play_out(4, seed, 3_000);
        assert!(game.turn_count() > 10, "seed {} stalled", seed);
    }
}

#[test]
fn test_greedy_game_reaches_a_winner() {
    let finished = (1..=3)
        .map(|seed| play_out(3, seed, 20_000))
        .filter(|game| game.winner().is_some())
        .count();
    assert!(finished > 0);
}

#[test]
fn test_same_seed_same_game() {
    let a = play_out(3, 77, 500);
    let b = play_out(3, 77, 500);
    assert_eq!(
        serde_json::to_value(&a).unwrap(),
        serde_json::to_value(&b).unwrap()
    );
}

#[test]
fn test_snapshot_round_trip() {
    let game = play_out(4, 5, 200);
    let json = serde_json::to_string(&game).unwrap();
    let restored: Game = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.state(), game.state());
    assert_eq!(restored.current_player(), game.current_player());
    assert_eq!(restored.board().pieces(), game.board().pieces());
    assert_eq!(
        serde_json::to_value(&restored).unwrap(),
        serde_json::to_value(&game).unwrap()
    );
}
