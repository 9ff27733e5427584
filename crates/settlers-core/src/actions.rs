//! Game actions that players can take.
//!
//! This module defines every player intent as a [`GameAction`], the
//! [`GameEvent`]s that result, and [`Game::apply_action`], which dispatches
//! one to the other.

use crate::board::{Piece, PieceKind, PlayerId};
use crate::game::{ForceEndTurnResult, Game, GameError, GameState};
use crate::player::{DevCardType, TradeOffer};
use crate::resources::{Resource, ResourceSet};
use crate::topology::Coord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// All possible actions a player can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameAction {
    // ==================== Placement ====================
    /// Place a settlement: initial placement or after buying one
    PlaceSettlement { node: Coord },
    /// Place a road: initial placement, after buying one, or a free road
    PlaceRoad { edge: Coord },
    /// Upgrade one of our settlements after buying a city
    PlaceCity { node: Coord },

    // ==================== Turn Actions ====================
    /// Roll the dice (must be done at start of turn)
    RollDice,
    EndTurn,

    // ==================== Robber Actions ====================
    /// Discard half a hand after a 7
    Discard { resources: ResourceSet },
    MoveRobber { hex: Coord },
    /// Pick who to rob when several players touch the robber's hex
    ChoosePlayer { victim: PlayerId },

    // ==================== Building Actions ====================
    BuyRoad,
    BuySettlement,
    BuyCity,
    BuyDevelopmentCard,
    /// Refund whichever piece is being placed
    CancelBuild,

    // ==================== Development Card Actions ====================
    PlayKnight,
    PlayRoadBuilding,
    PlayDiscovery,
    PlayMonopoly,
    /// Two resources from the bank after a discovery card
    DiscoveryPick { resources: ResourceSet },
    /// The resource to collect after a monopoly card
    MonopolyPick { resource: Resource },

    // ==================== Trading Actions ====================
    /// Post an offer; an empty `to` means anyone
    OfferTrade {
        to: BTreeSet<PlayerId>,
        give: ResourceSet,
        get: ResourceSet,
    },
    ClearOffer,
    /// Accept another player's posted offer
    AcceptTrade { from: PlayerId },
    BankTrade { give: ResourceSet, get: ResourceSet },

    // ==================== Board Reset ====================
    RequestReset,
    ResetVote { yes: bool },
}

impl GameAction {
    /// Actions only the current player may take
    fn needs_turn(&self) -> bool {
        !matches!(
            self,
            GameAction::Discard { .. }
                | GameAction::OfferTrade { .. }
                | GameAction::ClearOffer
                | GameAction::AcceptTrade { .. }
                | GameAction::RequestReset
                | GameAction::ResetVote { .. }
        )
    }
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    /// Dice were rolled
    DiceRolled {
        player: PlayerId,
        dice: (u8, u8),
        total: u8,
    },

    /// Resources were distributed after a dice roll
    ResourcesDistributed {
        income: Vec<(PlayerId, ResourceSet)>,
    },

    /// A 7 left these players holding too many cards
    DiscardRequired { players: Vec<PlayerId> },

    /// Player had to discard cards
    CardsDiscarded { player: PlayerId, count: u32 },

    PieceBuilt { piece: Piece },

    /// Resources granted by a second initial settlement
    StartingResources {
        player: PlayerId,
        resources: ResourceSet,
    },

    /// A player's longest road was recomputed
    LongestRoadUpdated { player: PlayerId, length: u32 },

    PieceBought { player: PlayerId, kind: PieceKind },

    BuildCancelled {
        player: PlayerId,
        refund: ResourceSet,
    },

    /// A development card was purchased
    DevelopmentCardPurchased {
        player: PlayerId,
        card: DevCardType,
    },

    DevelopmentCardPlayed {
        player: PlayerId,
        card: DevCardType,
    },

    DiscoveryTaken {
        player: PlayerId,
        resources: ResourceSet,
    },

    /// Monopoly resolved
    MonopolyTaken {
        player: PlayerId,
        resource: Resource,
        taken: Vec<(PlayerId, i32)>,
        total_stolen: i32,
    },

    /// The robber was moved
    RobberMoved {
        player: PlayerId,
        from: Option<Coord>,
        to: Coord,
    },

    /// Several players can be robbed; the mover must choose
    VictimChoiceNeeded { candidates: Vec<PlayerId> },

    /// A resource was stolen
    Stole {
        thief: PlayerId,
        victim: PlayerId,
        resource: Resource,
    },

    TradeOffered { offer: TradeOffer },

    TradeCleared { player: PlayerId },

    /// A trade was completed
    TradeCompleted {
        offer: TradeOffer,
        accepted_by: PlayerId,
    },

    BankTradeCompleted {
        player: PlayerId,
        gave: ResourceSet,
        received: ResourceSet,
    },

    /// Longest road changed hands
    LongestRoadChanged {
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
        length: u32,
    },

    /// Largest army changed hands
    LargestArmyChanged {
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
        knights: u32,
    },

    /// Turn ended
    TurnEnded {
        player: PlayerId,
        next_player: Option<PlayerId>,
    },

    /// The current player's turn was cut short
    TurnForced {
        player: PlayerId,
        result: ForceEndTurnResult,
    },

    ResetRequested { requester: PlayerId, waiting: u32 },

    ResetVoted { player: PlayerId, yes: bool },

    /// Every vote is in
    ResetVoteDecided { accepted: bool },

    /// A player won the game
    GameWon {
        player: PlayerId,
        victory_points: u32,
    },
}

impl Game {
    /// Apply one player's action and report what happened.
    ///
    /// Nothing changes when an error is returned.
    pub fn apply_action(
        &mut self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        if self.state() >= GameState::Over {
            return Err(GameError::GameOver);
        }
        if action.needs_turn() && self.current_player() != Some(player) {
            return Err(GameError::NotYourTurn);
        }
        debug!(player, ?action, state = ?self.state(), "applying action");

        let army_before = self.largest_army_player();
        let road_before = self.longest_road_player();
        let winner_before = self.winner();

        let mut events = match action {
            GameAction::PlaceSettlement { node } => {
                self.apply_placement(player, PieceKind::Settlement, node)?
            }
            GameAction::PlaceRoad { edge } => self.apply_placement(player, PieceKind::Road, edge)?,
            GameAction::PlaceCity { node } => self.apply_placement(player, PieceKind::City, node)?,

            GameAction::RollDice => {
                if !self.can_roll_dice(player) {
                    return Err(GameError::InvalidState);
                }
                let roll = self.roll_dice()?;
                let mut events = vec![GameEvent::DiceRolled {
                    player,
                    dice: roll.dice,
                    total: roll.total,
                }];
                if !roll.income.is_empty() {
                    events.push(GameEvent::ResourcesDistributed {
                        income: roll.income.into_iter().collect(),
                    });
                }
                if !roll.must_discard.is_empty() {
                    events.push(GameEvent::DiscardRequired {
                        players: roll.must_discard,
                    });
                }
                events
            }
            GameAction::EndTurn => {
                if !self.can_end_turn(player) {
                    return Err(GameError::InvalidState);
                }
                self.end_turn()?;
                vec![GameEvent::TurnEnded {
                    player,
                    next_player: self.current_player(),
                }]
            }

            GameAction::Discard { resources } => {
                self.discard(player, &resources)?;
                vec![GameEvent::CardsDiscarded {
                    player,
                    count: resources.total().max(0) as u32,
                }]
            }
            GameAction::MoveRobber { hex } => {
                let result = self.move_robber(player, hex)?;
                let mut events = vec![GameEvent::RobberMoved {
                    player,
                    from: result.from,
                    to: hex,
                }];
                match (result.victims.as_slice(), result.loot) {
                    ([victim], Some(resource)) => events.push(GameEvent::Stole {
                        thief: player,
                        victim: *victim,
                        resource,
                    }),
                    ([_, _, ..], _) => events.push(GameEvent::VictimChoiceNeeded {
                        candidates: result.victims.clone(),
                    }),
                    _ => {}
                }
                events
            }
            GameAction::ChoosePlayer { victim } => {
                let resource = self.choose_player(victim)?;
                vec![GameEvent::Stole {
                    thief: player,
                    victim,
                    resource,
                }]
            }

            GameAction::BuyRoad => self.apply_buy(player, PieceKind::Road)?,
            GameAction::BuySettlement => self.apply_buy(player, PieceKind::Settlement)?,
            GameAction::BuyCity => self.apply_buy(player, PieceKind::City)?,
            GameAction::BuyDevelopmentCard => {
                let card = self.buy_dev_card(player)?;
                vec![GameEvent::DevelopmentCardPurchased { player, card }]
            }
            GameAction::CancelBuild => {
                let refund = match self.state() {
                    GameState::PlacingRoad => self.cancel_build_road(player)?,
                    GameState::PlacingSettlement => self.cancel_build_settlement(player)?,
                    GameState::PlacingCity => self.cancel_build_city(player)?,
                    _ => return Err(GameError::InvalidState),
                };
                vec![GameEvent::BuildCancelled { player, refund }]
            }

            GameAction::PlayKnight => {
                self.play_knight(player)?;
                vec![played(player, DevCardType::Knight)]
            }
            GameAction::PlayRoadBuilding => {
                self.play_road_building(player)?;
                vec![played(player, DevCardType::RoadBuilding)]
            }
            GameAction::PlayDiscovery => {
                self.play_discovery(player)?;
                vec![played(player, DevCardType::Discovery)]
            }
            GameAction::PlayMonopoly => {
                self.play_monopoly(player)?;
                vec![played(player, DevCardType::Monopoly)]
            }
            GameAction::DiscoveryPick { resources } => {
                self.do_discovery_action(player, &resources)?;
                vec![GameEvent::DiscoveryTaken { player, resources }]
            }
            GameAction::MonopolyPick { resource } => {
                let taken = self.do_monopoly_action(player, resource)?;
                let total_stolen = taken.values().sum();
                vec![GameEvent::MonopolyTaken {
                    player,
                    resource,
                    taken: taken.into_iter().collect(),
                    total_stolen,
                }]
            }

            GameAction::OfferTrade { to, give, get } => {
                let offer = TradeOffer {
                    from: player,
                    to,
                    give,
                    get,
                };
                self.set_trade_offer(player, offer.clone())?;
                vec![GameEvent::TradeOffered { offer }]
            }
            GameAction::ClearOffer => {
                self.clear_trade_offer(player)?;
                vec![GameEvent::TradeCleared { player }]
            }
            GameAction::AcceptTrade { from } => {
                let offer = self.make_trade(from, player)?;
                vec![GameEvent::TradeCompleted {
                    offer,
                    accepted_by: player,
                }]
            }
            GameAction::BankTrade { give, get } => {
                self.make_bank_trade(player, &give, &get)?;
                vec![GameEvent::BankTradeCompleted {
                    player,
                    gave: give,
                    received: get,
                }]
            }

            GameAction::RequestReset => {
                let waiting = self.reset_vote_begin(player)?;
                let mut events = vec![GameEvent::ResetRequested {
                    requester: player,
                    waiting,
                }];
                if waiting == 0 {
                    events.push(GameEvent::ResetVoteDecided {
                        accepted: self.reset_vote_result()?,
                    });
                }
                events
            }
            GameAction::ResetVote { yes } => {
                let complete = self.reset_vote_register(player, yes)?;
                let mut events = vec![GameEvent::ResetVoted { player, yes }];
                if complete {
                    events.push(GameEvent::ResetVoteDecided {
                        accepted: self.reset_vote_result()?,
                    });
                }
                events
            }
        };

        self.push_award_events(army_before, road_before, &mut events);
        self.push_win_event(winner_before, &mut events);
        Ok(events)
    }

    /// Force the current player's turn to end and report it.
    ///
    /// When the game is left in PLAY1, the turn is also ended.
    pub fn apply_force_end_turn(&mut self) -> Result<Vec<GameEvent>, GameError> {
        let player = self.current_player().ok_or(GameError::InvalidState)?;
        let army_before = self.largest_army_player();
        let road_before = self.longest_road_player();
        let winner_before = self.winner();

        let result = self.force_end_turn()?;
        let mut events = vec![GameEvent::TurnForced { player, result }];
        if self.state() == GameState::Play1 {
            self.end_turn()?;
            events.push(GameEvent::TurnEnded {
                player,
                next_player: self.current_player(),
            });
        }
        self.push_award_events(army_before, road_before, &mut events);
        self.push_win_event(winner_before, &mut events);
        Ok(events)
    }

    fn apply_placement(
        &mut self,
        player: PlayerId,
        kind: PieceKind,
        coord: Coord,
    ) -> Result<Vec<GameEvent>, GameError> {
        let placement = self.put_piece(player, kind, coord)?;
        let mut events = vec![GameEvent::PieceBuilt {
            piece: placement.piece,
        }];
        if let Some(resources) = placement.starting_resources {
            events.push(GameEvent::StartingResources { player, resources });
        }
        for pn in placement.longest_road_recomputed {
            let length = self.player(pn).map_or(0, |p| p.longest_road_length);
            events.push(GameEvent::LongestRoadUpdated { player: pn, length });
        }
        Ok(events)
    }

    fn apply_buy(&mut self, player: PlayerId, kind: PieceKind) -> Result<Vec<GameEvent>, GameError> {
        match kind {
            PieceKind::Road => self.buy_road(player)?,
            PieceKind::Settlement => self.buy_settlement(player)?,
            PieceKind::City => self.buy_city(player)?,
        }
        Ok(vec![GameEvent::PieceBought { player, kind }])
    }

    fn push_award_events(
        &self,
        army_before: Option<PlayerId>,
        road_before: Option<PlayerId>,
        events: &mut Vec<GameEvent>,
    ) {
        let road_now = self.longest_road_player();
        if road_now != road_before {
            let length = self
                .players()
                .iter()
                .map(|p| p.longest_road_length)
                .max()
                .unwrap_or(0);
            events.push(GameEvent::LongestRoadChanged {
                previous: road_before,
                current: road_now,
                length,
            });
        }
        let army_now = self.largest_army_player();
        if army_now != army_before {
            let knights = army_now
                .and_then(|pn| self.player(pn))
                .map_or(0, |p| p.knights_played);
            events.push(GameEvent::LargestArmyChanged {
                previous: army_before,
                current: army_now,
                knights,
            });
        }
    }

    fn push_win_event(&self, winner_before: Option<PlayerId>, events: &mut Vec<GameEvent>) {
        if winner_before.is_some() {
            return;
        }
        if let Some(player) = self.winner() {
            events.push(GameEvent::GameWon {
                player,
                victory_points: self.total_vp(player),
            });
        }
    }
}

fn played(player: PlayerId, card: DevCardType) -> GameEvent {
    GameEvent::DevelopmentCardPlayed { player, card }
}
