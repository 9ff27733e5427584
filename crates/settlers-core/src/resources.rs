//! Resource kinds and resource-card multisets.
//!
//! This module contains:
//! - `Resource`, the five producible resource kinds
//! - `ResourceSet`, five named counters plus an "unknown" bucket
//! - Building costs
//!
//! The two subtract operations are deliberately not symmetric:
//! [`ResourceSet::subtract_one`] takes any shortfall out of `unknown` (which may
//! go negative), while [`ResourceSet::subtract`] clamps every counter at zero.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A producible resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resource {
    Clay,
    Ore,
    Sheep,
    Wheat,
    Wood,
}

impl Resource {
    /// All resource types, in wire order
    pub const ALL: [Resource; 5] = [
        Resource::Clay,
        Resource::Ore,
        Resource::Sheep,
        Resource::Wheat,
        Resource::Wood,
    ];

    /// Wire code, 1..=5
    pub fn code(self) -> i32 {
        self as i32 + 1
    }

    pub fn from_code(code: i32) -> Option<Resource> {
        match code {
            1..=5 => Some(Resource::ALL[(code - 1) as usize]),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Resource::Clay => "clay",
            Resource::Ore => "ore",
            Resource::Sheep => "sheep",
            Resource::Wheat => "wheat",
            Resource::Wood => "wood",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A multiset of resource cards.
///
/// `unknown` counts cards whose kind is hidden from the holder of this set,
/// e.g. an opponent's hand as seen by another client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceSet {
    pub clay: i32,
    pub ore: i32,
    pub sheep: i32,
    pub wheat: i32,
    pub wood: i32,
    pub unknown: i32,
}

impl ResourceSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set with specific amounts, in wire order
    pub fn with_amounts(clay: i32, ore: i32, sheep: i32, wheat: i32, wood: i32) -> Self {
        Self {
            clay,
            ore,
            sheep,
            wheat,
            wood,
            unknown: 0,
        }
    }

    /// Create a set holding `amount` of one resource
    pub fn single(resource: Resource, amount: i32) -> Self {
        let mut set = Self::new();
        set.add_one(amount, resource);
        set
    }

    pub fn get(&self, resource: Resource) -> i32 {
        match resource {
            Resource::Clay => self.clay,
            Resource::Ore => self.ore,
            Resource::Sheep => self.sheep,
            Resource::Wheat => self.wheat,
            Resource::Wood => self.wood,
        }
    }

    fn slot(&mut self, resource: Resource) -> &mut i32 {
        match resource {
            Resource::Clay => &mut self.clay,
            Resource::Ore => &mut self.ore,
            Resource::Sheep => &mut self.sheep,
            Resource::Wheat => &mut self.wheat,
            Resource::Wood => &mut self.wood,
        }
    }

    pub fn set(&mut self, resource: Resource, amount: i32) {
        *self.slot(resource) = amount;
    }

    pub fn add_one(&mut self, amount: i32, resource: Resource) {
        *self.slot(resource) += amount;
    }

    /// Subtract `amount` of one resource.
    ///
    /// If the set holds fewer than `amount`, that resource drops to zero and the
    /// rest comes out of `unknown`, which can go negative.
    pub fn subtract_one(&mut self, amount: i32, resource: Resource) {
        let have = self.get(resource);
        if amount > have {
            self.unknown -= amount - have;
            self.set(resource, 0);
        } else {
            self.set(resource, have - amount);
        }
    }

    /// Add every counter of `other`, including unknown
    pub fn add(&mut self, other: &ResourceSet) {
        for r in Resource::ALL {
            self.add_one(other.get(r), r);
        }
        self.unknown += other.unknown;
    }

    /// Subtract every counter of `other`, clamping each at zero
    pub fn subtract(&mut self, other: &ResourceSet) {
        for r in Resource::ALL {
            let left = self.get(r) - other.get(r);
            self.set(r, left.max(0));
        }
        self.unknown = (self.unknown - other.unknown).max(0);
    }

    /// Elementwise `>=`, including unknown
    pub fn contains(&self, other: &ResourceSet) -> bool {
        Resource::ALL.iter().all(|&r| self.get(r) >= other.get(r)) && self.unknown >= other.unknown
    }

    /// Total number of cards, unknown included
    pub fn total(&self) -> i32 {
        self.known_total() + self.unknown
    }

    /// Number of cards of a known kind
    pub fn known_total(&self) -> i32 {
        Resource::ALL.iter().map(|&r| self.get(r)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Move every known card into `unknown`, as an opponent would see the hand.
    pub fn convert_to_unknown(&mut self) {
        self.unknown += self.known_total();
        for r in Resource::ALL {
            self.set(r, 0);
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// One entry per known card, in wire order.
    pub fn to_cards(&self) -> Vec<Resource> {
        Resource::ALL
            .iter()
            .flat_map(|&r| std::iter::repeat(r).take(self.get(r).max(0) as usize))
            .collect()
    }

    /// Remove one known card chosen uniformly at random.
    pub fn take_random<R: Rng>(&mut self, rng: &mut R) -> Option<Resource> {
        let resource = *self.to_cards().choose(rng)?;
        self.subtract_one(1, resource);
        Some(resource)
    }

    /// "1 clay, 2 ore", or "nothing" for an empty set.
    pub fn friendly_string(&self) -> String {
        let parts: Vec<String> = Resource::ALL
            .iter()
            .filter(|&&r| self.get(r) != 0)
            .map(|&r| format!("{} {}", self.get(r), r))
            .chain((self.unknown != 0).then(|| format!("{} unknown", self.unknown)))
            .collect();
        if parts.is_empty() {
            "nothing".to_string()
        } else {
            parts.join(", ")
        }
    }
}

impl fmt::Display for ResourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "clay={}|ore={}|sheep={}|wheat={}|wood={}|unknown={}",
            self.clay, self.ore, self.sheep, self.wheat, self.wood, self.unknown
        )
    }
}

/// Building costs
pub mod costs {
    use super::ResourceSet;

    /// 1 clay, 1 wood
    pub const ROAD: ResourceSet = ResourceSet {
        clay: 1,
        ore: 0,
        sheep: 0,
        wheat: 0,
        wood: 1,
        unknown: 0,
    };

    /// 1 clay, 1 sheep, 1 wheat, 1 wood
    pub const SETTLEMENT: ResourceSet = ResourceSet {
        clay: 1,
        ore: 0,
        sheep: 1,
        wheat: 1,
        wood: 1,
        unknown: 0,
    };

    /// 3 ore, 2 wheat
    pub const CITY: ResourceSet = ResourceSet {
        clay: 0,
        ore: 3,
        sheep: 0,
        wheat: 2,
        wood: 0,
        unknown: 0,
    };

    /// 1 ore, 1 sheep, 1 wheat
    pub const DEV_CARD: ResourceSet = ResourceSet {
        clay: 0,
        ore: 1,
        sheep: 1,
        wheat: 1,
        wood: 0,
        unknown: 0,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_resource_codes() {
        for r in Resource::ALL {
            assert_eq!(Resource::from_code(r.code()), Some(r));
        }
        assert_eq!(Resource::Clay.code(), 1);
        assert_eq!(Resource::Wood.code(), 5);
        assert_eq!(Resource::from_code(0), None);
        assert_eq!(Resource::from_code(6), None);
    }

    #[test]
    fn test_add_and_total() {
        let mut set = ResourceSet::with_amounts(1, 2, 0, 0, 3);
        set.add(&ResourceSet::single(Resource::Sheep, 2));
        assert_eq!(set.total(), 8);
        assert_eq!(set.get(Resource::Sheep), 2);
        assert!(!set.is_empty());
    }

    #[test]
    fn test_subtract_one_spills_into_unknown() {
        let mut set = ResourceSet::with_amounts(1, 0, 0, 0, 0);
        set.subtract_one(3, Resource::Clay);
        assert_eq!(set.clay, 0);
        assert_eq!(set.unknown, -2);
    }

    #[test]
    fn test_subtract_one_within_amount() {
        let mut set = ResourceSet::with_amounts(4, 0, 0, 0, 0);
        set.subtract_one(3, Resource::Clay);
        assert_eq!(set.clay, 1);
        assert_eq!(set.unknown, 0);
    }

    #[test]
    fn test_subtract_set_clamps() {
        let mut set = ResourceSet::with_amounts(1, 5, 0, 0, 0);
        set.unknown = 1;
        let mut big = ResourceSet::with_amounts(3, 2, 1, 0, 0);
        big.unknown = 4;
        set.subtract(&big);
        assert_eq!(set, ResourceSet::with_amounts(0, 3, 0, 0, 0));
    }

    #[test]
    fn test_contains() {
        let hand = ResourceSet::with_amounts(1, 1, 1, 1, 1);
        assert!(hand.contains(&costs::SETTLEMENT));
        assert!(hand.contains(&costs::ROAD));
        assert!(!hand.contains(&costs::CITY));
        let mut hidden = ResourceSet::new();
        hidden.unknown = 1;
        assert!(!hand.contains(&hidden));
    }

    #[test]
    fn test_convert_to_unknown() {
        let mut set = ResourceSet::with_amounts(1, 2, 3, 0, 0);
        set.convert_to_unknown();
        assert_eq!(set.known_total(), 0);
        assert_eq!(set.unknown, 6);
        assert_eq!(set.total(), 6);
    }

    #[test]
    fn test_take_random() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut set = ResourceSet::with_amounts(0, 0, 2, 0, 0);
        assert_eq!(set.take_random(&mut rng), Some(Resource::Sheep));
        assert_eq!(set.take_random(&mut rng), Some(Resource::Sheep));
        assert_eq!(set.take_random(&mut rng), None);
        assert!(set.is_empty());
    }

    #[test]
    fn test_formatting() {
        let set = ResourceSet::with_amounts(1, 2, 0, 0, 0);
        assert_eq!(set.to_string(), "clay=1|ore=2|sheep=0|wheat=0|wood=0|unknown=0");
        assert_eq!(set.friendly_string(), "1 clay, 2 ore");
        assert_eq!(ResourceSet::new().friendly_string(), "nothing");
    }

    #[test]
    fn test_cards_in_wire_order() {
        let set = ResourceSet::with_amounts(1, 0, 0, 0, 2);
        assert_eq!(
            set.to_cards(),
            vec![Resource::Clay, Resource::Wood, Resource::Wood]
        );
    }
}
