//! Game options, set once when a game is created.
//!
//! Options travel as short key/value pairs (`PL=4`, `BC=3`, `NT=t`).
//! Integer options with an on/off meaning (`BC`, `N7`) are unset when absent
//! or given as `f`.

use crate::topology::Encoding;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from option parsing
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum OptionsError {
    #[error("Unknown game option: {0}")]
    UnknownKey(String),

    #[error("Value {value} out of range for option {key}")]
    OutOfRange { key: String, value: String },

    #[error("Malformed option: {0}")]
    Malformed(String),
}

/// Rule options for one game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOptions {
    /// `PL`: seats in the game, 2..=6
    pub max_players: u8,
    /// `VP`: points needed to win, 10..=15
    pub victory_points: u32,
    /// `BC`: largest allowed clump of same terrain or port class, 3..=9
    pub break_clumps: Option<u32>,
    /// `N7`: reroll 7s during the first N rounds, 1..=999
    pub no_sevens_rounds: Option<u32>,
    /// `NT`: player-to-player trading disabled
    pub no_trading: bool,
    /// `RD`: the robber may not go back to the desert
    pub robber_not_desert: bool,
    /// `SBL`: play on the large row/column board
    pub large_board: bool,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            max_players: 4,
            victory_points: 10,
            break_clumps: None,
            no_sevens_rounds: None,
            no_trading: false,
            robber_not_desert: false,
            large_board: false,
        }
    }
}

impl GameOptions {
    /// Options from key/value pairs; keys not given keep their defaults.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, OptionsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut opts = Self::default();
        for (key, value) in pairs {
            opts.set(key.as_ref().trim(), value.as_ref().trim())?;
        }
        Ok(opts)
    }

    pub fn parse(pairs: &[(&str, &str)]) -> Result<Self, OptionsError> {
        Self::from_pairs(pairs.iter().copied())
    }

    /// Set one option by key
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), OptionsError> {
        match key.to_ascii_uppercase().as_str() {
            "PL" => self.max_players = int_in_range(key, value, 2, 6)? as u8,
            "VP" => self.victory_points = int_in_range(key, value, 10, 15)?,
            "BC" => self.break_clumps = optional_int(key, value, 3, 9)?,
            "N7" => self.no_sevens_rounds = optional_int(key, value, 1, 999)?,
            "NT" => self.no_trading = boolean(key, value)?,
            "RD" => self.robber_not_desert = boolean(key, value)?,
            "SBL" => self.large_board = boolean(key, value)?,
            _ => return Err(OptionsError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// The row/column board is used for more than four seats or when asked for.
    pub fn encoding(&self) -> Encoding {
        if self.max_players > 4 || self.large_board {
            Encoding::RowCol
        } else {
            Encoding::Diagonal
        }
    }

    /// Every option as a key/value pair, unset integers as `f`
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let flag = |b: bool| (if b { "t" } else { "f" }).to_string();
        let opt_int = |v: Option<u32>| v.map_or_else(|| "f".to_string(), |n| n.to_string());
        vec![
            ("PL", self.max_players.to_string()),
            ("VP", self.victory_points.to_string()),
            ("BC", opt_int(self.break_clumps)),
            ("N7", opt_int(self.no_sevens_rounds)),
            ("NT", flag(self.no_trading)),
            ("RD", flag(self.robber_not_desert)),
            ("SBL", flag(self.large_board)),
        ]
    }
}

/// `"PL=4,VP=12,BC=3"`; an empty string gives the defaults.
impl FromStr for GameOptions {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pairs = s
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                item.split_once('=')
                    .ok_or_else(|| OptionsError::Malformed(item.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_pairs(pairs)
    }
}

impl fmt::Display for GameOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self
            .to_pairs()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        f.write_str(&items.join(","))
    }
}

fn out_of_range(key: &str, value: &str) -> OptionsError {
    OptionsError::OutOfRange {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn int_in_range(key: &str, value: &str, min: u32, max: u32) -> Result<u32, OptionsError> {
    let n: u32 = value.parse().map_err(|_| out_of_range(key, value))?;
    if (min..=max).contains(&n) {
        Ok(n)
    } else {
        Err(out_of_range(key, value))
    }
}

fn optional_int(key: &str, value: &str, min: u32, max: u32) -> Result<Option<u32>, OptionsError> {
    match value {
        "f" | "F" | "false" => Ok(None),
        _ => int_in_range(key, value, min, max).map(Some),
    }
}

fn boolean(key: &str, value: &str) -> Result<bool, OptionsError> {
    match value.to_ascii_lowercase().as_str() {
        "t" | "true" | "1" | "y" => Ok(true),
        "f" | "false" | "0" | "n" => Ok(false),
        _ => Err(out_of_range(key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let opts = GameOptions::default();
        assert_eq!(opts.max_players, 4);
        assert_eq!(opts.victory_points, 10);
        assert_eq!(opts.break_clumps, None);
        assert_eq!(opts.encoding(), Encoding::Diagonal);
    }

    #[test]
    fn test_parse_pairs() {
        let opts = GameOptions::parse(&[("PL", "6"), ("BC", "3"), ("NT", "t"), ("N7", "2")]).unwrap();
        assert_eq!(opts.max_players, 6);
        assert_eq!(opts.break_clumps, Some(3));
        assert_eq!(opts.no_sevens_rounds, Some(2));
        assert!(opts.no_trading);
        assert_eq!(opts.encoding(), Encoding::RowCol);
    }

    #[test]
    fn test_parse_string() {
        let opts: GameOptions = "VP=12, RD=t, SBL=t".parse().unwrap();
        assert_eq!(opts.victory_points, 12);
        assert!(opts.robber_not_desert);
        assert_eq!(opts.encoding(), Encoding::RowCol);
        assert_eq!("".parse::<GameOptions>().unwrap(), GameOptions::default());
    }

    #[test]
    fn test_rejects_bad_options() {
        assert_eq!(
            GameOptions::parse(&[("XX", "1")]),
            Err(OptionsError::UnknownKey("XX".to_string()))
        );
        assert!(matches!(
            GameOptions::parse(&[("PL", "7")]),
            Err(OptionsError::OutOfRange { .. })
        ));
        assert!(matches!(
            GameOptions::parse(&[("BC", "2")]),
            Err(OptionsError::OutOfRange { .. })
        ));
        assert!(matches!(
            "PL4".parse::<GameOptions>(),
            Err(OptionsError::Malformed(_))
        ));
    }

    #[test]
    fn test_display_round_trips() {
        let opts = GameOptions::parse(&[("BC", "4"), ("NT", "t")]).unwrap();
        let text = opts.to_string();
        assert_eq!(text, "PL=4,VP=10,BC=4,N7=f,NT=t,RD=f,SBL=f");
        assert_eq!(text.parse::<GameOptions>().unwrap(), opts);
    }
}
