use core::fmt;
use serde::{Deserialize, Serialize};

use crate::model::color::Color;
use crate::model::rank::Rank;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 5;

/// Table parameters for one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub players: usize,
    pub colors: usize,
    pub ranks: usize,
    pub hand_size: usize,
    pub max_information_tokens: u8,
    pub max_life_tokens: u8,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::full(2)
    }
}

impl GameConfig {
    /// Standard five-color game.
    pub const fn full(players: usize) -> Self {
        Self {
            players,
            colors: Color::COUNT,
            ranks: Rank::COUNT,
            hand_size: default_hand_size(players),
            max_information_tokens: 8,
            max_life_tokens: 3,
        }
    }

    pub const fn small(players: usize) -> Self {
        Self {
            players,
            colors: 2,
            ranks: Rank::COUNT,
            hand_size: 2,
            max_information_tokens: 3,
            max_life_tokens: 1,
        }
    }

    pub const fn very_small(players: usize) -> Self {
        Self {
            colors: 1,
            ..Self::small(players)
        }
    }

    /// Highest possible fireworks total.
    pub const fn max_score(&self) -> u32 {
        (self.colors * self.ranks) as u32
    }

    pub fn deck_size(&self) -> usize {
        let per_color: usize = Rank::in_play(self.ranks).map(|r| r.copies() as usize).sum();
        per_color * self.colors
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.players) {
            return Err(ConfigError::Players(self.players));
        }
        if self.colors == 0 || self.colors > Color::COUNT {
            return Err(ConfigError::Colors(self.colors));
        }
        if self.ranks == 0 || self.ranks > Rank::COUNT {
            return Err(ConfigError::Ranks(self.ranks));
        }
        if self.hand_size == 0 || self.players * self.hand_size > self.deck_size() {
            return Err(ConfigError::HandSize(self.hand_size));
        }
        if self.max_life_tokens == 0 {
            return Err(ConfigError::LifeTokens);
        }
        Ok(())
    }
}

const fn default_hand_size(players: usize) -> usize {
    if players < 4 { 5 } else { 4 }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Players(usize),
    Colors(usize),
    Ranks(usize),
    HandSize(usize),
    LifeTokens,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Players(n) => {
                write!(f, "player count {n} outside {MIN_PLAYERS}..={MAX_PLAYERS}")
            }
            ConfigError::Colors(n) => write!(f, "color count {n} outside 1..=5"),
            ConfigError::Ranks(n) => write!(f, "rank count {n} outside 1..=5"),
            ConfigError::HandSize(n) => write!(f, "hand size {n} cannot be dealt from the deck"),
            ConfigError::LifeTokens => f.write_str("at least one life token is required"),
        }
    }
}

impl std::error::Error for ConfigError {}
