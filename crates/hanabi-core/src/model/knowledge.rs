//! Per-slot hint knowledge.
//!
//! Plausibility only ever shrinks while a card sits in a slot. A slot starts over with
//! [`CardKnowledge::fresh`] when a new physical card is dealt into it.

use crate::model::card::Card;
use crate::model::color::Color;
use crate::model::rank::Rank;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Plausible values of one attribute (color or rank) packed into a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueMask(u8);

impl ValueMask {
    pub const EMPTY: Self = Self(0);

    /// All of the first `range` values plausible.
    pub const fn full(range: usize) -> Self {
        if range >= 8 {
            Self(u8::MAX)
        } else {
            Self(((1u16 << range) - 1) as u8)
        }
    }

    pub const fn only(value: usize) -> Self {
        Self(1 << value)
    }

    pub fn contains(self, value: usize) -> bool {
        value < 8 && self.0 & (1 << value) != 0
    }

    pub fn without(self, value: usize) -> Self {
        Self(self.0 & !(1 << value))
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

/// Knowledge about one attribute: the hinted value, if any, plus the plausible set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueKnowledge {
    hinted: Option<u8>,
    plausible: ValueMask,
}

impl ValueKnowledge {
    pub const fn new(range: usize) -> Self {
        Self {
            hinted: None,
            plausible: ValueMask::full(range),
        }
    }

    pub fn hinted(&self) -> Option<usize> {
        self.hinted.map(usize::from)
    }

    pub fn is_plausible(&self, value: usize) -> bool {
        self.plausible.contains(value)
    }

    pub fn plausible(&self) -> ValueMask {
        self.plausible
    }

    fn apply_is(&mut self, value: usize) {
        self.hinted = Some(value as u8);
        self.plausible = ValueMask::only(value);
    }

    fn apply_is_not(&mut self, value: usize) {
        self.plausible = self.plausible.without(value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardKnowledge {
    color: ValueKnowledge,
    rank: ValueKnowledge,
}

impl CardKnowledge {
    /// Knowledge of a newly dealt card: everything in play is plausible.
    pub const fn fresh(num_colors: usize, num_ranks: usize) -> Self {
        Self {
            color: ValueKnowledge::new(num_colors),
            rank: ValueKnowledge::new(num_ranks),
        }
    }

    pub fn color(&self) -> Option<Color> {
        self.color.hinted().and_then(Color::from_index)
    }

    pub fn rank(&self) -> Option<Rank> {
        self.rank.hinted().and_then(Rank::from_index)
    }

    pub fn color_hinted(&self) -> bool {
        self.color.hinted.is_some()
    }

    pub fn rank_hinted(&self) -> bool {
        self.rank.hinted.is_some()
    }

    pub fn color_plausible(&self, color: Color) -> bool {
        self.color.is_plausible(color.index())
    }

    pub fn rank_plausible(&self, rank: Rank) -> bool {
        self.rank.is_plausible(rank.index())
    }

    pub fn is_plausible(&self, card: Card) -> bool {
        self.color_plausible(card.color) && self.rank_plausible(card.rank)
    }

    pub fn color_mask(&self) -> ValueMask {
        self.color.plausible()
    }

    pub fn rank_mask(&self) -> ValueMask {
        self.rank.plausible()
    }

    /// Applies a color reveal. `matches` is whether this slot holds `color`.
    pub fn apply_color_hint(&mut self, color: Color, matches: bool) {
        if matches {
            self.color.apply_is(color.index());
        } else {
            self.color.apply_is_not(color.index());
        }
    }

    /// Applies a rank reveal. `matches` is whether this slot holds `rank`.
    pub fn apply_rank_hint(&mut self, rank: Rank, matches: bool) {
        if matches {
            self.rank.apply_is(rank.index());
        } else {
            self.rank.apply_is_not(rank.index());
        }
    }

    /// Number of (color, rank) combinations still plausible, ignoring copy counts.
    pub fn plausible_combinations(&self) -> u32 {
        self.color.plausible().count() * self.rank.plausible().count()
    }
}

impl fmt::Display for CardKnowledge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.color() {
            Some(color) => write!(f, "{color}")?,
            None => f.write_str("X")?,
        }
        match self.rank() {
            Some(rank) => write!(f, "{rank}")?,
            None => f.write_str("X")?,
        }
        f.write_str("|")?;
        for color in Color::ALL {
            if self.color_plausible(color) {
                write!(f, "{color}")?;
            }
        }
        for rank in Rank::ORDERED {
            if self.rank_plausible(rank) {
                write!(f, "{rank}")?;
            }
        }
        Ok(())
    }
}
