use core::fmt;
use serde::{Deserialize, Serialize};

/// Card rank. Stored 0-based (`One` has index 0) and displayed 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[repr(u8)]
pub enum Rank {
    One = 0,
    Two = 1,
    Three = 2,
    Four = 3,
    Five = 4,
}

impl Rank {
    pub const COUNT: usize = 5;

    pub const ORDERED: [Rank; 5] = [Rank::One, Rank::Two, Rank::Three, Rank::Four, Rank::Five];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Rank::One),
            1 => Some(Rank::Two),
            2 => Some(Rank::Three),
            3 => Some(Rank::Four),
            4 => Some(Rank::Five),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Face value printed on the card.
    pub const fn value(self) -> u8 {
        self as u8 + 1
    }

    /// Physical copies of this rank per color in the standard deck.
    pub const fn copies(self) -> u8 {
        match self {
            Rank::One => 3,
            Rank::Five => 1,
            _ => 2,
        }
    }

    pub fn in_play(count: usize) -> impl Iterator<Item = Rank> {
        Rank::ORDERED.into_iter().take(count.min(Rank::COUNT))
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}
