use crate::model::color::Color;
use crate::model::rank::Rank;
use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub color: Color,
    pub rank: Rank,
}

impl Card {
    pub const fn new(color: Color, rank: Rank) -> Self {
        Self { color, rank }
    }

    /// Dense index used by [`crate::model::deck::CardCounts`].
    pub const fn to_id(self) -> usize {
        self.color.index() * Rank::COUNT + self.rank.index()
    }

    pub const fn from_id(id: usize) -> Option<Self> {
        let color = match Color::from_index(id / Rank::COUNT) {
            Some(color) => color,
            None => return None,
        };
        match Rank::from_index(id % Rank::COUNT) {
            Some(rank) => Some(Card::new(color, rank)),
            None => None,
        }
    }

    /// True when this card is the next one needed on its firework.
    pub fn is_playable_on(self, fireworks: &[u8]) -> bool {
        fireworks
            .get(self.color.index())
            .is_some_and(|&height| height as usize == self.rank.index())
    }

    /// True when its firework has already passed this rank.
    pub fn is_already_played(self, fireworks: &[u8]) -> bool {
        fireworks
            .get(self.color.index())
            .is_some_and(|&height| (height as usize) > self.rank.index())
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.color, self.rank)
    }
}

impl std::str::FromStr for Card {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let color = chars
            .next()
            .and_then(Color::from_char)
            .ok_or_else(|| format!("invalid color in card '{s}'"))?;
        let rank = chars
            .next()
            .and_then(|c| c.to_digit(10))
            .and_then(|value| (value as usize).checked_sub(1))
            .and_then(Rank::from_index)
            .ok_or_else(|| format!("invalid rank in card '{s}'"))?;
        if chars.next().is_some() {
            return Err(format!("trailing characters in card '{s}'"));
        }
        Ok(Card::new(color, rank))
    }
}

#[cfg(test)]
mod tests {
    use super::{Card, Color, Rank};

    #[test]
    fn id_roundtrip_covers_all_cards() {
        for id in 0..25 {
            let card = Card::from_id(id).expect("valid id");
            assert_eq!(card.to_id(), id);
        }
        assert_eq!(Card::from_id(25), None);
    }

    #[test]
    fn playable_tracks_firework_height() {
        let fireworks = [2, 0, 0, 0, 0];
        assert!(Card::new(Color::Red, Rank::Three).is_playable_on(&fireworks));
        assert!(!Card::new(Color::Red, Rank::Two).is_playable_on(&fireworks));
        assert!(Card::new(Color::Red, Rank::Two).is_already_played(&fireworks));
        assert!(Card::new(Color::Blue, Rank::One).is_playable_on(&fireworks));
    }

    #[test]
    fn parses_display_form() {
        let card: Card = "G4".parse().unwrap();
        assert_eq!(card, Card::new(Color::Green, Rank::Four));
        assert_eq!(card.to_string(), "G4");
        assert!("X1".parse::<Card>().is_err());
        assert!("R6".parse::<Card>().is_err());
    }
}
