use crate::model::card::Card;
use crate::model::color::Color;
use crate::model::rank::Rank;
use rand::Rng;
use serde::{Deserialize, Serialize};

const CARD_KINDS: usize = Color::COUNT * Rank::COUNT;

/// Multiset of cards keyed by (color, rank).
///
/// Used both for the physical draw pile and for derived candidate decks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardCounts {
    counts: [u8; CARD_KINDS],
    total: u16,
}

impl Default for CardCounts {
    fn default() -> Self {
        Self::empty()
    }
}

impl CardCounts {
    pub const fn empty() -> Self {
        Self {
            counts: [0; CARD_KINDS],
            total: 0,
        }
    }

    /// Full composition of a deck using the first `num_colors` colors and `num_ranks` ranks.
    pub fn full(num_colors: usize, num_ranks: usize) -> Self {
        let mut deck = Self::empty();
        for color in Color::in_play(num_colors) {
            for rank in Rank::in_play(num_ranks) {
                let card = Card::new(color, rank);
                deck.counts[card.to_id()] = rank.copies();
                deck.total += rank.copies() as u16;
            }
        }
        deck
    }

    pub fn count(&self, card: Card) -> u8 {
        self.counts[card.to_id()]
    }

    pub fn contains(&self, card: Card) -> bool {
        self.count(card) > 0
    }

    pub fn total(&self) -> usize {
        self.total as usize
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn add(&mut self, card: Card) {
        self.counts[card.to_id()] += 1;
        self.total += 1;
    }

    /// Removes one copy. Returns false, leaving the counts untouched, when none remain.
    pub fn remove(&mut self, card: Card) -> bool {
        let slot = &mut self.counts[card.to_id()];
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        self.total -= 1;
        true
    }

    /// Removes every copy of `card`.
    pub fn remove_all(&mut self, card: Card) {
        let slot = &mut self.counts[card.to_id()];
        self.total -= *slot as u16;
        *slot = 0;
    }

    /// Keeps only the cards for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(Card) -> bool) {
        for id in 0..CARD_KINDS {
            if self.counts[id] == 0 {
                continue;
            }
            if let Some(card) = Card::from_id(id) {
                if !keep(card) {
                    self.total -= self.counts[id] as u16;
                    self.counts[id] = 0;
                }
            }
        }
    }

    /// Distinct card values with a non-zero count, paired with their counts.
    pub fn iter(&self) -> impl Iterator<Item = (Card, u8)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .filter_map(|(id, count)| Card::from_id(id).map(|card| (card, *count)))
    }

    /// Distinct card values with a non-zero count.
    pub fn distinct(&self) -> Vec<Card> {
        self.iter().map(|(card, _)| card).collect()
    }

    /// Draws one physical card, weighting each value by its remaining copies.
    ///
    /// The draw does not remove the card; callers decide whether it is consumed.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Card> {
        if self.total == 0 {
            return None;
        }
        let mut choice = rng.gen_range(0..self.total);
        for (card, count) in self.iter() {
            if choice < count as u16 {
                return Some(card);
            }
            choice -= count as u16;
        }
        None
    }
}
