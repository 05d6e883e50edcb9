//! What a single seat can see of a [`GameState`].

use crate::model::card::Card;
use crate::model::color::Color;
use crate::model::config::GameConfig;
use crate::model::deck::CardCounts;
use crate::model::hand::Slot;
use crate::model::knowledge::CardKnowledge;
use crate::model::moves::Move;
use crate::model::rank::Rank;
use crate::model::state::{Actor, GameState};
use serde::{Deserialize, Serialize};

/// Seat-relative snapshot. Seats are absolute; the observer's own cards are hidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub observer: usize,
    pub config: GameConfig,
    pub actor: Actor,
    pub hands: Vec<Vec<Slot>>,
    pub fireworks: Vec<u8>,
    pub discard_pile: Vec<Card>,
    pub information_tokens: u8,
    pub life_tokens: u8,
    pub deck_size: usize,
    /// Populated only when the observer is the acting player.
    pub legal_moves: Vec<Move>,
}

impl Observation {
    pub fn capture(state: &GameState, observer: usize) -> Self {
        let hands = state
            .hands()
            .iter()
            .enumerate()
            .map(|(seat, hand)| {
                hand.slots()
                    .iter()
                    .map(|slot| Slot {
                        card: if seat == observer { None } else { slot.card },
                        knowledge: slot.knowledge,
                    })
                    .collect()
            })
            .collect();
        let actor = state.cur_player();
        let legal_moves = if actor == Actor::Player(observer) {
            state.legal_moves()
        } else {
            Vec::new()
        };
        Self {
            observer,
            config: *state.config(),
            actor,
            hands,
            fireworks: state.fireworks().to_vec(),
            discard_pile: state.discard_pile().to_vec(),
            information_tokens: state.information_tokens(),
            life_tokens: state.life_tokens(),
            deck_size: state.deck_size(),
            legal_moves,
        }
    }

    pub fn num_players(&self) -> usize {
        self.hands.len()
    }

    /// Offset of the acting player from the observer, if a player is to act.
    pub fn cur_player_offset(&self) -> Option<usize> {
        match self.actor {
            Actor::Player(seat) => {
                Some((seat + self.num_players() - self.observer) % self.num_players())
            }
            Actor::Chance | Actor::Terminal => None,
        }
    }

    pub fn is_acting(&self) -> bool {
        self.actor == Actor::Player(self.observer)
    }

    /// Seats other than the observer, in turn order starting after the observer.
    pub fn other_seats(&self) -> impl Iterator<Item = usize> + '_ {
        let players = self.num_players();
        (1..players).map(move |offset| (self.observer + offset) % players)
    }

    pub fn hand(&self, seat: usize) -> &[Slot] {
        &self.hands[seat]
    }

    pub fn own_hand(&self) -> &[Slot] {
        &self.hands[self.observer]
    }

    pub fn own_knowledge(&self, slot: usize) -> Option<&CardKnowledge> {
        self.own_hand().get(slot).map(|s| &s.knowledge)
    }

    pub fn fireworks_score(&self) -> u32 {
        self.fireworks.iter().map(|&h| h as u32).sum()
    }

    pub fn is_playable(&self, card: Card) -> bool {
        card.is_playable_on(&self.fireworks)
    }

    /// A card that can never score: already played, or a lower rank of its color is gone.
    pub fn is_useless(&self, card: Card) -> bool {
        if card.is_already_played(&self.fireworks) {
            return true;
        }
        let height = self.fireworks.get(card.color.index()).copied().unwrap_or(0) as usize;
        (height..card.rank.index()).any(|rank_index| {
            Rank::from_index(rank_index).is_some_and(|rank| {
                let needed = Card::new(card.color, rank);
                self.discarded(needed) >= rank.copies() as usize
            })
        })
    }

    /// A still-useful card whose every other copy has been discarded.
    pub fn is_critical(&self, card: Card) -> bool {
        !self.is_useless(card) && self.discarded(card) + 1 >= card.rank.copies() as usize
    }

    pub fn discarded(&self, card: Card) -> usize {
        self.discard_pile.iter().filter(|&&c| c == card).count()
    }

    /// Cards the observer has not seen: the full deck minus discards, fireworks and
    /// every other player's hand.
    pub fn unseen_counts(&self) -> CardCounts {
        let mut counts = CardCounts::full(self.config.colors, self.config.ranks);
        for &card in &self.discard_pile {
            counts.remove(card);
        }
        for (color, &height) in Color::in_play(self.config.colors).zip(&self.fireworks) {
            for rank in Rank::in_play(height as usize) {
                counts.remove(Card::new(color, rank));
            }
        }
        for seat in self.other_seats() {
            for card in self.hands[seat].iter().filter_map(|slot| slot.card) {
                counts.remove(card);
            }
        }
        counts
    }

    /// Unseen cards consistent with the observer's knowledge of `slot`.
    pub fn candidates(&self, slot: usize) -> CardCounts {
        let mut counts = self.unseen_counts();
        if let Some(knowledge) = self.own_knowledge(slot) {
            counts.retain(|card| knowledge.is_plausible(card));
        }
        counts
    }

    /// Chance that `slot` holds a card satisfying `predicate`, weighted by copies.
    pub fn probability(&self, slot: usize, predicate: impl Fn(Card) -> bool) -> f64 {
        let counts = self.candidates(slot);
        if counts.is_empty() {
            return 0.0;
        }
        let hits: usize = counts
            .iter()
            .filter(|(card, _)| predicate(*card))
            .map(|(_, count)| count as usize)
            .sum();
        hits as f64 / counts.total() as f64
    }

    pub fn playable_probability(&self, slot: usize) -> f64 {
        self.probability(slot, |card| self.is_playable(card))
    }

    pub fn useless_probability(&self, slot: usize) -> f64 {
        self.probability(slot, |card| self.is_useless(card))
    }

    pub fn critical_probability(&self, slot: usize) -> f64 {
        self.probability(slot, |card| self.is_critical(card))
    }
}
