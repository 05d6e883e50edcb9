//! Candidate-deck sampling for a single seat.

use crate::model::card::Card;
use crate::model::color::Color;
use crate::model::config::GameConfig;
use crate::model::deck::CardCounts;
use crate::model::hand::Hand;
use crate::model::rank::Rank;
use crate::model::state::GameState;
use rand::Rng;
use std::fmt;

/// Public table information a sampler draws against.
#[derive(Debug, Clone, Copy)]
pub struct SampleContext<'a> {
    config: &'a GameConfig,
    hands: &'a [Hand],
    discard_pile: &'a [Card],
    fireworks: &'a [u8],
}

impl<'a> SampleContext<'a> {
    pub fn new(
        config: &'a GameConfig,
        hands: &'a [Hand],
        discard_pile: &'a [Card],
        fireworks: &'a [u8],
    ) -> Self {
        Self {
            config,
            hands,
            discard_pile,
            fireworks,
        }
    }

    pub fn from_state(state: &'a GameState) -> Self {
        Self::new(
            state.config(),
            state.hands(),
            state.discard_pile(),
            state.fireworks(),
        )
    }

    fn hand(&self, seat: usize) -> Result<&'a Hand, SamplingError> {
        self.hands.get(seat).ok_or(SamplingError::InvalidSeat(seat))
    }

    /// Full composition minus discards and fireworks.
    fn unplayed(&self) -> CardCounts {
        let mut counts = CardCounts::full(self.config.colors, self.config.ranks);
        for &card in self.discard_pile {
            counts.remove(card);
        }
        for (color, &height) in Color::in_play(self.config.colors).zip(self.fireworks) {
            for rank in Rank::in_play(height as usize) {
                counts.remove(Card::new(color, rank));
            }
        }
        counts
    }
}

/// Draws hidden cards that agree with everything a seat has been told.
#[derive(Debug, Default)]
pub struct DeckSampler;

impl DeckSampler {
    /// Raw availability for a slot: every physical card not visible elsewhere, before the
    /// slot's knowledge is applied.
    pub fn deck_counts(
        ctx: &SampleContext<'_>,
        seat: usize,
        slot: usize,
    ) -> Result<CardCounts, SamplingError> {
        ctx.hand(seat)?;
        let mut counts = ctx.unplayed();
        for (other_seat, hand) in ctx.hands.iter().enumerate() {
            for (index, held) in hand.slots().iter().enumerate() {
                if other_seat == seat && index == slot {
                    continue;
                }
                if let Some(card) = held.card {
                    counts.remove(card);
                }
            }
        }
        Ok(counts)
    }

    /// Multiset of card values the slot could hold, with remaining copy counts.
    pub fn valid_cards(
        ctx: &SampleContext<'_>,
        seat: usize,
        slot: usize,
    ) -> Result<CardCounts, SamplingError> {
        let hand = ctx.hand(seat)?;
        let knowledge = hand
            .knowledge(slot)
            .ok_or(SamplingError::InvalidSlot { seat, slot })?;
        let mut counts = Self::deck_counts(ctx, seat, slot)?;
        counts.retain(|card| knowledge.is_plausible(card));
        Ok(counts)
    }

    /// Samples one card for a slot, weighted by remaining physical copies.
    pub fn valid_card<R: Rng + ?Sized>(
        ctx: &SampleContext<'_>,
        seat: usize,
        slot: usize,
        rng: &mut R,
    ) -> Result<Card, SamplingError> {
        Self::valid_cards(ctx, seat, slot)?
            .sample(rng)
            .ok_or(SamplingError::Unsatisfiable { seat, slot })
    }

    /// Samples the whole hand at once, oldest slot first. Cards held in the hand being
    /// sampled are ignored and each chosen card is withheld from later slots.
    pub fn sample_hand<R: Rng + ?Sized>(
        ctx: &SampleContext<'_>,
        seat: usize,
        rng: &mut R,
    ) -> Result<Vec<Card>, SamplingError> {
        let hand = ctx.hand(seat)?;
        let mut pool = ctx.unplayed();
        for (other_seat, other) in ctx.hands.iter().enumerate() {
            if other_seat != seat {
                for card in other.cards() {
                    pool.remove(card);
                }
            }
        }

        let mut chosen = Vec::with_capacity(hand.len());
        for (slot, held) in hand.slots().iter().enumerate() {
            let mut candidates = pool;
            candidates.retain(|card| held.knowledge.is_plausible(card));
            let card = candidates
                .sample(rng)
                .ok_or(SamplingError::Unsatisfiable { seat, slot })?;
            pool.remove(card);
            chosen.push(card);
        }
        Ok(chosen)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingError {
    InvalidSeat(usize),
    InvalidSlot { seat: usize, slot: usize },
    /// No physical card satisfies the slot's constraints.
    Unsatisfiable { seat: usize, slot: usize },
}

impl fmt::Display for SamplingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingError::InvalidSeat(seat) => write!(f, "seat {seat} does not exist"),
            SamplingError::InvalidSlot { seat, slot } => {
                write!(f, "seat {seat} has no slot {slot}")
            }
            SamplingError::Unsatisfiable { seat, slot } => {
                write!(f, "no card fits seat {seat} slot {slot}")
            }
        }
    }
}

impl std::error::Error for SamplingError {}
