//! Whole-hand resampling and restoration.

use super::{DeckSampler, SampleContext, SamplingError};
use crate::model::card::Card;
use crate::model::moves::Move;
use crate::model::state::{GameState, MoveError};
use rand::Rng;
use std::fmt;
use tracing::{debug, warn};

/// Attempts made by [`Determinizer::determinize`] before giving up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 64;

/// Outcome of a [`Determinizer::restore`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Slots dealt their remembered card.
    pub restored: usize,
    /// Slots given a different card that still agrees with their knowledge.
    pub substitutions: usize,
    /// Slots force-dealt from raw availability with their knowledge reset.
    pub overrides: usize,
}

impl RestoreReport {
    pub fn is_exact(&self) -> bool {
        self.substitutions == 0 && self.overrides == 0
    }
}

/// Swaps a seat's physical cards for knowledge-consistent alternatives.
#[derive(Debug, Clone, Copy)]
pub struct Determinizer {
    max_attempts: usize,
}

impl Default for Determinizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl Determinizer {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Replaces every card in `seat`'s hand with a sample consistent with its knowledge.
    ///
    /// On failure the original cards are dealt back and the state is unchanged.
    pub fn determinize<R: Rng + ?Sized>(
        &self,
        state: &mut GameState,
        seat: usize,
        rng: &mut R,
    ) -> Result<(), DeterminizationError> {
        if seat >= state.num_players() {
            return Err(DeterminizationError::Sampling(SamplingError::InvalidSeat(seat)));
        }
        let originals: Vec<Option<Card>> = state.hand(seat).slots().iter().map(|s| s.card).collect();
        for (slot, card) in originals.iter().enumerate() {
            if card.is_some() {
                state.apply_move(Move::ReturnCard { seat, slot })?;
            }
        }

        let mut last_error = None;
        for _ in 0..self.max_attempts {
            let ctx = SampleContext::from_state(state);
            match DeckSampler::sample_hand(&ctx, seat, rng) {
                Ok(cards) => {
                    for (slot, card) in cards.into_iter().enumerate() {
                        state.apply_move(Move::DealSpecific { seat, slot, card })?;
                    }
                    return Ok(());
                }
                Err(err) => last_error = Some(err),
            }
        }

        for (slot, card) in originals.into_iter().enumerate() {
            if let Some(card) = card {
                state.apply_move(Move::DealSpecific { seat, slot, card })?;
            }
        }
        debug!(
            target: "hanabi_core::belief",
            seat,
            attempts = self.max_attempts,
            error = ?last_error,
            "determinization exhausted its attempts"
        );
        Err(DeterminizationError::Unsatisfiable {
            seat,
            attempts: self.max_attempts,
        })
    }

    /// Best-effort return of `seat`'s hand to `remembered`.
    ///
    /// `removed_slot` is the slot the owner played or discarded since the hand was
    /// remembered; later remembered cards shift down to close the gap and any newly
    /// drawn card at the end of the hand is left alone. Never fails: slots whose
    /// remembered card is no longer available are substituted or overridden.
    pub fn restore<R: Rng + ?Sized>(
        &self,
        state: &mut GameState,
        seat: usize,
        remembered: &[Card],
        removed_slot: Option<usize>,
        rng: &mut R,
    ) -> RestoreReport {
        let mut report = RestoreReport::default();
        if seat >= state.num_players() {
            warn!(target: "hanabi_core::belief", seat, "restore requested for unknown seat");
            return report;
        }
        let aligned: Vec<Card> = remembered
            .iter()
            .enumerate()
            .filter(|(index, _)| Some(*index) != removed_slot)
            .map(|(_, card)| *card)
            .collect();
        let slots = aligned.len().min(state.hand(seat).len());

        // Clear every mismatched slot first so cards can move within the hand.
        let mut returned: Vec<Option<Card>> = vec![None; slots];
        let mut pending = Vec::with_capacity(slots);
        for (slot, &wanted) in aligned.iter().enumerate().take(slots) {
            let current = state.hand(seat).card(slot);
            if current == Some(wanted) {
                report.restored += 1;
                continue;
            }
            if current.is_some() {
                if let Err(err) = state.apply_move(Move::ReturnCard { seat, slot }) {
                    warn!(target: "hanabi_core::belief", seat, slot, %err, "cannot return card");
                    continue;
                }
            }
            returned[slot] = current;
            pending.push((slot, wanted));
        }

        for (slot, wanted) in pending {
            let current = returned[slot];
            let ctx = SampleContext::from_state(state);
            let valid = DeckSampler::valid_cards(&ctx, seat, slot).unwrap_or_default();
            if valid.contains(wanted) {
                deal(state, seat, slot, wanted);
                report.restored += 1;
            } else if let Some(substitute) = valid.sample(rng) {
                deal(state, seat, slot, substitute);
                report.substitutions += 1;
            } else {
                let raw = DeckSampler::deck_counts(&ctx, seat, slot).unwrap_or_default();
                let forced = if raw.contains(wanted) {
                    Some(wanted)
                } else {
                    current.filter(|card| raw.contains(*card)).or_else(|| raw.sample(rng))
                };
                let Some(forced) = forced else {
                    warn!(target: "hanabi_core::belief", seat, slot, "no card left to force");
                    continue;
                };
                deal(state, seat, slot, forced);
                if let Err(err) = state.reset_knowledge(seat, slot) {
                    warn!(target: "hanabi_core::belief", seat, slot, %err, "cannot reset knowledge");
                }
                report.overrides += 1;
                debug!(
                    target: "hanabi_core::belief",
                    seat,
                    slot,
                    card = %forced,
                    "knowledge override during restore"
                );
            }
        }
        report
    }
}

fn deal(state: &mut GameState, seat: usize, slot: usize, card: Card) {
    if let Err(err) = state.apply_move(Move::DealSpecific { seat, slot, card }) {
        warn!(target: "hanabi_core::belief", seat, slot, %card, %err, "deal failed during restore");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeterminizationError {
    Unsatisfiable { seat: usize, attempts: usize },
    Sampling(SamplingError),
    Move(MoveError),
}

impl fmt::Display for DeterminizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeterminizationError::Unsatisfiable { seat, attempts } => write!(
                f,
                "no consistent hand for seat {seat} after {attempts} attempts"
            ),
            DeterminizationError::Sampling(err) => write!(f, "sampling failed: {err}"),
            DeterminizationError::Move(err) => write!(f, "engine rejected a swap: {err}"),
        }
    }
}

impl std::error::Error for DeterminizationError {}

impl From<MoveError> for DeterminizationError {
    fn from(err: MoveError) -> Self {
        DeterminizationError::Move(err)
    }
}

impl From<SamplingError> for DeterminizationError {
    fn from(err: SamplingError) -> Self {
        DeterminizationError::Sampling(err)
    }
}
