//! Knowledge-consistent sampling of hidden cards.
//!
//! - `sampler`: the candidate deck for a slot and weighted draws from it.
//! - `determinize`: whole-hand resampling and best-effort restoration, driven through
//!   the engine's `ReturnCard` / `DealSpecific` moves.

mod determinize;
mod sampler;

pub use determinize::{
    DEFAULT_MAX_ATTEMPTS, DeterminizationError, Determinizer, RestoreReport,
};
pub use sampler::{DeckSampler, SampleContext, SamplingError};
