mod mcts;
mod rule;

pub use mcts::MctsPolicy;
pub use rule::RulePolicy;

use hanabi_core::model::moves::Move;
use hanabi_core::model::observation::Observation;
use hanabi_core::model::state::GameState;
use rand::RngCore;

/// Context provided to policies for decision-making
pub struct PolicyContext<'a> {
    pub seat: usize,
    /// Ground truth. Only search policies may look at it, and only to copy it before
    /// hiding the seat's own cards again.
    pub state: &'a GameState,
    pub observation: &'a Observation,
}

impl<'a> PolicyContext<'a> {
    pub fn new(seat: usize, state: &'a GameState, observation: &'a Observation) -> Self {
        Self {
            seat,
            state,
            observation,
        }
    }
}

/// Unified interface for the rule-based and search players
pub trait Policy: Send {
    fn name(&self) -> &str;

    /// Choose a move for `ctx.seat`. Returns `None` when that seat is not to act.
    fn choose(&mut self, ctx: &PolicyContext<'_>, rng: &mut dyn RngCore) -> Option<Move>;
}
