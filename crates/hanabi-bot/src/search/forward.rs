//! Forward model: one iteration's private copy of the game, redeterminized as play moves.

use super::params::ScoringMode;
use super::scoring::RegretTracker;
use hanabi_core::belief::{DeterminizationError, Determinizer, RestoreReport};
use hanabi_core::model::card::Card;
use hanabi_core::model::moves::Move;
use hanabi_core::model::observation::Observation;
use hanabi_core::model::state::{Actor, GameState, MoveError};
use rand::Rng;
use tracing::debug;

/// Result of [`ForwardModel::step`].
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
}

#[derive(Debug, Clone)]
pub struct ForwardModel {
    state: GameState,
    searcher: usize,
    remembered: Vec<Option<Vec<Card>>>,
    determinizer: Determinizer,
    tracker: RegretTracker,
    restores: RestoreReport,
}

impl ForwardModel {
    pub fn new(
        true_state: &GameState,
        searcher: usize,
        scoring: ScoringMode,
        determinizer: Determinizer,
    ) -> Self {
        Self {
            state: true_state.clone(),
            searcher,
            remembered: vec![None; true_state.num_players()],
            determinizer,
            tracker: RegretTracker::new(scoring),
            restores: RestoreReport::default(),
        }
    }

    /// Resamples the searcher's own hand. Failure here is fatal for the decision.
    pub fn determinize_searcher<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<(), DeterminizationError> {
        self.determinizer.determinize(&mut self.state, self.searcher, rng)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn searcher(&self) -> usize {
        self.searcher
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn reward(&self) -> f64 {
        self.tracker.reward(&self.state)
    }

    pub fn tracker(&self) -> &RegretTracker {
        &self.tracker
    }

    /// Restore totals accumulated over this model's lifetime.
    pub fn restores(&self) -> RestoreReport {
        self.restores
    }

    /// Observation for whoever acts next, or for the searcher once nobody does.
    pub fn observation(&self) -> Observation {
        match self.state.cur_player() {
            Actor::Player(seat) => self.state.observation(seat),
            Actor::Chance | Actor::Terminal => self.state.observation(self.searcher),
        }
    }

    pub fn step<R: Rng + ?Sized>(&mut self, mv: Move, rng: &mut R) -> Result<StepOutcome, MoveError> {
        let mover = match self.state.cur_player() {
            Actor::Player(seat) => seat,
            Actor::Chance => return Err(MoveError::AwaitingChance),
            Actor::Terminal => return Err(MoveError::Terminal),
        };
        let removed_slot = mv.card_slot();
        let fireworks_before = self.state.fireworks().to_vec();
        let discards_before = self.state.discard_pile().len();

        let outcome = self.state.apply_move(mv)?;
        self.state.resolve_chance(rng)?;

        if let Some(card) = outcome.card.filter(|_| !outcome.scored) {
            let ranks = self.state.config().ranks;
            let pile = &self.state.discard_pile()[..discards_before];
            self.tracker.charge_destroyed(card, ranks, &fireworks_before, pile);
        }

        if mover != self.searcher {
            if let Some(remembered) = self.remembered[mover].take() {
                let report =
                    self.determinizer
                        .restore(&mut self.state, mover, &remembered, removed_slot, rng);
                self.restores.restored += report.restored;
                self.restores.substitutions += report.substitutions;
                self.restores.overrides += report.overrides;
            }
        }

        if let Actor::Player(next) = self.state.cur_player() {
            if next != self.searcher {
                self.remembered[next] = Some(self.state.player_hands()[next].clone());
                if let Err(err) = self.determinizer.determinize(&mut self.state, next, rng) {
                    debug!(
                        target: "hanabi_bot::mcts",
                        seat = next,
                        %err,
                        "opponent keeps its hand after failed determinization"
                    );
                }
            }
        }

        Ok(StepOutcome {
            observation: self.observation(),
            reward: self.reward(),
            done: self.is_terminal(),
        })
    }
}
