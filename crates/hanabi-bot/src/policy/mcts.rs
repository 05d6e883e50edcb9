use super::{Policy, PolicyContext};
use crate::search::{MctsAgent, MctsConfig, SearchOutcome};
use hanabi_core::model::moves::Move;
use rand::RngCore;
use rand::seq::SliceRandom;
use tracing::{Level, event};

/// Adapter that lets [`MctsAgent`] sit at a table next to rule players.
///
/// A failed search is logged and answered with a random legal move so an episode
/// never stalls on one bad decision.
#[derive(Debug)]
pub struct MctsPolicy {
    name: String,
    agent: MctsAgent,
    decisions: u64,
    fallbacks: u64,
    last_outcome: Option<SearchOutcome>,
}

impl MctsPolicy {
    pub fn new(config: MctsConfig) -> Self {
        Self::named("mcts", config)
    }

    pub fn named(name: impl Into<String>, config: MctsConfig) -> Self {
        Self {
            name: name.into(),
            agent: MctsAgent::new(config),
            decisions: 0,
            fallbacks: 0,
            last_outcome: None,
        }
    }

    pub fn agent(&self) -> &MctsAgent {
        &self.agent
    }

    pub fn decisions(&self) -> u64 {
        self.decisions
    }

    /// Decisions answered by a random move, either from an empty tree or a failed search.
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks
    }

    pub fn last_outcome(&self) -> Option<&SearchOutcome> {
        self.last_outcome.as_ref()
    }
}

impl Policy for MctsPolicy {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose(&mut self, ctx: &PolicyContext<'_>, rng: &mut dyn RngCore) -> Option<Move> {
        if !ctx.observation.is_acting() {
            return None;
        }
        self.decisions += 1;
        match self.agent.search(ctx.state, ctx.seat) {
            Ok(outcome) => {
                let chosen = outcome.chosen;
                self.fallbacks += u64::from(outcome.fallback);
                self.last_outcome = Some(outcome);
                Some(chosen)
            }
            Err(err) => {
                event!(
                    target: "hanabi_bot::mcts",
                    Level::WARN,
                    seat = ctx.seat,
                    error = %err,
                    "search failed; playing a random legal move"
                );
                self.fallbacks += 1;
                self.last_outcome = None;
                ctx.observation.legal_moves.choose(rng).copied()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MctsPolicy;
    use crate::policy::{Policy, PolicyContext};
    use crate::search::MctsConfig;
    use hanabi_core::model::config::GameConfig;
    use hanabi_core::model::state::GameState;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn search_move_is_legal_and_recorded() {
        let mut rng = StdRng::seed_from_u64(31);
        let state = GameState::new(GameConfig::small(2), &mut rng).unwrap();
        let config = MctsConfig {
            max_rollouts: 25,
            max_time_ms: 60_000,
            ..MctsConfig::default()
        }
        .with_seed(5);
        let mut policy = MctsPolicy::new(config);
        let obs = state.observation(0);
        let ctx = PolicyContext::new(0, &state, &obs);
        let mv = policy.choose(&ctx, &mut rng).unwrap();
        assert!(state.is_legal(&mv));
        assert_eq!(policy.decisions(), 1);
        assert_eq!(policy.last_outcome().map(|o| o.iterations), Some(25));
    }

    #[test]
    fn idle_seat_is_not_searched() {
        let mut rng = StdRng::seed_from_u64(32);
        let state = GameState::new(GameConfig::small(2), &mut rng).unwrap();
        let mut policy = MctsPolicy::new(MctsConfig::default().with_seed(1));
        let obs = state.observation(1);
        let ctx = PolicyContext::new(1, &state, &obs);
        assert!(policy.choose(&ctx, &mut rng).is_none());
        assert_eq!(policy.decisions(), 0);
    }
}
