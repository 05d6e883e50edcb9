use super::{Policy, PolicyContext};
use crate::rules::{Rule, RulePreset};
use hanabi_core::model::moves::Move;
use hanabi_core::model::observation::Observation;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use tracing::{Level, event};

/// Walks an ordered rule list and plays the first proposal.
///
/// When no rule fires a uniformly random legal move is played. The firing histogram has
/// one bucket per rule plus a trailing bucket for that fallback.
#[derive(Debug, Clone)]
pub struct RulePolicy {
    name: String,
    rules: Vec<Rule>,
    firings: Vec<u64>,
}

impl RulePolicy {
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        let firings = vec![0; rules.len() + 1];
        Self {
            name: name.into(),
            rules,
            firings,
        }
    }

    pub fn from_preset(preset: RulePreset) -> Self {
        Self::new(preset.as_str(), preset.rules())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn select<R: Rng + ?Sized>(&mut self, obs: &Observation, rng: &mut R) -> Option<Move> {
        if !obs.is_acting() {
            return None;
        }
        for (index, rule) in self.rules.iter().enumerate() {
            if let Some(mv) = rule.evaluate(obs, rng) {
                self.firings[index] += 1;
                event!(
                    target: "hanabi_bot::rules",
                    Level::TRACE,
                    policy = %self.name,
                    seat = obs.observer,
                    rule = rule.name(),
                    mv = %mv
                );
                return Some(mv);
            }
        }
        let mv = obs.legal_moves.choose(rng).copied()?;
        let fallback = self.rules.len();
        self.firings[fallback] += 1;
        event!(
            target: "hanabi_bot::rules",
            Level::TRACE,
            policy = %self.name,
            seat = obs.observer,
            rule = "fallback",
            mv = %mv
        );
        Some(mv)
    }

    /// Raw firing counts, rules first, fallback last.
    pub fn firing_counts(&self) -> &[u64] {
        &self.firings
    }

    pub fn total_calls(&self) -> u64 {
        self.firings.iter().sum()
    }

    /// Fraction of decisions each rule made, paired with the rule name.
    pub fn histogram(&self) -> Vec<(&'static str, f64)> {
        let total = self.total_calls();
        let fraction = |count: u64| {
            if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            }
        };
        self.rules
            .iter()
            .map(Rule::name)
            .chain(std::iter::once("fallback"))
            .zip(self.firings.iter())
            .map(|(name, &count)| (name, fraction(count)))
            .collect()
    }

    pub fn reset_histogram(&mut self) {
        self.firings.iter_mut().for_each(|count| *count = 0);
    }
}

impl Policy for RulePolicy {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose(&mut self, ctx: &PolicyContext<'_>, rng: &mut dyn RngCore) -> Option<Move> {
        self.select(ctx.observation, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::RulePolicy;
    use crate::policy::{Policy, PolicyContext};
    use crate::rules::{Rule, RulePreset};
    use hanabi_core::model::config::GameConfig;
    use hanabi_core::model::state::{Actor, GameState};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn opening(seed: u64) -> GameState {
        let mut rng = StdRng::seed_from_u64(seed);
        GameState::new(GameConfig::full(3), &mut rng).expect("game")
    }

    #[test]
    fn only_the_acting_seat_gets_a_move() {
        let state = opening(1);
        let mut policy = RulePolicy::from_preset(RulePreset::VanDenBergh);
        let mut rng = StdRng::seed_from_u64(3);
        let idle = state.observation(1);
        assert!(policy.select(&idle, &mut rng).is_none());
        let acting = state.observation(0);
        let mv = policy.select(&acting, &mut rng).unwrap();
        assert!(state.is_legal(&mv));
        assert_eq!(policy.total_calls(), 1);
    }

    #[test]
    fn empty_rule_list_always_falls_back() {
        let state = opening(2);
        let mut policy = RulePolicy::new("empty", Vec::new());
        let mut rng = StdRng::seed_from_u64(4);
        let obs = state.observation(0);
        for _ in 0..5 {
            let mv = policy.select(&obs, &mut rng).unwrap();
            assert!(obs.legal_moves.contains(&mv));
        }
        assert_eq!(policy.firing_counts(), &[5]);
        assert_eq!(policy.histogram(), vec![("fallback", 1.0)]);
    }

    #[test]
    fn histogram_fractions_sum_to_one() {
        let mut policy = RulePolicy::from_preset(RulePreset::Piers);
        let mut rng = StdRng::seed_from_u64(9);
        let mut state = opening(5);
        loop {
            match state.cur_player() {
                Actor::Chance => {
                    state.deal_random_card(&mut rng).unwrap();
                }
                Actor::Terminal => break,
                Actor::Player(seat) => {
                    let obs = state.observation(seat);
                    let ctx = PolicyContext::new(seat, &state, &obs);
                    let mv = policy.choose(&ctx, &mut rng).unwrap();
                    state.apply_move(mv).unwrap();
                }
            }
        }
        let total: f64 = policy.histogram().iter().map(|(_, fraction)| fraction).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(policy.histogram().len(), policy.rules().len() + 1);
    }

    #[test]
    fn first_firing_rule_wins() {
        let state = opening(6);
        let mut policy = RulePolicy::new("random-first", vec![Rule::LegalRandom, Rule::PlaySafeCard]);
        let mut rng = StdRng::seed_from_u64(1);
        let obs = state.observation(0);
        policy.select(&obs, &mut rng).unwrap();
        assert_eq!(policy.firing_counts(), &[1, 0, 0]);
    }
}
