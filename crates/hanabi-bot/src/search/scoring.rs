//! Reward shaping for search iterations.

use super::params::ScoringMode;
use hanabi_core::model::card::Card;
use hanabi_core::model::color::Color;
use hanabi_core::model::rank::Rank;
use hanabi_core::model::state::GameState;

/// Highest firework height still reachable for `color` given the discard pile.
pub fn reachable_height(color: Color, ranks: usize, discard_pile: &[Card]) -> u32 {
    Rank::in_play(ranks)
        .position(|rank| {
            let card = Card::new(color, rank);
            discard_pile.iter().filter(|&&c| c == card).count() >= rank.copies() as usize
        })
        .unwrap_or(ranks) as u32
}

/// Sum of [`reachable_height`] over every color in play.
pub fn max_reachable_score(state: &GameState) -> u32 {
    let config = state.config();
    Color::in_play(config.colors)
        .map(|color| reachable_height(color, config.ranks, state.discard_pile()))
        .sum()
}

/// Fireworks a color loses if `card` joins the discard pile. Zero for non-critical cards.
pub fn critical_discard_cost(card: Card, ranks: usize, fireworks: &[u8], discard_pile: &[Card]) -> u32 {
    let height = fireworks.get(card.color.index()).copied().unwrap_or(0) as u32;
    let before = reachable_height(card.color, ranks, discard_pile);
    if before <= height || (card.rank.index() as u32) < height {
        return 0;
    }
    let mut after_pile = discard_pile.to_vec();
    after_pile.push(card);
    let after = reachable_height(card.color, ranks, &after_pile).max(height);
    before - after
}

/// Accumulates regret over one forward-model trajectory.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegretTracker {
    mode: ScoringMode,
    regret: f64,
    critical_losses: u32,
}

impl RegretTracker {
    pub fn new(mode: ScoringMode) -> Self {
        Self {
            mode,
            regret: 0.0,
            critical_losses: 0,
        }
    }

    pub fn mode(&self) -> ScoringMode {
        self.mode
    }

    pub fn regret(&self) -> f64 {
        self.regret
    }

    pub fn critical_losses(&self) -> u32 {
        self.critical_losses
    }

    /// Charges the potential lost by a card destroyed through a discard or failed play.
    /// `fireworks` and `discard_pile` describe the table before the card was destroyed.
    pub fn charge_destroyed(&mut self, card: Card, ranks: usize, fireworks: &[u8], discard_pile: &[Card]) {
        let cost = critical_discard_cost(card, ranks, fireworks, discard_pile);
        if cost > 0 {
            self.regret += cost as f64;
            self.critical_losses += 1;
        }
    }

    pub fn reward(&self, state: &GameState) -> f64 {
        match self.mode {
            ScoringMode::Direct => state.score() as f64,
            ScoringMode::Regret => {
                let mut reward = state.fireworks_score() as f64 - self.regret;
                if state.life_tokens() == 0 {
                    reward -= max_reachable_score(state) as f64;
                }
                reward
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RegretTracker, critical_discard_cost, max_reachable_score, reachable_height};
    use crate::search::params::ScoringMode;
    use hanabi_core::model::card::Card;
    use hanabi_core::model::color::Color;
    use hanabi_core::model::config::GameConfig;
    use hanabi_core::model::moves::Move;
    use hanabi_core::model::state::{GameState, Position};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn c(text: &str) -> Card {
        text.parse().expect("card literal")
    }

    #[test]
    fn reachable_height_stops_at_first_exhausted_rank() {
        assert_eq!(reachable_height(Color::Red, 5, &[]), 5);
        assert_eq!(reachable_height(Color::Red, 5, &[c("R2"), c("R2")]), 1);
        assert_eq!(reachable_height(Color::Red, 5, &[c("R5")]), 4);
        assert_eq!(reachable_height(Color::Blue, 5, &[c("R1"), c("R1"), c("R1")]), 5);
    }

    #[test]
    fn discarding_last_red_two_is_critical() {
        let fireworks = [1u8, 0, 0, 0, 0];
        assert_eq!(critical_discard_cost(c("R2"), 5, &fireworks, &[c("R2")]), 4);
        assert_eq!(critical_discard_cost(c("R2"), 5, &fireworks, &[]), 0);
    }

    #[test]
    fn discarding_passed_red_two_costs_nothing() {
        let fireworks = [2u8, 0, 0, 0, 0];
        assert_eq!(critical_discard_cost(c("R2"), 5, &fireworks, &[c("R2")]), 0);
    }

    #[test]
    fn discarding_card_of_dead_color_costs_nothing() {
        let fireworks = [0u8; 5];
        let pile = [c("R1"), c("R1"), c("R1")];
        assert_eq!(critical_discard_cost(c("R5"), 5, &fireworks, &pile), 0);
    }

    #[test]
    fn regret_reward_charges_critical_loss_and_life_exhaustion() {
        let position = Position {
            hands: vec![vec![c("R2"), c("B3")], vec![c("G1"), c("Y3")]],
            fireworks: vec![1, 0, 0, 0, 0],
            discard_pile: vec![c("R2")],
            information_tokens: 7,
            life_tokens: 1,
            cur_player: 0,
        };
        let mut state = GameState::from_position(GameConfig::full(2), &position).unwrap();
        let mut tracker = RegretTracker::new(ScoringMode::Regret);
        let direct = RegretTracker::new(ScoringMode::Direct);
        assert_eq!(tracker.reward(&state), 1.0);

        let fireworks = state.fireworks().to_vec();
        let pile = state.discard_pile().to_vec();
        state.apply_move(Move::Discard { slot: 0 }).unwrap();
        tracker.charge_destroyed(c("R2"), 5, &fireworks, &pile);
        assert_eq!(tracker.regret(), 4.0);
        assert_eq!(tracker.reward(&state), 1.0 - 4.0);

        let mut rng = StdRng::seed_from_u64(0);
        state.deal_random_card(&mut rng).unwrap();
        state.apply_move(Move::Play { slot: 1 }).unwrap();
        assert!(state.is_terminal());
        let penalty = max_reachable_score(&state) as f64;
        assert_eq!(tracker.reward(&state), 1.0 - 4.0 - penalty);
        assert_eq!(direct.reward(&state), 0.0);
    }
}
