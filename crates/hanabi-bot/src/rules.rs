//! Hand-written Hanabi heuristics used as rollout policies and to narrow tree expansion.

use hanabi_core::model::card::Card;
use hanabi_core::model::hand::Slot;
use hanabi_core::model::moves::Move;
use hanabi_core::model::observation::Observation;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const CERTAIN: f64 = 1.0 - 1e-9;

/// One heuristic. Evaluation yields a legal move for the acting observer or nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    /// Play the card most likely to be playable if that chance reaches `threshold`.
    PlayProbablySafe {
        threshold: f64,
        #[serde(default)]
        require_extra_lives: bool,
    },
    PlaySafeCard,
    /// Play a card whose color and rank were both hinted and which is playable.
    PlayIfCertain,
    DiscardProbablyUseless {
        threshold: f64,
    },
    DiscardOldestFirst,
    DiscardRandomly,
    /// Discard a card known to be useless.
    OsawaDiscard,
    TellAnyoneUsefulCard,
    TellAnyoneUselessCard,
    TellMostInformation,
    TellPlayableCardOuter,
    TellUnknown,
    TellRandomly,
    LegalRandom,
}

impl Rule {
    pub fn name(&self) -> &'static str {
        match self {
            Rule::PlayProbablySafe { .. } => "play_probably_safe",
            Rule::PlaySafeCard => "play_safe_card",
            Rule::PlayIfCertain => "play_if_certain",
            Rule::DiscardProbablyUseless { .. } => "discard_probably_useless",
            Rule::DiscardOldestFirst => "discard_oldest_first",
            Rule::DiscardRandomly => "discard_randomly",
            Rule::OsawaDiscard => "osawa_discard",
            Rule::TellAnyoneUsefulCard => "tell_anyone_useful_card",
            Rule::TellAnyoneUselessCard => "tell_anyone_useless_card",
            Rule::TellMostInformation => "tell_most_information",
            Rule::TellPlayableCardOuter => "tell_playable_card_outer",
            Rule::TellUnknown => "tell_unknown",
            Rule::TellRandomly => "tell_randomly",
            Rule::LegalRandom => "legal_random",
        }
    }

    pub fn evaluate<R: Rng + ?Sized>(&self, obs: &Observation, rng: &mut R) -> Option<Move> {
        if !obs.is_acting() || obs.legal_moves.is_empty() {
            return None;
        }
        let proposal = match *self {
            Rule::PlayProbablySafe {
                threshold,
                require_extra_lives,
            } => {
                if require_extra_lives && obs.life_tokens <= 1 {
                    None
                } else {
                    best_slot(obs, |slot| obs.playable_probability(slot))
                        .filter(|(_, p)| *p >= threshold)
                        .map(|(slot, _)| Move::Play { slot })
                }
            }
            Rule::PlaySafeCard => best_slot(obs, |slot| obs.playable_probability(slot))
                .filter(|(_, p)| *p >= CERTAIN)
                .map(|(slot, _)| Move::Play { slot }),
            Rule::PlayIfCertain => play_if_certain(obs),
            Rule::DiscardProbablyUseless { threshold } => {
                best_slot(obs, |slot| obs.useless_probability(slot))
                    .filter(|(_, p)| *p >= threshold)
                    .map(|(slot, _)| Move::Discard { slot })
            }
            Rule::DiscardOldestFirst => Some(Move::Discard { slot: 0 }),
            Rule::DiscardRandomly => {
                let len = obs.own_hand().len();
                (len > 0).then(|| Move::Discard {
                    slot: rng.gen_range(0..len),
                })
            }
            Rule::OsawaDiscard => (0..obs.own_hand().len())
                .find(|&slot| obs.useless_probability(slot) >= CERTAIN)
                .map(|slot| Move::Discard { slot }),
            Rule::TellAnyoneUsefulCard => {
                tell_first(obs, |card| obs.is_playable(card), HintOrder::RankFirst)
            }
            Rule::TellAnyoneUselessCard => {
                tell_first(obs, |card| obs.is_useless(card), HintOrder::ColorFirst)
            }
            Rule::TellPlayableCardOuter => {
                tell_first(obs, |card| obs.is_playable(card), HintOrder::ColorFirst)
            }
            Rule::TellUnknown => tell_first(obs, |_| true, HintOrder::ColorFirst),
            Rule::TellMostInformation => tell_most_information(obs),
            Rule::TellRandomly => {
                let hints: Vec<Move> = obs.legal_moves.iter().copied().filter(Move::is_hint).collect();
                hints.choose(rng).copied()
            }
            Rule::LegalRandom => obs.legal_moves.choose(rng).copied(),
        };
        proposal.filter(|mv| obs.legal_moves.contains(mv))
    }
}

/// Highest-scoring own slot, earliest on ties.
fn best_slot(obs: &Observation, score: impl Fn(usize) -> f64) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for slot in 0..obs.own_hand().len() {
        let value = score(slot);
        if best.is_none_or(|(_, current)| value > current) {
            best = Some((slot, value));
        }
    }
    best
}

fn play_if_certain(obs: &Observation) -> Option<Move> {
    obs.own_hand()
        .iter()
        .position(|slot| match (slot.knowledge.color(), slot.knowledge.rank()) {
            (Some(color), Some(rank)) => obs.is_playable(Card::new(color, rank)),
            _ => false,
        })
        .map(|slot| Move::Play { slot })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HintOrder {
    ColorFirst,
    RankFirst,
}

/// Hints the first card in turn order that matches `wanted` and is missing information.
fn tell_first(
    obs: &Observation,
    wanted: impl Fn(Card) -> bool,
    order: HintOrder,
) -> Option<Move> {
    for target in obs.other_seats() {
        for slot in obs.hand(target) {
            let Some(card) = slot.card else { continue };
            if !wanted(card) {
                continue;
            }
            let color = (!slot.knowledge.color_hinted()).then_some(Move::RevealColor {
                target,
                color: card.color,
            });
            let rank = (!slot.knowledge.rank_hinted()).then_some(Move::RevealRank {
                target,
                rank: card.rank,
            });
            let hint = match order {
                HintOrder::ColorFirst => color.or(rank),
                HintOrder::RankFirst => rank.or(color),
            };
            if hint.is_some() {
                return hint;
            }
        }
    }
    None
}

/// The legal hint that removes the most possibilities across the target's hand.
fn tell_most_information(obs: &Observation) -> Option<Move> {
    let mut best: Option<(Move, usize)> = None;
    for &mv in obs.legal_moves.iter().filter(|mv| mv.is_hint()) {
        let gain = match mv {
            Move::RevealColor { target, color } => information_gain(obs.hand(target), |slot| {
                let touched = slot.card.is_some_and(|c| c.color == color);
                if touched {
                    !slot.knowledge.color_hinted()
                } else {
                    slot.knowledge.color_plausible(color)
                }
            }),
            Move::RevealRank { target, rank } => information_gain(obs.hand(target), |slot| {
                let touched = slot.card.is_some_and(|c| c.rank == rank);
                if touched {
                    !slot.knowledge.rank_hinted()
                } else {
                    slot.knowledge.rank_plausible(rank)
                }
            }),
            _ => 0,
        };
        if gain > 0 && best.is_none_or(|(_, current)| gain > current) {
            best = Some((mv, gain));
        }
    }
    best.map(|(mv, _)| mv)
}

fn information_gain(hand: &[Slot], informative: impl Fn(&Slot) -> bool) -> usize {
    hand.iter().filter(|slot| informative(slot)).count()
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::PlayProbablySafe {
                threshold,
                require_extra_lives,
            } => write!(
                f,
                "{}({threshold:.2}{})",
                self.name(),
                if *require_extra_lives { ", lives" } else { "" }
            ),
            Rule::DiscardProbablyUseless { threshold } => {
                write!(f, "{}({threshold:.2})", self.name())
            }
            _ => f.write_str(self.name()),
        }
    }
}

/// Named, ordered rule lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulePreset {
    #[default]
    VanDenBergh,
    Flawed,
    Outer,
    Piers,
    LegalRandom,
}

impl RulePreset {
    pub const ALL: [RulePreset; 5] = [
        RulePreset::VanDenBergh,
        RulePreset::Flawed,
        RulePreset::Outer,
        RulePreset::Piers,
        RulePreset::LegalRandom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RulePreset::VanDenBergh => "van_den_bergh",
            RulePreset::Flawed => "flawed",
            RulePreset::Outer => "outer",
            RulePreset::Piers => "piers",
            RulePreset::LegalRandom => "legal_random",
        }
    }

    pub fn rules(self) -> Vec<Rule> {
        match self {
            RulePreset::VanDenBergh => vec![
                Rule::PlayProbablySafe {
                    threshold: 0.6,
                    require_extra_lives: true,
                },
                Rule::PlaySafeCard,
                Rule::DiscardProbablyUseless { threshold: 0.99 },
                Rule::TellAnyoneUsefulCard,
                Rule::TellAnyoneUselessCard,
                Rule::TellMostInformation,
                Rule::DiscardProbablyUseless { threshold: 0.0 },
            ],
            RulePreset::Flawed => vec![
                Rule::PlaySafeCard,
                Rule::PlayProbablySafe {
                    threshold: 0.25,
                    require_extra_lives: false,
                },
                Rule::TellRandomly,
                Rule::OsawaDiscard,
                Rule::DiscardOldestFirst,
                Rule::DiscardRandomly,
            ],
            RulePreset::Outer => vec![
                Rule::PlaySafeCard,
                Rule::OsawaDiscard,
                Rule::TellPlayableCardOuter,
                Rule::TellUnknown,
                Rule::DiscardRandomly,
            ],
            RulePreset::Piers => vec![
                Rule::PlayIfCertain,
                Rule::PlaySafeCard,
                Rule::PlayProbablySafe {
                    threshold: 0.6,
                    require_extra_lives: true,
                },
                Rule::TellAnyoneUsefulCard,
                Rule::TellAnyoneUselessCard,
                Rule::OsawaDiscard,
                Rule::DiscardOldestFirst,
                Rule::TellRandomly,
                Rule::DiscardRandomly,
            ],
            RulePreset::LegalRandom => vec![Rule::LegalRandom],
        }
    }
}

impl fmt::Display for RulePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RulePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        RulePreset::ALL
            .into_iter()
            .find(|preset| preset.as_str() == normalized)
            .ok_or_else(|| format!("unknown rule preset '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::{Rule, RulePreset};
    use hanabi_core::model::card::Card;
    use hanabi_core::model::color::Color;
    use hanabi_core::model::config::GameConfig;
    use hanabi_core::model::moves::Move;
    use hanabi_core::model::rank::Rank;
    use hanabi_core::model::state::{GameState, Position};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn c(text: &str) -> Card {
        text.parse().expect("card literal")
    }

    fn state(own: [&str; 5], other: [&str; 5], fireworks: Vec<u8>, info: u8) -> GameState {
        let position = Position {
            hands: vec![
                own.iter().map(|s| c(s)).collect(),
                other.iter().map(|s| c(s)).collect(),
            ],
            fireworks,
            discard_pile: vec![],
            information_tokens: info,
            life_tokens: 3,
            cur_player: 0,
        };
        GameState::from_position(GameConfig::full(2), &position).expect("position")
    }

    fn hint_seat_zero(state: &mut GameState, hints: &[Move]) {
        for &hint in hints {
            // seat 0 passes the turn with a throwaway hint to seat 1 when needed
            if state.next_to_act() == 0 {
                let filler = state
                    .legal_moves()
                    .into_iter()
                    .find(|mv| mv.is_hint())
                    .expect("a hint for seat 1");
                state.apply_move(filler).unwrap();
            }
            state.apply_move(hint).unwrap();
        }
    }

    #[test]
    fn play_if_certain_needs_both_hints() {
        let mut state = state(
            ["R1", "Y3", "G3", "W4", "B4"],
            ["R2", "R3", "B1", "B2", "W1"],
            vec![],
            8,
        );
        let mut rng = StdRng::seed_from_u64(1);
        hint_seat_zero(
            &mut state,
            &[Move::RevealRank {
                target: 0,
                rank: Rank::One,
            }],
        );
        // After one full round seat 0 acts again; the rank alone is not enough.
        assert_eq!(Rule::PlayIfCertain.evaluate(&state.observation(0), &mut rng), None);
        hint_seat_zero(
            &mut state,
            &[Move::RevealColor {
                target: 0,
                color: Color::Red,
            }],
        );
        assert_eq!(
            Rule::PlayIfCertain.evaluate(&state.observation(0), &mut rng),
            Some(Move::Play { slot: 0 })
        );
    }

    #[test]
    fn play_safe_card_uses_copy_counts() {
        let mut state = state(
            ["R1", "Y3", "G3", "W4", "B4"],
            ["R2", "R3", "B1", "B2", "W1"],
            vec![],
            8,
        );
        hint_seat_zero(
            &mut state,
            &[Move::RevealRank {
                target: 0,
                rank: Rank::One,
            }],
        );
        let mut rng = StdRng::seed_from_u64(1);
        // Every one is playable on empty fireworks.
        assert_eq!(
            Rule::PlaySafeCard.evaluate(&state.observation(0), &mut rng),
            Some(Move::Play { slot: 0 })
        );
        assert_eq!(
            Rule::PlayProbablySafe {
                threshold: 0.6,
                require_extra_lives: true
            }
            .evaluate(&state.observation(0), &mut rng),
            Some(Move::Play { slot: 0 })
        );
    }

    #[test]
    fn discard_rules_respect_full_tokens() {
        let state = state(
            ["R1", "Y3", "G3", "W4", "B4"],
            ["R2", "R3", "B1", "B2", "W1"],
            vec![],
            8,
        );
        let mut rng = StdRng::seed_from_u64(1);
        let obs = state.observation(0);
        assert_eq!(Rule::DiscardOldestFirst.evaluate(&obs, &mut rng), None);
        assert_eq!(
            Rule::DiscardProbablyUseless { threshold: 0.0 }.evaluate(&obs, &mut rng),
            None
        );
    }

    #[test]
    fn tell_useful_card_prefers_rank() {
        let state = state(
            ["R1", "Y3", "G3", "W4", "B4"],
            ["R3", "R4", "B1", "B2", "W2"],
            vec![],
            8,
        );
        let mut rng = StdRng::seed_from_u64(1);
        let obs = state.observation(0);
        assert_eq!(
            Rule::TellAnyoneUsefulCard.evaluate(&obs, &mut rng),
            Some(Move::RevealRank {
                target: 1,
                rank: Rank::One
            })
        );
        assert_eq!(
            Rule::TellPlayableCardOuter.evaluate(&obs, &mut rng),
            Some(Move::RevealColor {
                target: 1,
                color: Color::Blue
            })
        );
    }

    #[test]
    fn tell_most_information_picks_widest_hint() {
        let state = state(
            ["R1", "Y3", "G3", "W4", "B4"],
            ["R3", "R4", "R1", "B2", "W2"],
            vec![],
            8,
        );
        let mut rng = StdRng::seed_from_u64(1);
        let best = Rule::TellMostInformation.evaluate(&state.observation(0), &mut rng);
        // Every fresh hint informs all five slots; the first such legal hint wins.
        assert!(matches!(best, Some(mv) if mv.is_hint()));
    }

    #[test]
    fn osawa_discards_known_dead_card() {
        let mut state = state(
            ["R1", "Y3", "G3", "W4", "B4"],
            ["R2", "R3", "B1", "B2", "W1"],
            vec![1, 0, 0, 0, 0],
            6,
        );
        hint_seat_zero(
            &mut state,
            &[
                Move::RevealColor {
                    target: 0,
                    color: Color::Red,
                },
                Move::RevealRank {
                    target: 0,
                    rank: Rank::One,
                },
            ],
        );
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            Rule::OsawaDiscard.evaluate(&state.observation(0), &mut rng),
            Some(Move::Discard { slot: 0 })
        );
    }

    #[test]
    fn rules_stay_silent_when_not_acting() {
        let state = state(
            ["R1", "Y3", "G3", "W4", "B4"],
            ["R2", "R3", "B1", "B2", "W1"],
            vec![],
            8,
        );
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(Rule::LegalRandom.evaluate(&state.observation(1), &mut rng), None);
    }

    #[test]
    fn presets_parse_and_serialize() {
        for preset in RulePreset::ALL {
            assert_eq!(preset.as_str().parse::<RulePreset>(), Ok(preset));
            assert!(!preset.rules().is_empty());
        }
        assert_eq!("Van-Den-Bergh".parse::<RulePreset>(), Ok(RulePreset::VanDenBergh));
        let json = serde_json::to_string(&Rule::DiscardProbablyUseless { threshold: 0.5 }).unwrap();
        assert_eq!(json, r#"{"rule":"discard_probably_useless","threshold":0.5}"#);
    }
}
