use crate::rules::RulePreset;
use hanabi_core::belief::DEFAULT_MAX_ATTEMPTS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How iteration results are turned into a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Fireworks total, zero once all lives are gone.
    Direct,
    /// Fireworks total minus lost potential from destroyed critical cards.
    #[default]
    Regret,
}

impl FromStr for ScoringMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "score" => Ok(ScoringMode::Direct),
            "regret" => Ok(ScoringMode::Regret),
            other => Err(format!("unknown scoring mode '{other}'")),
        }
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScoringMode::Direct => "direct",
            ScoringMode::Regret => "regret",
        })
    }
}

/// Which children a node gets when it is expanded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpansionMode {
    #[default]
    Legal,
    /// Only the moves proposed by the preset's rules.
    Rules { preset: RulePreset },
}

impl FromStr for ExpansionMode {
    type Err = String;

    /// Accepts `legal` or a rule preset name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("legal") {
            return Ok(ExpansionMode::Legal);
        }
        s.parse::<RulePreset>()
            .map(|preset| ExpansionMode::Rules { preset })
    }
}

/// Search knobs for [`crate::search::MctsAgent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MctsConfig {
    pub exploration_weight: f64,
    pub max_rollouts: u32,
    pub max_time_ms: u64,
    pub max_simulation_steps: u32,
    pub min_visits: u32,
    pub scoring: ScoringMode,
    pub expansion: ExpansionMode,
    pub rollout_policy: RulePreset,
    pub determinization_attempts: usize,
    pub seed: Option<u64>,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            exploration_weight: 2.5,
            max_rollouts: 1000,
            max_time_ms: 1000,
            max_simulation_steps: 100,
            min_visits: 0,
            scoring: ScoringMode::Regret,
            expansion: ExpansionMode::Legal,
            rollout_policy: RulePreset::LegalRandom,
            determinization_attempts: DEFAULT_MAX_ATTEMPTS,
            seed: None,
        }
    }
}

impl MctsConfig {
    /// Defaults with `HANABI_MCTS_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `HANABI_MCTS_*` overrides read through `read`. Unparseable values are ignored.
    pub fn with_overrides<F>(mut self, mut read: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(value) = read("HANABI_MCTS_EXPLORATION_WEIGHT")
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite() && *value >= 0.0)
        {
            self.exploration_weight = value;
        }
        if let Some(value) = parse_env(&mut read, "HANABI_MCTS_MAX_ROLLOUTS") {
            self.max_rollouts = value;
        }
        if let Some(value) = parse_env(&mut read, "HANABI_MCTS_MAX_TIME_MS") {
            self.max_time_ms = value;
        }
        if let Some(value) = parse_env(&mut read, "HANABI_MCTS_MAX_SIMULATION_STEPS") {
            self.max_simulation_steps = value;
        }
        if let Some(value) = parse_env(&mut read, "HANABI_MCTS_MIN_VISITS") {
            self.min_visits = value;
        }
        if let Some(value) = parse_env(&mut read, "HANABI_MCTS_SCORING") {
            self.scoring = value;
        }
        if let Some(value) = parse_env(&mut read, "HANABI_MCTS_EXPANSION") {
            self.expansion = value;
        }
        if let Some(value) = parse_env(&mut read, "HANABI_MCTS_ROLLOUT_POLICY") {
            self.rollout_policy = value;
        }
        if let Some(value) = parse_env(&mut read, "HANABI_MCTS_SEED") {
            self.seed = Some(value);
        }
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

fn parse_env<T, F>(read: &mut F, key: &str) -> Option<T>
where
    T: FromStr,
    F: FnMut(&str) -> Option<String>,
{
    read(key).and_then(|raw| raw.trim().parse::<T>().ok())
}
