use std::collections::HashMap;
use std::fs;
use std::path::Path;

use hanabi_core::model::moves::Move;
use hanabi_core::model::observation::Observation;
use hanabi_core::model::state::{EndOfGame, MoveOutcome};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::config::{AgentKind, BenchmarkConfig};
use crate::runner::EpisodeOutcome;

const CONFIDENCE_LEVEL: f64 = 0.95;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("agent '{0}' played but is missing from configuration")]
    UnknownAgent(String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Per-episode move counters. Discards are classified against the table as it was
/// before the card left the hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MoveStats {
    pub plays_scored: u32,
    pub plays_failed: u32,
    /// Discards of cards that could never score.
    pub discards_safe: u32,
    pub discards_useful: u32,
    /// Discards of the last copy of a card that could still score.
    pub discards_critical: u32,
    pub hints_color: u32,
    pub hints_rank: u32,
}

impl MoveStats {
    pub fn record(&mut self, before: &Observation, outcome: &MoveOutcome) {
        match outcome.applied {
            Move::Play { .. } if outcome.scored => self.plays_scored += 1,
            Move::Play { .. } => self.plays_failed += 1,
            Move::Discard { .. } => match outcome.card {
                Some(card) if before.is_useless(card) => self.discards_safe += 1,
                Some(card) if before.is_critical(card) => self.discards_critical += 1,
                _ => self.discards_useful += 1,
            },
            Move::RevealColor { .. } => self.hints_color += 1,
            Move::RevealRank { .. } => self.hints_rank += 1,
            Move::ReturnCard { .. } | Move::DealSpecific { .. } => {}
        }
    }

    pub fn merge(&mut self, other: &MoveStats) {
        self.plays_scored += other.plays_scored;
        self.plays_failed += other.plays_failed;
        self.discards_safe += other.discards_safe;
        self.discards_useful += other.discards_useful;
        self.discards_critical += other.discards_critical;
        self.hints_color += other.hints_color;
        self.hints_rank += other.hints_rank;
    }

    pub fn plays(&self) -> u32 {
        self.plays_scored + self.plays_failed
    }

    pub fn discards(&self) -> u32 {
        self.discards_safe + self.discards_useful + self.discards_critical
    }

    pub fn hints(&self) -> u32 {
        self.hints_color + self.hints_rank
    }
}

pub struct AnalyticsCollector {
    agents: HashMap<String, AgentAccumulator>,
    agent_order: Vec<String>,
    latency_budget_ms: u64,
    max_score: u32,
    scores: Vec<f64>,
    fireworks: Vec<f64>,
    perfect_games: usize,
    zero_games: usize,
    end_reasons: HashMap<EndOfGame, usize>,
    moves: MoveStats,
}

impl AnalyticsCollector {
    pub fn new(config: &BenchmarkConfig) -> Self {
        let mut agents = HashMap::new();
        let mut order = Vec::new();
        for (seat, agent) in config.agents.iter().enumerate() {
            agents.insert(
                agent.name.clone(),
                AgentAccumulator::new(agent.name.clone(), agent.kind.clone(), seat),
            );
            order.push(agent.name.clone());
        }

        Self {
            agents,
            agent_order: order,
            latency_budget_ms: config.metrics.latency_budget_ms,
            max_score: config.game.game_config().max_score(),
            scores: Vec::new(),
            fireworks: Vec::new(),
            perfect_games: 0,
            zero_games: 0,
            end_reasons: HashMap::new(),
            moves: MoveStats::default(),
        }
    }

    pub fn record_episode(&mut self, outcome: &EpisodeOutcome) -> Result<(), AnalyticsError> {
        for seat in &outcome.seat_results {
            let acc = self
                .agents
                .get_mut(&seat.agent_name)
                .ok_or_else(|| AnalyticsError::UnknownAgent(seat.agent_name.clone()))?;
            acc.total_latency_ms += seat.metrics.total_ms;
            acc.decisions += u64::from(seat.metrics.decisions);
        }

        self.scores.push(f64::from(outcome.score));
        self.fireworks.push(f64::from(outcome.fireworks_score));
        if outcome.score == self.max_score {
            self.perfect_games += 1;
        }
        if outcome.score == 0 {
            self.zero_games += 1;
        }
        *self.end_reasons.entry(outcome.end).or_insert(0) += 1;
        self.moves.merge(&outcome.moves);
        Ok(())
    }

    pub fn finalize(mut self) -> AnalyticsSummary {
        let agents = self
            .agent_order
            .iter()
            .filter_map(|name| self.agents.remove(name))
            .map(|acc| acc.into_report(self.latency_budget_ms))
            .collect();

        let mut end_reasons: Vec<(String, usize)> = self
            .end_reasons
            .into_iter()
            .map(|(end, count)| (format!("{end:?}"), count))
            .collect();
        end_reasons.sort();

        AnalyticsSummary {
            episodes: self.scores.len(),
            max_score: self.max_score,
            score: ScoreReport::from_samples(&self.scores),
            fireworks: ScoreReport::from_samples(&self.fireworks),
            perfect_games: self.perfect_games,
            zero_games: self.zero_games,
            end_reasons,
            agents,
            moves: self.moves,
            latency_budget_ms: self.latency_budget_ms,
        }
    }
}

struct AgentAccumulator {
    name: String,
    kind: AgentKind,
    seat: usize,
    total_latency_ms: f64,
    decisions: u64,
}

impl AgentAccumulator {
    fn new(name: String, kind: AgentKind, seat: usize) -> Self {
        Self {
            name,
            kind,
            seat,
            total_latency_ms: 0.0,
            decisions: 0,
        }
    }

    fn into_report(self, latency_budget_ms: u64) -> AgentReport {
        let avg_latency = if self.decisions == 0 {
            0.0
        } else {
            self.total_latency_ms / self.decisions as f64
        };

        AgentReport {
            name: self.name,
            kind: self.kind,
            seat: self.seat,
            decisions: self.decisions,
            average_ms_per_decision: avg_latency,
            over_budget: avg_latency > latency_budget_ms as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreReport {
    pub mean: f64,
    pub std_dev: f64,
    pub ci95: (f64, f64),
    pub min: f64,
    pub max: f64,
}

impl ScoreReport {
    pub fn from_samples(samples: &[f64]) -> Self {
        let (low, high) = confidence_interval(samples);
        let mean = mean(samples);
        Self {
            mean,
            std_dev: sample_variance(samples, mean).sqrt(),
            ci95: (low, high),
            min: samples.iter().copied().fold(f64::INFINITY, f64::min).min(mean),
            max: samples.iter().copied().fold(f64::NEG_INFINITY, f64::max).max(mean),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub episodes: usize,
    pub max_score: u32,
    pub score: ScoreReport,
    pub fireworks: ScoreReport,
    pub perfect_games: usize,
    pub zero_games: usize,
    pub end_reasons: Vec<(String, usize)>,
    pub agents: Vec<AgentReport>,
    pub moves: MoveStats,
    pub latency_budget_ms: u64,
}

impl AnalyticsSummary {
    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str("# Self-Play Summary\n\n");
        rows.push_str(&format!(
            "Episodes: {} (max score {})\n\n",
            self.episodes, self.max_score
        ));
        rows.push_str("| Metric | Mean | Std dev | 95% CI | Min | Max |\n");
        rows.push_str("|--------|------|---------|--------|-----|-----|\n");
        for (label, report) in [("Score", &self.score), ("Fireworks", &self.fireworks)] {
            rows.push_str(&format!(
                "| {label} | {mean:.3} | {std:.3} | [{low:.3}, {high:.3}] | {min:.0} | {max:.0} |\n",
                mean = report.mean,
                std = report.std_dev,
                low = report.ci95.0,
                high = report.ci95.1,
                min = report.min,
                max = report.max,
            ));
        }

        let rate = |count: usize| {
            if self.episodes == 0 {
                0.0
            } else {
                count as f64 * 100.0 / self.episodes as f64
            }
        };
        rows.push_str(&format!(
            "\nPerfect games: {:.1}%  \nZero-score games: {:.1}%\n",
            rate(self.perfect_games),
            rate(self.zero_games)
        ));
        if !self.end_reasons.is_empty() {
            rows.push_str("\n| Game end | Episodes |\n|----------|----------|\n");
            for (reason, count) in &self.end_reasons {
                rows.push_str(&format!("| {reason} | {count} |\n"));
            }
        }

        rows.push_str(&format!(
            "\nLatency budget: {} ms average per decision\n\n",
            self.latency_budget_ms
        ));
        rows.push_str("| Agent | Kind | Seat | Decisions | Avg ms/decision | Over Budget |\n");
        rows.push_str("|-------|------|------|-----------|-----------------|-------------|\n");
        for agent in &self.agents {
            rows.push_str(&format!(
                "| {name} | {kind:?} | {seat} | {decisions} | {latency:.2} | {over_budget} |\n",
                name = agent.name,
                kind = agent.kind,
                seat = agent.seat,
                decisions = agent.decisions,
                latency = agent.average_ms_per_decision,
                over_budget = if agent.over_budget { "Yes" } else { "No" },
            ));
        }

        let moves = &self.moves;
        let share = |part: u32, whole: u32| {
            if whole == 0 {
                0.0
            } else {
                f64::from(part) * 100.0 / f64::from(whole)
            }
        };
        rows.push_str("\n| Moves | Count | Share |\n|-------|-------|-------|\n");
        for (label, part, whole) in [
            ("Play (scored)", moves.plays_scored, moves.plays()),
            ("Play (failed)", moves.plays_failed, moves.plays()),
            ("Discard (safe)", moves.discards_safe, moves.discards()),
            ("Discard (useful)", moves.discards_useful, moves.discards()),
            ("Discard (critical)", moves.discards_critical, moves.discards()),
            ("Hint (color)", moves.hints_color, moves.hints()),
            ("Hint (rank)", moves.hints_rank, moves.hints()),
        ] {
            rows.push_str(&format!(
                "| {label} | {part} | {:.1}% |\n",
                share(part, whole)
            ));
        }

        fs::write(path.as_ref(), rows).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    pub name: String,
    pub kind: AgentKind,
    pub seat: usize,
    pub decisions: u64,
    pub average_ms_per_decision: f64,
    #[serde(skip)]
    pub over_budget: bool,
}

fn mean(points: &[f64]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    points.iter().sum::<f64>() / points.len() as f64
}

fn sample_variance(points: &[f64], mean: f64) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (points.len() as f64 - 1.0)
}

/// Two-sided normal-approximation interval for the mean.
fn confidence_interval(points: &[f64]) -> (f64, f64) {
    let mean = mean(points);
    if points.len() < 2 {
        return (mean, mean);
    }
    let z = Normal::new(0.0, 1.0)
        .map(|normal| normal.inverse_cdf(0.5 + CONFIDENCE_LEVEL / 2.0))
        .unwrap_or(1.96);
    let std_error = (sample_variance(points, mean) / points.len() as f64).sqrt();
    let margin = z * std_error;
    (mean - margin, mean + margin)
}
