use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use hanabi_bot::policy::{MctsPolicy, Policy, PolicyContext, RulePolicy};
use hanabi_bot::rules::RulePreset;
use hanabi_bot::search::MctsConfig;
use hanabi_core::model::config::GameConfig;
use hanabi_core::model::snapshot::StateSnapshot;
use hanabi_core::model::state::{Actor, EndOfGame, GameState, MoveError};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::analytics::{AnalyticsCollector, AnalyticsError, MoveStats};
use crate::config::{AgentConfig, AgentKind, BenchmarkConfig, ResolvedOutputs};
use crate::logging::TELEMETRY_FILE;

/// Plays seeded self-play episodes and writes one JSONL row per episode.
pub struct EpisodeRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    game: GameConfig,
    agents: Vec<AgentBlueprint>,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub episodes_played: usize,
    pub rows_written: usize,
    pub mean_score: f64,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub telemetry_path: Option<PathBuf>,
}

impl EpisodeRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let game = config.game.game_config();
        let agents = AgentBlueprint::from_configs(&config.agents)?;
        if agents.len() != game.players {
            return Err(RunnerError::SeatCount {
                expected: game.players,
                found: agents.len(),
            });
        }

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            game,
            agents,
        })
    }

    /// Execute every episode, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.episodes.seed.unwrap_or(0));
        let mut rows_written = 0usize;
        let mut analytics = AnalyticsCollector::new(&self.config);

        for episode_index in 0..self.config.episodes.count {
            let seed = rng.next_u64();
            let outcome = self.play_episode(episode_index, seed)?;
            analytics.record_episode(&outcome)?;
            write_episode_row(&mut writer, &self.config.run_id, &outcome)?;
            rows_written += 1;
        }

        writer.flush()?;

        let summary = analytics.finalize();
        summary.write_markdown(&self.outputs.summary_md)?;

        let telemetry_path = self
            .logging_enabled
            .then(|| self.outputs.report_dir().join(TELEMETRY_FILE));

        Ok(RunSummary {
            episodes_played: self.config.episodes.count,
            rows_written,
            mean_score: summary.score.mean,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            telemetry_path,
        })
    }

    /// Plays one full game from `seed`. The same seed always deals the same cards.
    pub fn play_episode(
        &self,
        episode_index: usize,
        seed: u64,
    ) -> Result<EpisodeOutcome, RunnerError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut state = GameState::new(self.game, &mut rng)
            .map_err(|err| self.engine_failure(episode_index, None, err))?;
        let mut seats: Vec<SeatState> = self
            .agents
            .iter()
            .enumerate()
            .map(|(seat, agent)| SeatState::new(seat, agent, seed))
            .collect();
        let mut moves = MoveStats::default();

        loop {
            let seat = match state.cur_player() {
                Actor::Terminal => break,
                Actor::Chance => {
                    state
                        .deal_random_card(&mut rng)
                        .map_err(|err| self.engine_failure(episode_index, Some(&state), err))?;
                    continue;
                }
                Actor::Player(seat) => seat,
            };

            let observation = state.observation(seat);
            let seat_state = &mut seats[seat];
            let ctx = PolicyContext::new(seat, &state, &observation);
            let start = Instant::now();
            let choice = seat_state.policy.choose(&ctx, &mut rng);
            let elapsed_ms = seat_state.metrics.record(start.elapsed());
            let mv = choice.ok_or_else(|| {
                RunnerError::game(format!(
                    "agent '{}' returned no move on its turn (episode {episode_index}, seat {seat})",
                    seat_state.agent_name
                ))
            })?;

            if self.logging_enabled && tracing::enabled!(Level::INFO) {
                event!(
                    target: "hanabi_bench::move",
                    Level::INFO,
                    run_id = %self.config.run_id,
                    episode_index = episode_index as u32,
                    turn = state.turns_taken(),
                    seat = seat as u32,
                    agent = %seat_state.agent_name,
                    mv = %mv,
                    elapsed_ms
                );
            }

            let outcome = state
                .apply_move(mv)
                .map_err(|err| self.engine_failure(episode_index, Some(&state), err))?;
            moves.record(&observation, &outcome);
        }

        let seat_results = seats
            .into_iter()
            .map(|seat| SeatResult {
                seat: seat.seat,
                agent_name: seat.agent_name,
                metrics: seat.metrics.finalize(),
            })
            .collect();

        Ok(EpisodeOutcome {
            episode_index,
            seed,
            score: state.score(),
            fireworks_score: state.fireworks_score(),
            life_tokens: state.life_tokens(),
            information_tokens: state.information_tokens(),
            turns: state.turns_taken(),
            end: state.end_of_game(),
            seat_results,
            moves,
        })
    }

    fn engine_failure(
        &self,
        episode_index: usize,
        state: Option<&GameState>,
        err: MoveError,
    ) -> RunnerError {
        let snapshot = state
            .map(|state| {
                StateSnapshot::to_json(state).unwrap_or_else(|e| format!("<snapshot failed: {e}>"))
            })
            .unwrap_or_default();
        event!(
            target: "hanabi_bench::run",
            Level::ERROR,
            run_id = %self.config.run_id,
            episode_index = episode_index as u32,
            error = %err,
            snapshot = %snapshot
        );
        RunnerError::Engine {
            episode_index,
            source: err,
        }
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_episode_row(
    writer: &mut BufWriter<File>,
    run_id: &str,
    outcome: &EpisodeOutcome,
) -> Result<(), RunnerError> {
    let row = EpisodeLogRow {
        run_id,
        episode_id: format!("E{:05}", outcome.episode_index),
        episode_index: outcome.episode_index,
        seed: outcome.seed,
        score: outcome.score,
        fireworks_score: outcome.fireworks_score,
        life_tokens: outcome.life_tokens,
        information_tokens: outcome.information_tokens,
        turns: outcome.turns,
        end: outcome.end,
        seats: outcome
            .seat_results
            .iter()
            .map(|seat| SeatRow {
                seat: seat.seat,
                agent: &seat.agent_name,
                decisions: seat.metrics.decisions,
                speed_ms_decision: seat.metrics.avg_ms_per_decision,
            })
            .collect(),
        moves: outcome.moves,
    };

    serde_json::to_writer(&mut *writer, &row)?;
    writer.write_all(b"\n")?;
    Ok(())
}

struct SeatState {
    seat: usize,
    agent_name: String,
    policy: Box<dyn Policy>,
    metrics: DecisionMetrics,
}

impl SeatState {
    fn new(seat: usize, agent: &AgentBlueprint, episode_seed: u64) -> Self {
        Self {
            seat,
            agent_name: agent.name.clone(),
            policy: agent.spawn_policy(seat, episode_seed),
            metrics: DecisionMetrics::default(),
        }
    }
}

pub struct EpisodeOutcome {
    pub episode_index: usize,
    pub seed: u64,
    pub score: u32,
    pub fireworks_score: u32,
    pub life_tokens: u8,
    pub information_tokens: u8,
    pub turns: u32,
    pub end: EndOfGame,
    pub seat_results: Vec<SeatResult>,
    pub moves: MoveStats,
}

pub struct SeatResult {
    pub seat: usize,
    pub agent_name: String,
    pub metrics: DecisionSummary,
}

#[derive(Default)]
struct DecisionMetrics {
    total: Duration,
    decisions: u32,
}

impl DecisionMetrics {
    fn record(&mut self, duration: Duration) -> f64 {
        self.total += duration;
        self.decisions += 1;
        duration.as_secs_f64() * 1000.0
    }

    fn finalize(self) -> DecisionSummary {
        let avg_ms = if self.decisions == 0 {
            0.0
        } else {
            self.total.as_secs_f64() * 1000.0 / f64::from(self.decisions)
        };

        DecisionSummary {
            decisions: self.decisions,
            avg_ms_per_decision: avg_ms,
            total_ms: self.total.as_secs_f64() * 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DecisionSummary {
    pub decisions: u32,
    pub avg_ms_per_decision: f64,
    pub total_ms: f64,
}

#[derive(Serialize)]
struct EpisodeLogRow<'a> {
    run_id: &'a str,
    episode_id: String,
    episode_index: usize,
    seed: u64,
    score: u32,
    fireworks_score: u32,
    life_tokens: u8,
    information_tokens: u8,
    turns: u32,
    end: EndOfGame,
    seats: Vec<SeatRow<'a>>,
    moves: MoveStats,
}

#[derive(Serialize)]
struct SeatRow<'a> {
    seat: usize,
    agent: &'a str,
    decisions: u32,
    speed_ms_decision: f64,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{0}")]
    Agent(#[from] AgentError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("episode {episode_index}: engine rejected a move: {source}")]
    Engine {
        episode_index: usize,
        #[source]
        source: MoveError,
    },
    #[error("game execution failed: {message}")]
    Game { message: String },
    #[error("configuration requires {expected} agents but found {found}")]
    SeatCount { expected: usize, found: usize },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}

impl RunnerError {
    fn game(message: String) -> Self {
        RunnerError::Game { message }
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid rules parameter for agent '{name}': {message}")]
    InvalidRulesParam { name: String, message: String },
    #[error("invalid mcts parameter for agent '{name}': {message}")]
    InvalidMctsParam { name: String, message: String },
}

struct AgentBlueprint {
    name: String,
    implementation: AgentImplementation,
}

enum AgentImplementation {
    Rules(RuleOptions),
    Mcts(MctsConfig),
}

impl AgentBlueprint {
    fn from_configs(configs: &[AgentConfig]) -> Result<Vec<Self>, AgentError> {
        configs.iter().map(Self::from_config).collect()
    }

    fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        let implementation = match config.kind {
            AgentKind::Rules => {
                AgentImplementation::Rules(RuleOptions::from_params(&config.name, &config.params)?)
            }
            AgentKind::Mcts => {
                AgentImplementation::Mcts(mcts_params(&config.name, &config.params)?)
            }
        };

        Ok(Self {
            name: config.name.clone(),
            implementation,
        })
    }

    /// Fresh policy for one seat of one episode. Unseeded search agents are seeded from
    /// the episode so whole runs replay exactly.
    fn spawn_policy(&self, seat: usize, episode_seed: u64) -> Box<dyn Policy> {
        match &self.implementation {
            AgentImplementation::Rules(opts) => {
                Box::new(RulePolicy::new(self.name.clone(), opts.preset.rules()))
            }
            AgentImplementation::Mcts(config) => {
                let mut config = config.clone();
                if config.seed.is_none() {
                    config.seed = Some(episode_seed.wrapping_add(seat as u64 + 1));
                }
                Box::new(MctsPolicy::named(self.name.clone(), config))
            }
        }
    }
}

struct RuleOptions {
    preset: RulePreset,
}

impl RuleOptions {
    fn from_params(name: &str, params: &serde_yaml::Value) -> Result<Self, AgentError> {
        if params.is_null() {
            return Ok(Self {
                preset: RulePreset::default(),
            });
        }

        let mapping = params
            .as_mapping()
            .ok_or_else(|| AgentError::InvalidRulesParam {
                name: name.to_string(),
                message: "expected mapping for rules params".to_string(),
            })?;

        let preset_value = mapping
            .iter()
            .find_map(|(key, value)| (key.as_str() == Some("preset")).then_some(value));

        let preset = match preset_value {
            Some(value) => {
                let text = value
                    .as_str()
                    .ok_or_else(|| AgentError::InvalidRulesParam {
                        name: name.to_string(),
                        message: "preset must be a string".to_string(),
                    })?;
                RulePreset::from_str(text).map_err(|err| AgentError::InvalidRulesParam {
                    name: name.to_string(),
                    message: err.to_string(),
                })?
            }
            None => RulePreset::default(),
        };

        Ok(Self { preset })
    }
}

/// Search knobs from the agent's params, then `HANABI_MCTS_*` overrides.
fn mcts_params(name: &str, params: &serde_yaml::Value) -> Result<MctsConfig, AgentError> {
    let config: MctsConfig = if params.is_null() {
        MctsConfig::default()
    } else {
        serde_yaml::from_value(params.clone()).map_err(|err| AgentError::InvalidMctsParam {
            name: name.to_string(),
            message: err.to_string(),
        })?
    };
    Ok(config.with_overrides(|key| std::env::var(key).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hanabi_bot::search::{ExpansionMode, ScoringMode};
    use std::iter::FromIterator;

    fn mapping(entries: &[(&str, &str)]) -> serde_yaml::Value {
        serde_yaml::Value::Mapping(serde_yaml::Mapping::from_iter(entries.iter().map(
            |(key, value)| {
                (
                    serde_yaml::Value::String((*key).into()),
                    serde_yaml::Value::String((*value).into()),
                )
            },
        )))
    }

    #[test]
    fn rule_params_default_to_van_den_bergh() {
        let params = serde_yaml::Value::Mapping(Default::default());
        let options = RuleOptions::from_params("bot", &params).unwrap();
        assert_eq!(options.preset, RulePreset::VanDenBergh);
    }

    #[test]
    fn rule_params_parse_preset() {
        let options =
            RuleOptions::from_params("bot", &mapping(&[("preset", "legal-random")])).unwrap();
        assert_eq!(options.preset, RulePreset::LegalRandom);
        assert!(RuleOptions::from_params("bot", &mapping(&[("preset", "nope")])).is_err());
    }

    #[test]
    fn mcts_params_fill_defaults() {
        let params: serde_yaml::Value = serde_yaml::from_str(
            "max_rollouts: 50\nscoring: direct\nexpansion:\n  kind: rules\n  preset: piers\n",
        )
        .unwrap();
        let config = mcts_params("search", &params).unwrap();
        assert_eq!(config.scoring, ScoringMode::Direct);
        assert_eq!(
            config.expansion,
            ExpansionMode::Rules {
                preset: RulePreset::Piers
            }
        );
        assert_eq!(
            config.exploration_weight,
            MctsConfig::default().exploration_weight
        );
    }

    #[test]
    fn mcts_params_reject_garbage() {
        let params: serde_yaml::Value = serde_yaml::from_str("max_rollouts: lots\n").unwrap();
        assert!(matches!(
            mcts_params("search", &params),
            Err(AgentError::InvalidMctsParam { .. })
        ));
    }
}
