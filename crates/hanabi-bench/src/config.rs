use hanabi_core::model::config::GameConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_LATENCY_BUDGET_MS: u64 = 1_200;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root benchmark configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchmarkConfig {
    pub run_id: String,
    #[serde(default)]
    pub game: GameSetup,
    pub episodes: EpisodeConfig,
    pub agents: Vec<AgentConfig>,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchmarkConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchmarkConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.game.validate()?;
        self.episodes.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.metrics.validate()?;
        self.logging.validate()?;
        validate_agents(&mut self.agents, self.game.players)?;
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
        }
    }
}

/// Table shape: player count and deck preset.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct GameSetup {
    pub players: usize,
    #[serde(default)]
    pub preset: GamePreset,
}

impl Default for GameSetup {
    fn default() -> Self {
        Self {
            players: 2,
            preset: GamePreset::Full,
        }
    }
}

impl GameSetup {
    pub fn game_config(&self) -> GameConfig {
        match self.preset {
            GamePreset::Full => GameConfig::full(self.players),
            GamePreset::Small => GameConfig::small(self.players),
            GamePreset::VerySmall => GameConfig::very_small(self.players),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.game_config()
            .validate()
            .map_err(|err| ValidationError::invalid("game", err))
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GamePreset {
    #[default]
    Full,
    Small,
    VerySmall,
}

/// Episode count and master seed.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EpisodeConfig {
    pub count: usize,
    pub seed: Option<u64>,
}

impl EpisodeConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(ValidationError::invalid(
                "episodes.count",
                "number of episodes must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// One seat at the table, in seat order.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub name: String,
    pub kind: AgentKind,
    #[serde(default)]
    pub params: serde_yaml::Value,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Rules,
    Mcts,
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::invalid(label, "path must not be empty"));
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::invalid(label, "resolved path is invalid"));
            }
        }
        Ok(())
    }
}

/// Metrics configuration block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MetricsConfig {
    #[serde(default = "default_latency_budget_ms")]
    pub latency_budget_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            latency_budget_ms: DEFAULT_LATENCY_BUDGET_MS,
        }
    }
}

impl MetricsConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.latency_budget_ms == 0 {
            return Err(ValidationError::invalid(
                "metrics.latency_budget_ms",
                "latency budget must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn default_latency_budget_ms() -> u64 {
    DEFAULT_LATENCY_BUDGET_MS
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    /// Per-target levels, e.g. `hanabi_bot::mcts: debug`.
    #[serde(default)]
    pub targets: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
            targets: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    fn validate(&mut self) -> Result<(), ValidationError> {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
        if self.level().is_none() {
            return Err(ValidationError::invalid(
                "logging.tracing_level",
                format!("unknown level '{}'", self.tracing_level),
            ));
        }
        for (target, level) in &self.targets {
            if target.trim().is_empty() || target.contains([',', '=']) {
                return Err(ValidationError::invalid(
                    "logging.targets",
                    format!("invalid target '{target}'"),
                ));
            }
            if parse_level(level).is_none() {
                return Err(ValidationError::invalid(
                    format!("logging.targets.{target}"),
                    format!("unknown level '{level}'"),
                ));
            }
        }
        Ok(())
    }

    pub fn level(&self) -> Option<Level> {
        parse_level(&self.tracing_level)
    }

    /// Configured per-target levels; entries that fail to parse are skipped.
    pub fn target_levels(&self) -> impl Iterator<Item = (&str, Level)> + '_ {
        self.targets
            .iter()
            .filter_map(|(target, level)| parse_level(level).map(|level| (target.as_str(), level)))
    }
}

fn parse_level(text: &str) -> Option<Level> {
    match text.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::invalid("run_id", "run_id must not be empty"));
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::invalid(
            "run_id",
            "run_id may only contain alphanumeric characters, '.', '_' or '-'",
        ));
    }

    Ok(())
}

fn validate_agents(agents: &mut [AgentConfig], players: usize) -> Result<(), ValidationError> {
    if agents.len() != players {
        return Err(ValidationError::invalid(
            "agents",
            format!("expected one agent per seat ({players}), found {}", agents.len()),
        ));
    }

    let mut seen = HashSet::new();
    for agent in agents.iter_mut() {
        if agent.name.trim().is_empty() {
            return Err(ValidationError::invalid("agents.name", "agent name must not be empty"));
        }

        if !agent.name.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
            return Err(ValidationError::invalid(
                format!("agents[{}].name", agent.name),
                "agent name contains invalid characters",
            ));
        }

        if !seen.insert(agent.name.clone()) {
            return Err(ValidationError::invalid(
                "agents",
                format!("agent name '{}' defined more than once", agent.name),
            ));
        }

        if agent.params.is_null() {
            agent.params = serde_yaml::Value::Mapping(Default::default());
        }
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
}

impl ResolvedOutputs {
    /// Directory that receives the summary and, when enabled, the telemetry log.
    pub fn report_dir(&self) -> PathBuf {
        self.summary_md
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

impl ValidationError {
    fn invalid(field: impl Into<String>, message: impl ToString) -> Self {
        ValidationError::InvalidField {
            field: field.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_YAML: &str = r#"
run_id: "selfplay_smoke"
game:
  players: 3
episodes:
  seed: 123
  count: 16
agents:
  - name: "vdb"
    kind: "rules"
    params:
      preset: "van_den_bergh"
  - name: "piers"
    kind: "rules"
    params:
      preset: "piers"
  - name: "search"
    kind: "mcts"
    params:
      max_rollouts: 200
outputs:
  jsonl: "bench/out/{run_id}/episodes.jsonl"
  summary_md: "bench/out/{run_id}/summary.md"
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        cfg.validate().expect("validate");

        assert_eq!(cfg.game.preset, GamePreset::Full);
        assert_eq!(cfg.game.game_config().hand_size, 5);
        assert_eq!(cfg.metrics.latency_budget_ms, DEFAULT_LATENCY_BUDGET_MS);
        assert!(cfg.logging.enable_structured);
        assert_eq!(cfg.logging.level(), Some(Level::DEBUG));

        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.jsonl,
            PathBuf::from("bench/out/selfplay_smoke/episodes.jsonl")
        );
        assert_eq!(outputs.report_dir(), PathBuf::from("bench/out/selfplay_smoke"));
    }

    #[test]
    fn rejects_wrong_seat_count() {
        let yaml = BASIC_YAML.replace("players: 3", "players: 4");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "agents"
        ));
    }

    #[test]
    fn rejects_duplicate_agents() {
        let yaml = BASIC_YAML.replace("name: \"piers\"", "name: \"vdb\"");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("duplicate agents should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "agents"
        ));
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("selfplay_smoke", "self play smoke");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("invalid run id");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "run_id"
        ));
    }

    #[test]
    fn rejects_unplayable_table() {
        let yaml = BASIC_YAML.replace("players: 3", "players: 7");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("seven players is not a game");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "game"
        ));
    }

    #[test]
    fn rejects_zero_episodes() {
        let yaml = BASIC_YAML.replace("count: 16", "count: 0");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("zero episodes");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "episodes.count"
        ));
    }

    #[test]
    fn reads_target_levels_and_rejects_unknown_ones() {
        let yaml = BASIC_YAML.replace(
            "  tracing_level: \"debug\"",
            "  tracing_level: \"debug\"\n  targets:\n    hanabi_bot::mcts: trace",
        );
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid targets");
        let targets: Vec<_> = cfg.logging.target_levels().collect();
        assert_eq!(targets, vec![("hanabi_bot::mcts", Level::TRACE)]);

        let yaml = yaml.replace("hanabi_bot::mcts: trace", "hanabi_bot::mcts: loud");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("unknown level");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "logging.targets.hanabi_bot::mcts"
        ));
    }
}
