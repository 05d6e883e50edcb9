//! Structured telemetry for benchmark runs.
//!
//! Every record lands as one JSON object per line in `telemetry.jsonl`, beside the
//! markdown summary. Search and belief targets are noisy at `debug`, so they get their
//! own defaults that configuration can override per target.

use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::{LoggingConfig, ResolvedOutputs};

pub const TELEMETRY_FILE: &str = "telemetry.jsonl";

/// Targets capped below the run level unless configuration names them.
const TARGET_DEFAULTS: &[(&str, Level)] = &[
    ("hanabi_bot::rules", Level::WARN),
    ("hanabi_core::belief", Level::INFO),
    ("hanabi_bot::mcts", Level::DEBUG),
];

/// Holds the writer thread open; records still queued are flushed on drop.
pub struct LoggingGuard {
    _worker: WorkerGuard,
    pub telemetry_path: PathBuf,
}

/// Filter directives for a run: the base level, capped target defaults, then the
/// configured per-target levels.
pub fn filter_directives(logging: &LoggingConfig) -> String {
    let base = logging.level().unwrap_or(Level::INFO);
    let mut directives = vec![base.as_str().to_ascii_lowercase()];
    for &(target, cap) in TARGET_DEFAULTS {
        if logging.targets.contains_key(target) {
            continue;
        }
        // `Level` orders TRACE highest, so `min` keeps the quieter of the two.
        let level = base.min(cap);
        directives.push(format!("{target}={}", level.as_str().to_ascii_lowercase()));
    }
    for (target, level) in logging.target_levels() {
        directives.push(format!("{target}={}", level.as_str().to_ascii_lowercase()));
    }
    directives.join(",")
}

/// Installs the JSON subscriber for a run. `RUST_LOG`, when set, replaces the
/// configured directives entirely.
pub fn init_logging(
    logging: &LoggingConfig,
    outputs: &ResolvedOutputs,
    run_id: &str,
) -> Result<Option<LoggingGuard>> {
    if !logging.enable_structured {
        return Ok(None);
    }

    let report_dir = outputs.report_dir();
    fs::create_dir_all(&report_dir)
        .with_context(|| format!("creating report directory {}", report_dir.display()))?;
    let telemetry_path = report_dir.join(TELEMETRY_FILE);
    let sink = File::create(&telemetry_path)
        .with_context(|| format!("opening {}", telemetry_path.display()))?;
    let (writer, worker) = NonBlockingBuilder::default().lossy(false).finish(sink);

    let directives = filter_directives(logging);
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&directives)
            .with_context(|| format!("parsing log directives '{directives}'"))?,
    };

    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(writer)
        .finish();

    // Only the first run in a process owns the global subscriber.
    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        tracing::info!(
            target: "hanabi_bench::run",
            run_id,
            directives = %directives,
            path = %telemetry_path.display(),
            "telemetry enabled"
        );
    }

    Ok(Some(LoggingGuard {
        _worker: worker,
        telemetry_path,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn logging(level: &str, targets: &[(&str, &str)]) -> LoggingConfig {
        LoggingConfig {
            enable_structured: true,
            tracing_level: level.to_string(),
            targets: targets
                .iter()
                .map(|(target, level)| (target.to_string(), level.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn target_defaults_never_raise_the_base_level() {
        let directives = filter_directives(&logging("info", &[]));
        assert_eq!(
            directives,
            "info,hanabi_bot::rules=warn,hanabi_core::belief=info,hanabi_bot::mcts=info"
        );

        let directives = filter_directives(&logging("trace", &[]));
        assert_eq!(
            directives,
            "trace,hanabi_bot::rules=warn,hanabi_core::belief=info,hanabi_bot::mcts=debug"
        );
    }

    #[test]
    fn configured_targets_replace_defaults() {
        let directives = filter_directives(&logging(
            "warn",
            &[("hanabi_bot::mcts", "trace"), ("hanabi_bench::move", "debug")],
        ));
        assert_eq!(
            directives,
            "warn,hanabi_bot::rules=warn,hanabi_core::belief=warn,\
             hanabi_bench::move=debug,hanabi_bot::mcts=trace"
        );
        EnvFilter::try_new(&directives).expect("directives parse");
    }

    #[test]
    fn disabled_logging_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outputs = ResolvedOutputs {
            jsonl: dir.path().join("run.jsonl"),
            summary_md: dir.path().join("summary.md"),
        };
        let mut config = logging("info", &[]);
        config.enable_structured = false;
        let guard = init_logging(&config, &outputs, "quiet").expect("init");
        assert!(guard.is_none());
        assert!(!dir.path().join(TELEMETRY_FILE).exists());
    }
}
