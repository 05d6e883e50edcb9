use std::path::PathBuf;

use clap::Parser;

use hanabi_bench::config::{BenchmarkConfig, ResolvedOutputs};
use hanabi_bench::logging::init_logging;
use hanabi_bench::runner::EpisodeRunner;

/// Self-play benchmarking harness for Hanabi agents.
#[derive(Debug, Parser)]
#[command(
    name = "hanabi-bench",
    author,
    version,
    about = "Deterministic Hanabi self-play harness"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/selfplay.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of episodes to play.
    #[arg(long, value_name = "COUNT")]
    episodes: Option<usize>,

    /// Override the master RNG seed.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Exit after validating the configuration (no episodes are played).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchmarkConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(episodes) = cli.episodes {
        config.episodes.count = episodes;
    }

    if let Some(seed) = cli.seed {
        config.episodes.seed = Some(seed);
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let episodes = config.episodes.count;
    let players = config.game.players;

    println!(
        "Loaded configuration '{run_id}': {players} players, {episodes} episode{}",
        if episodes == 1 { "" } else { "s" }
    );

    let _logging_guard = init_logging(&config.logging, &outputs, &run_id)?;
    let runner = EpisodeRunner::new(config, outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: episodes skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Run complete for '{run_id}': {} episodes, mean score {:.2} → {} rows at {}",
        summary.episodes_played,
        summary.mean_score,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }

    Ok(())
}
