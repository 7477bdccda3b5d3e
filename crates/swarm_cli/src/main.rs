//! Swarm CLI
//!
//! Batch strategy evaluation, single-episode traces and config inspection for
//! the swarm defense engine.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use swarm_core::{
    BatchEvaluator, DefenderStrategy, EpisodeRunner, EvaluationReport, SwarmConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "swarm_cli")]
#[command(about = "Evaluate defensive swarm strategies", long_about = None)]
struct Cli {
    /// YAML or JSON config file (defaults, or SWARM_PROFILE, when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Centroid,
    Leader,
}

impl From<StrategyArg> for DefenderStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Centroid => DefenderStrategy::Centroid,
            StrategyArg::Leader => DefenderStrategy::Leader,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate both strategies over the same seeds
    Compare {
        /// Episodes per strategy (seeds 0..runs)
        #[arg(long, default_value = "50")]
        runs: usize,

        /// Run episodes on all cores
        #[arg(long, default_value = "false")]
        parallel: bool,
    },

    /// Evaluate one strategy
    Evaluate {
        #[arg(long, value_enum)]
        strategy: StrategyArg,

        #[arg(long, default_value = "50")]
        runs: usize,

        #[arg(long, default_value = "false")]
        parallel: bool,

        /// Print the report as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Run a single episode
    Episode {
        #[arg(long, default_value = "0")]
        seed: u64,

        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Print one JSON snapshot per step
        #[arg(long, default_value = "false")]
        trace: bool,
    },

    /// Print the effective configuration as YAML
    Config {
        /// Preset name (default, leader, aggressive, fragile_leader)
        #[arg(long)]
        profile: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let base = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Compare { runs, parallel } => {
            let evaluator = BatchEvaluator::new(base)?.with_parallel(parallel);
            let comparison = evaluator.compare(runs);

            println!("Strategy comparison over {} seeds", runs);
            print_header();
            for report in comparison.reports() {
                print_row(report);
            }
            println!("\nBetter strategy: {}", comparison.better());
        }

        Commands::Evaluate { strategy, runs, parallel, json } => {
            let evaluator = BatchEvaluator::new(base)?.with_parallel(parallel);
            let report = evaluator.evaluate(strategy.into(), runs);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_header();
                print_row(&report);
            }
        }

        Commands::Episode { seed, strategy, trace } => {
            let config = match strategy {
                Some(s) => base.with_strategy(s.into()),
                None => base,
            };
            let runner = EpisodeRunner::new(config)?;

            let result = if trace {
                let mut write_err = None;
                let result = runner.run_with_observer(seed, |snap| {
                    if write_err.is_some() {
                        return;
                    }
                    match serde_json::to_string(snap) {
                        Ok(line) => println!("{}", line),
                        Err(e) => write_err = Some(e),
                    }
                });
                if let Some(e) = write_err {
                    return Err(e).context("failed to serialize snapshot");
                }
                result
            } else {
                runner.run(seed)
            };

            eprintln!(
                "seed {} ({}): {} at step {}",
                result.seed, result.strategy, result.outcome, result.steps
            );
        }

        Commands::Config { profile } => {
            let config = match profile {
                Some(name) => SwarmConfig::preset(&name)
                    .with_context(|| format!("unknown profile: {}", name))?,
                None => base,
            };
            print!("{}", config.to_yaml()?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SwarmConfig> {
    match path {
        Some(p) => SwarmConfig::load(p).map_err(|e| {
            let msg = if e.is_recoverable() {
                format!("invalid config in {} (edit the file and retry)", p.display())
            } else {
                format!("failed to load config from {}", p.display())
            };
            anyhow::Error::new(e).context(msg)
        }),
        None => Ok(SwarmConfig::from_env_or_default()),
    }
}

fn print_header() {
    println!(
        "{:<10} {:>6} {:>9} {:>11} {:>6} {:>6} {:>8}",
        "strategy", "runs", "win_rate", "mean_steps", "wins", "losses", "timeouts"
    );
}

fn print_row(report: &EvaluationReport) {
    println!(
        "{:<10} {:>6} {:>9.3} {:>11.1} {:>6} {:>6} {:>8}",
        report.strategy.as_str(),
        report.runs,
        report.win_rate,
        report.mean_steps,
        report.wins,
        report.losses,
        report.timeouts
    );
}
