//! BatchEvaluator - multi-seed strategy comparison
//!
//! Runs episodes with seeds `0..runs` and aggregates win rate and mean
//! duration. Episodes share nothing but the seed assignment, so the parallel
//! path yields exactly the sequential report.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{DefenderStrategy, SwarmConfig};
use crate::episode::{EpisodeResult, EpisodeRunner, Outcome};
use crate::error::ConfigError;

/// Aggregate over one strategy's batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub strategy: DefenderStrategy,
    pub runs: usize,
    pub wins: usize,
    pub losses: usize,
    pub timeouts: usize,
    /// wins / runs
    pub win_rate: f64,
    /// Mean step count over all runs, whatever the outcome
    pub mean_steps: f64,
    /// Population variance of the step count
    pub step_variance: f64,
}

impl EvaluationReport {
    pub fn from_results(strategy: DefenderStrategy, results: &[EpisodeResult]) -> Self {
        let runs = results.len();
        let count = |o: Outcome| results.iter().filter(|r| r.outcome == o).count();
        let wins = count(Outcome::Win);
        let losses = count(Outcome::Loss);
        let timeouts = count(Outcome::Timeout);

        if runs == 0 {
            return Self {
                strategy,
                runs,
                wins,
                losses,
                timeouts,
                win_rate: 0.0,
                mean_steps: 0.0,
                step_variance: 0.0,
            };
        }

        let n = runs as f64;
        let mean_steps = results.iter().map(|r| r.steps as f64).sum::<f64>() / n;
        let step_variance =
            results.iter().map(|r| (r.steps as f64 - mean_steps).powi(2)).sum::<f64>() / n;

        Self {
            strategy,
            runs,
            wins,
            losses,
            timeouts,
            win_rate: wins as f64 / n,
            mean_steps,
            step_variance,
        }
    }

    /// `(win_rate, mean_steps)`
    pub fn as_tuple(&self) -> (f64, f64) {
        (self.win_rate, self.mean_steps)
    }
}

/// Both strategies evaluated over the same seeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub centroid: EvaluationReport,
    pub leader: EvaluationReport,
}

impl StrategyComparison {
    /// Strategy with the higher win rate; ties go to the shorter mean episode.
    pub fn better(&self) -> DefenderStrategy {
        let (c, l) = (&self.centroid, &self.leader);
        if l.win_rate > c.win_rate || (l.win_rate == c.win_rate && l.mean_steps < c.mean_steps) {
            DefenderStrategy::Leader
        } else {
            DefenderStrategy::Centroid
        }
    }

    pub fn reports(&self) -> [&EvaluationReport; 2] {
        [&self.centroid, &self.leader]
    }
}

#[derive(Debug, Clone)]
pub struct BatchEvaluator {
    /// Base parameters; the strategy field is overridden per batch
    config: SwarmConfig,
    parallel: bool,
}

impl Default for BatchEvaluator {
    fn default() -> Self {
        Self { config: SwarmConfig::default(), parallel: false }
    }
}

impl BatchEvaluator {
    pub fn new(config: SwarmConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, parallel: false })
    }

    /// Spread episodes across the rayon thread pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Per-episode results for seeds `0..runs`, in seed order.
    pub fn run_all(&self, strategy: DefenderStrategy, runs: usize) -> Vec<EpisodeResult> {
        let runner = self.runner(strategy);
        if self.parallel {
            (0..runs).into_par_iter().map(|seed| runner.run(seed as u64)).collect()
        } else {
            (0..runs).map(|seed| runner.run(seed as u64)).collect()
        }
    }

    pub fn evaluate(&self, strategy: DefenderStrategy, runs: usize) -> EvaluationReport {
        info!(%strategy, runs, parallel = self.parallel, "evaluating");
        let results = self.run_all(strategy, runs);
        let report = EvaluationReport::from_results(strategy, &results);
        info!(
            %strategy,
            win_rate = report.win_rate,
            mean_steps = report.mean_steps,
            "evaluation finished"
        );
        report
    }

    pub fn compare(&self, runs: usize) -> StrategyComparison {
        StrategyComparison {
            centroid: self.evaluate(DefenderStrategy::Centroid, runs),
            leader: self.evaluate(DefenderStrategy::Leader, runs),
        }
    }

    fn runner(&self, strategy: DefenderStrategy) -> EpisodeRunner {
        // Only the strategy changes, and it is not part of validation.
        EpisodeRunner::for_config_unchecked(self.config.clone().with_strategy(strategy))
    }
}

/// `(win_rate, mean_steps)` for `runs` default-parameter episodes.
pub fn evaluate(strategy: DefenderStrategy, runs: usize) -> (f64, f64) {
    BatchEvaluator::default().evaluate(strategy, runs).as_tuple()
}
