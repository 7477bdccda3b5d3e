//! EpisodeRunner - seeded single-episode executor
//!
//! Builds one environment from a seed, steps it until a terminal predicate
//! holds or the step budget runs out, and reports the outcome. Win is checked
//! before loss after every step.

use std::fmt;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{DefenderStrategy, SwarmConfig};
use crate::environment::SwarmEnv;
use crate::error::ConfigError;
use crate::snapshot::EnvSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Every attacker was removed
    Win,
    /// An attacker reached the protected point
    Loss,
    /// Step budget exhausted
    Timeout,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Win => "WIN",
            Outcome::Loss => "LOSS",
            Outcome::Timeout => "TIMEOUT",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeResult {
    pub seed: u64,
    pub strategy: DefenderStrategy,
    pub outcome: Outcome,
    /// Zero-based index of the deciding step, or the step budget on timeout
    pub steps: u64,
}

/// Runs episodes for one fixed configuration.
#[derive(Debug, Clone)]
pub struct EpisodeRunner {
    config: SwarmConfig,
}

impl EpisodeRunner {
    pub fn new(config: SwarmConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Default parameters with the given defender strategy.
    pub fn for_strategy(strategy: DefenderStrategy) -> Self {
        Self { config: SwarmConfig::default().with_strategy(strategy) }
    }

    pub(crate) fn for_config_unchecked(config: SwarmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    pub fn strategy(&self) -> DefenderStrategy {
        self.config.strategy
    }

    /// The environment an episode with `seed` starts from.
    pub fn build_env(&self, seed: u64) -> SwarmEnv {
        SwarmEnv::spawn(self.config.clone(), ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn run(&self, seed: u64) -> EpisodeResult {
        self.drive(seed, |_| {})
    }

    /// Like [`Self::run`], handing a snapshot to `observer` after every step.
    pub fn run_with_observer<F>(&self, seed: u64, mut observer: F) -> EpisodeResult
    where
        F: FnMut(&EnvSnapshot),
    {
        self.drive(seed, |env| observer(&env.snapshot()))
    }

    fn drive<F>(&self, seed: u64, mut on_step: F) -> EpisodeResult
    where
        F: FnMut(&SwarmEnv),
    {
        let mut env = self.build_env(seed);
        let max_steps = self.config.max_steps;

        let mut outcome = Outcome::Timeout;
        let mut steps = max_steps;

        for t in 0..max_steps {
            env.step();
            on_step(&env);

            if env.defense_won() {
                outcome = Outcome::Win;
                steps = t;
                break;
            }
            if env.defense_lost() {
                outcome = Outcome::Loss;
                steps = t;
                break;
            }
        }

        debug!(seed, strategy = %self.config.strategy, %outcome, steps, "episode finished");
        EpisodeResult { seed, strategy: self.config.strategy, outcome, steps }
    }
}

/// One episode with default parameters.
pub fn run_episode(seed: u64, strategy: DefenderStrategy) -> EpisodeResult {
    EpisodeRunner::for_strategy(strategy).run(seed)
}
