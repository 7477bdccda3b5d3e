//! # swarm_core - Deterministic Defensive Swarm Simulation Engine
//!
//! Defenders guard the centre of a square arena against attackers that try to
//! reach it, while decoys wander to confuse the defence. Each episode is driven
//! by a single seeded random stream, so the same seed always replays the same
//! episode.
//!
//! ## Features
//! - Phase/pressure state machine with hysteresis (stealth vs. engaged attackers)
//! - Two defender strategies: centroid cohesion and leader following
//! - Seeded episode runner and a (optionally parallel) batch evaluator
//! - Serializable per-step snapshots for renderers
//!
//! ```rust
//! use swarm_core::{BatchEvaluator, DefenderStrategy};
//!
//! let report = BatchEvaluator::default().evaluate(DefenderStrategy::Leader, 4);
//! assert_eq!(report.runs, 4);
//! ```

pub mod agent;
pub mod config;
pub mod environment;
pub mod episode;
pub mod error;
pub mod evaluator;
pub mod phase;
pub mod snapshot;

pub use agent::{Agent, Point, Role};
pub use config::{
    DefenderStrategy, MotionConfig, PressureConfig, SpawnBox, SpawnConfig, SwarmConfig,
};
pub use environment::{StepReport, SwarmEnv};
pub use episode::{run_episode, EpisodeResult, EpisodeRunner, Outcome};
pub use error::{ConfigError, Result, SwarmError};
pub use evaluator::{evaluate, BatchEvaluator, EvaluationReport, StrategyComparison};
pub use phase::{Phase, PhaseState};
pub use snapshot::EnvSnapshot;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
