//! # Swarm Configuration
//!
//! Every tuning constant of the engine lives here, grouped the way the engine
//! reads them. All values are fixed for the lifetime of an episode.
//!
//! ## Usage
//!
//! ```rust
//! use swarm_core::config::{DefenderStrategy, SwarmConfig};
//!
//! let config = SwarmConfig::default();
//! let leader = SwarmConfig::default().with_strategy(DefenderStrategy::Leader);
//! assert!(leader.validate().is_ok());
//! ```
//!
//! ## Environment Variables
//!
//! - `SWARM_PROFILE`: Select preset (leader, aggressive, fragile_leader, default)
//!
//! ## Files
//!
//! `SwarmConfig::load` reads YAML (`.yaml`/`.yml`) or JSON (`.json`). Missing
//! keys fall back to the defaults, so a file only needs the overrides.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::agent::Point;
use crate::error::{ConfigError, Result, SwarmError};

/// How defenders coordinate their motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DefenderStrategy {
    /// Every defender closes on the group's mean position
    #[default]
    Centroid,
    /// One defender heads for the intruders, the rest follow it
    Leader,
}

impl DefenderStrategy {
    pub fn is_leader_based(&self) -> bool {
        matches!(self, DefenderStrategy::Leader)
    }

    pub fn all() -> [DefenderStrategy; 2] {
        [DefenderStrategy::Centroid, DefenderStrategy::Leader]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DefenderStrategy::Centroid => "centroid",
            DefenderStrategy::Leader => "leader",
        }
    }
}

impl std::fmt::Display for DefenderStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DefenderStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "centroid" | "leaderless" => Ok(DefenderStrategy::Centroid),
            "leader" | "leader_based" => Ok(DefenderStrategy::Leader),
            other => Err(format!("unknown defender strategy: {}", other)),
        }
    }
}

/// Pressure accumulator and phase thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureConfig {
    /// Pressure strictly above this engages attackers
    pub attack_threshold: f64,
    /// Pressure strictly below this returns attackers to stealth
    pub relax_threshold: f64,
    /// Multiplicative decay applied at the end of each step
    pub decay: f64,
    /// Added per detected attacker
    pub detection_gain: f64,
    /// Subtracted per undetected attacker
    pub evasion_loss: f64,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            attack_threshold: 18.0,
            relax_threshold: 6.0,
            decay: 0.95,
            detection_gain: 1.0,
            evasion_loss: 0.3,
        }
    }
}

/// Per-step travel distance for each behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub leader_speed: f64,
    pub follower_speed: f64,
    /// Centroid strategy: speed toward the defender mean
    pub cohesion_speed: f64,
    pub attacker_wander_speed: f64,
    pub attacker_charge_speed: f64,
    pub decoy_wander_speed: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            leader_speed: 0.6,
            follower_speed: 0.5,
            cohesion_speed: 0.4,
            attacker_wander_speed: 0.3,
            attacker_charge_speed: 0.9,
            decoy_wander_speed: 0.6,
        }
    }
}

/// Axis-aligned square spawn region `[min, max]²`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnBox {
    pub min: f64,
    pub max: f64,
}

impl SpawnBox {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Spawn box as written in a config file; missing bounds keep the default box's.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
struct SpawnBoxOverride {
    min: Option<f64>,
    max: Option<f64>,
}

impl SpawnBoxOverride {
    fn apply(self, base: SpawnBox) -> SpawnBox {
        SpawnBox::new(self.min.unwrap_or(base.min), self.max.unwrap_or(base.max))
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
struct SpawnConfigOverride {
    defenders: SpawnBoxOverride,
    intruders: SpawnBoxOverride,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SpawnConfigOverride")]
pub struct SpawnConfig {
    /// Defenders start clustered around the protected point
    pub defenders: SpawnBox,
    /// Attackers and decoys start clustered in one corner
    pub intruders: SpawnBox,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self { defenders: SpawnBox::new(40.0, 60.0), intruders: SpawnBox::new(0.0, 20.0) }
    }
}

impl From<SpawnConfigOverride> for SpawnConfig {
    fn from(o: SpawnConfigOverride) -> Self {
        let base = SpawnConfig::default();
        Self {
            defenders: o.defenders.apply(base.defenders),
            intruders: o.intruders.apply(base.intruders),
        }
    }
}

/// Complete episode configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Side length of the square arena
    pub world: f64,
    pub n_defenders: usize,
    pub n_attackers: usize,
    pub n_decoys: usize,
    pub strategy: DefenderStrategy,
    pub detection_radius: f64,
    /// Distance to the protected point at which an attacker breaks through
    pub attack_success_radius: f64,
    pub pressure: PressureConfig,
    pub attacker_kill_prob: f64,
    pub leader_kill_prob: f64,
    pub max_steps: u64,
    pub motion: MotionConfig,
    pub spawn: SpawnConfig,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            world: 100.0,
            n_defenders: 12,
            n_attackers: 8,
            n_decoys: 3,
            strategy: DefenderStrategy::Centroid,
            detection_radius: 5.0,
            attack_success_radius: 4.0,
            pressure: PressureConfig::default(),
            attacker_kill_prob: 0.06,
            leader_kill_prob: 0.002,
            max_steps: 600,
            motion: MotionConfig::default(),
            spawn: SpawnConfig::default(),
        }
    }
}

impl SwarmConfig {
    /// Default parameters with the leader strategy
    pub fn leader_based() -> Self {
        Self::default().with_strategy(DefenderStrategy::Leader)
    }

    /// Wider sensing and deadlier defenders
    pub fn aggressive() -> Self {
        Self { detection_radius: 8.0, attacker_kill_prob: 0.12, ..Self::default() }
    }

    /// Leader strategy with a leader that falls ten times as often
    pub fn fragile_leader() -> Self {
        Self { leader_kill_prob: 0.02, ..Self::leader_based() }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "default" | "centroid" => Some(Self::default()),
            "leader" => Some(Self::leader_based()),
            "aggressive" => Some(Self::aggressive()),
            "fragile_leader" => Some(Self::fragile_leader()),
            _ => None,
        }
    }

    /// Load from environment variable SWARM_PROFILE or use default
    pub fn from_env_or_default() -> Self {
        env::var("SWARM_PROFILE")
            .ok()
            .and_then(|name| Self::preset(&name))
            .unwrap_or_default()
    }

    pub fn with_strategy(mut self, strategy: DefenderStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Fixed protected point at the arena centre
    pub fn protected_point(&self) -> Point {
        Point::new(self.world / 2.0, self.world / 2.0)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML or JSON file, picked by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&std::fs::read_to_string(path)?),
            "json" => Self::from_json_str(&std::fs::read_to_string(path)?),
            _ => Err(SwarmError::UnsupportedFormat { path: path.display().to_string() }),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check every field an environment relies on.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(self.world.is_finite() && self.world > 0.0) {
            return Err(ConfigError::InvalidWorld(self.world));
        }
        if self.n_defenders == 0 {
            return Err(ConfigError::NoDefenders);
        }
        if self.max_steps == 0 {
            return Err(ConfigError::ZeroStepBudget);
        }

        for (field, value) in [
            ("attacker_kill_prob", self.attacker_kill_prob),
            ("leader_kill_prob", self.leader_kill_prob),
            ("pressure.decay", self.pressure.decay),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { field, value });
            }
        }

        let m = &self.motion;
        let p = &self.pressure;
        for (field, value) in [
            ("detection_radius", self.detection_radius),
            ("attack_success_radius", self.attack_success_radius),
            ("pressure.attack_threshold", p.attack_threshold),
            ("pressure.relax_threshold", p.relax_threshold),
            ("pressure.detection_gain", p.detection_gain),
            ("pressure.evasion_loss", p.evasion_loss),
            ("motion.leader_speed", m.leader_speed),
            ("motion.follower_speed", m.follower_speed),
            ("motion.cohesion_speed", m.cohesion_speed),
            ("motion.attacker_wander_speed", m.attacker_wander_speed),
            ("motion.attacker_charge_speed", m.attacker_charge_speed),
            ("motion.decoy_wander_speed", m.decoy_wander_speed),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Negative { field, value });
            }
        }

        if p.relax_threshold > p.attack_threshold {
            return Err(ConfigError::InvertedThresholds {
                relax: p.relax_threshold,
                attack: p.attack_threshold,
            });
        }

        for (field, bounds) in [
            ("spawn.defenders", self.spawn.defenders),
            ("spawn.intruders", self.spawn.intruders),
        ] {
            let fits = bounds.min.is_finite()
                && bounds.max.is_finite()
                && 0.0 <= bounds.min
                && bounds.min <= bounds.max
                && bounds.max <= self.world;
            if !fits {
                return Err(ConfigError::SpawnOutOfBounds {
                    field,
                    min: bounds.min,
                    max: bounds.max,
                    world: self.world,
                });
            }
        }

        Ok(())
    }
}
