//! Read-only state snapshot for renderers and reporters
//!
//! A renderer polls this once per step to draw the scene, together with the
//! two termination predicates it carries.
//!
//! # Example
//! ```ignore
//! let mut env = SwarmEnv::from_seed(SwarmConfig::default(), 0)?;
//! env.step();
//! let snap = env.snapshot();
//! println!("{}", serde_json::to_string(&snap)?);
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, Point};
use crate::environment::SwarmEnv;
use crate::phase::Phase;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvSnapshot {
    /// Completed steps
    pub step: u64,
    pub phase: Phase,
    pub pressure: f64,
    pub defenders: Vec<Point>,
    pub attackers: Vec<Point>,
    pub decoys: Vec<Point>,
    /// Present only under the leader strategy while a defender survives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leader: Option<Point>,
    pub protected_point: Point,
    pub world: f64,
    pub defense_won: bool,
    pub defense_lost: bool,
}

impl EnvSnapshot {
    pub fn capture<R: Rng>(env: &SwarmEnv<R>) -> Self {
        let positions = |agents: &[Agent]| -> Vec<Point> { agents.iter().map(|a| a.pos).collect() };
        Self {
            step: env.step_count(),
            phase: env.phase(),
            pressure: env.pressure(),
            defenders: positions(env.defenders()),
            attackers: positions(env.attackers()),
            decoys: positions(env.decoys()),
            leader: env.leader_position(),
            protected_point: env.protected_point(),
            world: env.world(),
            defense_won: env.defense_won(),
            defense_lost: env.defense_lost(),
        }
    }
}

impl<R: Rng> SwarmEnv<R> {
    pub fn snapshot(&self) -> EnvSnapshot {
        EnvSnapshot::capture(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SwarmConfig;

    #[test]
    fn test_snapshot_mirrors_environment() {
        let mut env = SwarmEnv::from_seed(SwarmConfig::leader_based(), 3).unwrap();
        env.step();
        let snap = env.snapshot();

        assert_eq!(snap.step, 1);
        assert_eq!(snap.phase, env.phase());
        assert_eq!(snap.pressure, env.pressure());
        assert_eq!(snap.defenders.len(), env.defenders().len());
        assert_eq!(snap.attackers.len(), env.attackers().len());
        assert_eq!(snap.decoys.len(), 3);
        assert_eq!(snap.leader, env.leader_position());
        assert_eq!(snap.protected_point, Point::new(50.0, 50.0));
        assert_eq!(snap.world, 100.0);
        assert_eq!(snap.defense_won, env.defense_won());
        assert_eq!(snap.defense_lost, env.defense_lost());
    }

    #[test]
    fn test_centroid_snapshot_omits_leader_in_json() {
        let env = SwarmEnv::from_seed(SwarmConfig::default(), 0).unwrap();
        let json = serde_json::to_value(env.snapshot()).unwrap();
        assert!(json.get("leader").is_none());
        assert_eq!(json["phase"], "stealth");
        assert_eq!(json["defenders"].as_array().unwrap().len(), 12);
    }
}
