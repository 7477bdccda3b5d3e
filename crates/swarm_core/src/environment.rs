//! Swarm Environment
//!
//! Owns the three agent groups, the phase/pressure state and the episode's
//! random stream, and advances them one step at a time.
//!
//! ## Step order
//! 1. Phase update from the pressure left by the previous step
//! 2. Centroids (defenders; attackers ∪ decoys), taken before any motion
//! 3. Defender motion (leader/follower or cohesion)
//! 4. Attacker motion (wander in stealth, charge the defender centroid when engaged)
//! 5. Decoy wander
//! 6. Detection & attrition
//! 7. Leader vulnerability
//! 8. Pressure decay
//!
//! Later sub-steps read positions written by earlier ones, so the order is fixed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::agent::{centroid, Agent, Point, Role};
use crate::config::{DefenderStrategy, SpawnBox, SwarmConfig};
use crate::error::ConfigError;
use crate::phase::{Phase, PhaseState};

/// What happened during one call to [`SwarmEnv::step`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Zero-based index of the step just executed
    pub step: u64,
    /// Phase in force for this step
    pub phase: Phase,
    /// Attackers credited with a detection
    pub detections: usize,
    /// Attackers removed by attrition
    pub kills: usize,
    pub leader_killed: bool,
    /// Pressure after decay
    pub pressure: f64,
}

pub struct SwarmEnv<R = ChaCha8Rng> {
    config: SwarmConfig,
    defenders: Vec<Agent>,
    attackers: Vec<Agent>,
    decoys: Vec<Agent>,
    /// Index into `defenders`
    leader: Option<usize>,
    state: PhaseState,
    step: u64,
    rng: R,
}

impl SwarmEnv<ChaCha8Rng> {
    /// Environment whose whole random stream derives from `seed`.
    pub fn from_seed(config: SwarmConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::new(config, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> SwarmEnv<R> {
    /// Validate `config` and spawn every group at random inside its spawn box.
    pub fn new(config: SwarmConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::spawn(config, rng))
    }

    /// Spawn without validating; callers have already checked `config`.
    pub(crate) fn spawn(config: SwarmConfig, mut rng: R) -> Self {
        let defenders =
            spawn_group(config.n_defenders, config.spawn.defenders, Role::Defender, &mut rng);
        let attackers =
            spawn_group(config.n_attackers, config.spawn.intruders, Role::Attacker, &mut rng);
        let decoys = spawn_group(config.n_decoys, config.spawn.intruders, Role::Decoy, &mut rng);
        Self::assemble(config, rng, defenders, attackers, decoys)
    }

    /// Environment with explicit starting positions.
    ///
    /// Group sizes in `config` are replaced by the lengths of the given lists and
    /// positions are clamped into the arena.
    pub fn with_agents(
        mut config: SwarmConfig,
        rng: R,
        defenders: &[Point],
        attackers: &[Point],
        decoys: &[Point],
    ) -> Result<Self, ConfigError> {
        config.n_defenders = defenders.len();
        config.n_attackers = attackers.len();
        config.n_decoys = decoys.len();
        config.validate()?;

        let world = config.world;
        let place = |points: &[Point], role: Role| -> Vec<Agent> {
            points.iter().map(|p| Agent::new(p.clamped(world), role)).collect()
        };
        let defenders = place(defenders, Role::Defender);
        let attackers = place(attackers, Role::Attacker);
        let decoys = place(decoys, Role::Decoy);
        Ok(Self::assemble(config, rng, defenders, attackers, decoys))
    }

    fn assemble(
        config: SwarmConfig,
        rng: R,
        defenders: Vec<Agent>,
        attackers: Vec<Agent>,
        decoys: Vec<Agent>,
    ) -> Self {
        let leader = (config.strategy.is_leader_based() && !defenders.is_empty()).then_some(0);
        Self {
            config,
            defenders,
            attackers,
            decoys,
            leader,
            state: PhaseState::new(),
            step: 0,
            rng,
        }
    }

    /// Advance the simulation by one step.
    pub fn step(&mut self) -> StepReport {
        let step = self.step;

        let held = self.state.steps_in_phase(step);
        if let Some(previous) = self.state.update(&self.config.pressure, step) {
            debug!(
                step,
                held,
                pressure = self.state.pressure,
                "phase {} -> {}",
                previous,
                self.state.phase
            );
        }
        let phase = self.state.phase;

        let defender_centroid = centroid(&self.defenders);
        let intruder_centroid = centroid(self.attackers.iter().chain(&self.decoys));

        self.move_defenders(defender_centroid, intruder_centroid);
        self.move_attackers(phase, defender_centroid);
        self.move_decoys();
        let (detections, kills) = self.detect_and_attrit();
        let leader_killed = self.leader_vulnerability();
        self.state.decay(&self.config.pressure);

        self.step += 1;
        debug_assert!(self.leader_invariant_holds(), "leader desynchronised from defenders");

        let report = StepReport {
            step,
            phase,
            detections,
            kills,
            leader_killed,
            pressure: self.state.pressure,
        };
        trace!(?report, attackers = self.attackers.len(), "step");
        report
    }

    fn move_defenders(
        &mut self,
        defender_centroid: Option<Point>,
        intruder_centroid: Option<Point>,
    ) {
        let world = self.config.world;
        let motion = &self.config.motion;

        match (self.config.strategy, self.leader) {
            (DefenderStrategy::Leader, Some(leader_idx)) => {
                // No intruders left to head for: the leader holds position.
                if let Some(target) = intruder_centroid {
                    self.defenders[leader_idx].move_toward(target, motion.leader_speed, world);
                }
                let anchor = self.defenders[leader_idx].pos;
                for (i, follower) in self.defenders.iter_mut().enumerate() {
                    if i != leader_idx {
                        follower.move_toward(anchor, motion.follower_speed, world);
                    }
                }
            }
            _ => {
                if let Some(target) = defender_centroid {
                    for defender in &mut self.defenders {
                        defender.move_toward(target, motion.cohesion_speed, world);
                    }
                }
            }
        }
    }

    fn move_attackers(&mut self, phase: Phase, defender_centroid: Option<Point>) {
        let world = self.config.world;
        let motion = &self.config.motion;

        match (phase, defender_centroid) {
            (Phase::Stealth, _) => {
                for attacker in &mut self.attackers {
                    attacker.wander(motion.attacker_wander_speed, world, &mut self.rng);
                }
            }
            (Phase::Engaged, Some(target)) => {
                for attacker in &mut self.attackers {
                    attacker.move_toward(target, motion.attacker_charge_speed, world);
                }
            }
            // Every defender has fallen; nothing to charge at.
            (Phase::Engaged, None) => {}
        }
    }

    fn move_decoys(&mut self) {
        let world = self.config.world;
        let speed = self.config.motion.decoy_wander_speed;
        for decoy in &mut self.decoys {
            decoy.wander(speed, world, &mut self.rng);
        }
    }

    /// Each attacker is visited once, in order; a kill removes it from the live
    /// group before the next attacker is examined.
    fn detect_and_attrit(&mut self) -> (usize, usize) {
        let defenders = &self.defenders;
        let config = &self.config;
        let state = &mut self.state;
        let rng = &mut self.rng;
        let mut detections = 0;
        let mut kills = 0;

        self.attackers.retain(|attacker| {
            // First defender in range takes the single credit.
            let detected = defenders
                .iter()
                .any(|d| d.pos.distance_to(attacker.pos) < config.detection_radius);
            if !detected {
                state.record_evasion(&config.pressure);
                return true;
            }
            detections += 1;
            state.record_detection(&config.pressure);
            let killed = rng.gen::<f64>() < config.attacker_kill_prob;
            if killed {
                kills += 1;
            }
            !killed
        });

        (detections, kills)
    }

    /// Returns whether the leader was removed this step.
    fn leader_vulnerability(&mut self) -> bool {
        if !self.config.strategy.is_leader_based() {
            return false;
        }
        let Some(leader_idx) = self.leader else {
            return false;
        };
        if self.rng.gen::<f64>() >= self.config.leader_kill_prob {
            return false;
        }

        self.defenders.remove(leader_idx);
        self.leader = if self.defenders.is_empty() {
            None
        } else {
            Some(self.rng.gen_range(0..self.defenders.len()))
        };
        debug!(
            step = self.step,
            remaining = self.defenders.len(),
            successor = ?self.leader,
            "leader lost"
        );
        true
    }

    fn leader_invariant_holds(&self) -> bool {
        match (self.config.strategy, self.leader) {
            (DefenderStrategy::Leader, Some(idx)) => idx < self.defenders.len(),
            (DefenderStrategy::Leader, None) => self.defenders.is_empty(),
            (DefenderStrategy::Centroid, leader) => leader.is_none(),
        }
    }

    /// True once every attacker has been removed.
    pub fn defense_won(&self) -> bool {
        self.attackers.is_empty()
    }

    /// True if any attacker is strictly inside the success radius of the protected point.
    pub fn defense_lost(&self) -> bool {
        let core = self.protected_point();
        let radius = self.config.attack_success_radius;
        self.attackers.iter().any(|a| a.distance_to(core) < radius)
    }

    pub fn protected_point(&self) -> Point {
        self.config.protected_point()
    }

    pub fn world(&self) -> f64 {
        self.config.world
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn pressure(&self) -> f64 {
        self.state.pressure
    }

    pub fn phase_state(&self) -> &PhaseState {
        &self.state
    }

    /// Number of completed steps.
    pub fn step_count(&self) -> u64 {
        self.step
    }

    pub fn defenders(&self) -> &[Agent] {
        &self.defenders
    }

    pub fn attackers(&self) -> &[Agent] {
        &self.attackers
    }

    pub fn decoys(&self) -> &[Agent] {
        &self.decoys
    }

    /// Leader index into [`Self::defenders`].
    pub fn leader(&self) -> Option<usize> {
        self.leader
    }

    pub fn leader_position(&self) -> Option<Point> {
        self.leader.and_then(|idx| self.defenders.get(idx)).map(|a| a.pos)
    }
}

fn spawn_group<R: Rng>(count: usize, area: SpawnBox, role: Role, rng: &mut R) -> Vec<Agent> {
    (0..count)
        .map(|_| {
            let x = rng.gen_range(area.min..=area.max);
            let y = rng.gen_range(area.min..=area.max);
            Agent::new(Point::new(x, y), role)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MotionConfig;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(0)
    }

    fn env_with(
        config: SwarmConfig,
        defenders: &[Point],
        attackers: &[Point],
        decoys: &[Point],
    ) -> SwarmEnv {
        SwarmEnv::with_agents(config, rng(), defenders, attackers, decoys).unwrap()
    }

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_spawn_respects_boxes_and_counts() {
        let env = SwarmEnv::from_seed(SwarmConfig::default(), 5).unwrap();
        assert_eq!(env.defenders().len(), 12);
        assert_eq!(env.attackers().len(), 8);
        assert_eq!(env.decoys().len(), 3);
        for d in env.defenders() {
            assert!((40.0..=60.0).contains(&d.pos.x) && (40.0..=60.0).contains(&d.pos.y));
            assert_eq!(d.role(), Role::Defender);
        }
        for a in env.attackers().iter().chain(env.decoys()) {
            assert!((0.0..=20.0).contains(&a.pos.x) && (0.0..=20.0).contains(&a.pos.y));
        }
        assert_eq!(env.phase(), Phase::Stealth);
        assert_eq!(env.pressure(), 0.0);
        assert_eq!(env.step_count(), 0);
    }

    #[test]
    fn test_initial_leader_by_strategy() {
        let centroid = SwarmEnv::from_seed(SwarmConfig::default(), 1).unwrap();
        assert_eq!(centroid.leader(), None);
        assert_eq!(centroid.leader_position(), None);

        let leader = SwarmEnv::from_seed(SwarmConfig::leader_based(), 1).unwrap();
        assert_eq!(leader.leader(), Some(0));
        assert_eq!(leader.leader_position(), Some(leader.defenders()[0].pos));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SwarmConfig { leader_kill_prob: -0.5, ..SwarmConfig::default() };
        assert!(SwarmEnv::from_seed(config, 0).is_err());

        let err = SwarmEnv::with_agents(SwarmConfig::default(), rng(), &[], &[p(1.0, 1.0)], &[]);
        assert!(matches!(err, Err(ConfigError::NoDefenders)));
    }

    #[test]
    fn test_with_agents_clamps_and_resizes() {
        let env = env_with(SwarmConfig::default(), &[p(150.0, -3.0)], &[], &[p(10.0, 10.0)]);
        assert_eq!(env.defenders()[0].pos, p(100.0, 0.0));
        assert_eq!(env.config().n_defenders, 1);
        assert_eq!(env.config().n_attackers, 0);
        assert_eq!(env.config().n_decoys, 1);
    }

    #[test]
    fn test_no_attackers_is_immediate_win() {
        let config = SwarmConfig { n_attackers: 0, ..SwarmConfig::default() };
        let env = SwarmEnv::from_seed(config, 0).unwrap();
        assert!(env.defense_won());
        assert!(!env.defense_lost());
    }

    #[test]
    fn test_defense_lost_uses_strict_radius() {
        let inside = env_with(SwarmConfig::default(), &[p(90.0, 90.0)], &[p(53.9, 50.0)], &[]);
        assert!(inside.defense_lost());
        let boundary = env_with(SwarmConfig::default(), &[p(90.0, 90.0)], &[p(54.0, 50.0)], &[]);
        assert!(!boundary.defense_lost());
        assert!(!boundary.defense_won());
    }

    #[test]
    fn test_single_detection_credit_per_attacker() {
        let config = SwarmConfig { attacker_kill_prob: 0.0, ..SwarmConfig::default() };
        let mut env = env_with(
            config,
            &[p(20.0, 20.0), p(21.0, 20.0), p(20.0, 21.0)],
            &[p(20.5, 20.5)],
            &[],
        );
        let report = env.step();
        assert_eq!(report.detections, 1);
        assert_eq!(report.kills, 0);
        assert!((env.pressure() - 0.95).abs() < 1e-12, "pressure {}", env.pressure());
    }

    #[test]
    fn test_detection_radius_is_strict() {
        let still = MotionConfig {
            leader_speed: 0.0,
            follower_speed: 0.0,
            cohesion_speed: 0.0,
            attacker_wander_speed: 0.0,
            attacker_charge_speed: 0.0,
            decoy_wander_speed: 0.0,
        };
        let config =
            SwarmConfig { attacker_kill_prob: 1.0, motion: still, ..SwarmConfig::default() };

        let mut boundary = env_with(config.clone(), &[p(20.0, 20.0)], &[p(25.0, 20.0)], &[]);
        let report = boundary.step();
        assert_eq!((report.detections, report.kills), (0, 0));
        assert_eq!(boundary.attackers()[0].pos, p(25.0, 20.0));

        // Only the stealth wander drew from the stream; no kill roll.
        let mut expected = rng();
        Agent::new(p(25.0, 20.0), Role::Attacker).wander(0.0, 100.0, &mut expected);
        assert_eq!(boundary.rng, expected);

        let mut inside = env_with(config, &[p(20.0, 20.0)], &[p(24.999, 20.0)], &[]);
        let report = inside.step();
        assert_eq!((report.detections, report.kills), (1, 1));
        assert!(inside.defense_won());
        assert_ne!(inside.rng, expected);
    }

    #[test]
    fn test_evasion_lowers_pressure_then_floors() {
        let mut env = env_with(SwarmConfig::default(), &[p(80.0, 80.0)], &[p(5.0, 5.0)], &[]);
        env.state.pressure = 10.0;
        let report = env.step();
        assert_eq!(report.detections, 0);
        assert!((env.pressure() - (10.0 - 0.3) * 0.95).abs() < 1e-12);

        env.state.pressure = 0.1;
        env.step();
        assert_eq!(env.pressure(), 0.0);
    }

    #[test]
    fn test_certain_kill_clears_attackers_in_one_step() {
        let config = SwarmConfig {
            attacker_kill_prob: 1.0,
            detection_radius: 1_000.0,
            ..SwarmConfig::default()
        };
        let mut env = SwarmEnv::from_seed(config, 9).unwrap();
        let report = env.step();
        assert_eq!(report.kills, 8);
        assert_eq!(report.detections, 8);
        assert!(env.defense_won());
        // 8 detections, then decay
        assert!((env.pressure() - 8.0 * 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_engaged_attackers_charge_pre_motion_centroid() {
        let defenders = [p(60.0, 60.0), p(70.0, 60.0)];
        let mut env = env_with(SwarmConfig::default(), &defenders, &[p(10.0, 10.0)], &[]);
        env.state.pressure = 25.0;

        let mut expected = env.attackers()[0].clone();
        expected.move_toward(p(65.0, 60.0), 0.9, 100.0);

        let report = env.step();
        assert_eq!(report.phase, Phase::Engaged);
        assert_eq!(env.phase(), Phase::Engaged);
        assert_eq!(env.attackers()[0].pos, expected.pos);
    }

    #[test]
    fn test_stealth_attackers_only_wander() {
        let mut env = env_with(SwarmConfig::default(), &[p(60.0, 60.0)], &[p(10.0, 10.0)], &[]);
        env.step();
        let a = env.attackers()[0].pos;
        assert!((a.x - 10.0).abs() <= 0.3 && (a.y - 10.0).abs() <= 0.3, "{:?}", a);
    }

    #[test]
    fn test_centroid_strategy_cohesion() {
        let defenders = [p(40.0, 50.0), p(60.0, 50.0)];
        let mut env = env_with(SwarmConfig::default(), &defenders, &[p(5.0, 5.0)], &[]);
        env.step();
        assert!((env.defenders()[0].pos.x - 40.4).abs() < 1e-6);
        assert!((env.defenders()[1].pos.x - 59.6).abs() < 1e-6);
        assert_eq!(env.leader(), None);
    }

    #[test]
    fn test_leader_strategy_followers_track_moved_leader() {
        let config = SwarmConfig { leader_kill_prob: 0.0, ..SwarmConfig::leader_based() };
        let defenders = [p(50.0, 50.0), p(55.0, 50.0), p(50.0, 56.0)];
        let attackers = [p(10.0, 10.0)];
        let decoys = [p(20.0, 10.0)];
        let mut env = env_with(config, &defenders, &attackers, &decoys);

        let mut leader = env.defenders()[0].clone();
        leader.move_toward(p(15.0, 10.0), 0.6, 100.0);
        let mut f1 = env.defenders()[1].clone();
        f1.move_toward(leader.pos, 0.5, 100.0);
        let mut f2 = env.defenders()[2].clone();
        f2.move_toward(leader.pos, 0.5, 100.0);

        let report = env.step();
        assert!(!report.leader_killed);
        assert_eq!(env.leader(), Some(0));
        assert_eq!(env.defenders()[0].pos, leader.pos);
        assert_eq!(env.defenders()[1].pos, f1.pos);
        assert_eq!(env.defenders()[2].pos, f2.pos);
    }

    #[test]
    fn test_certain_leader_kill_elects_successor_same_step() {
        let config = SwarmConfig { leader_kill_prob: 1.0, ..SwarmConfig::leader_based() };
        let mut env = SwarmEnv::from_seed(config, 4).unwrap();
        let report = env.step();
        assert!(report.leader_killed);
        assert_eq!(env.defenders().len(), 11);
        let leader = env.leader().expect("successor chosen");
        assert!(leader < env.defenders().len());
    }

    #[test]
    fn test_last_defender_falls_leader_cleared() {
        let config = SwarmConfig { leader_kill_prob: 1.0, ..SwarmConfig::leader_based() };
        let mut env = env_with(config, &[p(50.0, 50.0)], &[p(10.0, 10.0)], &[p(12.0, 12.0)]);
        assert!(env.step().leader_killed);
        assert!(env.defenders().is_empty());
        assert_eq!(env.leader(), None);

        // Engine keeps running without defenders; engaged attackers hold.
        let held = env.attackers()[0].pos;
        env.state.pressure = 30.0;
        for _ in 0..5 {
            let report = env.step();
            assert_eq!(report.phase, Phase::Engaged);
            assert!(!report.leader_killed);
            assert_eq!(report.detections, 0);
        }
        assert_eq!(env.attackers()[0].pos, held);
    }

    #[test]
    fn test_centroid_strategy_never_kills_leader() {
        let config = SwarmConfig { leader_kill_prob: 1.0, ..SwarmConfig::default() };
        let mut env = SwarmEnv::from_seed(config, 2).unwrap();
        for _ in 0..20 {
            assert!(!env.step().leader_killed);
        }
        assert_eq!(env.defenders().len(), 12);
    }

    #[test]
    fn test_invariants_hold_over_long_run() {
        for strategy in DefenderStrategy::all() {
            let config = SwarmConfig { leader_kill_prob: 0.05, ..SwarmConfig::default() }
                .with_strategy(strategy);
            let mut env = SwarmEnv::from_seed(config, 17).unwrap();
            for _ in 0..600 {
                let phase_before = env.phase();
                let pressure_before = env.pressure();
                let report = env.step();

                assert!(env.pressure() >= 0.0);
                let all = env.defenders().iter().chain(env.attackers()).chain(env.decoys());
                for agent in all {
                    assert!(agent.pos.in_bounds(100.0), "{:?}", agent.pos);
                }
                if phase_before == Phase::Engaged && pressure_before >= 6.0 {
                    assert_eq!(report.phase, Phase::Engaged);
                }
                if phase_before == Phase::Stealth && pressure_before <= 18.0 {
                    assert_eq!(report.phase, Phase::Stealth);
                }
                match (strategy, env.leader()) {
                    (DefenderStrategy::Leader, Some(i)) => assert!(i < env.defenders().len()),
                    (DefenderStrategy::Leader, None) => assert!(env.defenders().is_empty()),
                    (DefenderStrategy::Centroid, l) => assert_eq!(l, None),
                }
            }
            assert_eq!(env.step_count(), 600);
        }
    }
}
