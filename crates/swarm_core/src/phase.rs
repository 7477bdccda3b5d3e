//! Phase / Pressure State Machine
//!
//! Attackers switch between two behaviours depending on accumulated pressure:
//! - Stealth: wander quietly while pressure is low
//! - Engaged: charge the defender centroid once pressure crosses the attack threshold
//!
//! The gap between the relax and attack thresholds is a hysteresis band: inside
//! it the phase is left unchanged.

use serde::{Deserialize, Serialize};

use crate::config::PressureConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Stealth,
    Engaged,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Stealth => "STEALTH",
            Phase::Engaged => "ENGAGED",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase plus the pressure accumulator that drives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseState {
    pub phase: Phase,
    pub pressure: f64,
    /// Step at which the current phase began
    pub phase_start_step: u64,
}

impl Default for PhaseState {
    fn default() -> Self {
        Self { phase: Phase::Stealth, pressure: 0.0, phase_start_step: 0 }
    }
}

impl PhaseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps_in_phase(&self, current_step: u64) -> u64 {
        current_step.saturating_sub(self.phase_start_step)
    }

    /// Phase implied by the current pressure, given the previous phase.
    pub fn next_phase(&self, cfg: &PressureConfig) -> Phase {
        if self.pressure > cfg.attack_threshold {
            Phase::Engaged
        } else if self.pressure < cfg.relax_threshold {
            Phase::Stealth
        } else {
            self.phase
        }
    }

    /// Re-evaluate the phase.
    ///
    /// # Returns
    /// The previous phase if a transition happened
    pub fn update(&mut self, cfg: &PressureConfig, current_step: u64) -> Option<Phase> {
        let old_phase = self.phase;
        let new_phase = self.next_phase(cfg);
        if new_phase == old_phase {
            return None;
        }
        self.phase = new_phase;
        self.phase_start_step = current_step;
        Some(old_phase)
    }

    pub fn record_detection(&mut self, cfg: &PressureConfig) {
        self.pressure += cfg.detection_gain;
    }

    /// May drive pressure negative until `decay` runs.
    pub fn record_evasion(&mut self, cfg: &PressureConfig) {
        self.pressure -= cfg.evasion_loss;
    }

    /// Geometric decay with a floor at zero.
    pub fn decay(&mut self, cfg: &PressureConfig) {
        self.pressure = (self.pressure * cfg.decay).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> PressureConfig {
        PressureConfig::default()
    }

    fn state(phase: Phase, pressure: f64) -> PhaseState {
        PhaseState { phase, pressure, phase_start_step: 0 }
    }

    #[test]
    fn test_initial_state_is_stealth() {
        let s = PhaseState::new();
        assert_eq!(s.phase, Phase::Stealth);
        assert_eq!(s.pressure, 0.0);
    }

    #[test]
    fn test_engages_above_attack_threshold() {
        let mut s = state(Phase::Stealth, 18.5);
        assert_eq!(s.update(&cfg(), 12), Some(Phase::Stealth));
        assert_eq!(s.phase, Phase::Engaged);
        assert_eq!(s.phase_start_step, 12);
    }

    #[test]
    fn test_attack_threshold_is_strict() {
        let mut s = state(Phase::Stealth, 18.0);
        assert_eq!(s.update(&cfg(), 1), None);
        assert_eq!(s.phase, Phase::Stealth);
    }

    #[test]
    fn test_relaxes_below_relax_threshold() {
        let mut s = state(Phase::Engaged, 5.9);
        assert_eq!(s.update(&cfg(), 3), Some(Phase::Engaged));
        assert_eq!(s.phase, Phase::Stealth);
    }

    #[test]
    fn test_relax_threshold_is_strict() {
        let mut s = state(Phase::Engaged, 6.0);
        assert_eq!(s.update(&cfg(), 1), None);
        assert_eq!(s.phase, Phase::Engaged);
    }

    #[test]
    fn test_hysteresis_band_keeps_phase() {
        for pressure in [6.0, 10.0, 12.5, 18.0] {
            let mut engaged = state(Phase::Engaged, pressure);
            let mut stealth = state(Phase::Stealth, pressure);
            engaged.update(&cfg(), 0);
            stealth.update(&cfg(), 0);
            assert_eq!(engaged.phase, Phase::Engaged, "pressure {}", pressure);
            assert_eq!(stealth.phase, Phase::Stealth, "pressure {}", pressure);
        }
    }

    #[test]
    fn test_decay_floors_at_zero() {
        let mut s = state(Phase::Stealth, -2.4);
        s.decay(&cfg());
        assert_eq!(s.pressure, 0.0);

        let mut s = state(Phase::Stealth, 10.0);
        s.decay(&cfg());
        assert!((s.pressure - 9.5).abs() < 1e-12);
    }

    #[test]
    fn test_detection_and_evasion_deltas() {
        let mut s = PhaseState::new();
        s.record_detection(&cfg());
        s.record_detection(&cfg());
        s.record_evasion(&cfg());
        assert!((s.pressure - 1.7).abs() < 1e-12);
    }

    #[test]
    fn test_steps_in_phase() {
        let s = PhaseState { phase: Phase::Engaged, pressure: 20.0, phase_start_step: 40 };
        assert_eq!(s.steps_in_phase(55), 15);
        assert_eq!(s.steps_in_phase(10), 0);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Stealth.to_string(), "STEALTH");
        assert_eq!(Phase::Engaged.to_string(), "ENGAGED");
    }
}
