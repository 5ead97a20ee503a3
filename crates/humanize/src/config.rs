//! Motion profile configuration.

use serde::{Deserialize, Serialize};

/// Tunables for trajectory shape and timing. The defaults describe a
/// plausible human pointer; tests pin `seed` for determinism.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MotionProfile {
    /// Perpendicular curve amplitude as a fraction of travel distance.
    #[serde(default = "MotionProfile::default_randomness")]
    pub randomness: f64,

    /// Fitts's-law intercept in seconds.
    #[serde(default = "MotionProfile::default_fitts_a")]
    pub fitts_a: f64,

    /// Fitts's-law slope in seconds per bit.
    #[serde(default = "MotionProfile::default_fitts_b")]
    pub fitts_b: f64,

    /// Total-time jitter fraction.
    #[serde(default = "MotionProfile::default_time_jitter")]
    pub time_jitter: f64,

    #[serde(default = "MotionProfile::default_overshoot_probability")]
    pub overshoot_probability: f64,

    #[serde(default = "MotionProfile::default_overshoot_min_px")]
    pub overshoot_min_px: f64,

    #[serde(default = "MotionProfile::default_overshoot_max_px")]
    pub overshoot_max_px: f64,

    #[serde(default = "MotionProfile::default_min_steps")]
    pub min_steps: usize,

    #[serde(default = "MotionProfile::default_max_steps")]
    pub max_steps: usize,

    /// Floor on the total movement time.
    #[serde(default = "MotionProfile::default_min_duration_ms")]
    pub min_duration_ms: u64,

    /// Fixed rng seed for reproducible trajectories.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl MotionProfile {
    fn default_randomness() -> f64 {
        0.3
    }
    fn default_fitts_a() -> f64 {
        0.05
    }
    fn default_fitts_b() -> f64 {
        0.15
    }
    fn default_time_jitter() -> f64 {
        0.10
    }
    fn default_overshoot_probability() -> f64 {
        0.2
    }
    fn default_overshoot_min_px() -> f64 {
        2.0
    }
    fn default_overshoot_max_px() -> f64 {
        6.0
    }
    fn default_min_steps() -> usize {
        20
    }
    fn default_max_steps() -> usize {
        80
    }
    fn default_min_duration_ms() -> u64 {
        20
    }
}

impl Default for MotionProfile {
    fn default() -> Self {
        Self {
            randomness: Self::default_randomness(),
            fitts_a: Self::default_fitts_a(),
            fitts_b: Self::default_fitts_b(),
            time_jitter: Self::default_time_jitter(),
            overshoot_probability: Self::default_overshoot_probability(),
            overshoot_min_px: Self::default_overshoot_min_px(),
            overshoot_max_px: Self::default_overshoot_max_px(),
            min_steps: Self::default_min_steps(),
            max_steps: Self::default_max_steps(),
            min_duration_ms: Self::default_min_duration_ms(),
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let p = MotionProfile::default();
        assert_eq!(p.randomness, 0.3);
        assert_eq!(p.fitts_a, 0.05);
        assert_eq!(p.fitts_b, 0.15);
        assert_eq!(p.overshoot_probability, 0.2);
        assert_eq!(p.min_steps, 20);
        assert_eq!(p.max_steps, 80);
    }
}
