//! Auxiliary reward shaping.
//!
//! Shaping sits between the environment's raw reward and the clipping
//! stage of the preprocessor: an optional normalization against the
//! smallest positive reward seen during burn-in, and an optional
//! movement bonus that pays out when the current frame differs enough
//! from the recent wide history window. The movement threshold is
//! calibrated exactly once from burn-in statistics and never updated
//! afterwards.
use crate::{NetFrame, StackedState};
use anyhow::Result;
use ndarray::s;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`RewardShaper`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct RewardShaperConfig {
    /// Scales raw rewards by `2 / min_positive_burn_in_reward`.
    pub normalize_reward: bool,

    /// Enables the movement-based auxiliary bonus.
    pub movement_bonus: bool,

    /// Width of the movement history window in frames.
    pub movement_frames: usize,

    /// Bonus paid when the movement difference exceeds the calibrated
    /// threshold.
    pub movement_bonus_value: f32,

    /// Gates the bonus with a probability following the exploration
    /// epsilon schedule instead of applying it unconditionally.
    pub decay_gate: bool,
}

impl Default for RewardShaperConfig {
    fn default() -> Self {
        Self {
            normalize_reward: false,
            movement_bonus: false,
            movement_frames: 10,
            movement_bonus_value: 0.9,
            decay_gate: false,
        }
    }
}

impl RewardShaperConfig {
    /// Enables or disables burn-in reward normalization.
    pub fn normalize_reward(mut self, v: bool) -> Self {
        self.normalize_reward = v;
        self
    }

    /// Enables or disables the movement bonus.
    pub fn movement_bonus(mut self, v: bool) -> Self {
        self.movement_bonus = v;
        self
    }

    /// Sets the width of the movement history window.
    pub fn movement_frames(mut self, v: usize) -> Self {
        self.movement_frames = v;
        self
    }

    /// Sets the bonus value.
    pub fn movement_bonus_value(mut self, v: f32) -> Self {
        self.movement_bonus_value = v;
        self
    }

    /// Enables or disables epsilon-schedule gating of the bonus.
    pub fn decay_gate(mut self, v: bool) -> Self {
        self.decay_gate = v;
        self
    }

    /// Constructs [`RewardShaperConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`RewardShaperConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Combines the raw reward with auxiliary shaping terms.
pub struct RewardShaper {
    config: RewardShaperConfig,
    num_actions: usize,
    burn_in_diffs: Vec<Vec<f32>>,
    threshold: Option<f32>,
    min_positive_reward: Option<f32>,
}

impl RewardShaper {
    /// Constructs a shaper from its configuration.
    pub fn build(config: &RewardShaperConfig, num_actions: usize) -> Self {
        Self {
            config: config.clone(),
            num_actions,
            burn_in_diffs: Vec::new(),
            threshold: None,
            min_positive_reward: None,
        }
    }

    /// Records burn-in statistics for one step: the per-channel movement
    /// difference of the wide window against the incoming frame, and the
    /// smallest positive raw reward seen so far.
    pub fn observe_burn_in(
        &mut self,
        mv_window: &StackedState,
        next_frame: &NetFrame,
        raw_reward: f32,
    ) {
        if raw_reward > 0.0 {
            self.min_positive_reward = Some(match self.min_positive_reward {
                Some(m) => m.min(raw_reward),
                None => raw_reward,
            });
        }
        if self.config.movement_bonus {
            self.burn_in_diffs.push(channel_diffs(mv_window, next_frame));
        }
    }

    /// One-shot threshold calibration from the recorded burn-in
    /// statistics.
    ///
    /// The threshold is the value at rank `n - n/num_actions` of the
    /// sorted per-step minima, i.e. roughly the top `1/num_actions`
    /// quantile of observed movement. Calling this again is a no-op; the
    /// threshold is deliberately never recalibrated.
    pub fn calibrate(&mut self) {
        if self.threshold.is_some() || self.burn_in_diffs.is_empty() {
            return;
        }
        let mut mins: Vec<f32> = self
            .burn_in_diffs
            .iter()
            .map(|d| d.iter().cloned().fold(f32::MAX, f32::min))
            .collect();
        mins.sort_by(f32::total_cmp);
        let k = mins.len() / self.num_actions;
        let ix = if k == 0 { 0 } else { mins.len() - k };
        self.threshold = Some(mins[ix]);
        self.burn_in_diffs.clear();
    }

    /// Whether the movement threshold has been calibrated.
    pub fn calibrated(&self) -> bool {
        self.threshold.is_some()
    }

    /// Movement bonus for the current step; zero when the bonus is
    /// disabled or not yet calibrated.
    pub fn movement_bonus(&self, mv_window: &StackedState, next_frame: &NetFrame) -> f32 {
        let threshold = match (self.config.movement_bonus, self.threshold) {
            (true, Some(t)) => t,
            _ => return 0.0,
        };
        let diffs = channel_diffs(mv_window, next_frame);
        let min_diff = diffs.iter().cloned().fold(f32::MAX, f32::min);
        if min_diff > threshold {
            self.config.movement_bonus_value
        } else {
            0.0
        }
    }

    /// Combines the raw reward with the movement bonus.
    ///
    /// `epsilon` is the current exploration probability; with `decay_gate`
    /// enabled the bonus is only added with that probability, so the
    /// shaping incentive fades together with exploration.
    pub fn shape(&self, raw_reward: f32, bonus: f32, epsilon: f64, rng: &mut impl Rng) -> f32 {
        let mut reward = if self.config.normalize_reward {
            match self.min_positive_reward {
                Some(m) => 2.0 * raw_reward / m,
                None => raw_reward,
            }
        } else {
            raw_reward
        };
        let gate = if self.config.decay_gate { epsilon } else { 1.0 };
        if rng.gen::<f64>() < gate {
            reward += bonus;
        }
        reward
    }
}

/// Mean absolute pixel difference between each frame of the window and
/// the incoming frame, one value per window channel.
fn channel_diffs(mv_window: &StackedState, next_frame: &NetFrame) -> Vec<f32> {
    let n = (next_frame.len() as f32).max(1.0);
    (0..mv_window.shape()[0])
        .map(|k| {
            let frame = mv_window.slice(s![k, .., ..]);
            (&frame - next_frame).mapv(f32::abs).sum() / n
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};
    use rand::{rngs::SmallRng, SeedableRng};

    fn window(v: f32) -> StackedState {
        Array3::from_elem((2, 2, 2), v)
    }

    fn frame(v: f32) -> NetFrame {
        Array2::from_elem((2, 2), v)
    }

    fn movement_config() -> RewardShaperConfig {
        RewardShaperConfig::default()
            .movement_bonus(true)
            .movement_frames(2)
    }

    #[test]
    fn test_channel_diffs() {
        let mut w = window(0.0);
        w.slice_mut(s![1, .., ..]).fill(0.5);
        let d = channel_diffs(&w, &frame(1.0));
        assert!((d[0] - 1.0).abs() < 1e-6);
        assert!((d[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_one_shot_calibration_and_bonus() {
        let mut shaper = RewardShaper::build(&movement_config(), 2);
        for d in [0.0f32, 0.1, 0.2, 0.3] {
            shaper.observe_burn_in(&window(0.0), &frame(d), 0.0);
        }
        assert!(!shaper.calibrated());
        shaper.calibrate();
        assert!(shaper.calibrated());

        // Rank 4 - 4/2 = 2 of the sorted minima: threshold 0.2.
        assert_eq!(shaper.movement_bonus(&window(0.0), &frame(0.3)), 0.9);
        assert_eq!(shaper.movement_bonus(&window(0.0), &frame(0.15)), 0.0);

        // Recalibration attempts must not move the threshold.
        shaper.observe_burn_in(&window(0.0), &frame(100.0), 0.0);
        shaper.calibrate();
        assert_eq!(shaper.movement_bonus(&window(0.0), &frame(0.3)), 0.9);
    }

    #[test]
    fn test_bonus_zero_before_calibration() {
        let shaper = RewardShaper::build(&movement_config(), 2);
        assert_eq!(shaper.movement_bonus(&window(0.0), &frame(10.0)), 0.0);
    }

    #[test]
    fn test_normalization_by_burn_in_minimum() {
        let config = RewardShaperConfig::default().normalize_reward(true);
        let mut shaper = RewardShaper::build(&config, 2);
        let mut rng = SmallRng::seed_from_u64(0);
        shaper.observe_burn_in(&window(0.0), &frame(0.0), 4.0);
        shaper.observe_burn_in(&window(0.0), &frame(0.0), 8.0);
        let shaped = shaper.shape(2.0, 0.0, 1.0, &mut rng);
        assert!((shaped - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_decay_gate() {
        let config = movement_config().decay_gate(true);
        let shaper = RewardShaper::build(&config, 2);
        let mut rng = SmallRng::seed_from_u64(0);
        // Epsilon zero: bonus never applied.
        for _ in 0..50 {
            assert_eq!(shaper.shape(0.0, 0.9, 0.0, &mut rng), 0.0);
        }
        // Epsilon one: bonus always applied.
        for _ in 0..50 {
            assert!((shaper.shape(0.0, 0.9, 1.0, &mut rng) - 0.9).abs() < 1e-6);
        }
    }
}
