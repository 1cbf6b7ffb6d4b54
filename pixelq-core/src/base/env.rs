//! Environment.
use anyhow::Result;
use ndarray::{Array2, Array3};

/// A raw environment observation: an RGB image of shape `(height, width, 3)`.
pub type RgbFrame = Array3<u8>;

/// A compact stored frame: grayscale, resized, low bit-depth, shape
/// `(frame_height, frame_width)`.
pub type CompactFrame = Array2<u8>;

/// A normalized single-channel network frame of shape
/// `(frame_height, frame_width)`.
pub type NetFrame = Array2<f32>;

/// A stacked multi-frame window of shape `(stack, frame_height, frame_width)`,
/// channels-first with the newest frame last.
pub type StackedState = Array3<f32>;

/// The result of a single environment step.
pub struct EnvStep {
    /// Observation after the step.
    pub obs: RgbFrame,

    /// Raw reward emitted by the environment.
    pub reward: f32,

    /// Flag denoting if the episode ended with this step. Depending on
    /// [`Env::lives`] this may be a sub-episode boundary (e.g. a lost
    /// life) rather than a full game over.
    pub is_done: bool,
}

/// Represents an arcade-style environment emitting pixel observations.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: u64) -> Result<Self>
    where
        Self: Sized;

    /// Returns the number of discrete actions.
    fn num_actions(&self) -> usize;

    /// Resets the environment and returns the initial observation.
    fn reset(&mut self) -> Result<RgbFrame>;

    /// Performs an environment step.
    fn step(&mut self, action: usize) -> Result<EnvStep>;

    /// Remaining lives, for environments where losing a life ends a
    /// sub-episode without requiring a full reset. `None` means the
    /// environment has no notion of lives and every `is_done` is a full
    /// game over.
    fn lives(&self) -> Option<usize> {
        None
    }
}
