//! Frame preprocessing.
use crate::{
    replay::{NetworkBatch, TransitionBatch},
    CompactFrame, NetFrame, RgbFrame,
};
use anyhow::{anyhow, Result};
use image::{
    imageops::{grayscale, resize, FilterType::Triangle},
    ImageBuffer, Rgb,
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`FramePreprocessor`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct FramePreprocessorConfig {
    /// Height of stored and network frames.
    pub frame_height: usize,

    /// Width of stored and network frames.
    pub frame_width: usize,

    /// Clips rewards to `{-1, 0, +1}` by sign.
    pub clip_reward: bool,
}

impl Default for FramePreprocessorConfig {
    fn default() -> Self {
        Self {
            frame_height: 84,
            frame_width: 84,
            clip_reward: false,
        }
    }
}

impl FramePreprocessorConfig {
    /// Sets the size of processed frames.
    pub fn frame_size(mut self, height: usize, width: usize) -> Self {
        self.frame_height = height;
        self.frame_width = width;
        self
    }

    /// Enables or disables sign reward clipping.
    pub fn clip_reward(mut self, v: bool) -> Self {
        self.clip_reward = v;
        self
    }

    /// Constructs [`FramePreprocessorConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`FramePreprocessorConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Normalizes raw observations into stored and network representations.
///
/// Raw RGB observations are grayscaled and resized into [`CompactFrame`]s
/// to keep the replay store memory-bounded; network frames are the same
/// pixels as `f32` scaled into `[0, 1]`, so decompacting a stored frame
/// yields the same tensor as processing the raw observation it came from.
pub struct FramePreprocessor {
    frame_height: usize,
    frame_width: usize,
    clip_reward: bool,
}

impl FramePreprocessor {
    /// Constructs a preprocessor from its configuration.
    pub fn build(config: &FramePreprocessorConfig) -> Self {
        Self {
            frame_height: config.frame_height,
            frame_width: config.frame_width,
            clip_reward: config.clip_reward,
        }
    }

    /// Reduces a raw observation to the compact representation kept in the
    /// replay memory: grayscale, resized to the configured frame size.
    pub fn process_state_for_memory(&self, obs: &RgbFrame) -> Result<CompactFrame> {
        let (h, w) = (obs.shape()[0], obs.shape()[1]);
        let raw: Vec<u8> = obs.iter().cloned().collect();
        let img = ImageBuffer::<Rgb<u8>, _>::from_vec(w as u32, h as u32, raw)
            .ok_or_else(|| anyhow!("observation of shape ({}, {}, 3) expected", h, w))?;
        let img = resize(
            &img,
            self.frame_width as u32,
            self.frame_height as u32,
            Triangle,
        );
        let img = grayscale(&img);
        let buf = img.into_raw();
        let frame = Array2::from_shape_vec((self.frame_height, self.frame_width), buf)?;
        Ok(frame)
    }

    /// Produces a normalized floating-point single-channel frame sized to
    /// the network's expected spatial dimensions.
    pub fn process_state_for_network(&self, obs: &RgbFrame) -> Result<NetFrame> {
        let compact = self.process_state_for_memory(obs)?;
        Ok(self.frame_to_network(&compact))
    }

    /// Decompacts a stored frame into a network frame.
    pub fn frame_to_network(&self, frame: &CompactFrame) -> NetFrame {
        frame.mapv(|v| v as f32 / 255.0)
    }

    /// Maps a reward to `{-1, 0, +1}` by sign when clipping is enabled,
    /// identity otherwise.
    pub fn process_reward(&self, reward: f32) -> f32 {
        if !self.clip_reward {
            return reward;
        }
        if reward > 0.0 {
            1.0
        } else if reward < 0.0 {
            -1.0
        } else {
            0.0
        }
    }

    /// Decompacts a sampled batch into network tensors without mutating
    /// the underlying store.
    pub fn process_batch(&self, batch: TransitionBatch) -> NetworkBatch {
        NetworkBatch {
            states: batch.states.mapv(|v| v as f32 / 255.0),
            next_states: batch.next_states.mapv(|v| v as f32 / 255.0),
            actions: batch.actions,
            rewards: batch.rewards,
            is_terminal: batch.is_terminal,
        }
    }

    /// Clears internal stateful buffers at episode boundaries.
    ///
    /// The preprocessor holds no decompaction caches today; the hook stays
    /// on the interface so rollout code resets it together with the
    /// history stacks.
    pub fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn checker_obs(h: usize, w: usize) -> RgbFrame {
        Array3::from_shape_fn((h, w, 3), |(y, x, _)| {
            if (y + x) % 2 == 0 {
                255
            } else {
                0
            }
        })
    }

    #[test]
    fn test_reward_clipping() {
        let preproc =
            FramePreprocessor::build(&FramePreprocessorConfig::default().clip_reward(true));
        assert_eq!(preproc.process_reward(5.0), 1.0);
        assert_eq!(preproc.process_reward(-3.0), -1.0);
        assert_eq!(preproc.process_reward(0.0), 0.0);

        let identity = FramePreprocessor::build(&FramePreprocessorConfig::default());
        assert_eq!(identity.process_reward(5.0), 5.0);
        assert_eq!(identity.process_reward(-3.0), -3.0);
    }

    #[test]
    fn test_memory_frame_shape() {
        let preproc =
            FramePreprocessor::build(&FramePreprocessorConfig::default().frame_size(32, 24));
        let frame = preproc
            .process_state_for_memory(&checker_obs(64, 48))
            .unwrap();
        assert_eq!(frame.shape(), &[32, 24]);
    }

    #[test]
    fn test_network_frame_matches_decompacted_memory_frame() {
        let preproc =
            FramePreprocessor::build(&FramePreprocessorConfig::default().frame_size(16, 16));
        let obs = checker_obs(32, 32);
        let compact = preproc.process_state_for_memory(&obs).unwrap();
        let net = preproc.process_state_for_network(&obs).unwrap();
        assert_eq!(net, preproc.frame_to_network(&compact));
        assert!(net.iter().all(|v| (0.0..=1.0).contains(v)));
    }
}
