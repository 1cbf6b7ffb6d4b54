//! Mixing of pre-recorded expert transitions into training batches.
//!
//! An expert memory is an ordinary [`ReplayMemory`] dumped to disk by a
//! previous run (or built from traces, see [`crate::trace`]). During
//! training a decaying fraction of every batch is drawn from it, so
//! early updates lean on demonstrated behavior while later updates rely
//! on the agent's own experience.
//!
//! [`ReplayMemory`]: crate::replay::ReplayMemory
use crate::{
    replay::{ReplayMemory, TransitionSample},
    PixelqError,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`ExpertSampler`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ExpertSamplerConfig {
    /// Fraction of the batch drawn from expert memory at the first
    /// update.
    pub initial_prob: f64,

    /// Floor of the mixing fraction.
    pub final_prob: f64,

    /// Number of updates over which the fraction decays linearly.
    pub decay_steps: usize,
}

impl Default for ExpertSamplerConfig {
    fn default() -> Self {
        Self {
            initial_prob: 1.0,
            final_prob: 0.05,
            decay_steps: 1_000_000,
        }
    }
}

impl ExpertSamplerConfig {
    /// Sets the initial mixing fraction.
    pub fn initial_prob(mut self, v: f64) -> Self {
        self.initial_prob = v;
        self
    }

    /// Sets the floor of the mixing fraction.
    pub fn final_prob(mut self, v: f64) -> Self {
        self.final_prob = v;
        self
    }

    /// Sets the number of updates over which the fraction decays.
    pub fn decay_steps(mut self, v: usize) -> Self {
        self.decay_steps = v;
        self
    }

    /// Constructs [`ExpertSamplerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ExpertSamplerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Draws a decaying share of each training batch from an expert memory.
pub struct ExpertSampler {
    memory: ReplayMemory,
    prob: f64,
    final_prob: f64,
    decay_per_update: f64,
}

impl ExpertSampler {
    /// Wraps an already-loaded expert memory.
    pub fn new(memory: ReplayMemory, config: &ExpertSamplerConfig) -> Result<Self> {
        if config.initial_prob < config.final_prob {
            return Err(PixelqError::InvalidArgument(format!(
                "initial_prob ({}) must not be below final_prob ({})",
                config.initial_prob, config.final_prob
            ))
            .into());
        }
        let decay_per_update = if config.decay_steps == 0 {
            0.0
        } else {
            (config.final_prob - config.initial_prob) / config.decay_steps as f64
        };
        Ok(Self {
            memory,
            prob: config.initial_prob,
            final_prob: config.final_prob,
            decay_per_update,
        })
    }

    /// Loads an expert memory dump from disk and wraps it.
    pub fn load(path: impl AsRef<Path>, config: &ExpertSamplerConfig) -> Result<Self> {
        let memory = ReplayMemory::load(path)?;
        Self::new(memory, config)
    }

    /// Current mixing fraction.
    pub fn mixing_prob(&self) -> f64 {
        self.prob
    }

    /// Number of transitions stored in the expert memory.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Whether the expert memory is empty.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Number of expert transitions to draw for a batch of the given
    /// size, advancing the decay schedule by one update.
    pub fn draw_count(&mut self, batch_size: usize) -> usize {
        let n = (batch_size as f64 * self.prob).round() as usize;
        self.prob = (self.prob + self.decay_per_update).max(self.final_prob);
        n.min(batch_size)
    }

    /// Samples `n` transitions from the expert memory.
    pub fn sample(&mut self, n: usize) -> Result<Vec<TransitionSample>> {
        self.memory.sample(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::ReplayMemoryConfig;
    use ndarray::Array2;

    fn expert_memory() -> ReplayMemory {
        let config = ReplayMemoryConfig::default()
            .capacity(16)
            .history_length(2)
            .frame_size(2, 2);
        let mut memory = ReplayMemory::build(&config).unwrap();
        for t in 0..10u8 {
            memory.append(Array2::from_elem((2, 2), t), 0, 1.0, t == 9);
        }
        memory
    }

    #[test]
    fn test_decay_to_floor() {
        let config = ExpertSamplerConfig::default()
            .initial_prob(1.0)
            .final_prob(0.25)
            .decay_steps(4);
        let mut sampler = ExpertSampler::new(expert_memory(), &config).unwrap();

        assert_eq!(sampler.draw_count(8), 8);
        assert!((sampler.mixing_prob() - 0.8125).abs() < 1e-9);
        let mut last = sampler.mixing_prob();
        for _ in 0..10 {
            sampler.draw_count(8);
            assert!(sampler.mixing_prob() <= last + 1e-9);
            last = sampler.mixing_prob();
        }
        assert!((sampler.mixing_prob() - 0.25).abs() < 1e-9);
        assert_eq!(sampler.draw_count(8), 2);
    }

    #[test]
    fn test_draw_count_rounds() {
        let config = ExpertSamplerConfig::default()
            .initial_prob(0.5)
            .final_prob(0.5)
            .decay_steps(1);
        let mut sampler = ExpertSampler::new(expert_memory(), &config).unwrap();
        assert_eq!(sampler.draw_count(5), 3);
    }

    #[test]
    fn test_rejects_inverted_schedule() {
        let config = ExpertSamplerConfig::default()
            .initial_prob(0.1)
            .final_prob(0.5);
        assert!(ExpertSampler::new(expert_memory(), &config).is_err());
    }
}
