//! Configuration of [`ReplayMemory`](super::ReplayMemory).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`ReplayMemory`](super::ReplayMemory).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ReplayMemoryConfig {
    /// Maximum number of transitions that can be stored.
    pub capacity: usize,

    /// Number of frames stacked into one network input window.
    pub history_length: usize,

    /// Height of stored frames.
    pub frame_height: usize,

    /// Width of stored frames.
    pub frame_width: usize,

    /// Random seed for sampling.
    pub seed: u64,
}

impl Default for ReplayMemoryConfig {
    fn default() -> Self {
        Self {
            capacity: 1_000_000,
            history_length: 4,
            frame_height: 84,
            frame_width: 84,
            seed: 42,
        }
    }
}

impl ReplayMemoryConfig {
    /// Sets the capacity of the memory.
    pub fn capacity(mut self, v: usize) -> Self {
        self.capacity = v;
        self
    }

    /// Sets the look-back window length.
    pub fn history_length(mut self, v: usize) -> Self {
        self.history_length = v;
        self
    }

    /// Sets the size of stored frames.
    pub fn frame_size(mut self, height: usize, width: usize) -> Self {
        self.frame_height = height;
        self.frame_width = width;
        self
    }

    /// Sets the sampling seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Constructs [`ReplayMemoryConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ReplayMemoryConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
