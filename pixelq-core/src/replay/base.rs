//! Fixed-capacity circular transition store.
use super::{ReplayMemoryConfig, TransitionBatch, TransitionSample};
use crate::{error::PixelqError, CompactFrame};
use anyhow::Result;
use ndarray::{s, Array2, Array3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

fn sample_rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

/// A fixed-capacity circular store of per-frame transitions.
///
/// One slot holds `(compact frame, action, reward, terminal flag)` of a
/// single environment step. Appends are O(1) and unconditionally overwrite
/// the oldest slot once the store is full; the memory footprint is bounded
/// by `capacity` regardless of episode count. Stacked training windows are
/// reassembled lazily at sampling time from a slot and its temporal
/// neighbors.
///
/// Uniform random sampling over the store approximates an i.i.d. training
/// distribution despite strongly correlated temporal data, which is the
/// justification for experience replay in this class of learner.
#[derive(Serialize, Deserialize)]
pub struct ReplayMemory {
    /// Maximum number of transitions that can be stored.
    capacity: usize,

    /// Look-back window length of assembled samples.
    history_length: usize,

    frame_height: usize,
    frame_width: usize,

    /// Next slot to overwrite.
    i: usize,

    /// Current number of stored transitions, saturating at `capacity`.
    size: usize,

    frames: Vec<CompactFrame>,
    actions: Vec<u32>,
    rewards: Vec<f32>,
    terminals: Vec<bool>,

    /// Random number generator for sampling.
    #[serde(skip, default = "sample_rng")]
    rng: StdRng,
}

impl ReplayMemory {
    /// Creates an empty memory with the given configuration.
    pub fn build(config: &ReplayMemoryConfig) -> Result<Self> {
        if config.capacity == 0 {
            return Err(PixelqError::InvalidArgument("capacity must be positive".into()).into());
        }
        if config.history_length == 0 {
            return Err(
                PixelqError::InvalidArgument("history length must be positive".into()).into(),
            );
        }
        if config.capacity < config.history_length + 2 {
            return Err(PixelqError::InvalidArgument(format!(
                "capacity {} cannot hold a history of {} frames plus a successor",
                config.capacity, config.history_length
            ))
            .into());
        }
        Ok(Self {
            capacity: config.capacity,
            history_length: config.history_length,
            frame_height: config.frame_height,
            frame_width: config.frame_width,
            i: 0,
            size: 0,
            frames: vec![
                Array2::zeros((config.frame_height, config.frame_width));
                config.capacity
            ],
            actions: vec![0; config.capacity],
            rewards: vec![0.0; config.capacity],
            terminals: vec![false; config.capacity],
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    /// Writes a transition into the current slot and advances the cursor.
    ///
    /// Never fails and never blocks; once the store is full the oldest
    /// slot is overwritten.
    pub fn append(&mut self, state: CompactFrame, action: usize, reward: f32, is_terminal: bool) {
        self.frames[self.i] = state;
        self.actions[self.i] = action as u32;
        self.rewards[self.i] = reward;
        self.terminals[self.i] = is_terminal;
        self.i = (self.i + 1) % self.capacity;
        self.size += 1;
        if self.size >= self.capacity {
            self.size = self.capacity;
        }
    }

    /// Current number of stored transitions.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Maximum number of transitions that can be stored.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Next physical slot to overwrite.
    pub fn write_cursor(&self) -> usize {
        self.i
    }

    /// Look-back window length of assembled samples.
    pub fn history_length(&self) -> usize {
        self.history_length
    }

    /// Returns the transition at the given logical index (0 = oldest),
    /// or `None` when out of range.
    pub fn transition_at(&self, logical: usize) -> Option<(&CompactFrame, u32, f32, bool)> {
        if logical >= self.size {
            return None;
        }
        let p = self.physical(logical);
        Some((
            &self.frames[p],
            self.actions[p],
            self.rewards[p],
            self.terminals[p],
        ))
    }

    /// Draws `batch_size` training-window transitions uniformly at random.
    ///
    /// Indices come from logical positions with a full look-back window
    /// and an existing successor frame; the first `history_length` slots
    /// and the newest slot are never selected. Samples within one call are
    /// drawn with replacement. The store is not mutated.
    ///
    /// Fails with [`PixelqError::InvalidArgument`] for a zero batch size
    /// and with [`PixelqError::InsufficientData`] until enough transitions
    /// exist.
    pub fn sample(&mut self, batch_size: usize) -> Result<Vec<TransitionSample>> {
        if batch_size == 0 {
            return Err(PixelqError::InvalidArgument("batch size must be positive".into()).into());
        }
        let required = self.history_length + 2;
        if self.size < required {
            return Err(PixelqError::InsufficientData {
                required,
                available: self.size,
            }
            .into());
        }
        let lo = self.history_length;
        let hi = self.size - 1;
        Ok((0..batch_size)
            .map(|_| {
                let ix = self.rng.gen_range(lo..hi);
                self.sample_at(ix)
            })
            .collect())
    }

    /// Samples and packs a minibatch into batch tensors.
    pub fn sample_batch(&mut self, batch_size: usize) -> Result<TransitionBatch> {
        Ok(TransitionBatch::from_samples(&self.sample(batch_size)?))
    }

    /// Saves the memory to a binary dump, e.g. for expert data.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        bincode::serialize_into(file, self)?;
        Ok(())
    }

    /// Loads a memory from a binary dump.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = BufReader::new(File::open(path)?);
        Ok(bincode::deserialize_from(file)?)
    }

    fn physical(&self, logical: usize) -> usize {
        if self.size < self.capacity {
            logical
        } else {
            (self.i + logical) % self.capacity
        }
    }

    fn sample_at(&self, ix: usize) -> TransitionSample {
        let state = self.window(ix, ix);
        let next_state = self.window(ix + 1, ix);
        let p = self.physical(ix);
        TransitionSample {
            state,
            next_state,
            action: self.actions[p],
            reward: self.rewards[p],
            is_terminal: self.terminals[p],
        }
    }

    /// Assembles the stacked window of `history_length` frames ending at
    /// logical index `end`.
    ///
    /// A terminal flag at a logical index strictly before `sampled` marks
    /// an episode boundary inside the look-back window; every frame at or
    /// before the latest such boundary is replaced by the zero frame so a
    /// window never carries cross-episode pixels.
    fn window(&self, end: usize, sampled: usize) -> Array3<u8> {
        let h = self.history_length;
        let start = end + 1 - h;
        let mut boundary = None;
        for j in start..sampled {
            if self.terminals[self.physical(j)] {
                boundary = Some(j);
            }
        }
        let mut out = Array3::zeros((h, self.frame_height, self.frame_width));
        for (k, j) in (start..=end).enumerate() {
            if let Some(b) = boundary {
                if j <= b {
                    continue;
                }
            }
            out.slice_mut(s![k, .., ..])
                .assign(&self.frames[self.physical(j)]);
        }
        out
    }
}
