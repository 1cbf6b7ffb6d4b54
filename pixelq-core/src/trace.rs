//! Episode traces and their conversion into replay memory.
//!
//! A trace records one episode as raw RGB observations plus the actions
//! and rewards taken, without any preprocessing applied. Traces are the
//! portable interchange format for demonstrations: they can be dumped
//! during play and later replayed through a [`FramePreprocessor`] to
//! build an expert [`ReplayMemory`] with the exact same frame pipeline
//! as live training.
use crate::{
    preprocess::FramePreprocessor,
    replay::{ReplayMemory, ReplayMemoryConfig},
    PixelqError, RgbFrame,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

/// One recorded episode of raw observations, actions and rewards.
///
/// `states` holds one more entry than `actions`/`rewards`/`dones` when
/// the trailing observation of the episode was captured; the conversion
/// splices it into memory the same way the live loop does.
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct EpisodeTrace {
    /// Raw RGB observations.
    pub states: Vec<RgbFrame>,

    /// Actions taken at each observation.
    pub actions: Vec<u32>,

    /// Raw rewards received after each action.
    pub rewards: Vec<f32>,

    /// Episode-termination flags.
    pub dones: Vec<bool>,
}

impl EpisodeTrace {
    /// Creates an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one step to the trace.
    pub fn push(&mut self, state: RgbFrame, action: u32, reward: f32, done: bool) {
        self.states.push(state);
        self.actions.push(action);
        self.rewards.push(reward);
        self.dones.push(done);
    }

    /// Appends the trailing observation of a finished episode.
    pub fn push_final_state(&mut self, state: RgbFrame) {
        self.states.push(state);
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the trace holds no steps.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Saves the trace with bincode.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        bincode::serialize_into(file, self)?;
        Ok(())
    }

    /// Loads a trace dumped with [`EpisodeTrace::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = BufReader::new(File::open(path)?);
        Ok(bincode::deserialize_from(file)?)
    }
}

/// Replays traces through the frame pipeline into a fresh memory.
///
/// Each step is preprocessed and appended exactly as the live training
/// loop would; a trailing observation beyond the last step is spliced in
/// with the last action, zero reward and the last done flag so that the
/// final transition of the episode has its successor frame available.
pub fn traces_to_memory(
    traces: &[EpisodeTrace],
    preprocessor: &FramePreprocessor,
    config: &ReplayMemoryConfig,
) -> Result<ReplayMemory> {
    let mut memory = ReplayMemory::build(config)?;
    for trace in traces {
        let n = trace.len();
        if trace.rewards.len() != n || trace.dones.len() != n {
            return Err(PixelqError::InvalidArgument(
                "trace actions, rewards and dones must have equal length".into(),
            )
            .into());
        }
        if trace.states.len() != n && trace.states.len() != n + 1 {
            return Err(PixelqError::InvalidArgument(format!(
                "trace with {} steps must hold {} or {} states, got {}",
                n,
                n,
                n + 1,
                trace.states.len()
            ))
            .into());
        }
        for t in 0..n {
            let frame = preprocessor.process_state_for_memory(&trace.states[t])?;
            let reward = preprocessor.process_reward(trace.rewards[t]);
            memory.append(frame, trace.actions[t] as usize, reward, trace.dones[t]);
        }
        if trace.states.len() == n + 1 && n > 0 {
            let frame = preprocessor.process_state_for_memory(&trace.states[n])?;
            memory.append(frame, trace.actions[n - 1] as usize, 0.0, trace.dones[n - 1]);
        }
    }
    Ok(memory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::FramePreprocessorConfig;
    use ndarray::Array3;
    use tempdir::TempDir;

    fn obs(v: u8) -> RgbFrame {
        Array3::from_elem((4, 4, 3), v)
    }

    fn trace_with_final_state() -> EpisodeTrace {
        let mut trace = EpisodeTrace::new();
        for t in 0..5u8 {
            trace.push(obs(t * 10), t as u32 % 3, t as f32, t == 4);
        }
        trace.push_final_state(obs(50));
        trace
    }

    #[test]
    fn test_matches_live_appends() {
        let preproc_config = FramePreprocessorConfig::default().frame_size(4, 4);
        let preprocessor = FramePreprocessor::build(&preproc_config);
        let memory_config = ReplayMemoryConfig::default()
            .capacity(32)
            .history_length(2)
            .frame_size(4, 4);
        let trace = trace_with_final_state();

        let converted =
            traces_to_memory(&[trace.clone()], &preprocessor, &memory_config).unwrap();

        let mut live = ReplayMemory::build(&memory_config).unwrap();
        for t in 0..5usize {
            let frame = preprocessor
                .process_state_for_memory(&trace.states[t])
                .unwrap();
            live.append(frame, trace.actions[t] as usize, trace.rewards[t], trace.dones[t]);
        }
        let last = preprocessor
            .process_state_for_memory(&trace.states[5])
            .unwrap();
        live.append(last, trace.actions[4] as usize, 0.0, trace.dones[4]);

        assert_eq!(converted.len(), live.len());
        for logical in 0..live.len() {
            let a = converted.transition_at(logical).unwrap();
            let b = live.transition_at(logical).unwrap();
            assert_eq!(a.0, b.0);
            assert_eq!(a.1, b.1);
            assert_eq!(a.2, b.2);
            assert_eq!(a.3, b.3);
        }
        // The spliced trailing row carries the last action, zero reward
        // and the terminal flag.
        let tail = converted.transition_at(5).unwrap();
        assert_eq!(tail.1, 1);
        assert_eq!(tail.2, 0.0);
        assert!(tail.3);
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let preprocessor = FramePreprocessor::build(&FramePreprocessorConfig::default());
        let config = ReplayMemoryConfig::default().capacity(8).history_length(2);
        let mut trace = EpisodeTrace::new();
        trace.push(obs(0), 0, 0.0, false);
        trace.states.push(obs(1));
        trace.states.push(obs(2));
        assert!(traces_to_memory(&[trace], &preprocessor, &config).is_err());
    }

    #[test]
    fn test_bincode_roundtrip() {
        let dir = TempDir::new("trace").unwrap();
        let path = dir.path().join("episode.trace");
        let trace = trace_with_final_state();
        trace.save(&path).unwrap();
        let loaded = EpisodeTrace::load(&path).unwrap();
        assert_eq!(loaded.len(), trace.len());
        assert_eq!(loaded.states.len(), trace.states.len());
        assert_eq!(loaded.actions, trace.actions);
        assert_eq!(loaded.rewards, trace.rewards);
        assert_eq!(loaded.dones, trace.dones);
        assert_eq!(loaded.states[3], trace.states[3]);
    }
}
