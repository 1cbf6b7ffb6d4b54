//! Sampled transitions and their batched forms.
use ndarray::{s, Array3, Array4};

/// One training-window transition assembled at sampling time.
///
/// `state` and `next_state` are stacked compact frame windows differing by
/// exactly one frame shift; they are derived from the store, never held by
/// it.
#[derive(Debug)]
pub struct TransitionSample {
    /// Stacked window of compact frames ending at the sampled index,
    /// shape `(history_length, h, w)`.
    pub state: Array3<u8>,

    /// The same window shifted by one frame.
    pub next_state: Array3<u8>,

    /// Action taken at the sampled index.
    pub action: u32,

    /// Shape-adjusted reward recorded at the sampled index.
    pub reward: f32,

    /// Terminal flag of the sampled transition.
    pub is_terminal: bool,
}

/// A minibatch of sampled transitions in compact (stored) representation.
pub struct TransitionBatch {
    /// Stacked state windows, shape `(batch, history_length, h, w)`.
    pub states: Array4<u8>,

    /// Stacked next-state windows.
    pub next_states: Array4<u8>,

    /// Actions.
    pub actions: Vec<u32>,

    /// Rewards.
    pub rewards: Vec<f32>,

    /// Terminal flags.
    pub is_terminal: Vec<bool>,
}

impl TransitionBatch {
    /// Packs individual samples into batch tensors.
    ///
    /// Panics if `samples` is empty; callers validate batch sizes before
    /// sampling.
    pub fn from_samples(samples: &[TransitionSample]) -> Self {
        let n = samples.len();
        let shape = samples[0].state.dim();
        let mut states = Array4::<u8>::zeros((n, shape.0, shape.1, shape.2));
        let mut next_states = Array4::<u8>::zeros((n, shape.0, shape.1, shape.2));
        let mut actions = Vec::with_capacity(n);
        let mut rewards = Vec::with_capacity(n);
        let mut is_terminal = Vec::with_capacity(n);
        for (i, sample) in samples.iter().enumerate() {
            states.slice_mut(s![i, .., .., ..]).assign(&sample.state);
            next_states
                .slice_mut(s![i, .., .., ..])
                .assign(&sample.next_state);
            actions.push(sample.action);
            rewards.push(sample.reward);
            is_terminal.push(sample.is_terminal);
        }
        Self {
            states,
            next_states,
            actions,
            rewards,
            is_terminal,
        }
    }

    /// Number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns `true` if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// A minibatch decompacted into network-ready tensors.
pub struct NetworkBatch {
    /// Normalized state windows, shape `(batch, history_length, h, w)`.
    pub states: Array4<f32>,

    /// Normalized next-state windows.
    pub next_states: Array4<f32>,

    /// Actions.
    pub actions: Vec<u32>,

    /// Rewards.
    pub rewards: Vec<f32>,

    /// Terminal flags.
    pub is_terminal: Vec<bool>,
}

impl NetworkBatch {
    /// Number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns `true` if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
