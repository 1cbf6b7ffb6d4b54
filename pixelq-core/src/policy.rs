//! Exploration strategies for action selection.
use crate::util::argmax;
use ndarray::ArrayView1;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Action-selection variants over the same `select_action` capability.
///
/// Which variant is active at a given point of a run is decided by the
/// trainer: uniform random during burn-in, linear decay while training,
/// a fixed low epsilon during evaluation episodes.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum ExplorationPolicy {
    /// Uniform random action selection.
    UniformRandom(UniformRandomPolicy),

    /// Epsilon-greedy with a linearly decayed epsilon.
    LinearDecayGreedyEpsilon(LinearDecayGreedyEpsilonPolicy),

    /// Epsilon-greedy with a fixed epsilon.
    GreedyEpsilon(GreedyEpsilonPolicy),
}

impl ExplorationPolicy {
    /// Selects an action given current Q-value estimates.
    pub fn select_action(&mut self, q_values: &ArrayView1<f32>, rng: &mut impl Rng) -> usize {
        match self {
            Self::UniformRandom(p) => p.select_action(rng),
            Self::LinearDecayGreedyEpsilon(p) => p.select_action(q_values, rng),
            Self::GreedyEpsilon(p) => p.select_action(q_values, rng),
        }
    }

    /// Whether the variant consults Q-values at all. Lets callers skip the
    /// forward pass while the uniform policy is active.
    pub fn needs_q_values(&self) -> bool {
        !matches!(self, Self::UniformRandom(_))
    }

    /// Current exploration probability of the variant.
    pub fn epsilon(&self) -> f64 {
        match self {
            Self::UniformRandom(_) => 1.0,
            Self::LinearDecayGreedyEpsilon(p) => p.epsilon(),
            Self::GreedyEpsilon(p) => p.epsilon,
        }
    }
}

/// Uniform random action selection, used while the replay store fills up.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct UniformRandomPolicy {
    /// Number of discrete actions.
    pub num_actions: usize,
}

impl UniformRandomPolicy {
    /// Constructs a uniform random policy.
    pub fn new(num_actions: usize) -> Self {
        Self { num_actions }
    }

    /// Returns an action uniformly over `[0, num_actions)`.
    pub fn select_action(&self, rng: &mut impl Rng) -> usize {
        rng.gen_range(0..self.num_actions)
    }
}

/// Epsilon-greedy action selection with a linearly decayed epsilon.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct LinearDecayGreedyEpsilonPolicy {
    /// Number of training-mode calls so far.
    pub step: usize,

    /// Epsilon at step 0.
    pub initial_epsilon: f64,

    /// Epsilon floor after decay completes.
    pub final_epsilon: f64,

    /// Number of steps over which epsilon is annealed.
    pub decay_steps: usize,
}

impl LinearDecayGreedyEpsilonPolicy {
    /// Constructs a linear-decay epsilon-greedy policy.
    pub fn new(initial_epsilon: f64, final_epsilon: f64, decay_steps: usize) -> Self {
        Self {
            step: 0,
            initial_epsilon,
            final_epsilon,
            decay_steps,
        }
    }

    /// Epsilon value at the given step.
    pub fn epsilon_at(&self, step: usize) -> f64 {
        let d = (self.initial_epsilon - self.final_epsilon) / self.decay_steps as f64;
        (self.initial_epsilon - d * step as f64).max(self.final_epsilon)
    }

    /// Epsilon value at the current step.
    pub fn epsilon(&self) -> f64 {
        self.epsilon_at(self.step)
    }

    /// Returns the arg-max action with probability `1 - epsilon(step)` and
    /// a uniform random action otherwise; advances the step counter.
    pub fn select_action(&mut self, q_values: &ArrayView1<f32>, rng: &mut impl Rng) -> usize {
        let eps = self.epsilon();
        self.step += 1;
        if rng.gen::<f64>() < eps {
            rng.gen_range(0..q_values.len())
        } else {
            argmax(q_values)
        }
    }
}

/// Epsilon-greedy action selection with a constant, typically small,
/// epsilon; used at evaluation. Carries no step-dependent state.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct GreedyEpsilonPolicy {
    /// Exploration probability.
    pub epsilon: f64,
}

impl GreedyEpsilonPolicy {
    /// Constructs a fixed-epsilon greedy policy.
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    /// Returns the arg-max action with probability `1 - epsilon`.
    pub fn select_action(&self, q_values: &ArrayView1<f32>, rng: &mut impl Rng) -> usize {
        if rng.gen::<f64>() < self.epsilon {
            rng.gen_range(0..q_values.len())
        } else {
            argmax(q_values)
        }
    }
}
