//! Greedy evaluation of a value estimator.
use crate::{
    policy::GreedyEpsilonPolicy,
    preprocess::{FramePreprocessor, FramePreprocessorConfig, HistoryStack},
    record::{Record, RecordValue::Scalar},
    Env, ValueEstimator,
};
use anyhow::Result;
use ndarray::Axis;
use rand::{rngs::StdRng, SeedableRng};

/// Runs a fixed number of near-greedy episodes and reports the raw,
/// undiscounted return.
///
/// The evaluator owns its own environment instance so that evaluation
/// never disturbs the training environment's episode state. Rewards are
/// accumulated unclipped and unshaped; only the frame pipeline is shared
/// with training.
pub struct Evaluator<E: Env> {
    env: E,
    n_episodes: usize,
    max_episode_length: usize,
    epsilon: f64,
    num_frames: usize,
    preprocessor_config: FramePreprocessorConfig,
    rng: StdRng,
}

impl<E: Env> Evaluator<E> {
    /// Constructs an evaluator with its own environment.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        env_config: &E::Config,
        seed: u64,
        n_episodes: usize,
        max_episode_length: usize,
        epsilon: f64,
        num_frames: usize,
        preprocessor_config: &FramePreprocessorConfig,
    ) -> Result<Self> {
        Ok(Self {
            env: E::build(env_config, seed)?,
            n_episodes,
            max_episode_length,
            epsilon,
            num_frames,
            preprocessor_config: preprocessor_config.clone(),
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Runs the configured number of episodes and returns their mean and
    /// standard deviation of raw episode returns.
    pub fn evaluate<Q: ValueEstimator>(&mut self, qnet: &Q) -> Result<Record> {
        let policy = GreedyEpsilonPolicy::new(self.epsilon);
        let preprocessor = FramePreprocessor::build(&self.preprocessor_config);
        let mut returns = Vec::with_capacity(self.n_episodes);
        let mut lengths = Vec::with_capacity(self.n_episodes);

        for _ in 0..self.n_episodes {
            let mut history = HistoryStack::new(
                self.num_frames,
                self.preprocessor_config.frame_height,
                self.preprocessor_config.frame_width,
            )?;
            let mut obs = self.env.reset()?;
            let mut episode_return = 0f32;
            let mut steps = 0usize;

            loop {
                let frame = preprocessor.process_state_for_network(&obs)?;
                let state = history.process_state_for_network(frame);
                let states = state.insert_axis(Axis(0));
                let q = qnet.predict(&states)?;
                let action = policy.select_action(&q.row(0), &mut self.rng);

                let step = self.env.step(action)?;
                episode_return += step.reward;
                steps += 1;
                obs = step.obs;

                if step.is_done || steps >= self.max_episode_length {
                    break;
                }
            }
            returns.push(episode_return);
            lengths.push(steps as f32);
        }

        let mut record = Record::empty();
        record.insert("eval_reward_mean", Scalar(mean(&returns)));
        record.insert("eval_reward_std", Scalar(std(&returns)));
        record.insert("eval_episode_length", Scalar(mean(&lengths)));
        Ok(record)
    }
}

fn mean(xs: &[f32]) -> f32 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f32>() / xs.len() as f32
}

fn std(xs: &[f32]) -> f32 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    (xs.iter().map(|x| (x - m) * (x - m)).sum::<f32>() / xs.len() as f32).sqrt()
}
