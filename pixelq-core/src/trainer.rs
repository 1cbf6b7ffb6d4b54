//! Training loop orchestration.
mod config;

use crate::{
    evaluator::Evaluator,
    expert::ExpertSampler,
    policy::{ExplorationPolicy, LinearDecayGreedyEpsilonPolicy, UniformRandomPolicy},
    preprocess::{FramePreprocessor, FramePreprocessorConfig, HistoryStack},
    record::{Record, RecordValue::Scalar, Recorder},
    replay::{ReplayMemory, ReplayMemoryConfig, TransitionBatch},
    shaping::{RewardShaper, RewardShaperConfig},
    util::{argmax, one_hot},
    Env, ValueEstimator,
};
use anyhow::{ensure, Result};
pub use config::TrainerConfig;
use log::info;
use ndarray::{Array1, Array2, Axis};
use rand::{rngs::StdRng, SeedableRng};
use std::{fs, path::PathBuf};

/// Counters of a training run, updated as [`Trainer::fit`] progresses
/// and returned when the run finishes.
#[derive(Debug, Clone)]
pub struct TrainingState {
    /// Environment steps taken so far.
    pub env_steps: usize,

    /// Parameter updates performed so far.
    pub updates: usize,

    /// Episodes finished so far.
    pub episodes: usize,

    /// Whether the run is still in the burn-in phase.
    pub burn_in: bool,
}

impl TrainingState {
    fn new(burn_in: bool) -> Self {
        Self {
            env_steps: 0,
            updates: 0,
            episodes: 0,
            burn_in,
        }
    }
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages the training loop and the objects it wires together.
///
/// # Training loop
///
/// One call to [`Trainer::fit`] runs `num_iterations` environment steps:
///
/// 1. The current observation is reduced to a network frame and pushed
///    into the narrow history stack; the stacked window is the estimator
///    input.
/// 2. An action is selected by the exploration policy: uniform random
///    during burn-in (no forward pass), linear-decay epsilon-greedy
///    afterwards.
/// 3. The environment steps; the raw reward flows through shaping
///    (optional normalization and movement bonus) and then reward
///    clipping before the transition is appended to the replay memory.
/// 4. On episode end the trailing frame is spliced into memory with the
///    last action, zero reward and the terminal flag, both history
///    stacks are cleared, and the environment is reset only on true
///    game-over or when the episode exceeds `max_episode_length`.
/// 5. Past burn-in, every `train_freq` steps a minibatch (optionally
///    blended with expert transitions) drives one estimator update;
///    every `train_freq * target_update_freq` steps the target estimator
///    is hard-synced; checkpoints and evaluation passes run on their own
///    cadences.
///
/// # Interaction of objects
///
/// ```mermaid
/// graph LR
///     A[ExplorationPolicy]-->|action|B[Env]
///     B -->|observation, reward|C[FramePreprocessor]
///     C -->|compact frame|D[ReplayMemory]
///     C -->|network frame|E[HistoryStack]
///     E -->|stacked window|F[ValueEstimator]
///     D -->|minibatch|F
///     F -->|Q-values|A
/// ```
pub struct Trainer<E: Env> {
    config: TrainerConfig,
    env_config: E::Config,
    preprocessor_config: FramePreprocessorConfig,
    replay_config: ReplayMemoryConfig,
    shaper_config: RewardShaperConfig,
    expert: Option<ExpertSampler>,
}

impl<E: Env> Trainer<E> {
    /// Constructs a trainer.
    pub fn build(
        config: TrainerConfig,
        env_config: E::Config,
        preprocessor_config: FramePreprocessorConfig,
        replay_config: ReplayMemoryConfig,
        shaper_config: RewardShaperConfig,
    ) -> Self {
        Self {
            config,
            env_config,
            preprocessor_config,
            replay_config,
            shaper_config,
            expert: None,
        }
    }

    /// Attaches an expert sampler whose transitions are blended into
    /// training batches.
    pub fn expert_sampler(mut self, sampler: ExpertSampler) -> Self {
        self.expert = Some(sampler);
        self
    }

    /// Runs the training loop with the given online and target
    /// estimators, writing episode and evaluation records to `recorder`.
    pub fn fit<Q: ValueEstimator>(
        &mut self,
        qnet: &mut Q,
        qnet_tgt: &mut Q,
        recorder: &mut dyn Recorder,
    ) -> Result<TrainingState> {
        let mut env = E::build(&self.env_config, self.config.seed)?;
        let num_actions = env.num_actions();
        let mut preprocessor = FramePreprocessor::build(&self.preprocessor_config);
        let mut memory = ReplayMemory::build(&self.replay_config)?;
        let mut history = HistoryStack::new(
            self.replay_config.history_length,
            self.preprocessor_config.frame_height,
            self.preprocessor_config.frame_width,
        )?;
        let mut mv_history = HistoryStack::new(
            self.shaper_config.movement_frames,
            self.preprocessor_config.frame_height,
            self.preprocessor_config.frame_width,
        )?;
        let mut shaper = RewardShaper::build(&self.shaper_config, num_actions);
        let mut evaluator: Evaluator<E> = Evaluator::new(
            &self.env_config,
            self.config.seed.wrapping_add(1),
            self.config.num_eval_episodes,
            self.config.max_episode_length,
            self.config.eval_epsilon,
            self.replay_config.history_length,
            &self.preprocessor_config,
        )?;
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        qnet_tgt.copy_params_from(qnet)?;

        let mut state = TrainingState::new(self.config.num_burn_in > 0);
        let mut policy = if state.burn_in {
            ExplorationPolicy::UniformRandom(UniformRandomPolicy::new(num_actions))
        } else {
            ExplorationPolicy::LinearDecayGreedyEpsilon(LinearDecayGreedyEpsilonPolicy::new(
                self.config.initial_epsilon,
                self.config.final_epsilon,
                self.config.exploration_steps,
            ))
        };
        let mut obs = env.reset()?;
        let mut episode_length = 0usize;
        let mut episode_reward = 0f32;
        let mut episode_raw_reward = 0f32;
        let mut episode_loss_sum = 0f32;
        let mut episode_loss_count = 0usize;

        for t in 1..=self.config.num_iterations {
            state.env_steps = t;

            let frame = preprocessor.process_state_for_network(&obs)?;
            let stacked = history.process_state_for_network(frame.clone());
            let mv_window = mv_history.process_state_for_network(frame);

            let q_values = if policy.needs_q_values() {
                Some(qnet.predict(&stacked.insert_axis(Axis(0)))?)
            } else {
                None
            };
            let zeros = Array1::<f32>::zeros(num_actions);
            let q_row = match &q_values {
                Some(q) => q.row(0),
                None => zeros.view(),
            };
            let action = policy.select_action(&q_row, &mut rng);

            let step = env.step(action)?;
            let next_frame = preprocessor.process_state_for_network(&step.obs)?;

            if state.burn_in {
                shaper.observe_burn_in(&mv_window, &next_frame, step.reward);
            }
            let bonus = shaper.movement_bonus(&mv_window, &next_frame);
            let shaped = shaper.shape(step.reward, bonus, policy.epsilon(), &mut rng);
            let reward = preprocessor.process_reward(shaped);
            let compact = preprocessor.process_state_for_memory(&obs)?;

            episode_length += 1;
            episode_reward += reward;
            episode_raw_reward += step.reward;

            // An episode cut by the length cap is terminal in memory as
            // well, so sampled windows never span the reset boundary.
            let capped = episode_length >= self.config.max_episode_length;
            let episode_over = step.is_done || capped;
            memory.append(compact, action, reward, episode_over);
            if episode_over {
                // Splice the trailing frame so the final transition has
                // its successor available.
                let last = preprocessor.process_state_for_memory(&step.obs)?;
                memory.append(last, action, 0.0, true);
            }

            if episode_over {
                state.episodes += 1;
                let mut record = Record::from_scalar("episode_reward", episode_reward);
                record.insert("episode_raw_reward", Scalar(episode_raw_reward));
                record.insert("episode_length", Scalar(episode_length as f32));
                record.insert("env_steps", Scalar(t as f32));
                record.insert("epsilon", Scalar(policy.epsilon() as f32));
                if episode_loss_count > 0 {
                    record.insert(
                        "loss",
                        Scalar(episode_loss_sum / episode_loss_count as f32),
                    );
                }
                recorder.write(record);
                info!(
                    "episode {} finished: length {}, raw reward {}, env steps {}",
                    state.episodes, episode_length, episode_raw_reward, t
                );

                let was_burn_in = state.burn_in;
                state.burn_in = t < self.config.num_burn_in;
                if was_burn_in && !state.burn_in {
                    shaper.calibrate();
                    policy = ExplorationPolicy::LinearDecayGreedyEpsilon(
                        LinearDecayGreedyEpsilonPolicy::new(
                            self.config.initial_epsilon,
                            self.config.final_epsilon,
                            self.config.exploration_steps,
                        ),
                    );
                    info!("burn-in finished after {} steps", t);
                }

                history.reset();
                mv_history.reset();
                preprocessor.reset();

                let game_over = env.lives().map_or(true, |l| l == 0);
                if game_over || capped {
                    obs = env.reset()?;
                } else {
                    obs = step.obs;
                }
                episode_length = 0;
                episode_reward = 0.0;
                episode_raw_reward = 0.0;
                episode_loss_sum = 0.0;
                episode_loss_count = 0;
            } else {
                obs = step.obs;
            }

            if state.burn_in {
                continue;
            }

            if t % self.config.train_freq == 0 {
                let loss = self.update(qnet, qnet_tgt, &mut memory, &preprocessor)?;
                state.updates += 1;
                episode_loss_sum += loss;
                episode_loss_count += 1;
            }

            let sync_freq = self
                .config
                .train_freq
                .saturating_mul(self.config.target_update_freq);
            if t % sync_freq == 0 {
                qnet_tgt.copy_params_from(qnet)?;
                info!("synced target estimator at step {}", t);
            }

            if t % self.config.save_freq == 0 {
                if let Some(model_dir) = &self.config.model_dir {
                    save_checkpoint(qnet, model_dir, t);
                }
            }

            let eval_freq = self
                .config
                .train_freq
                .saturating_mul(self.config.eval_freq);
            if t % eval_freq == 0 {
                info!("starting evaluation at step {}", t);
                let mut record = evaluator.evaluate(qnet)?;
                record.insert("env_steps", Scalar(t as f32));
                if let Ok(mean) = record.get_scalar("eval_reward_mean") {
                    info!("evaluation mean reward: {}", mean);
                }
                recorder.write(record);
            }
        }

        if let Some(model_dir) = &self.config.model_dir {
            save_checkpoint(qnet, model_dir, state.env_steps);
        }

        Ok(state)
    }

    /// One estimator update from a sampled minibatch, optionally blended
    /// with expert transitions. Returns the training loss.
    fn update<Q: ValueEstimator>(
        &mut self,
        qnet: &mut Q,
        qnet_tgt: &Q,
        memory: &mut ReplayMemory,
        preprocessor: &FramePreprocessor,
    ) -> Result<f32> {
        let batch_size = self.config.batch_size;
        let samples = match self.expert.as_mut() {
            Some(expert) if !expert.is_empty() => {
                let n_expert = expert.draw_count(batch_size);
                let mut samples = if n_expert > 0 {
                    expert.sample(n_expert)?
                } else {
                    Vec::new()
                };
                if n_expert < batch_size {
                    samples.extend(memory.sample(batch_size - n_expert)?);
                }
                samples
            }
            _ => memory.sample(batch_size)?,
        };
        let batch = preprocessor.process_batch(TransitionBatch::from_samples(&samples));

        let q_next = if self.config.use_target {
            qnet_tgt.predict(&batch.next_states)?
        } else {
            qnet.predict(&batch.next_states)?
        };
        let next_values = if self.config.double_dqn {
            let q_online = qnet.predict(&batch.next_states)?;
            double_estimator_values(&q_online, &q_next)
        } else {
            max_values(&q_next)
        };

        let mut targets = Array1::<f32>::zeros(batch.len());
        for i in 0..batch.len() {
            let mask = if batch.is_terminal[i] { 0.0 } else { 1.0 };
            targets[i] = batch.rewards[i] + self.config.gamma * mask * next_values[i];
        }
        ensure!(
            targets.iter().all(|v| v.is_finite()),
            "non-finite TD target in update"
        );

        let num_actions = q_next.shape()[1];
        let action_mask = one_hot(&batch.actions, num_actions);
        qnet.train_step(&batch.states, &action_mask, &targets)
    }
}

/// Bootstrap values with the action chosen by the online estimator and
/// evaluated by the target estimator.
fn double_estimator_values(q_online: &Array2<f32>, q_target: &Array2<f32>) -> Array1<f32> {
    let values: Vec<f32> = q_online
        .rows()
        .into_iter()
        .zip(q_target.rows())
        .map(|(online, target)| target[argmax(&online)])
        .collect();
    Array1::from(values)
}

/// Row-wise maximum bootstrap values.
fn max_values(q: &Array2<f32>) -> Array1<f32> {
    let values: Vec<f32> = q
        .rows()
        .into_iter()
        .map(|row| row[argmax(&row)])
        .collect();
    Array1::from(values)
}

fn save_checkpoint<Q: ValueEstimator>(qnet: &Q, model_dir: &str, t: usize) {
    let dir = PathBuf::from(model_dir);
    if let Err(e) = fs::create_dir_all(&dir) {
        info!("failed to create checkpoint directory {:?}: {}", dir, e);
        return;
    }
    let path = dir.join(format!("qnet_{}.bin", t));
    match qnet.save_params(&path) {
        Ok(()) => info!("saved estimator parameters in {:?}", path),
        Err(e) => info!("failed to save estimator parameters in {:?}: {}", path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_max_values() {
        let q = array![[1.0f32, 3.0, 2.0], [5.0, 4.0, 4.5]];
        let v = max_values(&q);
        assert_eq!(v, array![3.0, 5.0]);
    }

    #[test]
    fn test_double_estimator_uses_online_action() {
        // Online picks index 1 in both rows; the value comes from the
        // target estimator, not from the target's own maximum.
        let q_online = array![[0.0f32, 2.0, 1.0], [0.0, 9.0, 1.0]];
        let q_target = array![[7.0f32, 0.5, 6.0], [1.0, 0.25, 8.0]];
        let v = double_estimator_values(&q_online, &q_target);
        assert_eq!(v, array![0.5, 0.25]);
        assert!(v[0] < max_values(&q_target)[0]);
    }

    #[test]
    fn test_double_estimator_matches_max_when_estimators_agree() {
        let q = array![[1.0f32, 3.0, 2.0], [5.0, 4.0, 4.5]];
        assert_eq!(double_estimator_values(&q, &q), max_values(&q));
    }
}
