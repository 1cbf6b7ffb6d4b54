//! Configuration of [`Trainer`](super::Trainer).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Trainer`](super::Trainer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TrainerConfig {
    /// Discount factor.
    pub gamma: f32,

    /// Size of minibatches sampled for updates.
    pub batch_size: usize,

    /// The total number of environment steps to run.
    pub num_iterations: usize,

    /// Burn-in period, for filling replay memory, in environment steps.
    pub num_burn_in: usize,

    /// Interval of updates in environment steps.
    pub train_freq: usize,

    /// Interval of hard target sync in updates.
    pub target_update_freq: usize,

    /// Interval of checkpointing in environment steps.
    pub save_freq: usize,

    /// Interval of evaluation in updates.
    pub eval_freq: usize,

    /// Episodes longer than this are cut and the environment reset.
    pub max_episode_length: usize,

    /// Number of episodes per evaluation pass.
    pub num_eval_episodes: usize,

    /// Exploration probability at the first step after burn-in.
    pub initial_epsilon: f64,

    /// Floor of the exploration probability.
    pub final_epsilon: f64,

    /// Number of steps over which epsilon decays linearly.
    pub exploration_steps: usize,

    /// Exploration probability used during evaluation.
    pub eval_epsilon: f64,

    /// Selects next-state actions with the online estimator instead of
    /// taking the target estimator's maximum.
    pub double_dqn: bool,

    /// Bootstraps targets from the target estimator; when false the
    /// online estimator is used for targets as well.
    pub use_target: bool,

    /// Where to save estimator checkpoints.
    pub model_dir: Option<String>,

    /// Seed of the action-selection RNG.
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            batch_size: 32,
            num_iterations: 0,
            num_burn_in: 50_000,
            train_freq: 4,
            target_update_freq: 10_000,
            save_freq: usize::MAX,
            eval_freq: usize::MAX,
            max_episode_length: 10_000,
            num_eval_episodes: 20,
            initial_epsilon: 1.0,
            final_epsilon: 0.05,
            exploration_steps: 2_000_000,
            eval_epsilon: 0.05,
            double_dqn: true,
            use_target: true,
            model_dir: None,
            seed: 42,
        }
    }
}

impl TrainerConfig {
    /// Sets the discount factor.
    pub fn gamma(mut self, v: f32) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the minibatch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the total number of environment steps.
    pub fn num_iterations(mut self, v: usize) -> Self {
        self.num_iterations = v;
        self
    }

    /// Sets the burn-in period in environment steps.
    pub fn num_burn_in(mut self, v: usize) -> Self {
        self.num_burn_in = v;
        self
    }

    /// Sets the interval of updates in environment steps.
    pub fn train_freq(mut self, v: usize) -> Self {
        self.train_freq = v;
        self
    }

    /// Sets the interval of hard target sync in updates.
    pub fn target_update_freq(mut self, v: usize) -> Self {
        self.target_update_freq = v;
        self
    }

    /// Sets the interval of checkpointing in environment steps.
    pub fn save_freq(mut self, v: usize) -> Self {
        self.save_freq = v;
        self
    }

    /// Sets the interval of evaluation in updates.
    pub fn eval_freq(mut self, v: usize) -> Self {
        self.eval_freq = v;
        self
    }

    /// Sets the episode length cap.
    pub fn max_episode_length(mut self, v: usize) -> Self {
        self.max_episode_length = v;
        self
    }

    /// Sets the number of episodes per evaluation pass.
    pub fn num_eval_episodes(mut self, v: usize) -> Self {
        self.num_eval_episodes = v;
        self
    }

    /// Sets the epsilon decay schedule.
    pub fn epsilon_schedule(mut self, initial: f64, fin: f64, steps: usize) -> Self {
        self.initial_epsilon = initial;
        self.final_epsilon = fin;
        self.exploration_steps = steps;
        self
    }

    /// Sets the exploration probability used during evaluation.
    pub fn eval_epsilon(mut self, v: f64) -> Self {
        self.eval_epsilon = v;
        self
    }

    /// Enables or disables double-estimator action selection.
    pub fn double_dqn(mut self, v: bool) -> Self {
        self.double_dqn = v;
        self
    }

    /// Enables or disables bootstrapping from the target estimator.
    pub fn use_target(mut self, v: bool) -> Self {
        self.use_target = v;
        self
    }

    /// Sets the directory where checkpoints are saved.
    pub fn model_dir(mut self, v: impl Into<String>) -> Self {
        self.model_dir = Some(v.into());
        self
    }

    /// Sets the seed of the action-selection RNG.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Constructs [`TrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TrainerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_yaml_roundtrip() -> Result<()> {
        let config = TrainerConfig::default()
            .num_iterations(1000)
            .num_burn_in(100)
            .epsilon_schedule(1.0, 0.1, 500)
            .model_dir("some/directory");

        let dir = TempDir::new("trainer_config")?;
        let path = dir.path().join("trainer.yaml");
        config.save(&path)?;
        assert_eq!(TrainerConfig::load(&path)?, config);
        Ok(())
    }
}
