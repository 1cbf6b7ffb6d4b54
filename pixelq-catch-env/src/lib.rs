#![warn(missing_docs)]
//! A small self-contained catch game rendered as RGB pixel frames.
//!
//! A ball falls from the top of a grid, one row per step, and a paddle
//! at the bottom moves left or right to catch it. Catching scores +1,
//! missing scores -1 and costs a life; the game is over when all lives
//! are spent. Observations are raw RGB frames, so the environment
//! exercises the full preprocessing pipeline of `pixelq-core` without
//! any external emulator.
use anyhow::Result;
use ndarray::{s, Array3};
use pixelq_core::{Env, EnvStep, RgbFrame};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const BACKGROUND: [u8; 3] = [16, 16, 32];
const BALL: [u8; 3] = [240, 240, 240];
const PADDLE: [u8; 3] = [200, 80, 80];

/// Configuration of [`CatchEnv`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct CatchEnvConfig {
    /// Number of grid rows.
    pub field_height: usize,

    /// Number of grid columns.
    pub field_width: usize,

    /// Width of the paddle in cells.
    pub paddle_width: usize,

    /// Lives per game.
    pub num_lives: usize,

    /// Rendered pixels per grid cell.
    pub render_scale: usize,
}

impl Default for CatchEnvConfig {
    fn default() -> Self {
        Self {
            field_height: 16,
            field_width: 16,
            paddle_width: 3,
            num_lives: 3,
            render_scale: 4,
        }
    }
}

impl CatchEnvConfig {
    /// Sets the grid size.
    pub fn field_size(mut self, height: usize, width: usize) -> Self {
        self.field_height = height;
        self.field_width = width;
        self
    }

    /// Sets the paddle width in cells.
    pub fn paddle_width(mut self, v: usize) -> Self {
        self.paddle_width = v;
        self
    }

    /// Sets the number of lives per game.
    pub fn num_lives(mut self, v: usize) -> Self {
        self.num_lives = v;
        self
    }

    /// Sets the rendered pixels per grid cell.
    pub fn render_scale(mut self, v: usize) -> Self {
        self.render_scale = v;
        self
    }
}

/// The catch game.
///
/// Actions: `0` stay, `1` move left, `2` move right. A step where the
/// ball reaches the bottom row ends a life-episode when the paddle
/// misses; the ball respawns on the next step. [`CatchEnv::lives`]
/// reports remaining lives so callers can tell a lost life from a
/// finished game.
pub struct CatchEnv {
    config: CatchEnvConfig,
    rng: StdRng,
    ball_row: usize,
    ball_col: usize,
    paddle_col: usize,
    lives: usize,
}

impl CatchEnv {
    fn spawn_ball(&mut self) {
        self.ball_row = 0;
        self.ball_col = self.rng.gen_range(0..self.config.field_width);
    }

    fn paddle_covers(&self, col: usize) -> bool {
        col >= self.paddle_col && col < self.paddle_col + self.config.paddle_width
    }

    fn render(&self) -> RgbFrame {
        let k = self.config.render_scale;
        let h = self.config.field_height * k;
        let w = self.config.field_width * k;
        let mut frame = Array3::zeros((h, w, 3));
        for (c, v) in BACKGROUND.iter().enumerate() {
            frame.slice_mut(s![.., .., c]).fill(*v);
        }
        for (c, v) in BALL.iter().enumerate() {
            frame
                .slice_mut(s![
                    self.ball_row * k..(self.ball_row + 1) * k,
                    self.ball_col * k..(self.ball_col + 1) * k,
                    c
                ])
                .fill(*v);
        }
        let bottom = (self.config.field_height - 1) * k;
        let paddle_end = self.paddle_col + self.config.paddle_width;
        for (c, v) in PADDLE.iter().enumerate() {
            frame
                .slice_mut(s![
                    bottom..bottom + k,
                    self.paddle_col * k..paddle_end * k,
                    c
                ])
                .fill(*v);
        }
        frame
    }
}

impl Env for CatchEnv {
    type Config = CatchEnvConfig;

    fn build(config: &Self::Config, seed: u64) -> Result<Self> {
        let mut env = Self {
            config: config.clone(),
            rng: StdRng::seed_from_u64(seed),
            ball_row: 0,
            ball_col: 0,
            paddle_col: config.field_width / 2,
            lives: config.num_lives,
        };
        env.spawn_ball();
        Ok(env)
    }

    fn num_actions(&self) -> usize {
        3
    }

    fn reset(&mut self) -> Result<RgbFrame> {
        self.lives = self.config.num_lives;
        self.paddle_col = self.config.field_width / 2;
        self.spawn_ball();
        Ok(self.render())
    }

    fn step(&mut self, action: usize) -> Result<EnvStep> {
        let max_paddle = self.config.field_width - self.config.paddle_width;
        match action {
            1 => self.paddle_col = self.paddle_col.saturating_sub(1),
            2 => self.paddle_col = (self.paddle_col + 1).min(max_paddle),
            _ => {}
        }

        let mut reward = 0.0;
        let mut is_done = false;
        if self.ball_row + 1 >= self.config.field_height - 1 {
            // Ball reaches the paddle row this step.
            if self.paddle_covers(self.ball_col) {
                reward = 1.0;
            } else {
                reward = -1.0;
                self.lives = self.lives.saturating_sub(1);
                is_done = true;
            }
            self.spawn_ball();
        } else {
            self.ball_row += 1;
        }

        Ok(EnvStep {
            obs: self.render(),
            reward,
            is_done,
        })
    }

    fn lives(&self) -> Option<usize> {
        Some(self.lives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> CatchEnv {
        CatchEnv::build(&CatchEnvConfig::default(), 42).unwrap()
    }

    fn drop_ball(env: &mut CatchEnv, towards_ball: bool) -> EnvStep {
        loop {
            let action = if !towards_ball {
                // Run away from the ball column.
                if env.ball_col > env.config.field_width / 2 {
                    1
                } else {
                    2
                }
            } else if env.ball_col < env.paddle_col {
                1
            } else if env.ball_col >= env.paddle_col + env.config.paddle_width {
                2
            } else {
                0
            };
            let step = env.step(action).unwrap();
            if step.reward != 0.0 {
                return step;
            }
        }
    }

    #[test]
    fn test_frame_shape() {
        let mut env = env();
        let obs = env.reset().unwrap();
        assert_eq!(obs.shape(), &[64, 64, 3]);
        assert_eq!(env.num_actions(), 3);
    }

    #[test]
    fn test_catch_rewards_and_keeps_lives() {
        let mut env = env();
        env.reset().unwrap();
        let step = drop_ball(&mut env, true);
        assert_eq!(step.reward, 1.0);
        assert!(!step.is_done);
        assert_eq!(env.lives(), Some(3));
    }

    #[test]
    fn test_miss_costs_a_life_and_ends_episode() {
        let mut env = env();
        env.reset().unwrap();
        let step = drop_ball(&mut env, false);
        assert_eq!(step.reward, -1.0);
        assert!(step.is_done);
        assert_eq!(env.lives(), Some(2));
    }

    #[test]
    fn test_game_over_at_zero_lives() {
        let mut env = env();
        env.reset().unwrap();
        for _ in 0..3 {
            drop_ball(&mut env, false);
        }
        assert_eq!(env.lives(), Some(0));
        env.reset().unwrap();
        assert_eq!(env.lives(), Some(3));
    }

    #[test]
    fn test_deterministic_under_seed() {
        let mut a = CatchEnv::build(&CatchEnvConfig::default(), 7).unwrap();
        let mut b = CatchEnv::build(&CatchEnvConfig::default(), 7).unwrap();
        a.reset().unwrap();
        b.reset().unwrap();
        for action in [0, 1, 2, 2, 1, 0, 2] {
            let sa = a.step(action).unwrap();
            let sb = b.step(action).unwrap();
            assert_eq!(sa.obs, sb.obs);
            assert_eq!(sa.reward, sb.reward);
        }
    }
}
