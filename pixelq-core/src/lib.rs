#![warn(missing_docs)]
//! A library for training value-based agents on arcade games from raw pixels.
//!
//! The crate provides the storage and orchestration side of off-policy
//! temporal-difference learning: a circular replay memory over compact
//! frames, the preprocessing pipeline that turns raw observations into
//! network-ready tensors, exploration schedules and the training loop
//! itself. The value function is an external collaborator behind the
//! [`ValueEstimator`] trait, the game behind the [`Env`] trait.
pub mod error;
pub use error::PixelqError;

pub mod expert;
pub mod policy;
pub mod preprocess;
pub mod record;
pub mod replay;
pub mod shaping;
pub mod trace;
pub mod util;

mod base;
pub use base::{CompactFrame, Env, EnvStep, NetFrame, RgbFrame, StackedState, ValueEstimator};

mod trainer;
pub use trainer::{Trainer, TrainerConfig, TrainingState};

mod evaluator;
pub use evaluator::Evaluator;
