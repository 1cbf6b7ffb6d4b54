//! Core functionalities.
mod env;
mod estimator;
pub use env::{CompactFrame, Env, EnvStep, NetFrame, RgbFrame, StackedState};
pub use estimator::ValueEstimator;
