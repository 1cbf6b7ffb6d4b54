//! Circular experience-replay storage over compact frames.
mod base;
mod batch;
mod config;
pub use base::ReplayMemory;
pub use batch::{NetworkBatch, TransitionBatch, TransitionSample};
pub use config::ReplayMemoryConfig;
