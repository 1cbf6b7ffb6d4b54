//! Observation preprocessing: frame compaction and history stacking.
mod frame;
mod history;
pub use frame::{FramePreprocessor, FramePreprocessorConfig};
pub use history::HistoryStack;
