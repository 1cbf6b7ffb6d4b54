//! Value estimator.
use anyhow::Result;
use ndarray::{Array1, Array2, Array4};
use std::path::Path;

/// An external action-value function.
///
/// The trainer treats the network and its optimizer as an opaque
/// collaborator: it only ever asks for Q-values of stacked frame windows
/// and hands back `(states, action mask, targets)` for one gradient step.
/// A second instance of the same estimator serves as the target network;
/// [`ValueEstimator::copy_params_from`] must be a point-in-time full
/// parameter copy.
pub trait ValueEstimator {
    /// Predicts per-action values for a batch of stacked frame windows of
    /// shape `(batch, stack, frame_height, frame_width)`. Returns an array
    /// of shape `(batch, num_actions)`.
    fn predict(&self, states: &Array4<f32>) -> Result<Array2<f32>>;

    /// Performs one optimization step on `(states, action_mask, targets)`
    /// and returns the scalar loss. `action_mask` is one-hot over actions.
    fn train_step(
        &mut self,
        states: &Array4<f32>,
        action_mask: &Array2<f32>,
        targets: &Array1<f32>,
    ) -> Result<f32>;

    /// Hard-copies all parameters from `src` into `self`.
    fn copy_params_from(&mut self, src: &Self) -> Result<()>;

    /// Saves the parameters of the estimator under the given path.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Loads the parameters of the estimator from the given path.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
