//! Small numeric helpers shared across the crate.
use ndarray::{Array2, ArrayView1};

/// Returns the index of the largest element of `row`.
///
/// Ties resolve to the lowest index, which keeps greedy action selection
/// deterministic for a fixed Q-value estimate.
pub fn argmax(row: &ArrayView1<f32>) -> usize {
    let mut best = 0;
    let mut best_v = f32::MIN;
    for (i, v) in row.iter().enumerate() {
        if *v > best_v {
            best = i;
            best_v = *v;
        }
    }
    best
}

/// Builds a one-hot action mask of shape `(actions.len(), num_actions)`.
pub fn one_hot(actions: &[u32], num_actions: usize) -> Array2<f32> {
    let mut mask = Array2::<f32>::zeros((actions.len(), num_actions));
    for (i, a) in actions.iter().enumerate() {
        mask[[i, *a as usize]] = 1.0;
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&arr1(&[0.1f32, 0.7, 0.3]).view()), 1);
        assert_eq!(argmax(&arr1(&[2.0f32, 2.0]).view()), 0);
        assert_eq!(argmax(&arr1(&[-1.0f32, -3.0]).view()), 0);
    }

    #[test]
    fn test_one_hot() {
        let mask = one_hot(&[1, 0], 3);
        assert_eq!(mask[[0, 1]], 1.0);
        assert_eq!(mask[[0, 0]], 0.0);
        assert_eq!(mask[[1, 0]], 1.0);
        assert_eq!(mask.sum(), 2.0);
    }
}
