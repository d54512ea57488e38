//! Holdout разбиение train/test

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Перемешивание с фиксированным seed, без стратификации.
/// В тест уходит ceil(n * test_size) строк.
pub fn train_test_split(n_samples: usize, test_size: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::InvalidParameter {
            name: "test_size".to_string(),
            value: test_size.to_string(),
            reason: "must be in (0, 1)".to_string(),
        });
    }

    let n_test = (n_samples as f64 * test_size).ceil() as usize;
    if n_samples < 2 || n_test >= n_samples {
        return Err(PipelineError::InsufficientData(format!(
            "cannot split {} rows with test_size {}",
            n_samples, test_size
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: indices,
    })
}
