//! Deterministic dataset splits.
//!
//! The held-out test partition is a seeded permutation; the per-epoch
//! validation rows are the unshuffled tail of the training partition.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use soil_core::{Error, Result};

/// Row indices of a two-way split
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffles `0..n` with `seed` and holds out `ceil(n * test_fraction)` rows
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Result<SplitIndices> {
    check_fraction(test_fraction)?;
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(Error::Dataset(format!(
            "cannot hold out {n_test} of {n} rows"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: indices,
    })
}

/// Splits `indices` keeping order: the last `fraction` of them become
/// validation rows
pub fn validation_tail_split(indices: &[usize], fraction: f64) -> Result<SplitIndices> {
    check_fraction(fraction)?;
    let split_at = (indices.len() as f64 * (1.0 - fraction)) as usize;
    if split_at == 0 || split_at >= indices.len() {
        return Err(Error::Dataset(format!(
            "validation fraction {fraction} leaves an empty side of {} rows",
            indices.len()
        )));
    }
    Ok(SplitIndices {
        train: indices[..split_at].to_vec(),
        test: indices[split_at..].to_vec(),
    })
}

fn check_fraction(fraction: f64) -> Result<()> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(Error::InvalidArgument(format!(
            "split fraction must be in (0, 1), got {fraction}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_split_sizes() {
        let split = train_test_split(4400, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 880);
        assert_eq!(split.train.len(), 3520);

        let split = train_test_split(11, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 3);
    }

    #[test]
    fn test_split_is_partition() {
        let split = train_test_split(100, 0.2, 1).unwrap();
        let all: HashSet<_> = split.train.iter().chain(&split.test).copied().collect();
        assert_eq!(all.len(), 100);
        assert!(all.iter().all(|&i| i < 100));
    }

    #[test]
    fn test_split_is_reproducible() {
        assert_eq!(
            train_test_split(500, 0.2, 42).unwrap(),
            train_test_split(500, 0.2, 42).unwrap()
        );
        assert_ne!(
            train_test_split(500, 0.2, 42).unwrap(),
            train_test_split(500, 0.2, 43).unwrap()
        );
    }

    #[test]
    fn test_validation_tail_keeps_order() {
        let indices: Vec<usize> = (10..20).collect();
        let split = validation_tail_split(&indices, 0.2).unwrap();
        assert_eq!(split.train, (10..18).collect::<Vec<_>>());
        assert_eq!(split.test, vec![18, 19]);
    }

    #[test]
    fn test_invalid_fractions() {
        assert!(train_test_split(10, 0.0, 0).is_err());
        assert!(train_test_split(10, 1.0, 0).is_err());
        assert!(train_test_split(1, 0.5, 0).is_err());
        assert!(validation_tail_split(&[1], 0.2).is_err());
    }
}
