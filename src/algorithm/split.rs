//! Seeded train/validation splitting

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};

/// Shuffle `0..n` with a seeded rng and split off the validation fraction.
///
/// Returns `(train_indices, validation_indices)`. Fails when either side of
/// the split would be empty.
pub fn train_validation_split(
    n: usize,
    validation_split: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if n == 0 {
        return Err(Error::Training(
            "no labeled rows available for training".to_string(),
        ));
    }
    if !(0.0..1.0).contains(&validation_split) {
        return Err(Error::Training(format!(
            "validation split must be in [0, 1), got {validation_split}"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_validation = ((n as f64) * validation_split).round() as usize;
    if n_validation == 0 || n_validation >= n {
        return Err(Error::Training(format!(
            "split of {n} rows at {validation_split} leaves an empty side"
        )));
    }

    let validation = indices.split_off(n - n_validation);
    Ok((indices, validation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_deterministic_for_a_seed() {
        let (train_a, val_a) = train_validation_split(100, 0.2, 42).unwrap();
        let (train_b, val_b) = train_validation_split(100, 0.2, 42).unwrap();
        assert_eq!(train_a, train_b);
        assert_eq!(val_a, val_b);
    }

    #[test]
    fn split_partitions_all_indices() {
        let (train, validation) = train_validation_split(50, 0.3, 7).unwrap();
        assert_eq!(train.len(), 35);
        assert_eq!(validation.len(), 15);

        let mut all: Vec<usize> = train.iter().chain(validation.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn empty_or_degenerate_splits_fail() {
        assert!(train_validation_split(0, 0.2, 1).is_err());
        assert!(train_validation_split(3, 0.0, 1).is_err());
        assert!(train_validation_split(2, 0.9, 1).is_err());
    }
}
