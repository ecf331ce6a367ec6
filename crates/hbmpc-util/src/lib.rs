#![crate_name = "hbmpc_util"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Utilities for the hbmpc library.

use itertools::Itertools;
use num_bigint_dig::{prime::probably_prime, BigUint};
use prime_factorization::Factorization;

/// Returns whether the modulus p is prime; this function is 100% accurate.
pub fn is_prime(p: u64) -> bool {
    probably_prime(&BigUint::from(p), 0)
}

/// Returns the distinct prime factors of `n` in increasing order.
///
/// Returns an empty vector for `n <= 1`.
pub fn prime_factors(n: u64) -> Vec<u64> {
    if n <= 1 {
        return vec![];
    }
    Factorization::run(n)
        .factors
        .into_iter()
        .sorted()
        .dedup()
        .collect_vec()
}

/// Transpose a rectangular matrix given as a vector of rows.
///
/// Panics if the rows do not all have the same length.
pub fn transpose<T: Clone>(rows: &[Vec<T>]) -> Vec<Vec<T>> {
    if rows.is_empty() {
        return vec![];
    }
    let ncols = rows[0].len();
    assert!(
        rows.iter().all(|row| row.len() == ncols),
        "Cannot transpose a ragged matrix"
    );
    (0..ncols)
        .map(|j| rows.iter().map(|row| row[j].clone()).collect_vec())
        .collect_vec()
}
