//! Deterministic utilities for reproducible training
//!
//! Provides the LCG-based RNG behind bootstrap sampling, feature sampling
//! and boosting subsamples, so the same seed always yields the same model.

use std::num::Wrapping;

/// Linear Congruential Generator for deterministic pseudo-randomness
/// Uses constants from Numerical Recipes (glibc)
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<i64>,
}

impl LcgRng {
    // LCG constants (compatible with glibc)
    const MULTIPLIER: i64 = 1103515245;
    const INCREMENT: i64 = 12345;
    const MODULUS: i64 = 1 << 31;

    pub fn new(seed: i64) -> Self {
        Self {
            state: Wrapping(seed.wrapping_abs() % Self::MODULUS),
        }
    }

    /// Child generator for an independent stream (one per tree or fold).
    pub fn fork(&mut self, stream: u64) -> Self {
        let mixed = self.next_i64() ^ (stream as i64).wrapping_mul(0x9E37_79B9);
        Self::new(mixed)
    }

    /// Generate next random i64 in range [0, MODULUS)
    pub fn next_i64(&mut self) -> i64 {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
        self.state.0 & (Self::MODULUS - 1)
    }

    /// Generate random value in range [0, max)
    pub fn next_range(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        (self.next_i64() as u64 % max as u64) as usize
    }

    /// Uniform value in [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        self.next_i64() as f64 / Self::MODULUS as f64
    }

    /// `n` draws from `0..len` with replacement.
    pub fn bootstrap(&mut self, len: usize, n: usize) -> Vec<usize> {
        (0..n).map(|_| self.next_range(len)).collect()
    }

    /// `k` distinct values from `0..len`, ascending.
    ///
    /// Partial Fisher-Yates; `k >= len` returns the full range.
    pub fn sample_distinct(&mut self, len: usize, k: usize) -> Vec<usize> {
        let mut pool: Vec<usize> = (0..len).collect();
        let k = k.min(len);
        for i in 0..k {
            let j = i + self.next_range(len - i);
            pool.swap(i, j);
        }
        pool.truncate(k);
        pool.sort_unstable();
        pool
    }
}
