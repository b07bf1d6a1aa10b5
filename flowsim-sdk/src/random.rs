//! Random sources for the flow model.
//!
//! The flow model never touches ambient randomness. Every draw goes through a
//! [`RandomSource`], so a publisher can be seeded for a reproducible run and
//! tests can script the exact sequence of draws.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A source of uniform draws in `[0, 1)`.
pub trait RandomSource {
    /// Next uniform draw in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Returns true with the given probability.
    fn chance(&mut self, probability: f64) -> bool {
        self.next_unit() < probability
    }

    /// A uniform draw from `[low, high)`.
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_unit()
    }
}

impl<S: RandomSource + ?Sized> RandomSource for &mut S {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

impl<S: RandomSource + ?Sized> RandomSource for Box<S> {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

/// A [`RandomSource`] backed by a `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R = StdRng> {
    rng: R,
}

impl RngSource<StdRng> {
    /// A generator seeded from operating system entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// A deterministic generator for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RngSource<R> {
    /// Wrap an existing generator.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed list of draws, cycling back to the start when exhausted.
///
/// Values are clamped into `[0, 1)` when the source is created. An empty list
/// always yields `0.0`.
///
/// # Example
///
/// ```rust
/// use flowsim_sdk::{RandomSource, SequenceSource};
///
/// let mut source = SequenceSource::new([0.25, 0.75]);
/// assert_eq!(source.next_unit(), 0.25);
/// assert_eq!(source.next_unit(), 0.75);
/// assert_eq!(source.next_unit(), 0.25);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SequenceSource {
    values: Vec<f64>,
    pending: VecDeque<f64>,
}

impl SequenceSource {
    /// Create a source that replays `values` in order.
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        let values: Vec<f64> = values
            .into_iter()
            .map(|v| v.clamp(0.0, LARGEST_UNIT))
            .collect();
        Self {
            pending: values.iter().copied().collect(),
            values,
        }
    }
}

impl RandomSource for SequenceSource {
    fn next_unit(&mut self) -> f64 {
        if self.pending.is_empty() {
            self.pending.extend(self.values.iter().copied());
        }
        self.pending.pop_front().unwrap_or(0.0)
    }
}

/// Largest `f64` strictly below 1.0.
const LARGEST_UNIT: f64 = 1.0 - f64::EPSILON / 2.0;
