//! Building blocks for the event simulation.

use crate::gen::Gen;
use rand::distributions::uniform::SampleUniform;
use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::{Rng, RngCore};
use std::ops::Range;

/// Any value in a half-open range, all equally likely.
pub struct Uniform<T> {
    range: Range<T>,
}

impl<T> Gen<T> for Uniform<T>
where
    T: SampleUniform + PartialOrd + Copy,
{
    fn generate(&self, rng: &mut dyn RngCore) -> T {
        rng.gen_range(self.range.start..self.range.end)
    }
}

/// Panics on generation if the range is empty.
pub fn uniform<T>(range: Range<T>) -> Uniform<T> {
    Uniform { range }
}

/// One of a fixed set of items, picked according to its weight.
pub struct WeightedChoice<T> {
    items: Vec<T>,
    index: WeightedIndex<f64>,
}

impl<T: Clone> WeightedChoice<T> {
    /// Fails when a weight is negative or all weights are zero.
    pub fn new(weighted: Vec<(T, f64)>) -> Result<Self, WeightedError> {
        let (items, weights): (Vec<T>, Vec<f64>) = weighted.into_iter().unzip();
        Ok(Self {
            items,
            index: WeightedIndex::new(weights)?,
        })
    }
}

impl<T: Clone> Gen<T> for WeightedChoice<T> {
    fn generate(&self, rng: &mut dyn RngCore) -> T {
        self.items[self.index.sample(rng)].clone()
    }
}

/// Any item of a non-empty list, all equally likely.
pub struct OneOf<T> {
    items: Vec<T>,
}

impl<T: Clone> Gen<T> for OneOf<T> {
    fn generate(&self, rng: &mut dyn RngCore) -> T {
        self.items[rng.gen_range(0..self.items.len())].clone()
    }
}

pub fn one_of<T: Clone>(items: Vec<T>) -> OneOf<T> {
    OneOf { items }
}

/// `true` with probability `p`, clamped to `[0, 1]`.
pub struct Chance {
    p: f64,
}

impl Gen<bool> for Chance {
    fn generate(&self, rng: &mut dyn RngCore) -> bool {
        rng.gen_bool(self.p)
    }
}

pub fn bool_with_prob(p: f64) -> Chance {
    Chance {
        p: if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) },
    }
}

/// Long-tailed count: log-normal around `median`, truncated to `max`.
pub struct LogNormalCount {
    dist: Option<rand_distr::LogNormal<f64>>,
    median: f64,
    max: u32,
}

impl Gen<u32> for LogNormalCount {
    fn generate(&self, rng: &mut dyn RngCore) -> u32 {
        let drawn = match &self.dist {
            Some(dist) => dist.sample(rng),
            None => self.median,
        };
        (drawn as u32).min(self.max)
    }
}

/// An invalid `sigma` degenerates to always drawing `median`.
pub fn log_normal(median: f64, sigma: f64, max: u32) -> LogNormalCount {
    LogNormalCount {
        dist: rand_distr::LogNormal::new(median.ln(), sigma).ok(),
        median,
        max,
    }
}
