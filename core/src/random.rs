use rand::prelude::*;
use rand::rngs::SmallRng;

/// Source of randomness for placement and random cell selection.
///
/// Injected so hosts decide seeding and tests can script exact outcomes.
pub trait RandomSource {
    /// Uniform integer in `0..bound`. Callers never pass a zero bound.
    fn below(&mut self, bound: usize) -> usize;

    /// `true` with probability `p`, clamped to `[0, 1]`. NaN never succeeds.
    fn chance(&mut self, p: f64) -> bool;
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn below(&mut self, bound: usize) -> usize {
        (**self).below(bound)
    }

    fn chance(&mut self, p: f64) -> bool {
        (**self).chance(p)
    }
}

/// Seeded small-state generator, reproducible for a given seed.
#[derive(Clone, Debug)]
pub struct SeededRandom {
    seed: u64,
    rng: SmallRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SeededRandom {
    fn below(&mut self, bound: usize) -> usize {
        self.rng.random_range(0..bound)
    }

    fn chance(&mut self, p: f64) -> bool {
        if p.is_nan() || p <= 0.0 {
            false
        } else if p >= 1.0 {
            true
        } else {
            self.rng.random_bool(p)
        }
    }
}

/// Fisher–Yates shuffle driven by `rng`.
pub fn shuffle<T, R: RandomSource + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.below(i + 1);
        items.swap(i, j);
    }
}

/// Replays a fixed script of values, for tests that need exact outcomes.
#[cfg(test)]
#[derive(Clone, Debug, Default)]
pub(crate) struct ScriptedRandom {
    picks: alloc::collections::VecDeque<usize>,
    chances: alloc::collections::VecDeque<bool>,
}

#[cfg(test)]
impl ScriptedRandom {
    pub(crate) fn new(picks: &[usize], chances: &[bool]) -> Self {
        Self {
            picks: picks.iter().copied().collect(),
            chances: chances.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
impl RandomSource for ScriptedRandom {
    /// Next scripted pick reduced into range, `0` once the script runs out.
    fn below(&mut self, bound: usize) -> usize {
        self.picks.pop_front().unwrap_or(0) % bound
    }

    /// Next scripted trial, `false` once the script runs out.
    fn chance(&mut self, _p: f64) -> bool {
        self.chances.pop_front().unwrap_or(false)
    }
}
