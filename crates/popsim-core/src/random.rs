//! Seeded random draws shared by every stochastic process of a run.
//!
//! A simulator owns exactly one [`RandomSource`]. Every draw of a run (exit
//! races, birth renewals, child sexes, immigration arrivals and ages) comes
//! from it in a fixed order, so a seed fully determines the trajectory.
//! Reordering calls changes the output.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

/// Uniform, exponential, normal and Bernoulli draws from one seeded stream.
#[derive(Debug, Clone)]
pub struct RandomSource {
    seed: u64,
    rng: ChaCha8Rng,
}

impl RandomSource {
    /// Create a source seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// The seed this stream started from.
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// A draw from `U[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// A draw from `Exp(rate)` by inversion: `-ln(1 - u) / rate`.
    ///
    /// One uniform is consumed even when `rate <= 0`; such a process never
    /// fires, so the result is `+inf`.
    pub fn exponential(&mut self, rate: f64) -> f64 {
        let u = self.uniform();
        if rate <= 0.0 {
            return f64::INFINITY;
        }
        -(1.0 - u).ln() / rate
    }

    /// A draw from `N(mean, sd^2)`.
    pub fn normal(&mut self, mean: f64, sd: f64) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        sd.mul_add(z, mean)
    }

    /// `true` with probability `p`.
    pub fn bernoulli(&mut self, p: f64) -> bool {
        self.uniform() < p
    }
}

/// Round to the nearest integer with ties going up: `floor(x + 0.5)`.
///
/// Saturates at the `i64` range; `+inf` (a process that never fires) maps to
/// `i64::MAX` and NaN maps to 0.
#[allow(clippy::cast_possible_truncation)]
pub fn round_half_up(x: f64) -> i64 {
    // `as` saturates for out-of-range floats.
    (x + 0.5).floor() as i64
}

/// Truncate a non-negative offset toward zero, saturating like [`round_half_up`].
#[allow(clippy::cast_possible_truncation)]
pub fn floor_offset(x: f64) -> i64 {
    x.floor() as i64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = RandomSource::new(7);
        let mut b = RandomSource::new(7);
        for _ in 0..100 {
            assert!((a.uniform() - b.uniform()).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn uniform_in_unit_interval() {
        let mut source = RandomSource::new(3);
        for _ in 0..10_000 {
            let u = source.uniform();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn exponential_is_non_negative_with_expected_mean() {
        let mut source = RandomSource::new(5);
        let n = 20_000;
        let mut sum = 0.0;
        for _ in 0..n {
            let x = source.exponential(2.0);
            assert!(x >= 0.0);
            sum += x;
        }
        let mean = sum / f64::from(n);
        assert!((mean - 0.5).abs() < 0.02, "mean was {mean}");
    }

    #[test]
    fn zero_rate_never_fires_but_consumes_a_draw() {
        let mut a = RandomSource::new(9);
        let mut b = RandomSource::new(9);
        assert!(a.exponential(0.0).is_infinite());
        let _ = b.uniform();
        assert!((a.uniform() - b.uniform()).abs() < f64::EPSILON);
    }

    #[test]
    fn normal_has_expected_moments() {
        let mut source = RandomSource::new(13);
        let n = 20_000;
        let draws: Vec<f64> = (0..n).map(|_| source.normal(30.0, 10.0)).collect();
        let mean = draws.iter().sum::<f64>() / f64::from(n);
        let var = draws.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / f64::from(n);
        assert!((mean - 30.0).abs() < 0.5, "mean was {mean}");
        assert!((var.sqrt() - 10.0).abs() < 0.5, "sd was {}", var.sqrt());
    }

    #[test]
    fn bernoulli_extremes() {
        let mut source = RandomSource::new(1);
        assert!((0..100).all(|_| source.bernoulli(1.0)));
        assert!((0..100).all(|_| !source.bernoulli(0.0)));
    }

    #[test]
    fn rounding_ties_go_up() {
        assert_eq!(round_half_up(0.5), 1);
        assert_eq!(round_half_up(0.499_999), 0);
        assert_eq!(round_half_up(1.5), 2);
        assert_eq!(round_half_up(2.49), 2);
        assert_eq!(round_half_up(0.0), 0);
        assert_eq!(round_half_up(-0.0), 0);
        assert_eq!(round_half_up(-0.5), 0);
        assert_eq!(round_half_up(-0.6), -1);
    }

    #[test]
    fn rounding_saturates() {
        assert_eq!(round_half_up(f64::INFINITY), i64::MAX);
        assert_eq!(floor_offset(f64::INFINITY), i64::MAX);
        assert_eq!(floor_offset(0.999), 0);
        assert_eq!(floor_offset(3.2), 3);
    }
}
