//! Discrete Gaussian sampling

use rand::Rng;

/// Standard deviation of the error distribution
pub const DEFAULT_SIGMA: f64 = 3.2;

/// Discrete Gaussian sampler with standard deviation σ
#[derive(Debug, Clone)]
pub struct GaussianSampler {
    sigma: f64,
    /// Samples are clamped to ±tailcut
    tailcut: i64,
}

impl Default for GaussianSampler {
    fn default() -> Self {
        Self::new(DEFAULT_SIGMA)
    }
}

impl GaussianSampler {
    /// Create a new Gaussian sampler with given standard deviation
    pub fn new(sigma: f64) -> Self {
        Self {
            sigma,
            tailcut: (6.0 * sigma).ceil() as i64,
        }
    }

    /// Sample from discrete Gaussian distribution
    ///
    /// Box-Muller transform with rounding, truncated at 6σ.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> i64 {
        // u1 in (0, 1] keeps ln finite
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = rng.gen();

        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        let sample = (z * self.sigma).round() as i64;

        sample.clamp(-self.tailcut, self.tailcut)
    }

    /// Sample a vector of n discrete Gaussian values
    pub fn sample_vec<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<i64> {
        (0..n).map(|_| self.sample(rng)).collect()
    }

    /// Get the standard deviation
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Bound on the absolute value of any sample
    pub fn tailcut(&self) -> i64 {
        self.tailcut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_gaussian_distribution() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(42);
        let sampler = GaussianSampler::new(3.2);

        let samples: Vec<i64> = (0..10000).map(|_| sampler.sample(&mut rng)).collect();

        let mean: f64 = samples.iter().map(|&x| x as f64).sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.5, "Mean {} should be close to 0", mean);

        let variance: f64 = samples
            .iter()
            .map(|&x| (x as f64 - mean).powi(2))
            .sum::<f64>()
            / samples.len() as f64;
        let std_dev = variance.sqrt();
        assert!(
            (std_dev - 3.2).abs() < 0.5,
            "Std dev {} should be close to 3.2",
            std_dev
        );
    }

    #[test]
    fn test_samples_respect_tailcut() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(123);
        let sampler = GaussianSampler::default();

        let samples = sampler.sample_vec(5000, &mut rng);
        assert_eq!(samples.len(), 5000);
        assert!(samples.iter().all(|s| s.abs() <= sampler.tailcut()));
    }
}
