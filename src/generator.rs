use anyhow::{Result, ensure};
use clap::ValueEnum;
use rand::distr::{Distribution, Uniform};
use rand::{SeedableRng, rngs::SmallRng, seq::SliceRandom};
use rand_distr::Zipf;
use serde::Deserialize;

/// How keys are picked for the mixed workload.
#[derive(Debug, Default, Copy, Clone, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDistribution {
    /// Every key is equally likely
    #[default]
    Uniform,
    /// key1 is the hottest key, popularity falls off with rank
    Zipfian,
}

enum Sampler {
    Uniform(Uniform<u64>),
    Zipf(Zipf<f64>),
}

/// The single random source of a generation run: key sampling and the
/// final shuffle both draw from the same rng.
pub struct KeyGen {
    sampler: Sampler,
    rng: SmallRng,
}

impl KeyGen {
    pub fn new(
        distribution: KeyDistribution,
        key_count: u64,
        zipf_exponent: f64,
        seed: u64,
    ) -> Result<Self> {
        ensure!(key_count > 0, "Cannot sample keys from an empty key space");
        let sampler = match distribution {
            KeyDistribution::Uniform => Sampler::Uniform(Uniform::new_inclusive(1, key_count)?),
            KeyDistribution::Zipfian => Sampler::Zipf(Zipf::new(key_count as f64, zipf_exponent)?),
        };
        Ok(KeyGen { sampler, rng: SmallRng::seed_from_u64(seed) })
    }

    /// Draws a key index in `[1, key_count]`, with replacement.
    pub fn next_key(&mut self) -> u64 {
        match &self.sampler {
            Sampler::Uniform(u) => u.sample(&mut self.rng),
            Sampler::Zipf(z) => z.sample(&mut self.rng) as u64,
        }
    }

    /// Unbiased in-place permutation.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}
