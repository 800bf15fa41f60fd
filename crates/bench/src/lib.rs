use std::ops::RangeInclusive;
use std::time::Duration;

use criterion::BenchmarkGroup;
use criterion::measurement::Measurement;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SMALL_RUNTIME_SAMPLE_SIZE: usize = 15;
const SMALL_RUNTIME_WARM_UP_MS: u64 = 100;
const SMALL_RUNTIME_MEASURE_MS: u64 = 200;
const LARGE_RUNTIME_SAMPLE_SIZE: usize = 10;
const LARGE_RUNTIME_WARM_UP_MS: u64 = 800;
const LARGE_RUNTIME_MEASURE_MS: u64 = 1500;
const LARGE_INPUT_THRESHOLD: usize = 100_000;
const RNG_SEED: u64 = 0x5EED_2026;
const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

pub fn apply_small_runtime_config<M: Measurement>(group: &mut BenchmarkGroup<'_, M>) {
    group.sample_size(SMALL_RUNTIME_SAMPLE_SIZE);
    group.warm_up_time(Duration::from_millis(SMALL_RUNTIME_WARM_UP_MS));
    group.measurement_time(Duration::from_millis(SMALL_RUNTIME_MEASURE_MS));
}

pub fn apply_large_runtime_config<M: Measurement>(group: &mut BenchmarkGroup<'_, M>) {
    group.sample_size(LARGE_RUNTIME_SAMPLE_SIZE);
    group.warm_up_time(Duration::from_millis(LARGE_RUNTIME_WARM_UP_MS));
    group.measurement_time(Duration::from_millis(LARGE_RUNTIME_MEASURE_MS));
}

/// Small config below `LARGE_INPUT_THRESHOLD` elements, large config above.
pub fn apply_runtime_config_for_size<M: Measurement>(size: usize, group: &mut BenchmarkGroup<'_, M>) {
    if size >= LARGE_INPUT_THRESHOLD {
        apply_large_runtime_config(group);
    } else {
        apply_small_runtime_config(group);
    }
}

pub fn default_rng() -> StdRng {
    StdRng::seed_from_u64(RNG_SEED)
}

/// SplitMix64 finalizer.
pub fn mix_seed(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub fn seed_for(base: u64, salt: u64) -> u64 {
    mix_seed(base ^ salt.wrapping_mul(SEED_MIX))
}

pub fn random_values<R: Rng + ?Sized>(rng: &mut R, len: usize, range: RangeInclusive<i64>) -> Vec<i64> {
    (0..len).map(|_| rng.random_range(range.clone())).collect()
}

/// Non-empty half-open range inside `0..len`. `len` must be positive.
pub fn random_span<R: Rng + ?Sized>(rng: &mut R, len: usize) -> (usize, usize) {
    let start = rng.random_range(0..len);
    let end = rng.random_range((start + 1)..=len);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_stay_in_bounds() {
        let mut rng = default_rng();
        for len in 1..50 {
            let (start, end) = random_span(&mut rng, len);
            assert!(start < end && end <= len);
        }
    }

    #[test]
    fn seeds_differ_by_salt() {
        assert_ne!(seed_for(1, 2), seed_for(1, 3));
        assert_eq!(seed_for(7, 9), seed_for(7, 9));
    }

    #[test]
    fn values_respect_range() {
        let mut rng = default_rng();
        let values = random_values(&mut rng, 100, -5..=5);
        assert_eq!(values.len(), 100);
        assert!(values.iter().all(|v| (-5..=5).contains(v)));
    }
}
