//! Fractal Brownian motion over 2-D simplex noise.
//!
//! Octaves are summed with rising frequency and falling amplitude, so the
//! field has broad hills with finer bumps on top.

use noise::{NoiseFn, Simplex};

/// Octave settings for an [`FbmField`].
#[derive(Clone, Debug, PartialEq)]
pub struct FbmParams {
    pub seed: u64,
    pub octaves: u32,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves.
    pub gain: f64,
    /// Frequency of the first octave, in cycles per block.
    pub frequency: f64,
    /// Amplitude of the first octave, in blocks.
    pub amplitude: f64,
}

impl Default for FbmParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 4,
            lacunarity: 2.0,
            gain: 0.5,
            frequency: 0.008,
            amplitude: 18.0,
        }
    }
}

/// A seeded fBm field. Cheap to sample from many threads.
pub struct FbmField {
    noise: Simplex,
    params: FbmParams,
    /// Sum of all octave amplitudes; no sample exceeds it in magnitude.
    bound: f64,
}

impl FbmField {
    /// Builds the field and its amplitude bound.
    pub fn new(params: FbmParams) -> Self {
        let bound = (0..params.octaves)
            .map(|octave| params.amplitude * params.gain.powi(octave as i32))
            .sum();
        Self {
            noise: Simplex::new(fold_seed(params.seed)),
            params,
            bound,
        }
    }

    /// Field value at a horizontal block position, within `±bound()`.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let p = &self.params;
        let (total, _, _) = (0..p.octaves).fold(
            (0.0, p.frequency, p.amplitude),
            |(total, freq, amp), _| {
                let value = self.noise.get([x * freq, y * freq]);
                (total + value * amp, freq * p.lacunarity, amp * p.gain)
            },
        );
        total
    }

    /// [`sample`](Self::sample) scaled into `[-1, 1]`.
    pub fn sample_unit(&self, x: f64, y: f64) -> f64 {
        if self.bound > 0.0 {
            self.sample(x, y) / self.bound
        } else {
            0.0
        }
    }

    /// Largest absolute value `sample` can return.
    pub fn bound(&self) -> f64 {
        self.bound
    }

    /// Parameters the field was built with.
    pub fn params(&self) -> &FbmParams {
        &self.params
    }
}

/// Simplex takes a 32-bit seed; fold the high half in so seeds differing
/// only in their upper bits still differ.
fn fold_seed(seed: u64) -> u32 {
    (seed ^ (seed >> 32)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_field() {
        let params = FbmParams {
            seed: 42,
            ..Default::default()
        };
        let a = FbmField::new(params.clone());
        let b = FbmField::new(params);
        assert_eq!(a.sample(100.0, 200.0), b.sample(100.0, 200.0));
    }

    #[test]
    fn test_samples_stay_within_bound() {
        let field = FbmField::new(FbmParams::default());
        for i in 0..60 {
            for j in 0..60 {
                let (x, y) = (i as f64 * 7.3, j as f64 * 5.9);
                assert!(field.sample(x, y).abs() <= field.bound() + 1e-9);
                assert!(field.sample_unit(x, y).abs() <= 1.0 + 1e-9);
            }
        }
    }

    #[test]
    fn test_bound_is_geometric_sum() {
        let field = FbmField::new(FbmParams {
            amplitude: 1000.0,
            gain: 0.5,
            octaves: 4,
            ..Default::default()
        });
        assert!((field.bound() - 1875.0).abs() < 1e-9);
    }

    #[test]
    fn test_high_seed_bits_matter() {
        assert_ne!(fold_seed(1), fold_seed(1 | (1 << 40)));
    }

    #[test]
    fn test_zero_octaves_is_flat() {
        let field = FbmField::new(FbmParams {
            octaves: 0,
            ..Default::default()
        });
        assert_eq!(field.sample(3.0, 4.0), 0.0);
        assert_eq!(field.sample_unit(3.0, 4.0), 0.0);
    }
}
