//! Spectrum to feature vector reduction
//!
//! Algorithm:
//! 1. Split the (shifted) magnitude spectrum into `size` contiguous groups;
//!    group `i` covers bins `[i * n / size, (i + 1) * n / size)`
//! 2. Average the magnitudes in each group
//! 3. Convert to dB: `20 * log10(mag + EPSILON)`
//! 4. Standardize to zero mean and unit variance

use crate::error::ModuleError;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Reduce a magnitude spectrum to a standardized feature vector of `size` values
///
/// # Errors
///
/// `FeatureExtraction` if `size` is zero or larger than the spectrum.
pub fn spectrum_to_features(spectrum: &[f32], size: usize) -> Result<Vec<f32>, ModuleError> {
    if size == 0 {
        return Err(ModuleError::FeatureExtraction(
            "Feature vector size must be > 0".to_string(),
        ));
    }
    if spectrum.len() < size {
        return Err(ModuleError::FeatureExtraction(format!(
            "window spectrum has {} bins, fewer than the feature vector size {}",
            spectrum.len(),
            size
        )));
    }

    let n = spectrum.len();
    let mut features: Vec<f32> = (0..size)
        .map(|i| {
            let start = i * n / size;
            let end = (i + 1) * n / size;
            let group = &spectrum[start..end];
            let mean = group.iter().sum::<f32>() / group.len() as f32;
            20.0 * (mean + EPSILON).log10()
        })
        .collect();

    standardize(&mut features);
    Ok(features)
}

/// Scale `values` in place to zero mean and unit variance
///
/// A constant vector has no spread and becomes all zeros.
pub fn standardize(values: &mut [f32]) {
    if values.is_empty() {
        return;
    }

    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;

    // Compare the range rather than the std dev: rounding in `mean` leaves a
    // tiny nonzero variance for constant input
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if max - min <= 1e-6 * (1.0 + mean.abs()) {
        values.iter_mut().for_each(|v| *v = 0.0);
        return;
    }

    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    let std_dev = variance.sqrt();

    for v in values.iter_mut() {
        *v = (*v - mean) / std_dev;
    }
}
