//! Sliding-window segmentation of an IQ trace
//!
//! Windows are fixed-length and non-overlapping: window `i` covers samples
//! `[i * W, (i + 1) * W)` where `W = round(sliding_window * sample_rate)`.
//! A trailing partial window is discarded.

use rustfft::num_complex::Complex;

use crate::error::ModuleError;

/// Tolerance when converting `duration / sliding_window` to a window count,
/// so 1.0 s / 0.1 s gives 10 windows rather than 9
const WINDOW_COUNT_EPSILON: f64 = 1e-6;

/// Window layout for one trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    /// Samples per window
    pub window_samples: usize,
    /// Number of complete windows to extract
    pub num_windows: usize,
}

/// Work out how many windows of `sliding_window` seconds fit in a trace
///
/// # Arguments
///
/// * `total_samples` - Number of samples actually present
/// * `sample_rate` - Sample rate in Hz
/// * `sliding_window` - Window length in seconds
/// * `duration` - Trace duration in seconds as reported by the duration lookup
///
/// # Errors
///
/// `FeatureExtraction` if parameters are not positive or the trace is shorter
/// than a single window.
pub fn plan_windows(
    total_samples: usize,
    sample_rate: f32,
    sliding_window: f32,
    duration: f32,
) -> Result<WindowPlan, ModuleError> {
    if !(sample_rate > 0.0 && sliding_window > 0.0) {
        return Err(ModuleError::FeatureExtraction(format!(
            "sample rate ({}) and sliding window ({}) must be > 0",
            sample_rate, sliding_window
        )));
    }
    if !(duration >= 0.0) {
        return Err(ModuleError::FeatureExtraction(format!(
            "invalid trace duration {}",
            duration
        )));
    }

    let window_samples = (sliding_window as f64 * sample_rate as f64).round() as usize;
    if window_samples == 0 {
        return Err(ModuleError::FeatureExtraction(
            "sliding window is shorter than one sample".to_string(),
        ));
    }

    let by_duration =
        (duration as f64 / sliding_window as f64 + WINDOW_COUNT_EPSILON).floor() as usize;
    let by_samples = total_samples / window_samples;
    if by_duration != by_samples {
        log::debug!(
            "Window count from duration ({}) differs from sample count ({}), using the smaller",
            by_duration,
            by_samples
        );
    }
    let num_windows = by_duration.min(by_samples);

    if num_windows == 0 {
        return Err(ModuleError::FeatureExtraction(format!(
            "trace too short: {} samples, one {:.3} s window needs {}",
            total_samples, sliding_window, window_samples
        )));
    }

    Ok(WindowPlan {
        window_samples,
        num_windows,
    })
}

/// Iterate the complete windows described by `plan`
pub fn sliding_windows<'a>(
    samples: &'a [Complex<f32>],
    plan: &WindowPlan,
) -> impl Iterator<Item = &'a [Complex<f32>]> {
    samples
        .chunks_exact(plan.window_samples)
        .take(plan.num_windows)
}
