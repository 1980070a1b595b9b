//! Feature extraction modules
//!
//! Turns an IQ trace into one feature vector per sliding window:
//! - Window segmentation
//! - FFT magnitude spectrum
//! - Spectrum reduction and standardization
//!
//! # Example
//!
//! ```no_run
//! use em_binary_classifier::features::load_predicting_data;
//! use em_binary_classifier::io::{time_duration, TraceFormat};
//! use std::path::Path;
//!
//! let path = Path::new("trace.npy");
//! let duration = time_duration(path, 32e3, TraceFormat::Npy)?;
//! let features = load_predicting_data(path, 32e3, 50, 0.1, duration)?;
//! println!("{} windows x {} features", features.rows(), features.width());
//! # Ok::<(), em_binary_classifier::ModuleError>(())
//! ```

pub mod spectrum;
pub mod vector;
pub mod window;

use std::path::Path;

use crate::config::ExtractionConfig;
use crate::error::ModuleError;
use crate::io::{Trace, TraceFormat};
use spectrum::SpectrumAnalyzer;
use vector::spectrum_to_features;
use window::{plan_windows, sliding_windows};

/// Row-major matrix with one feature vector per window
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    data: Vec<f32>,
    width: usize,
}

impl FeatureMatrix {
    /// Build from row-major data
    ///
    /// # Errors
    ///
    /// `FeatureExtraction` if `width` is zero or does not divide `data.len()`.
    pub fn new(data: Vec<f32>, width: usize) -> Result<Self, ModuleError> {
        if width == 0 || data.len() % width != 0 {
            return Err(ModuleError::FeatureExtraction(format!(
                "{} values cannot form rows of width {}",
                data.len(),
                width
            )));
        }
        Ok(Self { data, width })
    }

    /// Build from individual rows, which must all have the same length
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, ModuleError> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != width) {
            return Err(ModuleError::FeatureExtraction(
                "feature rows have different lengths".to_string(),
            ));
        }
        Self::new(rows.into_iter().flatten().collect(), width)
    }

    /// Number of feature vectors
    pub fn rows(&self) -> usize {
        self.data.len() / self.width
    }

    /// Values per feature vector
    pub fn width(&self) -> usize {
        self.width
    }

    /// Feature vector `i`
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        self.data.chunks_exact(self.width).nth(i)
    }

    /// Iterate feature vectors in window order
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.width)
    }
}

/// Extract one feature vector per window of an in-memory trace
///
/// `duration` bounds the number of windows together with the samples
/// actually present.
pub fn extract_features(
    trace: &Trace,
    config: &ExtractionConfig,
    duration: f32,
) -> Result<FeatureMatrix, ModuleError> {
    let plan = plan_windows(
        trace.len(),
        config.sample_rate,
        config.sliding_window,
        duration,
    )?;

    if plan.window_samples < config.feature_vector_size {
        return Err(ModuleError::FeatureExtraction(format!(
            "window of {} samples cannot yield {} features",
            plan.window_samples, config.feature_vector_size
        )));
    }

    log::debug!(
        "Extracting features: {} windows of {} samples, vector size {}",
        plan.num_windows,
        plan.window_samples,
        config.feature_vector_size
    );

    let mut analyzer = SpectrumAnalyzer::new(plan.window_samples);
    let mut data = Vec::with_capacity(plan.num_windows * config.feature_vector_size);
    for window in sliding_windows(trace.samples(), &plan) {
        let magnitudes = analyzer.magnitude(window);
        data.extend(spectrum_to_features(&magnitudes, config.feature_vector_size)?);
    }

    FeatureMatrix::new(data, config.feature_vector_size)
}

/// Load an NPY trace and build its feature matrix
///
/// # Arguments
///
/// * `path` - NPY trace file
/// * `sample_rate` - IQ sample rate in Hz
/// * `feature_vector_size` - Values per feature vector
/// * `sliding_window` - Window length in seconds
/// * `duration` - Trace duration in seconds (see [`crate::io::time_duration`])
///
/// # Errors
///
/// `TraceLoad` if the trace cannot be read, `FeatureExtraction` if it is too
/// short or the parameters do not fit it.
pub fn load_predicting_data(
    path: &Path,
    sample_rate: f32,
    feature_vector_size: usize,
    sliding_window: f32,
    duration: f32,
) -> Result<FeatureMatrix, ModuleError> {
    let trace = Trace::load(path, sample_rate, TraceFormat::Npy)?;
    let config = ExtractionConfig {
        sample_rate,
        sliding_window,
        feature_vector_size,
    };
    extract_features(&trace, &config, duration)
}
