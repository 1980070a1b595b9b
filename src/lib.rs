//! # EM Binary Classifier
//!
//! Binary classifier module for EM side-channel forensic analysis. The module
//! loads a pre-trained classifier and a captured IQ trace, extracts spectral
//! features over sliding windows, and reports a single class label.
//!
//! ## Features
//!
//! - **Trace I/O**: NPY arrays (complex, float, integer) and raw interleaved IQ
//! - **Feature Extraction**: FFT magnitude spectrum per 0.1 s window, reduced to 50 values
//! - **Classification**: Serialized linear or MLP model, majority vote across windows
//! - **Reporting**: `results.txt` in a per-module results directory
//!
//! ## Quick Start
//!
//! ```no_run
//! use em_binary_classifier::{get_results, initialize};
//!
//! let config = initialize("1", "/data/trace1.npy", "/out")?;
//! let summary = get_results(&config)?;
//!
//! println!("{}", summary); // "Classification: benign"
//! # Ok::<(), em_binary_classifier::ModuleError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Model Load → Trace Duration → Feature Extraction → Prediction → Results File
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod ml;
pub mod module;

use std::path::{Path, PathBuf};

// Re-export main types
pub use config::{ExtractionConfig, ModuleConfig, MODULE_NAME};
pub use error::ModuleError;
pub use ml::{Classifier, ModelArtifact, Prediction};
pub use module::BinaryClassifierModule;

/// Configure a module instance
///
/// Parses `module_id`, creates `results_root/<module_id>` (and any missing
/// parents) and derives the model path from the module name. The directory
/// is named from the id as supplied, so `"007"` gives `results_root/007`.
///
/// # Arguments
///
/// * `module_id` - Integer or integer-like string identifying the module run
/// * `em_trace_path` - EM trace to classify (not checked until results are generated)
/// * `results_root` - Base directory for per-module results
///
/// # Errors
///
/// `Configuration` if `module_id` is not an integer (nothing is created in
/// that case), `Filesystem` if the results directory cannot be created.
///
/// # Example
///
/// ```no_run
/// use em_binary_classifier::initialize;
///
/// let config = initialize(3, "capture.npy", "results")?;
/// assert!(config.results_dir().ends_with("3"));
/// # Ok::<(), em_binary_classifier::ModuleError>(())
/// ```
pub fn initialize(
    module_id: impl ToString,
    em_trace_path: impl Into<PathBuf>,
    results_root: impl AsRef<Path>,
) -> Result<ModuleConfig, ModuleError> {
    log::info!("initializing...");

    let config = ModuleConfig::new(&module_id.to_string(), em_trace_path, results_root)?;

    std::fs::create_dir_all(config.results_dir())
        .map_err(|e| ModuleError::filesystem(config.results_dir(), e))?;

    log::debug!(
        "Module {} configured: results in {}, model at {}",
        config.module_id(),
        config.results_dir().display(),
        config.model_path().display()
    );

    Ok(config)
}

/// Classify the configured trace with the module's stored model
///
/// The model is loaded from [`ModuleConfig::model_path`] on every call.
///
/// # Returns
///
/// `Classification: <label>`; the same label is written to
/// `<results_dir>/results.txt` as `Classification Result: <label>`.
///
/// # Errors
///
/// `ModelLoad`, `TraceLoad`, `FeatureExtraction` and `Prediction` all occur
/// before the results file is opened. `Filesystem` if writing it fails.
pub fn get_results(config: &ModuleConfig) -> Result<String, ModuleError> {
    let classifier = ModelArtifact::load(config.model_path())?;
    get_results_with(config, &classifier)
}

/// Classify the configured trace with a caller-supplied classifier
///
/// Same as [`get_results`] without the model loading step.
pub fn get_results_with<C: Classifier + ?Sized>(
    config: &ModuleConfig,
    classifier: &C,
) -> Result<String, ModuleError> {
    log::info!("generating results...");
    log::info!("EM trace path: {}", config.trace_path().display());
    log::info!("Results directory: {}", config.results_dir().display());

    let extraction = ExtractionConfig::default();

    let duration = io::time_duration(
        config.trace_path(),
        extraction.sample_rate,
        io::TraceFormat::Npy,
    )?;

    let features = features::load_predicting_data(
        config.trace_path(),
        extraction.sample_rate,
        extraction.feature_vector_size,
        extraction.sliding_window,
        duration,
    )?;

    let prediction = ml::predict_class(classifier, &features)?;

    analysis::write_results(config.results_dir(), &prediction)
}
