//! Error types for the binary classifier module

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while configuring the module or generating results
///
/// None of these are handled inside the crate: every failure propagates to
/// the host, which owns presentation and retry policy.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Invalid module configuration (e.g. a module id that is not an integer)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Directory creation, trace read or results write failed
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        /// Path the failing operation was applied to
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Serialized classifier is missing, corrupt or of an unsupported version
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// EM trace is missing or not in a readable format
    #[error("Trace load error: {0}")]
    TraceLoad(String),

    /// Trace too short, or parameters inconsistent with the trace
    #[error("Feature extraction error: {0}")]
    FeatureExtraction(String),

    /// Classifier could not be applied to the extracted features
    #[error("Prediction error: {0}")]
    Prediction(String),

    /// Results were requested before the module was initialized
    #[error("Module not initialized: call initialize before get_results")]
    NotInitialized,
}

impl ModuleError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ModuleError::Filesystem {
            path: path.into(),
            source,
        }
    }
}
