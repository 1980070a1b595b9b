//! Configuration for the binary classifier module

use std::path::{Path, PathBuf};

use crate::error::ModuleError;

/// Name of this module, used to locate its model artifact
pub const MODULE_NAME: &str = "binary-classifier";

/// Directory the host keeps installed modules in
pub const DEFAULT_MODULES_ROOT: &str = "./modules";

/// File name of the serialized classifier inside the module directory
pub const MODEL_FILE_NAME: &str = "ml-model.json";

/// Feature extraction parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {
    /// IQ sample rate in Hz (default: 32000.0)
    pub sample_rate: f32,

    /// Sliding window length in seconds (default: 0.1)
    /// Windows do not overlap; each one yields a single feature vector
    pub sliding_window: f32,

    /// Number of values per feature vector (default: 50)
    pub feature_vector_size: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 32e3,
            sliding_window: 0.1,
            feature_vector_size: 50,
        }
    }
}

impl ExtractionConfig {
    /// Number of samples covered by one sliding window
    pub fn window_samples(&self) -> usize {
        (self.sliding_window as f64 * self.sample_rate as f64).round() as usize
    }
}

/// Per-instance module configuration
///
/// Produced by [`crate::initialize`] and passed explicitly into
/// [`crate::get_results`]. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleConfig {
    module_id: i64,
    trace_path: PathBuf,
    results_dir: PathBuf,
    model_path: PathBuf,
}

impl ModuleConfig {
    /// Build a configuration without touching the filesystem
    ///
    /// The results directory is `results_root/<module_id>`, named from the id
    /// as supplied (so `"007"` stays `007`). The model path is derived from
    /// [`DEFAULT_MODULES_ROOT`] and [`MODULE_NAME`].
    ///
    /// # Errors
    ///
    /// `Configuration` if `module_id` is not an integer.
    pub fn new(
        module_id: &str,
        trace_path: impl Into<PathBuf>,
        results_root: impl AsRef<Path>,
    ) -> Result<Self, ModuleError> {
        let id = parse_module_id(module_id)?;
        Ok(Self {
            module_id: id,
            trace_path: trace_path.into(),
            results_dir: results_root.as_ref().join(module_id.trim()),
            model_path: model_path_in(Path::new(DEFAULT_MODULES_ROOT)),
        })
    }

    /// Re-derive the model path under a different modules root
    pub fn with_modules_root(mut self, modules_root: impl AsRef<Path>) -> Self {
        self.model_path = model_path_in(modules_root.as_ref());
        self
    }

    /// Integer module identifier
    pub fn module_id(&self) -> i64 {
        self.module_id
    }

    /// Path of the EM trace to classify
    pub fn trace_path(&self) -> &Path {
        &self.trace_path
    }

    /// Module-specific results directory (`<root>/<module_id>`)
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Path of the serialized classifier
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

fn model_path_in(modules_root: &Path) -> PathBuf {
    modules_root.join(MODULE_NAME).join(MODEL_FILE_NAME)
}

/// Parse a host-supplied module id
///
/// Surrounding whitespace is ignored; anything else that is not an integer
/// is rejected.
pub fn parse_module_id(raw: &str) -> Result<i64, ModuleError> {
    raw.trim().parse::<i64>().map_err(|e| {
        ModuleError::Configuration(format!("module id {:?} is not an integer: {}", raw, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.sample_rate, 32000.0);
        assert_eq!(config.feature_vector_size, 50);
        assert_eq!(config.window_samples(), 3200);
    }

    #[test]
    fn test_module_config_paths() {
        let config = ModuleConfig::new("7", "/data/trace.npy", "/out").unwrap();
        assert_eq!(config.module_id(), 7);
        assert_eq!(config.trace_path(), Path::new("/data/trace.npy"));
        assert_eq!(config.results_dir(), Path::new("/out/7"));
        assert_eq!(
            config.model_path(),
            Path::new("./modules/binary-classifier/ml-model.json")
        );
    }

    #[test]
    fn test_with_modules_root() {
        let config = ModuleConfig::new("1", "t.npy", "/out")
            .unwrap()
            .with_modules_root("/opt/modules");
        assert_eq!(
            config.model_path(),
            Path::new("/opt/modules/binary-classifier/ml-model.json")
        );
    }

    #[test]
    fn test_results_dir_keeps_supplied_id() {
        let config = ModuleConfig::new("007", "t.npy", "/out").unwrap();
        assert_eq!(config.module_id(), 7);
        assert_eq!(config.results_dir(), Path::new("/out/007"));

        let config = ModuleConfig::new(" 12 ", "t.npy", "/out").unwrap();
        assert_eq!(config.results_dir(), Path::new("/out/12"));

        assert!(matches!(
            ModuleConfig::new("x7", "t.npy", "/out"),
            Err(ModuleError::Configuration(_))
        ));
    }

    #[test]
    fn test_parse_module_id() {
        assert_eq!(parse_module_id("42").unwrap(), 42);
        assert_eq!(parse_module_id(" -3 ").unwrap(), -3);
        assert!(matches!(parse_module_id("abc"), Err(ModuleError::Configuration(_))));
        assert!(matches!(parse_module_id("1.5"), Err(ModuleError::Configuration(_))));
        assert!(matches!(parse_module_id(""), Err(ModuleError::Configuration(_))));
    }
}
