//! Stateful host-facing wrapper
//!
//! Hosts that drive modules through a two-call contract (`initialize`, then
//! `get_results`) hold one [`BinaryClassifierModule`] per module instance.

use std::path::{Path, PathBuf};

use crate::config::ModuleConfig;
use crate::error::ModuleError;

/// Module instance with an initialize-then-get-results lifecycle
#[derive(Debug, Clone, Default)]
pub struct BinaryClassifierModule {
    modules_root: Option<PathBuf>,
    config: Option<ModuleConfig>,
}

impl BinaryClassifierModule {
    /// Uninitialized module using the default modules root
    pub fn new() -> Self {
        Self::default()
    }

    /// Uninitialized module that looks for its model under `modules_root`
    pub fn with_modules_root(modules_root: impl Into<PathBuf>) -> Self {
        Self {
            modules_root: Some(modules_root.into()),
            config: None,
        }
    }

    /// Configure the module, see [`crate::initialize`]
    ///
    /// A failed call leaves any previous configuration in place.
    pub fn initialize(
        &mut self,
        module_id: impl ToString,
        em_trace_path: impl Into<PathBuf>,
        results_root: impl AsRef<Path>,
    ) -> Result<(), ModuleError> {
        let mut config = crate::initialize(module_id, em_trace_path, results_root)?;
        if let Some(root) = &self.modules_root {
            config = config.with_modules_root(root);
        }
        self.config = Some(config);
        Ok(())
    }

    /// Current configuration, if initialized
    pub fn config(&self) -> Option<&ModuleConfig> {
        self.config.as_ref()
    }

    /// Whether [`initialize`](Self::initialize) has succeeded
    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    /// Generate results, see [`crate::get_results`]
    ///
    /// # Errors
    ///
    /// `NotInitialized` before a successful `initialize`.
    pub fn get_results(&self) -> Result<String, ModuleError> {
        let config = self.config.as_ref().ok_or(ModuleError::NotInitialized)?;
        crate::get_results(config)
    }
}
