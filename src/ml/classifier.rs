//! Classifier capability

use crate::error::ModuleError;
use crate::features::FeatureMatrix;

/// Anything that maps feature vectors to class labels
///
/// Implemented by the serialized model artifact; tests and embedding hosts
/// can supply their own implementation to [`crate::get_results_with`].
pub trait Classifier {
    /// Predict one label per row of `features`, in row order
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<String>, ModuleError>;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<String>, ModuleError> {
        (**self).predict(features)
    }
}

impl<C: Classifier + ?Sized> Classifier for &C {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<String>, ModuleError> {
        (**self).predict(features)
    }
}
