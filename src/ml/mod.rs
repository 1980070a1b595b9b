//! Classification modules
//!
//! Classifier capability, the serialized model artifact, and reduction of
//! per-window predictions to one result.

pub mod classifier;
pub mod model;
pub mod prediction;

pub use classifier::Classifier;
pub use model::{ModelArtifact, SerializedModel};
pub use prediction::{predict_class, Prediction};
