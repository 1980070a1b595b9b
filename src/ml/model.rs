//! Serialized classifier model
//!
//! The model artifact is a JSON document:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "scaler": { "mean": [...], "scale": [...] },
//!   "model": { "type": "linear", "weights": [...], "intercept": 0.0,
//!              "classes": ["benign", "malicious"] }
//! }
//! ```
//!
//! `scaler` is optional. Supported model types are `linear` (decision
//! function `w·x + b`, positive → second class), `mlp` (dense layers with
//! ReLU hidden activations) and `constant` (always the same label).

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::classifier::Classifier;
use crate::error::ModuleError;
use crate::features::FeatureMatrix;

/// Artifact format version this build reads and writes
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Model artifact as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Serialization format version; must equal [`MODEL_FORMAT_VERSION`]
    pub format_version: u32,

    /// Per-feature standardization applied before the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<StandardScaler>,

    /// The classifier itself
    pub model: SerializedModel,
}

/// Per-feature `(x - mean) / scale` transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Per-feature mean
    pub mean: Vec<f32>,
    /// Per-feature scale (standard deviation)
    pub scale: Vec<f32>,
}

/// Classifier variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SerializedModel {
    /// Linear decision function
    Linear(LinearModel),
    /// Multilayer perceptron
    Mlp(MlpModel),
    /// Always predicts `label`
    Constant {
        /// Predicted label
        label: String,
    },
}

/// Linear binary classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    /// One weight per feature
    pub weights: Vec<f32>,
    /// Bias term
    pub intercept: f32,
    /// `[negative, positive]` class labels
    pub classes: [String; 2],
}

/// Fully connected layer; `weights[out][in]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Weight rows, one per output unit
    pub weights: Vec<Vec<f32>>,
    /// One bias per output unit
    pub biases: Vec<f32>,
}

impl DenseLayer {
    fn inputs(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }

    fn outputs(&self) -> usize {
        self.weights.len()
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .zip(&self.biases)
            .map(|(row, b)| dot(row, input) + b)
            .collect()
    }
}

/// Multilayer perceptron binary classifier
///
/// Hidden layers use ReLU. A single output unit is a logit (positive →
/// second class); two output units pick the larger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpModel {
    /// Layers from input to output
    pub layers: Vec<DenseLayer>,
    /// `[negative, positive]` class labels
    pub classes: [String; 2],
}

impl SerializedModel {
    fn input_width(&self) -> Option<usize> {
        match self {
            SerializedModel::Linear(m) => Some(m.weights.len()),
            SerializedModel::Mlp(m) => m.layers.first().map(DenseLayer::inputs),
            SerializedModel::Constant { .. } => None,
        }
    }
}

impl ModelArtifact {
    /// Wrap a model with the current format version and no scaler
    pub fn new(model: SerializedModel) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            scaler: None,
            model,
        }
    }

    /// Attach a feature scaler
    pub fn with_scaler(mut self, scaler: StandardScaler) -> Self {
        self.scaler = Some(scaler);
        self
    }

    /// Load and validate an artifact from disk
    ///
    /// # Errors
    ///
    /// `ModelLoad` if the file is missing, is not valid JSON for this
    /// format, has another format version, or is structurally inconsistent.
    pub fn load(path: &Path) -> Result<Self, ModuleError> {
        log::debug!("Loading classifier model from: {}", path.display());

        let text = std::fs::read_to_string(path).map_err(|e| {
            ModuleError::ModelLoad(format!("cannot read model {}: {}", path.display(), e))
        })?;
        let artifact: ModelArtifact = serde_json::from_str(&text).map_err(|e| {
            ModuleError::ModelLoad(format!("corrupt model {}: {}", path.display(), e))
        })?;

        if artifact.format_version != MODEL_FORMAT_VERSION {
            return Err(ModuleError::ModelLoad(format!(
                "model {} has format version {}, expected {}",
                path.display(),
                artifact.format_version,
                MODEL_FORMAT_VERSION
            )));
        }

        artifact.validate()?;
        Ok(artifact)
    }

    /// Write the artifact as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), ModuleError> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| ModuleError::ModelLoad(format!("cannot serialize model: {}", e)))?;
        std::fs::write(path, text).map_err(|e| ModuleError::filesystem(path, e))
    }

    /// Number of features the model expects, if it constrains it
    pub fn input_width(&self) -> Option<usize> {
        self.model
            .input_width()
            .or_else(|| self.scaler.as_ref().map(|s| s.mean.len()))
    }

    /// Check internal dimensions
    pub fn validate(&self) -> Result<(), ModuleError> {
        let invalid =
            |msg: String| -> Result<(), ModuleError> { Err(ModuleError::ModelLoad(msg)) };

        match &self.model {
            SerializedModel::Linear(m) => {
                if m.weights.is_empty() {
                    return invalid("linear model has no weights".to_string());
                }
                check_classes(&m.classes)?;
            }
            SerializedModel::Mlp(m) => {
                if m.layers.is_empty() {
                    return invalid("mlp model has no layers".to_string());
                }
                for (i, layer) in m.layers.iter().enumerate() {
                    if layer.outputs() == 0 || layer.inputs() == 0 {
                        return invalid(format!("mlp layer {} is empty", i));
                    }
                    if layer.biases.len() != layer.outputs() {
                        return invalid(format!(
                            "mlp layer {} has {} biases for {} units",
                            i,
                            layer.biases.len(),
                            layer.outputs()
                        ));
                    }
                    if layer.weights.iter().any(|row| row.len() != layer.inputs()) {
                        return invalid(format!("mlp layer {} has ragged weights", i));
                    }
                }
                for (i, pair) in m.layers.windows(2).enumerate() {
                    if pair[0].outputs() != pair[1].inputs() {
                        return invalid(format!(
                            "mlp layer {} outputs {} values but layer {} takes {}",
                            i,
                            pair[0].outputs(),
                            i + 1,
                            pair[1].inputs()
                        ));
                    }
                }
                let outputs = m.layers.last().map(DenseLayer::outputs).unwrap_or(0);
                if outputs != 1 && outputs != 2 {
                    return invalid(format!(
                        "binary mlp needs 1 or 2 output units, found {}",
                        outputs
                    ));
                }
                check_classes(&m.classes)?;
            }
            SerializedModel::Constant { label } => {
                if label.is_empty() {
                    return invalid("constant model has an empty label".to_string());
                }
            }
        }

        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != scaler.scale.len() {
                return invalid("scaler mean and scale lengths differ".to_string());
            }
            if let Some(width) = self.model.input_width() {
                if width != scaler.mean.len() {
                    return invalid(format!(
                        "scaler has {} features, model takes {}",
                        scaler.mean.len(),
                        width
                    ));
                }
            }
        }

        Ok(())
    }

    fn predict_row(&self, row: &[f32]) -> String {
        let scaled;
        let x = match &self.scaler {
            Some(scaler) => {
                scaled = row
                    .iter()
                    .zip(scaler.mean.iter().zip(&scaler.scale))
                    .map(|(v, (m, s))| if *s == 0.0 { v - m } else { (v - m) / s })
                    .collect::<Vec<f32>>();
                &scaled[..]
            }
            None => row,
        };

        match &self.model {
            SerializedModel::Linear(m) => {
                let decision = dot(&m.weights, x) + m.intercept;
                m.classes[(decision > 0.0) as usize].clone()
            }
            SerializedModel::Mlp(m) => {
                let mut activations = x.to_vec();
                let last = m.layers.len() - 1;
                for (i, layer) in m.layers.iter().enumerate() {
                    activations = layer.forward(&activations);
                    if i < last {
                        activations.iter_mut().for_each(|a| *a = a.max(0.0));
                    }
                }
                let positive = match activations.as_slice() {
                    [logit] => *logit > 0.0,
                    [neg, pos] => pos > neg,
                    _ => false,
                };
                m.classes[positive as usize].clone()
            }
            SerializedModel::Constant { label } => label.clone(),
        }
    }
}

impl Classifier for ModelArtifact {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<String>, ModuleError> {
        // Artifacts built in code never went through `load`
        self.validate().map_err(|e| match e {
            ModuleError::ModelLoad(msg) => {
                ModuleError::Prediction(format!("invalid model: {}", msg))
            }
            other => other,
        })?;

        if let Some(width) = self.input_width() {
            if features.width() != width {
                return Err(ModuleError::Prediction(format!(
                    "model expects {} features per vector, got {}",
                    width,
                    features.width()
                )));
            }
        }

        Ok(features.iter_rows().map(|row| self.predict_row(row)).collect())
    }
}

fn check_classes(classes: &[String; 2]) -> Result<(), ModuleError> {
    if classes.iter().any(String::is_empty) {
        return Err(ModuleError::ModelLoad("class label is empty".to_string()));
    }
    Ok(())
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
