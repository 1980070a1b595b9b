//! Classification result and majority-vote reduction

use std::fmt;

use super::classifier::Classifier;
use crate::error::ModuleError;
use crate::features::FeatureMatrix;

/// Output of a classifier over a whole trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prediction {
    /// One label for the trace
    Label(String),
    /// One label per sliding window
    PerWindow(Vec<String>),
}

impl Prediction {
    /// Collapse to a single label by majority vote
    ///
    /// Ties go to the label that appears first. Returns `None` for an empty
    /// per-window prediction.
    pub fn majority(&self) -> Option<&str> {
        match self {
            Prediction::Label(label) => Some(label.as_str()),
            Prediction::PerWindow(labels) => mode(labels),
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::Label(label) => write!(f, "{}", label),
            Prediction::PerWindow(labels) => {
                write!(f, "[")?;
                for (i, label) in labels.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "'{}'", label)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Predict one label per window
pub fn predict_windows<C: Classifier + ?Sized>(
    classifier: &C,
    features: &FeatureMatrix,
) -> Result<Prediction, ModuleError> {
    let labels = classifier.predict(features)?;
    if labels.len() != features.rows() {
        return Err(ModuleError::Prediction(format!(
            "classifier returned {} labels for {} feature vectors",
            labels.len(),
            features.rows()
        )));
    }
    Ok(Prediction::PerWindow(labels))
}

/// Predict a single class for the whole trace
///
/// Every window is classified and the most frequent label wins.
///
/// # Errors
///
/// `Prediction` if there are no feature vectors or the classifier rejects
/// them.
pub fn predict_class<C: Classifier + ?Sized>(
    classifier: &C,
    features: &FeatureMatrix,
) -> Result<Prediction, ModuleError> {
    if features.rows() == 0 {
        return Err(ModuleError::Prediction("no feature vectors to classify".to_string()));
    }

    let per_window = predict_windows(classifier, features)?;
    let label = per_window
        .majority()
        .ok_or_else(|| ModuleError::Prediction("classifier returned no labels".to_string()))?
        .to_string();

    if let Prediction::PerWindow(labels) = &per_window {
        let agreeing = labels.iter().filter(|l| **l == label).count();
        log::debug!(
            "Majority vote: {} ({} of {} windows)",
            label,
            agreeing,
            labels.len()
        );
    }

    Ok(Prediction::Label(label))
}

/// Most frequent label; ties resolve to the one seen first
fn mode(labels: &[String]) -> Option<&str> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for label in labels {
        match counts.iter_mut().find(|(l, _)| *l == label.as_str()) {
            Some((_, n)) => *n += 1,
            None => counts.push((label.as_str(), 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (label, n) in counts {
        if best.map_or(true, |(_, top)| n > top) {
            best = Some((label, n));
        }
    }
    best.map(|(label, _)| label)
}
