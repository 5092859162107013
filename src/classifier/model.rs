use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{DiceError, Result};
use crate::models::DiceProbability;

/// A pretrained two-class model over flattened feature vectors.
///
/// Implementations are immutable once built and shared read-only between
/// classification calls.
pub trait DiceModel: Send + Sync {
    /// Expected feature vector length, if the model fixes one.
    fn descriptor_len(&self) -> Option<usize>;

    fn predict_proba(&self, features: &[f32]) -> Result<DiceProbability>;
}

/// Linear SVM with Platt-calibrated probabilities.
///
/// `P(die) = 1 / (1 + exp(platt_a * (w . x + bias) + platt_b))`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSvm {
    pub weights: Vec<f32>,
    pub bias: f32,
    pub platt_a: f32,
    pub platt_b: f32,
}

impl LinearSvm {
    pub fn new(weights: Vec<f32>, bias: f32, platt_a: f32, platt_b: f32) -> Self {
        Self {
            weights,
            bias,
            platt_a,
            platt_b,
        }
    }

    /// Load a JSON model artifact.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |reason: String| DiceError::ModelLoad {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let model: LinearSvm =
            serde_json::from_str(&content).map_err(|e| load_error(e.to_string()))?;

        if model.weights.is_empty() {
            return Err(load_error("model has no weights".to_string()));
        }
        if !model.weights.iter().all(|w| w.is_finite())
            || !model.bias.is_finite()
            || !model.platt_a.is_finite()
            || !model.platt_b.is_finite()
        {
            return Err(load_error("model contains non-finite parameters".to_string()));
        }

        log::info!(
            "Loaded dice model from {} ({} weights)",
            path.display(),
            model.weights.len()
        );
        Ok(model)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Signed distance to the separating hyperplane (unnormalised).
    pub fn decision_function(&self, features: &[f32]) -> Result<f32> {
        if features.len() != self.weights.len() {
            return Err(DiceError::FeatureCompute(format!(
                "expected {} features, got {}",
                self.weights.len(),
                features.len()
            )));
        }
        let dot: f32 = self
            .weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum();
        Ok(dot + self.bias)
    }
}

impl DiceModel for LinearSvm {
    fn descriptor_len(&self) -> Option<usize> {
        Some(self.weights.len())
    }

    fn predict_proba(&self, features: &[f32]) -> Result<DiceProbability> {
        let decision = self.decision_function(features)?;
        let die = 1.0 / (1.0 + (self.platt_a * decision + self.platt_b).exp());
        Ok(DiceProbability::from_die_probability(die))
    }
}
