//! Classifier artifacts and the seam the prediction and attribution services use.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConfigError, PredictError};

pub mod logistic;
pub mod trees;

pub use logistic::LogisticModel;
pub use trees::{Tree, TreeEnsemble, TreeNode};

/// A pre-trained binary classifier over an ordered numeric row.
pub trait Classifier: Send + Sync {
    fn kind(&self) -> &str;

    /// Column names in the order the model was trained on.
    fn feature_names(&self) -> &[String];

    /// `[p(class 0), p(class 1)]` for one row.
    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], PredictError>;

    /// Expected class-1 probability when only the features flagged in `known` are
    /// observed. Models that cannot marginalize features return `None`.
    fn expected_proba(&self, _row: &[f64], _known: &[bool]) -> Option<f64> {
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    TreeEnsemble(TreeEnsemble),
    Logistic(LogisticModel),
}

impl ModelArtifact {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::TreeEnsemble(m) => m.validate(),
            Self::Logistic(m) => m.validate(),
        }
    }

    pub fn into_classifier(self) -> Result<Arc<dyn Classifier>, ConfigError> {
        self.validate()?;
        Ok(match self {
            Self::TreeEnsemble(m) => Arc::new(m),
            Self::Logistic(m) => Arc::new(m),
        })
    }
}

pub fn load_model(path: &Path) -> Result<Arc<dyn Classifier>, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        what: "model",
        path: path.to_path_buf(),
        source,
    })?;
    let artifact =
        serde_json::from_str::<ModelArtifact>(&raw).map_err(|source| ConfigError::Parse {
            what: "model",
            path: path.to_path_buf(),
            source,
        })?;
    let model = artifact.into_classifier()?;
    info!(
        kind = model.kind(),
        features = model.feature_names().len(),
        path = %path.display(),
        "loaded model"
    );
    Ok(model)
}

pub(crate) fn sigmoid(margin: f64) -> f64 {
    if margin >= 0.0 {
        1.0 / (1.0 + (-margin).exp())
    } else {
        let e = margin.exp();
        e / (1.0 + e)
    }
}

pub(crate) fn check_row_len(expected: usize, row: &[f64]) -> Result<(), PredictError> {
    if row.len() != expected {
        return Err(PredictError::InvalidOutput(format!(
            "row has {} values, model takes {expected}",
            row.len()
        )));
    }
    Ok(())
}

pub(crate) fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        what: "model",
        reason: reason.into(),
    }
}
