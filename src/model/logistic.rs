use serde::{Deserialize, Serialize};

use super::{Classifier, check_row_len, invalid, sigmoid};
use crate::error::{ConfigError, PredictError};

/// Linear logit over (optionally standardized) features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub intercept: f64,
    pub coeffs: Vec<f64>,
    /// Training means; an unobserved feature is replaced by its mean.
    pub feature_means: Vec<f64>,
    /// Empty when the coefficients apply to raw values.
    #[serde(default)]
    pub feature_stds: Vec<f64>,
}

impl LogisticModel {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = self.feature_names.len();
        if n == 0 {
            return Err(invalid("logistic model declares no features"));
        }
        if self.coeffs.len() != n || self.feature_means.len() != n {
            return Err(invalid(format!(
                "logistic model has {n} features but {} coeffs and {} means",
                self.coeffs.len(),
                self.feature_means.len()
            )));
        }
        if !self.feature_stds.is_empty() && self.feature_stds.len() != n {
            return Err(invalid(format!(
                "logistic model has {n} features but {} stds",
                self.feature_stds.len()
            )));
        }
        if self.feature_stds.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(invalid("feature stds must be positive"));
        }
        let all = std::iter::once(&self.intercept)
            .chain(&self.coeffs)
            .chain(&self.feature_means);
        for v in all {
            if !v.is_finite() {
                return Err(invalid("logistic model has non-finite parameters"));
            }
        }
        Ok(())
    }

    fn margin_with(&self, value_at: impl Fn(usize) -> f64) -> f64 {
        let mut margin = self.intercept;
        for (idx, coeff) in self.coeffs.iter().enumerate() {
            let x = value_at(idx);
            let scaled = match self.feature_stds.get(idx) {
                Some(std) => (x - self.feature_means[idx]) / std,
                None => x,
            };
            margin += coeff * scaled;
        }
        margin
    }
}

impl Classifier for LogisticModel {
    fn kind(&self) -> &str {
        "logistic"
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], PredictError> {
        check_row_len(self.feature_names.len(), row)?;
        let p = sigmoid(self.margin_with(|idx| row[idx]));
        Ok([1.0 - p, p])
    }

    fn expected_proba(&self, row: &[f64], known: &[bool]) -> Option<f64> {
        if row.len() != self.feature_names.len() || known.len() != row.len() {
            return None;
        }
        let margin = self.margin_with(|idx| {
            if known[idx] {
                row[idx]
            } else {
                self.feature_means[idx]
            }
        });
        Some(sigmoid(margin))
    }
}
