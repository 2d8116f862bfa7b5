use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PredictError;
use crate::features::{FeatureRecord, NamedRow};
use crate::model::Classifier;

const PROB_TOLERANCE: f64 = 1e-6;

/// Player 1's win probability and its complement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub p1: f64,
    pub p2: f64,
}

impl PredictionResult {
    pub fn from_p1(p1: f64) -> Self {
        Self { p1, p2: 1.0 - p1 }
    }

    pub fn favourite_is_player_1(&self) -> bool {
        self.p1 >= self.p2
    }
}

#[derive(Clone)]
pub struct Predictor {
    model: Arc<dyn Classifier>,
}

impl Predictor {
    pub fn new(model: Arc<dyn Classifier>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Arc<dyn Classifier> {
        &self.model
    }

    pub fn predict(&self, record: &FeatureRecord) -> Result<PredictionResult, PredictError> {
        self.predict_row(&record.to_row())
    }

    /// Runs the classifier after checking the row's columns against the model's.
    pub fn predict_row(&self, row: &NamedRow) -> Result<PredictionResult, PredictError> {
        check_schema(self.model.as_ref(), row)?;
        let [p0, p1] = self.model.predict_proba(&row.values)?;
        validate_distribution(p0, p1)?;
        let result = PredictionResult::from_p1(p1);
        info!(p1 = result.p1, model = self.model.kind(), "prediction");
        Ok(result)
    }
}

pub fn check_schema(model: &dyn Classifier, row: &NamedRow) -> Result<(), PredictError> {
    let expected = model.feature_names();
    if expected != row.names.as_slice() || row.names.len() != row.values.len() {
        return Err(PredictError::schema_mismatch(expected, &row.names));
    }
    Ok(())
}

fn validate_distribution(p0: f64, p1: f64) -> Result<(), PredictError> {
    for p in [p0, p1] {
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(PredictError::InvalidOutput(format!(
                "class probability {p} outside [0, 1]"
            )));
        }
    }
    if (p0 + p1 - 1.0).abs() > PROB_TOLERANCE {
        return Err(PredictError::InvalidOutput(format!(
            "class probabilities sum to {}",
            p0 + p1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        names: Vec<String>,
        out: [f64; 2],
    }

    impl Classifier for Fixed {
        fn kind(&self) -> &str {
            "fixed"
        }

        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict_proba(&self, _row: &[f64]) -> Result<[f64; 2], PredictError> {
            Ok(self.out)
        }
    }

    fn row(names: &[&str]) -> NamedRow {
        NamedRow {
            names: names.iter().map(|n| n.to_string()).collect(),
            values: vec![0.0; names.len()],
        }
    }

    fn predictor(out: [f64; 2]) -> Predictor {
        Predictor::new(Arc::new(Fixed {
            names: vec!["a".to_string(), "b".to_string()],
            out,
        }))
    }

    #[test]
    fn misordered_columns_are_rejected() {
        let err = predictor([0.4, 0.6]).predict_row(&row(&["b", "a"])).unwrap_err();
        assert!(matches!(err, PredictError::SchemaMismatch { .. }));
    }

    #[test]
    fn extra_or_missing_columns_are_rejected() {
        let p = predictor([0.4, 0.6]);
        assert!(p.predict_row(&row(&["a"])).is_err());
        assert!(p.predict_row(&row(&["a", "b", "c"])).is_err());
    }

    #[test]
    fn positive_class_is_player_1() {
        let result = predictor([0.25, 0.75]).predict_row(&row(&["a", "b"])).unwrap();
        assert_eq!(result.p1, 0.75);
        assert_eq!(result.p2, 0.25);
        assert!(result.favourite_is_player_1());
    }

    #[test]
    fn broken_distribution_is_reported() {
        let err = predictor([0.5, 0.7]).predict_row(&row(&["a", "b"])).unwrap_err();
        assert!(matches!(err, PredictError::InvalidOutput(_)));
        let err = predictor([f64::NAN, 0.5]).predict_row(&row(&["a", "b"])).unwrap_err();
        assert!(matches!(err, PredictError::InvalidOutput(_)));
    }
}
