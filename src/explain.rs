//! Per-feature attribution of a single prediction.
//!
//! Exact Shapley values over every feature coalition, where a coalition's value is the
//! model's expected probability with only those features observed. Contributions sum
//! to `prediction - baseline`, the baseline being the expectation with nothing known.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ExplainError;
use crate::features::{FeatureRecord, NamedRow};
use crate::model::Classifier;
use crate::predict::check_schema;

/// Coalition enumeration is `2^n` model evaluations.
pub const MAX_EXACT_FEATURES: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub feature: String,
    pub value: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionResult {
    /// Expected probability with no feature observed.
    pub baseline: f64,
    /// Probability with every feature observed.
    pub prediction: f64,
    /// Sorted by descending absolute contribution.
    pub contributions: Vec<Contribution>,
}

impl AttributionResult {
    pub fn total(&self) -> f64 {
        self.contributions.iter().map(|c| c.contribution).sum()
    }

    pub fn get(&self, feature: &str) -> Option<&Contribution> {
        self.contributions.iter().find(|c| c.feature == feature)
    }

    /// Running totals from the baseline, smallest contribution first, so the last
    /// step ends at the prediction.
    pub fn waterfall(&self) -> Vec<WaterfallStep> {
        let mut running = self.baseline;
        self.contributions
            .iter()
            .rev()
            .map(|c| {
                let start = running;
                running += c.contribution;
                WaterfallStep {
                    feature: c.feature.clone(),
                    start,
                    end: running,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaterfallStep {
    pub feature: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Clone)]
pub struct Explainer {
    model: Arc<dyn Classifier>,
}

impl Explainer {
    pub fn new(model: Arc<dyn Classifier>) -> Self {
        Self { model }
    }

    pub fn explain(&self, record: &FeatureRecord) -> Result<AttributionResult, ExplainError> {
        self.explain_row(&record.to_row())
    }

    pub fn explain_row(&self, row: &NamedRow) -> Result<AttributionResult, ExplainError> {
        check_schema(self.model.as_ref(), row)?;
        let n = row.values.len();
        if n > MAX_EXACT_FEATURES {
            return Err(self.unsupported(format!(
                "{n} features exceeds exact attribution limit of {MAX_EXACT_FEATURES}"
            )));
        }

        let coalitions = 1usize << n;
        let mut value = Vec::with_capacity(coalitions);
        let mut known = vec![false; n];
        for mask in 0..coalitions {
            for (bit, slot) in known.iter_mut().enumerate() {
                *slot = mask & (1 << bit) != 0;
            }
            let Some(v) = self.model.expected_proba(&row.values, &known) else {
                return Err(self.unsupported("model cannot marginalize features".to_string()));
            };
            if !v.is_finite() {
                return Err(self.unsupported(format!("non-finite expectation for coalition {mask:#b}")));
            }
            value.push(v);
        }

        let weights = shapley_weights(n);
        let mut contributions = Vec::with_capacity(n);
        for i in 0..n {
            let bit = 1usize << i;
            let mut phi = 0.0;
            for mask in (0..coalitions).filter(|m| m & bit == 0) {
                let size = mask.count_ones() as usize;
                phi += weights[size] * (value[mask | bit] - value[mask]);
            }
            contributions.push(Contribution {
                feature: row.names[i].clone(),
                value: row.values[i],
                contribution: phi,
            });
        }
        contributions.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));

        let result = AttributionResult {
            baseline: value[0],
            prediction: value[coalitions - 1],
            contributions,
        };
        debug!(
            baseline = result.baseline,
            prediction = result.prediction,
            evaluations = coalitions,
            "attribution computed"
        );
        Ok(result)
    }

    fn unsupported(&self, reason: String) -> ExplainError {
        ExplainError::Unsupported {
            model: self.model.kind().to_string(),
            reason,
        }
    }
}

/// `|S|! (n - |S| - 1)! / n!` indexed by coalition size.
fn shapley_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let mut fact = vec![1.0_f64; n + 1];
    for k in 1..=n {
        fact[k] = fact[k - 1] * k as f64;
    }
    (0..n)
        .map(|s| fact[s] * fact[n - s - 1] / fact[n])
        .collect()
}
