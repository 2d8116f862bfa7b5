use std::path::Path;
use std::sync::Arc;

use crate::error::{ConfigError, ExplainError, PredictError};
use crate::explain::{AttributionResult, Explainer};
use crate::features::{FeatureRecord, FeatureVectorBuilder, MatchSetup};
use crate::model::{self, Classifier};
use crate::predict::{PredictionResult, Predictor};
use crate::ranks::PlayerRankTable;

/// The read-only tables and model, loaded once and passed to whoever needs them.
#[derive(Clone)]
pub struct Engine {
    ranks: Arc<PlayerRankTable>,
    predictor: Predictor,
    explainer: Explainer,
}

impl Engine {
    pub fn new(ranks: PlayerRankTable, model: Arc<dyn Classifier>) -> Self {
        Self {
            ranks: Arc::new(ranks),
            predictor: Predictor::new(Arc::clone(&model)),
            explainer: Explainer::new(model),
        }
    }

    pub fn load(model_path: &Path, ranks_path: &Path) -> Result<Self, ConfigError> {
        let model = model::load_model(model_path)?;
        let ranks = PlayerRankTable::load(ranks_path)?;
        Ok(Self::new(ranks, model))
    }

    pub fn ranks(&self) -> &PlayerRankTable {
        &self.ranks
    }

    pub fn model(&self) -> &Arc<dyn Classifier> {
        self.predictor.model()
    }

    pub fn build(&self, setup: &MatchSetup) -> FeatureRecord {
        FeatureVectorBuilder::new(&self.ranks).build_setup(setup)
    }

    pub fn predict(&self, record: &FeatureRecord) -> Result<PredictionResult, PredictError> {
        self.predictor.predict(record)
    }

    /// Opt-in; costs `2^n` model evaluations.
    pub fn explain(&self, record: &FeatureRecord) -> Result<AttributionResult, ExplainError> {
        self.explainer.explain(record)
    }
}
