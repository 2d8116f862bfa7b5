//! User feedback on a prediction and the stores it is appended to.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::FeedbackBackend;
use crate::error::FeedbackError;
use crate::features::{FeatureRecord, MatchSetup};
use crate::predict::PredictionResult;

pub mod sheets;
pub mod sqlite;

pub use sheets::SheetsSink;
pub use sqlite::SqliteSink;

/// Column headers, in row order, for tabular stores.
pub const FEEDBACK_HEADER: [&str; 8] = [
    "Submitted At",
    "Player 1",
    "Player 2",
    "Rank 1",
    "Rank 2",
    "Predicted P1",
    "Prediction Correct",
    "Suggestion",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Judgement {
    Correct,
    Incorrect,
    NotSure,
}

impl Judgement {
    pub const ALL: [Judgement; 3] = [Judgement::Correct, Judgement::Incorrect, Judgement::NotSure];

    pub fn label(self) -> &'static str {
        match self {
            Self::Correct => "Yes",
            Self::Incorrect => "No",
            Self::NotSure => "Not sure",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|j| j.label().eq_ignore_ascii_case(raw.trim()))
    }

    pub fn next(self) -> Self {
        match self {
            Self::Correct => Self::Incorrect,
            Self::Incorrect => Self::NotSure,
            Self::NotSure => Self::Correct,
        }
    }
}

/// One submitted judgement. Handed to a sink and not kept afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub submitted_at: String,
    pub player_1: String,
    pub player_2: String,
    pub rank_1: u32,
    pub rank_2: u32,
    pub p1: f64,
    pub judgement: Judgement,
    pub suggestion: String,
}

impl FeedbackRecord {
    pub fn new(
        setup: &MatchSetup,
        record: &FeatureRecord,
        result: &PredictionResult,
        judgement: Judgement,
        suggestion: &str,
    ) -> Self {
        Self {
            submitted_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            player_1: setup.player_1.clone(),
            player_2: setup.player_2.clone(),
            rank_1: record.rank_1,
            rank_2: record.rank_2,
            p1: result.p1,
            judgement,
            suggestion: suggestion.trim().to_string(),
        }
    }

    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.submitted_at.clone(),
            self.player_1.clone(),
            self.player_2.clone(),
            self.rank_1.to_string(),
            self.rank_2.to_string(),
            format!("{:.4}", self.p1),
            self.judgement.label().to_string(),
            self.suggestion.clone(),
        ]
    }
}

pub trait FeedbackSink {
    fn name(&self) -> &str;

    fn append(&self, record: &FeedbackRecord) -> Result<(), FeedbackError>;
}

pub fn open_sink(backend: &FeedbackBackend) -> Result<Option<Box<dyn FeedbackSink>>, FeedbackError> {
    Ok(match backend {
        FeedbackBackend::Off => None,
        FeedbackBackend::Sqlite { path } => Some(Box::new(SqliteSink::open(path)?)),
        FeedbackBackend::Sheets(cfg) => Some(Box::new(SheetsSink::new(cfg.clone())?)),
    })
}

pub fn submit(sink: &dyn FeedbackSink, record: &FeedbackRecord) -> Result<(), FeedbackError> {
    match sink.append(record) {
        Ok(()) => {
            info!(
                sink = sink.name(),
                player_1 = %record.player_1,
                player_2 = %record.player_2,
                judgement = record.judgement.label(),
                "feedback stored"
            );
            Ok(())
        }
        Err(err) => {
            warn!(sink = sink.name(), error = %err, "feedback submission failed");
            Err(err)
        }
    }
}
