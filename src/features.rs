use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::encoding::{BestOf, Category, Court, Round, Series, Surface};
use crate::ranks::PlayerRankTable;

/// Column names and order of the classifier's training frame.
pub const FEATURE_NAMES: [&str; 8] = [
    "Surface_Code",
    "Court_Code",
    "Series_Code",
    "Round_Code",
    "Best of",
    "Rank_1",
    "Rank_2",
    "Rank_Diff",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Everything the user picks before asking for a prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSetup {
    pub surface: Surface,
    pub court: Court,
    pub series: Series,
    pub round: Round,
    pub best_of: BestOf,
    pub player_1: String,
    pub player_2: String,
}

impl MatchSetup {
    pub fn same_players(&self) -> bool {
        crate::ranks::canonical_name(&self.player_1) == crate::ranks::canonical_name(&self.player_2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub surface_code: u8,
    pub court_code: u8,
    pub series_code: u8,
    pub round_code: u8,
    pub best_of: u8,
    pub rank_1: u32,
    pub rank_2: u32,
    /// `rank_2 - rank_1`; negative favours player 2 under the model's convention.
    pub rank_diff: i64,
}

impl FeatureRecord {
    pub fn values(&self) -> [f64; FEATURE_COUNT] {
        [
            f64::from(self.surface_code),
            f64::from(self.court_code),
            f64::from(self.series_code),
            f64::from(self.round_code),
            f64::from(self.best_of),
            f64::from(self.rank_1),
            f64::from(self.rank_2),
            self.rank_diff as f64,
        ]
    }

    pub fn named(&self) -> Vec<(&'static str, f64)> {
        FEATURE_NAMES.iter().copied().zip(self.values()).collect()
    }

    pub fn to_row(&self) -> NamedRow {
        NamedRow {
            names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            values: self.values().to_vec(),
        }
    }
}

/// An ordered, named numeric row as handed to a classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedRow {
    pub names: Vec<String>,
    pub values: Vec<f64>,
}

/// Builds feature records against a read-only rank table.
#[derive(Debug, Clone, Copy)]
pub struct FeatureVectorBuilder<'a> {
    ranks: &'a PlayerRankTable,
}

impl<'a> FeatureVectorBuilder<'a> {
    pub fn new(ranks: &'a PlayerRankTable) -> Self {
        Self { ranks }
    }

    /// Total over every valid selection, including identical or unranked players.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        &self,
        surface: Surface,
        court: Court,
        series: Series,
        round: Round,
        best_of: BestOf,
        player_1: &str,
        player_2: &str,
    ) -> FeatureRecord {
        let rank_1 = self.ranks.rank(player_1);
        let rank_2 = self.ranks.rank(player_2);
        let record = FeatureRecord {
            surface_code: surface.code(),
            court_code: court.code(),
            series_code: series.code(),
            round_code: round.code(),
            best_of: best_of.sets(),
            rank_1,
            rank_2,
            rank_diff: i64::from(rank_2) - i64::from(rank_1),
        };
        debug!(?record, player_1, player_2, "built feature record");
        record
    }

    pub fn build_setup(&self, setup: &MatchSetup) -> FeatureRecord {
        self.build(
            setup.surface,
            setup.court,
            setup.series,
            setup.round,
            setup.best_of,
            &setup.player_1,
            &setup.player_2,
        )
    }
}
