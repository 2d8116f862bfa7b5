use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use atp_terminal::encoding::{BestOf, Category, Court, Round, Series, Surface};
use atp_terminal::engine::Engine;
use atp_terminal::error::{ConfigError, ExplainError, PredictError};
use atp_terminal::explain::Explainer;
use atp_terminal::features::{FEATURE_NAMES, FeatureRecord, FeatureVectorBuilder, MatchSetup, NamedRow};
use atp_terminal::model::{self, Classifier};
use atp_terminal::predict::Predictor;
use atp_terminal::ranks::{PlayerRankTable, SENTINEL_RANK};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn engine(model_file: &str) -> Engine {
    Engine::load(&fixture(model_file), &fixture("ranks.json")).unwrap()
}

fn setup(p1: &str, p2: &str) -> MatchSetup {
    MatchSetup {
        surface: Surface::Hard,
        court: Court::Outdoor,
        series: Series::Masters1000,
        round: Round::Quarterfinals,
        best_of: BestOf::Three,
        player_1: p1.to_string(),
        player_2: p2.to_string(),
    }
}

#[test]
fn masters_quarterfinal_record_matches_encoding_tables() {
    let engine = engine("model_trees.json");
    let record = engine.build(&setup("Sinner J.", "Alcaraz C."));
    assert_eq!(
        record.values(),
        [3.0, 0.0, 6.0, 4.0, 3.0, 5.0, 80.0, 75.0]
    );
}

#[test]
fn unknown_player_gets_sentinel_rank() {
    let engine = engine("model_trees.json");

    let record = engine.build(&setup("Medvedev D.", "Nobody X."));
    assert_eq!(record.rank_1, 10);
    assert_eq!(record.rank_2, SENTINEL_RANK);
    assert_eq!(record.rank_diff, 990);

    let record = engine.build(&setup("Nobody X.", "Medvedev D."));
    assert_eq!(record.rank_1, SENTINEL_RANK);
    assert_eq!(record.rank_diff, -990);
}

#[test]
fn identical_players_still_build_a_record() {
    let engine = engine("model_trees.json");
    let record = engine.build(&setup("Zverev A.", "zverev  a."));
    assert_eq!(record.rank_1, 2);
    assert_eq!(record.rank_2, 2);
    assert_eq!(record.rank_diff, 0);
    assert!(engine.predict(&record).is_ok());
}

#[test]
fn prediction_is_deterministic_and_complementary() {
    for file in ["model_trees.json", "model_logistic.json"] {
        let engine = engine(file);
        let record = engine.build(&setup("Sinner J.", "Alcaraz C."));
        let first = engine.predict(&record).unwrap();
        let second = engine.predict(&record).unwrap();
        assert_eq!(first, second, "{file}");
        assert!((first.p1 + first.p2 - 1.0).abs() < 1e-12, "{file}");
        assert!((0.0..=1.0).contains(&first.p1), "{file}");
        assert!(first.favourite_is_player_1(), "{file}: better-ranked player 1");
    }
}

#[test]
fn tree_prediction_matches_hand_computed_margin() {
    let engine = engine("model_trees.json");
    let record = engine.build(&setup("Sinner J.", "Alcaraz C."));
    let p = engine.predict(&record).unwrap();
    // Rank_Diff 75 goes right (+0.8); Hard surface code 3 goes right (-0.1).
    let expected = 1.0 / (1.0 + (-0.7_f64).exp());
    assert!((p.p1 - expected).abs() < 1e-12);
}

#[test]
fn attribution_is_additive_and_sorted() {
    for file in ["model_trees.json", "model_logistic.json"] {
        let engine = engine(file);
        let record = engine.build(&setup("Sinner J.", "Alcaraz C."));
        let prediction = engine.predict(&record).unwrap();
        let attr = engine.explain(&record).unwrap();

        assert_eq!(attr.contributions.len(), FEATURE_NAMES.len(), "{file}");
        assert!((attr.prediction - prediction.p1).abs() < 1e-9, "{file}");
        assert!(
            (attr.baseline + attr.total() - prediction.p1).abs() < 1e-9,
            "{file}: baseline {} + total {} != {}",
            attr.baseline,
            attr.total(),
            prediction.p1
        );
        for pair in attr.contributions.windows(2) {
            assert!(pair[0].contribution.abs() >= pair[1].contribution.abs(), "{file}");
        }
    }
}

#[test]
fn features_a_model_ignores_get_no_credit() {
    let engine = engine("model_trees.json");
    let record = engine.build(&setup("Sinner J.", "Alcaraz C."));
    let attr = engine.explain(&record).unwrap();
    for name in ["Court_Code", "Series_Code", "Round_Code", "Best of", "Rank_1", "Rank_2"] {
        let c = attr.get(name).unwrap();
        assert!(c.contribution.abs() < 1e-12, "{name} got {}", c.contribution);
    }
    assert!(attr.get("Rank_Diff").unwrap().contribution > 0.0);
    assert_eq!(attr.contributions[0].feature, "Rank_Diff");
}

#[test]
fn randomized_setups_keep_probability_and_attribution_invariants() {
    let engine = engine("model_trees.json");
    let logistic = engine_with_model("model_logistic.json");
    let players = ["Sinner J.", "Alcaraz C.", "Medvedev D.", "Zverev A.", "Unknown Q."];
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..200 {
        let setup = MatchSetup {
            surface: Surface::ALL[rng.gen_range(0..Surface::ALL.len())],
            court: Court::ALL[rng.gen_range(0..Court::ALL.len())],
            series: Series::ALL[rng.gen_range(0..Series::ALL.len())],
            round: Round::ALL[rng.gen_range(0..Round::ALL.len())],
            best_of: BestOf::ALL[rng.gen_range(0..BestOf::ALL.len())],
            player_1: players[rng.gen_range(0..players.len())].to_string(),
            player_2: players[rng.gen_range(0..players.len())].to_string(),
        };
        for engine in [&engine, &logistic] {
            let record = engine.build(&setup);
            assert_eq!(
                record.rank_diff,
                i64::from(record.rank_2) - i64::from(record.rank_1)
            );
            let p = engine.predict(&record).unwrap();
            assert!((0.0..=1.0).contains(&p.p1));
            assert!((p.p1 + p.p2 - 1.0).abs() < 1e-12);

            let attr = engine.explain(&record).unwrap();
            assert!((attr.baseline + attr.total() - p.p1).abs() < 1e-9);
        }
    }
}

fn engine_with_model(model_file: &str) -> Engine {
    let model = model::load_model(&fixture(model_file)).unwrap();
    let ranks = PlayerRankTable::load(&fixture("ranks.json")).unwrap();
    Engine::new(ranks, model)
}

#[test]
fn builder_and_engine_agree() {
    let ranks = PlayerRankTable::load(&fixture("ranks.json")).unwrap();
    let builder = FeatureVectorBuilder::new(&ranks);
    let direct = builder.build(
        Surface::Hard,
        Court::Outdoor,
        Series::Masters1000,
        Round::Quarterfinals,
        BestOf::Three,
        "Sinner J.",
        "Alcaraz C.",
    );
    let via_engine = engine("model_trees.json").build(&setup("Sinner J.", "Alcaraz C."));
    assert_eq!(direct, via_engine);
}

#[test]
fn seven_feature_model_is_a_schema_mismatch() {
    let model = model::load_model(&fixture("model_seven_features.json")).unwrap();
    let record = engine("model_trees.json").build(&setup("Sinner J.", "Alcaraz C."));

    let err = Predictor::new(model.clone()).predict(&record).unwrap_err();
    assert!(matches!(err, PredictError::SchemaMismatch { .. }));

    let err = Explainer::new(model).explain(&record).unwrap_err();
    assert!(matches!(
        err,
        ExplainError::Predict(PredictError::SchemaMismatch { .. })
    ));
}

#[test]
fn reordered_columns_are_rejected_not_coerced() {
    let model = model::load_model(&fixture("model_logistic.json")).unwrap();
    let record = engine("model_trees.json").build(&setup("Sinner J.", "Alcaraz C."));
    let mut row = record.to_row();
    row.names.swap(5, 6);
    row.values.swap(5, 6);
    let err = Predictor::new(model).predict_row(&row).unwrap_err();
    assert!(matches!(err, PredictError::SchemaMismatch { .. }));
}

struct NoExpectation {
    names: Vec<String>,
}

impl Classifier for NoExpectation {
    fn kind(&self) -> &str {
        "opaque"
    }

    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn predict_proba(&self, _row: &[f64]) -> Result<[f64; 2], PredictError> {
        Ok([0.4, 0.6])
    }
}

#[test]
fn opaque_model_predicts_but_cannot_explain() {
    let names = FEATURE_NAMES.iter().map(|n| n.to_string()).collect();
    let model = std::sync::Arc::new(NoExpectation { names });
    let ranks = PlayerRankTable::load(&fixture("ranks.json")).unwrap();
    let engine = Engine::new(ranks, model);
    let record = engine.build(&setup("Sinner J.", "Alcaraz C."));

    assert!((engine.predict(&record).unwrap().p1 - 0.6).abs() < 1e-12);
    let err = engine.explain(&record).unwrap_err();
    assert!(matches!(err, ExplainError::Unsupported { .. }));
}

#[test]
fn missing_and_corrupt_artifacts_are_config_errors() {
    let err = Engine::load(&fixture("does_not_exist.json"), &fixture("ranks.json")).err();
    assert!(matches!(err, Some(ConfigError::Read { .. })));

    let err = Engine::load(&fixture("corrupt.json"), &fixture("ranks.json")).err();
    assert!(matches!(err, Some(ConfigError::Parse { .. })));

    let err = Engine::load(&fixture("model_trees.json"), &fixture("corrupt.json")).err();
    assert!(matches!(err, Some(ConfigError::Parse { .. })));

    let err = Engine::load(&fixture("model_trees.json"), &fixture("missing_ranks.json")).err();
    assert!(matches!(err, Some(ConfigError::Read { .. })));
}

#[test]
fn shipped_assets_load() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets");
    let engine = Engine::load(&root.join("model.json"), &root.join("player_ranks.json")).unwrap();
    assert_eq!(engine.model().feature_names(), FEATURE_NAMES.map(String::from).as_slice());
    assert!(engine.ranks().players().iter().any(|p| p == "Sinner J."));

    let record = engine.build(&setup("Sinner J.", "Monfils G."));
    let p = engine.predict(&record).unwrap();
    assert!(p.p1 > 0.5);
}

#[test]
fn named_row_carries_training_column_names() {
    let record = FeatureRecord {
        surface_code: 1,
        court_code: 1,
        series_code: 2,
        round_code: 7,
        best_of: 5,
        rank_1: 3,
        rank_2: 1,
        rank_diff: -2,
    };
    let row: NamedRow = record.to_row();
    assert_eq!(row.names, FEATURE_NAMES.map(String::from).to_vec());
    assert_eq!(row.values[7], -2.0);
}
