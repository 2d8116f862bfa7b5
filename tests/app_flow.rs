use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use atp_terminal::engine::Engine;
use atp_terminal::error::FeedbackError;
use atp_terminal::feedback::{FeedbackRecord, FeedbackSink, Judgement, SqliteSink};
use atp_terminal::report_export;
use atp_terminal::state::{AppState, FeedbackStatus, Field, InputMode};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn engine() -> Engine {
    Engine::load(&fixture("model_trees.json"), &fixture("ranks.json")).unwrap()
}

fn scratch_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    std::env::temp_dir().join(format!("atp_terminal_{tag}_{}_{nanos}", std::process::id()))
}

/// Players sorted: Alcaraz C., Medvedev D., Sinner J., Zverev A.
fn state_with_prediction(engine: &Engine) -> AppState {
    let mut state = AppState::new(engine.ranks().players().to_vec());
    state.player_1 = 2;
    state.player_2 = 0;
    assert!(state.predict(engine));
    state
}

struct FailingSink {
    calls: Cell<usize>,
}

impl FeedbackSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    fn append(&self, _record: &FeedbackRecord) -> Result<(), FeedbackError> {
        self.calls.set(self.calls.get() + 1);
        Err(FeedbackError::Network("connection reset".to_string()))
    }
}

#[test]
fn players_are_listed_title_cased_and_sorted() {
    let engine = engine();
    assert_eq!(
        engine.ranks().players(),
        ["Alcaraz C.", "Medvedev D.", "Sinner J.", "Zverev A."]
    );
}

#[test]
fn failed_feedback_keeps_prediction_and_draft() {
    let engine = engine();
    let mut state = state_with_prediction(&engine);
    let before = state.prediction.clone();

    state.open_feedback();
    assert_eq!(state.mode, InputMode::Feedback);
    for ch in "too confident".chars() {
        state.feedback_type(ch);
    }
    state.cycle_judgement();

    let sink = FailingSink { calls: Cell::new(0) };
    assert!(!state.submit_feedback(Some(&sink)));
    assert_eq!(sink.calls.get(), 1);

    assert_eq!(state.prediction, before);
    assert_eq!(state.feedback.suggestion, "too confident");
    assert_eq!(state.feedback.judgement, Judgement::Incorrect);
    assert!(matches!(state.feedback_status, Some(FeedbackStatus::Failed(ref msg)) if msg.contains("connection reset")));
    assert!(state.logs.back().is_some_and(|l| l.starts_with("[WARN]")));
}

#[test]
fn disabled_feedback_is_reported_not_fatal() {
    let engine = engine();
    let mut state = state_with_prediction(&engine);
    state.open_feedback();
    assert!(!state.submit_feedback(None));
    assert!(state.prediction.is_some());
    assert!(matches!(state.feedback_status, Some(FeedbackStatus::Failed(_))));
}

#[test]
fn feedback_lands_in_sqlite_sink() {
    let engine = engine();
    let mut state = state_with_prediction(&engine);
    state.open_feedback();
    for ch in "  spot on  ".chars() {
        state.feedback_type(ch);
    }

    let sink = SqliteSink::in_memory().unwrap();
    assert!(state.submit_feedback(Some(&sink)));
    assert_eq!(state.mode, InputMode::Setup);
    assert_eq!(
        state.feedback_status,
        Some(FeedbackStatus::Sent {
            sink: "sqlite".to_string()
        })
    );
    assert!(state.feedback.suggestion.is_empty());

    let stored = sink.recent(1).unwrap();
    assert_eq!(stored.len(), 1);
    let row = &stored[0];
    assert_eq!(row.player_1, "Sinner J.");
    assert_eq!(row.player_2, "Alcaraz C.");
    assert_eq!((row.rank_1, row.rank_2), (5, 80));
    assert_eq!(row.judgement, Judgement::Correct);
    assert_eq!(row.suggestion, "spot on");
    let shown = state.prediction.as_ref().map(|v| v.result.p1).unwrap();
    assert!((row.p1 - shown).abs() < 1e-12);
}

#[test]
fn same_player_twice_is_declined_with_warning() {
    let engine = engine();
    let mut state = AppState::new(engine.ranks().players().to_vec());
    state.player_1 = 1;
    state.player_2 = 1;
    assert!(!state.predict(&engine));
    assert!(state.prediction.is_none());
    assert!(state.logs.back().is_some_and(|l| l.contains("two different players")));
}

#[test]
fn new_prediction_replaces_previous_and_refreshes_insights() {
    let engine = engine();
    let mut state = state_with_prediction(&engine);
    state.toggle_insights(&engine);
    let first_attr = match &state.attribution {
        Some(Ok(attr)) => attr.clone(),
        other => panic!("expected attribution, got {other:?}"),
    };

    state.focus = Field::Player2;
    state.cycle_focused(1);
    assert!(state.predict(&engine));
    let second = state.prediction.as_ref().unwrap();
    assert_eq!(second.setup.player_2, "Medvedev D.");
    match &state.attribution {
        Some(Ok(attr)) => {
            assert_ne!(attr, &first_attr);
            assert!((attr.baseline + attr.total() - second.result.p1).abs() < 1e-9);
        }
        other => panic!("expected attribution, got {other:?}"),
    }
}

#[test]
fn insights_stay_hidden_until_requested() {
    let engine = engine();
    let state = state_with_prediction(&engine);
    assert!(!state.show_insights);
    assert!(state.attribution.is_none());
}

#[test]
fn export_writes_workbook() {
    let engine = engine();
    let mut state = state_with_prediction(&engine);
    state.toggle_insights(&engine);

    let dir = scratch_dir("export");
    assert!(state.export(&dir));
    assert!(state.export(&dir));
    let written = std::fs::read_dir(&dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect::<Vec<_>>();
    assert_eq!(written.len(), 2, "back-to-back exports must not overwrite");
    for path in &written {
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("xlsx"));
    }
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn export_report_counts_rows() {
    let engine = engine();
    let state = state_with_prediction(&engine);
    let view = state.prediction.as_ref().unwrap();
    let attribution = engine.explain(&view.record).unwrap();

    let dir = scratch_dir("report");
    let path = report_export::default_export_path(&dir);
    let report = report_export::export_prediction(&path, view, Some(&attribution)).unwrap();
    assert_eq!(report.prediction_rows, 12);
    assert_eq!(report.attribution_rows, 8);
    assert!(report.path.exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn nothing_to_export_or_review_before_predicting() {
    let engine = engine();
    let mut state = AppState::new(engine.ranks().players().to_vec());
    assert!(!state.export(&scratch_dir("empty")));
    state.open_feedback();
    assert_eq!(state.mode, InputMode::Setup);
}

#[test]
fn unranked_players_are_flagged_on_the_prediction() {
    let engine = engine();
    let mut state = AppState::new(vec!["Sinner J.".to_string(), "Nobody X.".to_string()]);
    assert!(state.predict(&engine));
    let view = state.prediction.as_ref().unwrap();
    assert_eq!(view.unranked, [false, true]);
    assert_eq!(view.record.rank_2, atp_terminal::ranks::SENTINEL_RANK);
}
