use std::collections::VecDeque;
use std::path::Path;

use crate::encoding::{BestOf, Category, Court, Round, Series, Surface};
use crate::engine::Engine;
use crate::explain::AttributionResult;
use crate::features::{FeatureRecord, MatchSetup};
use crate::feedback::{self, FeedbackRecord, FeedbackSink, Judgement};
use crate::predict::PredictionResult;
use crate::report_export;

const MAX_LOGS: usize = 200;
const MAX_SUGGESTION_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Surface,
    Court,
    Series,
    Round,
    BestOf,
    Player1,
    Player2,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Surface,
        Field::Court,
        Field::Series,
        Field::Round,
        Field::BestOf,
        Field::Player1,
        Field::Player2,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Surface => "Surface",
            Self::Court => "Court Type",
            Self::Series => "Series",
            Self::Round => "Round",
            Self::BestOf => "Best of Sets",
            Self::Player1 => "Player 1",
            Self::Player2 => "Player 2",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Setup,
    Feedback,
}

/// The last successful prediction and the inputs that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionView {
    pub setup: MatchSetup,
    pub record: FeatureRecord,
    pub result: PredictionResult,
    /// Players missing from the rank table, who were scored with the sentinel rank.
    pub unranked: [bool; 2],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackStatus {
    Sent { sink: String },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackDraft {
    pub judgement: Judgement,
    pub suggestion: String,
}

impl Default for FeedbackDraft {
    fn default() -> Self {
        Self {
            judgement: Judgement::Correct,
            suggestion: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub surface: Surface,
    pub court: Court,
    pub series: Series,
    pub round: Round,
    pub best_of: BestOf,
    pub players: Vec<String>,
    pub player_1: usize,
    pub player_2: usize,
    pub focus: Field,
    pub mode: InputMode,
    pub prediction: Option<PredictionView>,
    pub attribution: Option<Result<AttributionResult, String>>,
    pub show_insights: bool,
    pub feedback: FeedbackDraft,
    pub feedback_status: Option<FeedbackStatus>,
    pub help_overlay: bool,
    pub logs: VecDeque<String>,
}

impl AppState {
    pub fn new(players: Vec<String>) -> Self {
        let player_2 = if players.len() > 1 { 1 } else { 0 };
        Self {
            surface: Surface::ALL[0],
            court: Court::ALL[0],
            series: Series::ALL[0],
            round: Round::ALL[0],
            best_of: BestOf::Three,
            players,
            player_1: 0,
            player_2,
            focus: Field::Surface,
            mode: InputMode::Setup,
            prediction: None,
            attribution: None,
            show_insights: false,
            feedback: FeedbackDraft::default(),
            feedback_status: None,
            help_overlay: false,
            logs: VecDeque::new(),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn player_name(&self, idx: usize) -> &str {
        self.players.get(idx).map(String::as_str).unwrap_or("")
    }

    pub fn setup(&self) -> MatchSetup {
        MatchSetup {
            surface: self.surface,
            court: self.court,
            series: self.series,
            round: self.round,
            best_of: self.best_of,
            player_1: self.player_name(self.player_1).to_string(),
            player_2: self.player_name(self.player_2).to_string(),
        }
    }

    pub fn same_players_selected(&self) -> bool {
        self.setup().same_players()
    }

    pub fn focus_next(&mut self) {
        let idx = (self.focus.index() + 1) % Field::ALL.len();
        self.focus = Field::ALL[idx];
    }

    pub fn focus_prev(&mut self) {
        let idx = (self.focus.index() + Field::ALL.len() - 1) % Field::ALL.len();
        self.focus = Field::ALL[idx];
    }

    /// Moves the focused field's selection by `step` options, wrapping around.
    pub fn cycle_focused(&mut self, step: isize) {
        match self.focus {
            Field::Surface => self.surface = cycle_category(self.surface, step),
            Field::Court => self.court = cycle_category(self.court, step),
            Field::Series => self.series = cycle_category(self.series, step),
            Field::Round => self.round = cycle_category(self.round, step),
            Field::BestOf => {
                let idx = wrap(BestOf::ALL.iter().position(|b| *b == self.best_of).unwrap_or(0), step, BestOf::ALL.len());
                self.best_of = BestOf::ALL[idx];
            }
            Field::Player1 => self.player_1 = wrap(self.player_1, step, self.players.len()),
            Field::Player2 => self.player_2 = wrap(self.player_2, step, self.players.len()),
        }
        if matches!(self.focus, Field::Player1 | Field::Player2) && self.same_players_selected() {
            self.push_log("[WARN] Please select two different players.");
        }
    }

    /// Runs a prediction for the current selection. Identical players are declined
    /// here; the feature builder itself accepts them.
    pub fn predict(&mut self, engine: &Engine) -> bool {
        if self.same_players_selected() {
            self.push_log("[WARN] Please select two different players.");
            return false;
        }

        let setup = self.setup();
        let record = engine.build(&setup);
        let unranked = [&setup.player_1, &setup.player_2]
            .map(|name| engine.ranks().lookup(name).is_none());
        match engine.predict(&record) {
            Ok(result) => {
                self.push_log(format!(
                    "[INFO] {} {:.1}% vs {} {:.1}%",
                    setup.player_1,
                    result.p1 * 100.0,
                    setup.player_2,
                    result.p2 * 100.0
                ));
                self.prediction = Some(PredictionView {
                    setup,
                    record,
                    result,
                    unranked,
                });
                self.attribution = None;
                self.feedback_status = None;
                if self.show_insights {
                    self.refresh_attribution(engine);
                }
                true
            }
            Err(err) => {
                self.push_log(format!("[ERROR] Prediction failed: {err}"));
                false
            }
        }
    }

    pub fn toggle_insights(&mut self, engine: &Engine) {
        self.show_insights = !self.show_insights;
        if self.show_insights && self.attribution.is_none() {
            self.refresh_attribution(engine);
        }
    }

    fn refresh_attribution(&mut self, engine: &Engine) {
        let Some(view) = &self.prediction else {
            return;
        };
        let outcome = engine.explain(&view.record).map_err(|err| err.to_string());
        if let Err(err) = &outcome {
            self.push_log(format!("[WARN] Insights unavailable: {err}"));
        }
        self.attribution = Some(outcome);
    }

    pub fn open_feedback(&mut self) {
        if self.prediction.is_none() {
            self.push_log("[INFO] Run a prediction before leaving feedback");
            return;
        }
        self.mode = InputMode::Feedback;
    }

    pub fn close_feedback(&mut self) {
        self.mode = InputMode::Setup;
    }

    pub fn feedback_type(&mut self, ch: char) {
        if self.feedback.suggestion.chars().count() < MAX_SUGGESTION_CHARS && !ch.is_control() {
            self.feedback.suggestion.push(ch);
        }
    }

    pub fn feedback_backspace(&mut self) {
        self.feedback.suggestion.pop();
    }

    pub fn cycle_judgement(&mut self) {
        self.feedback.judgement = self.feedback.judgement.next();
    }

    /// Sends the draft to `sink`. Failures are reported and leave the prediction and
    /// the draft in place so the user can retry.
    pub fn submit_feedback(&mut self, sink: Option<&dyn FeedbackSink>) -> bool {
        let Some(view) = &self.prediction else {
            self.push_log("[INFO] Nothing to give feedback on yet");
            return false;
        };
        let Some(sink) = sink else {
            self.feedback_status = Some(FeedbackStatus::Failed("feedback is disabled".to_string()));
            self.push_log("[WARN] Feedback is disabled");
            return false;
        };

        let record = FeedbackRecord::new(
            &view.setup,
            &view.record,
            &view.result,
            self.feedback.judgement,
            &self.feedback.suggestion,
        );
        match feedback::submit(sink, &record) {
            Ok(()) => {
                self.feedback_status = Some(FeedbackStatus::Sent {
                    sink: sink.name().to_string(),
                });
                self.feedback = FeedbackDraft::default();
                self.mode = InputMode::Setup;
                self.push_log("[INFO] Thanks! Feedback submitted");
                true
            }
            Err(err) => {
                self.feedback_status = Some(FeedbackStatus::Failed(err.to_string()));
                self.push_log(format!("[WARN] Feedback failed: {err}"));
                false
            }
        }
    }

    pub fn export(&mut self, dir: &Path) -> bool {
        let Some(view) = &self.prediction else {
            self.push_log("[INFO] Nothing to export yet");
            return false;
        };
        let attribution = self.attribution.as_ref().and_then(|a| a.as_ref().ok());
        let path = report_export::default_export_path(dir);
        match report_export::export_prediction(&path, view, attribution) {
            Ok(report) => {
                self.push_log(format!("[INFO] Exported {}", report.path.display()));
                true
            }
            Err(err) => {
                self.push_log(format!("[WARN] Export failed: {err:#}"));
                false
            }
        }
    }
}

fn wrap(idx: usize, step: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let len = len as isize;
    ((idx as isize + step).rem_euclid(len)) as usize
}

fn cycle_category<C: Category + PartialEq>(current: C, step: isize) -> C {
    let idx = C::ALL.iter().position(|c| *c == current).unwrap_or(0);
    C::ALL[wrap(idx, step, C::ALL.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_handles_negative_steps() {
        assert_eq!(wrap(0, -1, 4), 3);
        assert_eq!(wrap(3, 1, 4), 0);
        assert_eq!(wrap(2, 10, 4), 0);
        assert_eq!(wrap(0, 1, 0), 0);
    }

    #[test]
    fn cycling_round_walks_canonical_order() {
        let mut state = AppState::new(vec!["A".to_string(), "B".to_string()]);
        state.focus = Field::Round;
        state.cycle_focused(4);
        assert_eq!(state.round, Round::Quarterfinals);
        state.cycle_focused(-5);
        assert_eq!(state.round, Round::Final);
    }

    #[test]
    fn focus_wraps_both_ways() {
        let mut state = AppState::new(Vec::new());
        state.focus_prev();
        assert_eq!(state.focus, Field::Player2);
        state.focus_next();
        assert_eq!(state.focus, Field::Surface);
    }

    #[test]
    fn selecting_same_player_warns() {
        let mut state = AppState::new(vec!["A".to_string(), "B".to_string()]);
        state.focus = Field::Player2;
        state.cycle_focused(1);
        assert!(state.same_players_selected());
        assert!(state.logs.back().is_some_and(|l| l.contains("two different players")));
    }

    #[test]
    fn feedback_typing_ignores_control_chars() {
        let mut state = AppState::new(Vec::new());
        state.feedback_type('o');
        state.feedback_type('\n');
        state.feedback_type('k');
        state.feedback_backspace();
        assert_eq!(state.feedback.suggestion, "o");
    }
}
