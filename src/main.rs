use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph, Row, Table};
use tracing::{error, info};

use atp_terminal::config::{self, AppConfig};
use atp_terminal::encoding::Category;
use atp_terminal::engine::Engine;
use atp_terminal::explain::AttributionResult;
use atp_terminal::feedback::{self, FeedbackSink};
use atp_terminal::logging;
use atp_terminal::state::{AppState, FeedbackStatus, Field, InputMode};

const PLAYER_PAGE: isize = 10;

struct App {
    state: AppState,
    engine: Engine,
    sink: Option<Box<dyn FeedbackSink>>,
    export_dir: PathBuf,
    should_quit: bool,
}

impl App {
    fn on_key(&mut self, key: KeyEvent) {
        if self.state.mode == InputMode::Feedback {
            self.on_feedback_key(key);
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab | KeyCode::Down | KeyCode::Char('j') => self.state.focus_next(),
            KeyCode::BackTab | KeyCode::Up | KeyCode::Char('k') => self.state.focus_prev(),
            KeyCode::Right | KeyCode::Char('l') => self.state.cycle_focused(1),
            KeyCode::Left | KeyCode::Char('h') => self.state.cycle_focused(-1),
            KeyCode::PageDown => self.state.cycle_focused(PLAYER_PAGE),
            KeyCode::PageUp => self.state.cycle_focused(-PLAYER_PAGE),
            KeyCode::Enter | KeyCode::Char('p') => {
                self.state.predict(&self.engine);
            }
            KeyCode::Char('i') | KeyCode::Char('I') => self.state.toggle_insights(&self.engine),
            KeyCode::Char('f') | KeyCode::Char('F') => self.state.open_feedback(),
            KeyCode::Char('x') | KeyCode::Char('X') => {
                self.state.export(&self.export_dir);
            }
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            _ => {}
        }
    }

    fn on_feedback_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.state.close_feedback(),
            KeyCode::Tab => self.state.cycle_judgement(),
            KeyCode::Backspace => self.state.feedback_backspace(),
            KeyCode::Enter => {
                self.state.submit_feedback(self.sink.as_deref());
            }
            KeyCode::Char(ch) => self.state.feedback_type(ch),
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let _log_guard = config::log_dir_from_env()
        .as_deref()
        .and_then(logging::init_file_logging);
    let config = AppConfig::from_env();

    let engine = Engine::load(&config.model_path, &config.ranks_path)
        .context("failed loading model or rank table")?;

    let mut state = AppState::new(engine.ranks().players().to_vec());
    if let Some(issue) = &config.feedback_issue {
        state.push_log(format!("[WARN] Feedback disabled: {issue}"));
    }
    let sink = match feedback::open_sink(&config.feedback) {
        Ok(sink) => sink,
        Err(err) => {
            error!(error = %err, "feedback sink unavailable");
            state.push_log(format!("[WARN] Feedback disabled: {err}"));
            None
        }
    };
    state.push_log(format!(
        "[INFO] Loaded {} model, {} players",
        engine.model().kind(),
        engine.ranks().len()
    ));
    info!("terminal ui starting");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App {
        state,
        engine,
        sink,
        export_dir: config.export_dir,
        should_quit: false,
    };
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text()).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(36), Constraint::Min(30)])
        .split(chunks[1]);

    render_setup(frame, columns[0], &app.state);
    render_results(frame, columns[1], &app.state);

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text() -> String {
    let line1 = "  ( )  ATP TENNIS MATCH WIN PREDICTOR".to_string();
    let line2 = "   |   Win probability from match conditions and ATP rankings".to_string();
    let line3 = "   |".to_string();
    format!("{line1}\n{line2}\n{line3}")
}

fn footer_text(state: &AppState) -> String {
    match state.mode {
        InputMode::Setup => {
            "j/k Field | h/l Change | PgUp/PgDn Skip | Enter Predict | i Insights | f Feedback | x Export | ? Help | q Quit".to_string()
        }
        InputMode::Feedback => {
            "Type suggestion | Tab Correct? | Backspace Delete | Enter Submit | Esc Back".to_string()
        }
    }
}

fn field_value(state: &AppState, field: Field) -> String {
    match field {
        Field::Surface => state.surface.label().to_string(),
        Field::Court => state.court.label().to_string(),
        Field::Series => state.series.label().to_string(),
        Field::Round => state.round.label().to_string(),
        Field::BestOf => state.best_of.to_string(),
        Field::Player1 => state.player_name(state.player_1).to_string(),
        Field::Player2 => state.player_name(state.player_2).to_string(),
    }
}

fn render_setup(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Match Setup").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();
    for field in Field::ALL {
        let focused = field == state.focus && state.mode == InputMode::Setup;
        let label_style = if focused {
            Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        let value_style = if focused {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(field.label(), label_style)));
        lines.push(Line::from(Span::styled(
            format!("  < {} >", field_value(state, field)),
            value_style,
        )));
    }
    if state.same_players_selected() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Please select two different players.",
            Style::default().fg(Color::Yellow),
        )));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_results(frame: &mut Frame, area: Rect, state: &AppState) {
    let feedback_height = if state.mode == InputMode::Feedback || state.feedback_status.is_some() {
        6
    } else {
        0
    };
    let insights_height = if state.show_insights { 12 } else { 0 };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(6),
            Constraint::Length(insights_height),
            Constraint::Length(feedback_height),
        ])
        .split(area);

    let Some(view) = &state.prediction else {
        let empty = Paragraph::new("Pick a match setup and press Enter to predict")
            .style(Style::default().fg(Color::DarkGray))
            .block(
                Block::default()
                    .title("Predicted Win Probabilities")
                    .borders(Borders::ALL),
            );
        frame.render_widget(empty, rows[0]);
        return;
    };

    let metrics = Paragraph::new(format!(
        "{:<28} {:>7.2}%   ({})\n{:<28} {:>7.2}%   ({})",
        view.setup.player_1,
        view.result.p1 * 100.0,
        rank_hint(view.record.rank_1, view.unranked[0]),
        view.setup.player_2,
        view.result.p2 * 100.0,
        rank_hint(view.record.rank_2, view.unranked[1]),
    ))
    .block(
        Block::default()
            .title("Predicted Win Probabilities")
            .borders(Borders::ALL),
    );
    frame.render_widget(metrics, rows[0]);

    let chart = win_bar_chart(state);
    frame.render_widget(chart, rows[1]);

    if state.show_insights {
        render_insights(frame, rows[2], state);
    }
    if feedback_height > 0 {
        render_feedback(frame, rows[3], state);
    }
}

fn rank_hint(rank: u32, unranked: bool) -> String {
    if unranked {
        format!("ATP Rank: {rank}, unranked")
    } else {
        format!("ATP Rank: {rank}")
    }
}

fn win_bar_chart(state: &AppState) -> BarChart<'static> {
    let Some(view) = &state.prediction else {
        return BarChart::default();
    };
    let p1 = (view.result.p1 * 100.0).round() as u64;
    let p2 = (view.result.p2 * 100.0).round() as u64;

    let bar_1 = Bar::default()
        .value(p1)
        .label(Line::from(view.setup.player_1.clone()))
        .text_value(format!("{p1}%"))
        .style(Style::default().fg(Color::Green));
    let bar_2 = Bar::default()
        .value(p2)
        .label(Line::from(view.setup.player_2.clone()))
        .text_value(format!("{p2}%"))
        .style(Style::default().fg(Color::Red));

    BarChart::default()
        .block(Block::default().title("Win Probability").borders(Borders::ALL))
        .data(BarGroup::default().bars(&[bar_1, bar_2]))
        .bar_width(12)
        .bar_gap(6)
        .max(100)
}

fn render_insights(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .title("Why Did the Model Predict This?")
        .borders(Borders::ALL);
    match &state.attribution {
        Some(Ok(attr)) => {
            let halves = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(36), Constraint::Min(20)])
                .split(area);

            let rows = attr.contributions.iter().map(|c| {
                Row::new(vec![
                    c.feature.clone(),
                    format!("{}", c.value),
                    format!("{:+.4}", c.contribution),
                ])
                .style(impact_style(c.contribution))
            });
            let table = Table::new(
                rows,
                [
                    Constraint::Length(14),
                    Constraint::Length(8),
                    Constraint::Length(10),
                ],
            )
            .header(
                Row::new(vec!["Feature", "Value", "Impact"])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .block(block);
            frame.render_widget(table, halves[0]);

            render_waterfall(frame, halves[1], attr);
        }
        Some(Err(err)) => {
            let msg = Paragraph::new(format!("Insights unavailable: {err}"))
                .style(Style::default().fg(Color::Yellow))
                .block(block);
            frame.render_widget(msg, area);
        }
        None => {
            let msg = Paragraph::new("Run a prediction to see insights")
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            frame.render_widget(msg, area);
        }
    }
}

fn impact_style(contribution: f64) -> Style {
    if contribution >= 0.0 {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Red)
    }
}

fn render_waterfall(frame: &mut Frame, area: Rect, attr: &AttributionResult) {
    let block = Block::default()
        .title("Waterfall")
        .title_bottom(format!(
            "E[f(x)] {:.3} -> f(x) {:.3}",
            attr.baseline, attr.prediction
        ))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let steps = attr.waterfall();
    let (lo, hi) = steps.iter().fold((attr.baseline, attr.baseline), |(lo, hi), s| {
        (lo.min(s.start).min(s.end), hi.max(s.start).max(s.end))
    });
    let width = usize::from(inner.width).saturating_sub(14 + 8);

    // Largest effect on top, ending at the prediction.
    let lines = steps
        .iter()
        .rev()
        .map(|step| {
            Line::from(vec![
                Span::raw(format!("{:<14}", step.feature)),
                Span::styled(
                    waterfall_bar(step.start, step.end, lo, hi, width),
                    impact_style(step.end - step.start),
                ),
                Span::raw(format!(" {:.3}", step.end)),
            ])
        })
        .collect::<Vec<_>>();
    frame.render_widget(Paragraph::new(lines), inner);
}

/// A bar spanning `start..end` on a `width`-column axis covering `lo..hi`.
fn waterfall_bar(start: f64, end: f64, lo: f64, hi: f64, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let span = (hi - lo).max(f64::EPSILON);
    let col = |v: f64| (((v - lo) / span) * width as f64).round() as usize;
    let from = col(start.min(end)).min(width - 1);
    let to = col(start.max(end)).clamp(from + 1, width);
    format!(
        "{}{}{}",
        " ".repeat(from),
        "█".repeat(to - from),
        " ".repeat(width - to)
    )
}

fn render_feedback(frame: &mut Frame, area: Rect, state: &AppState) {
    let status = match &state.feedback_status {
        Some(FeedbackStatus::Sent { sink }) => format!("Submitted to {sink}"),
        Some(FeedbackStatus::Failed(err)) => format!("Not submitted: {err}"),
        None => String::new(),
    };
    let cursor = if state.mode == InputMode::Feedback { "_" } else { "" };
    let text = format!(
        "Was the prediction correct? {}\nSuggestion: {}{cursor}\n{status}",
        state.feedback.judgement.label(),
        state.feedback.suggestion,
    );
    let style = match state.feedback_status {
        Some(FeedbackStatus::Failed(_)) => Style::default().fg(Color::Yellow),
        _ => Style::default(),
    };
    let panel = Paragraph::new(text)
        .style(style)
        .block(Block::default().title("Feedback").borders(Borders::ALL));
    frame.render_widget(panel, area);
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "ATP Win Predictor - Help",
        "",
        "Match setup:",
        "  j/k or Tab    Move between fields",
        "  h/l or ←/→    Change value",
        "  PgUp/PgDn     Jump 10 players",
        "  Enter / p     Predict",
        "",
        "Results:",
        "  i             Toggle insights (attribution + waterfall)",
        "  f             Leave feedback",
        "  x             Export to xlsx",
        "",
        "  ?             Toggle help",
        "  q             Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
