use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::error::ConfigError;

const APP_DIR: &str = "atp_terminal";
const DEFAULT_MODEL_PATH: &str = "assets/model.json";
const DEFAULT_RANKS_PATH: &str = "assets/player_ranks.json";
const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DEFAULT_SHEETS_TAB: &str = "Feedback";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackBackend {
    Off,
    Sqlite { path: PathBuf },
    Sheets(SheetsConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetsConfig {
    pub base_url: String,
    pub spreadsheet_id: String,
    pub tab: String,
    pub token: String,
}

#[derive(Debug)]
pub struct AppConfig {
    pub model_path: PathBuf,
    pub ranks_path: PathBuf,
    pub feedback: FeedbackBackend,
    /// Set when the requested feedback backend was misconfigured and disabled.
    pub feedback_issue: Option<ConfigError>,
    pub export_dir: PathBuf,
}

impl AppConfig {
    /// Reads `ATP_*` settings from the process environment. Call after dotenv files
    /// have been applied. A broken feedback setup disables feedback rather than failing.
    pub fn from_env() -> Self {
        let model_path = env_path("ATP_MODEL_PATH").unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));
        let ranks_path = env_path("ATP_RANKS_PATH").unwrap_or_else(|| PathBuf::from(DEFAULT_RANKS_PATH));
        let export_dir = env_path("ATP_EXPORT_DIR")
            .or_else(|| app_cache_dir().map(|d| d.join("exports")))
            .unwrap_or_else(|| PathBuf::from("exports"));

        let (feedback, feedback_issue) = match feedback_backend_from_env() {
            Ok(backend) => (backend, None),
            Err(err) => {
                warn!(error = %err, "feedback disabled");
                (FeedbackBackend::Off, Some(err))
            }
        };

        Self {
            model_path,
            ranks_path,
            feedback,
            feedback_issue,
            export_dir,
        }
    }
}

pub fn feedback_backend_from_env() -> Result<FeedbackBackend, ConfigError> {
    parse_feedback_backend(env_string)
}

/// Resolves the feedback backend from `ATP_*` settings read through `var`. Unknown
/// backend names are rejected rather than falling back to a local store.
pub fn parse_feedback_backend(
    var: impl Fn(&str) -> Option<String>,
) -> Result<FeedbackBackend, ConfigError> {
    let raw = var("ATP_FEEDBACK_BACKEND").unwrap_or_else(|| "sqlite".to_string());
    match raw.trim().to_ascii_lowercase().as_str() {
        "off" | "none" | "0" | "false" => Ok(FeedbackBackend::Off),
        "sheets" | "google_sheets" => {
            let spreadsheet_id = var("ATP_SHEETS_SPREADSHEET_ID")
                .ok_or(ConfigError::MissingSetting("ATP_SHEETS_SPREADSHEET_ID"))?;
            let token = var("ATP_SHEETS_TOKEN").ok_or(ConfigError::MissingSetting("ATP_SHEETS_TOKEN"))?;
            Ok(FeedbackBackend::Sheets(SheetsConfig {
                base_url: var("ATP_SHEETS_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_SHEETS_BASE_URL.to_string()),
                spreadsheet_id,
                tab: var("ATP_SHEETS_TAB").unwrap_or_else(|| DEFAULT_SHEETS_TAB.to_string()),
                token,
            }))
        }
        "sqlite" => {
            let path = var("ATP_FEEDBACK_DB")
                .map(PathBuf::from)
                .or_else(|| app_cache_dir().map(|d| d.join("feedback.sqlite")))
                .ok_or(ConfigError::MissingSetting("ATP_FEEDBACK_DB"))?;
            Ok(FeedbackBackend::Sqlite { path })
        }
        other => Err(ConfigError::Invalid {
            what: "feedback backend",
            reason: format!("unknown ATP_FEEDBACK_BACKEND {other:?}, expected sqlite, sheets or off"),
        }),
    }
}

/// Log directory, resolvable before the rest of the config so logging can start first.
pub fn log_dir_from_env() -> Option<PathBuf> {
    env_path("ATP_LOG_DIR").or_else(|| app_cache_dir().map(|d| d.join("logs")))
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Some(base) = env_string("XDG_CACHE_HOME") {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = env_string("HOME")?;
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env_string(key).map(PathBuf::from)
}
