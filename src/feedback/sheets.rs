use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{FEEDBACK_HEADER, FeedbackRecord, FeedbackSink};
use crate::config::SheetsConfig;
use crate::error::FeedbackError;

const REQUEST_TIMEOUT_SECS: u64 = 10;

static CLIENT: OnceCell<Client> = OnceCell::new();

fn shared_client() -> Result<&'static Client, FeedbackError> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("atp_terminal/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FeedbackError::from)
    })
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Appends feedback rows to a Google Sheets tab through the values REST API.
///
/// The first append checks the header row and writes it when the tab is empty.
pub struct SheetsSink {
    config: SheetsConfig,
    client: Client,
    header_checked: AtomicBool,
}

impl SheetsSink {
    pub fn new(config: SheetsConfig) -> Result<Self, FeedbackError> {
        let client = shared_client()?.clone();
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: SheetsConfig, client: Client) -> Self {
        Self {
            config,
            client,
            header_checked: AtomicBool::new(false),
        }
    }

    fn values_url(&self, range: &str, append: bool) -> Result<Url, FeedbackError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|err| FeedbackError::Remote(format!("bad sheets base url: {err}")))?;
        let segment = if append {
            format!("{range}:append")
        } else {
            range.to_string()
        };
        url.path_segments_mut()
            .map_err(|_| FeedbackError::Remote("sheets base url cannot take a path".to_string()))?
            .pop_if_empty()
            .push(&self.config.spreadsheet_id)
            .push("values")
            .push(&segment);
        if append {
            url.query_pairs_mut()
                .append_pair("valueInputOption", "RAW")
                .append_pair("insertDataOption", "INSERT_ROWS");
        }
        Ok(url)
    }

    fn header_range(&self) -> String {
        let last_col = (b'A' + FEEDBACK_HEADER.len() as u8 - 1) as char;
        format!("{}!A1:{last_col}1", self.config.tab)
    }

    fn ensure_header(&self) -> Result<(), FeedbackError> {
        if self.header_checked.load(Ordering::Acquire) {
            return Ok(());
        }

        let url = self.values_url(&self.header_range(), false)?;
        let resp = check_status(self.client.get(url).bearer_auth(&self.config.token).send()?)?;
        let range = resp
            .json::<ValueRange>()
            .map_err(|err| FeedbackError::Remote(format!("unreadable header range: {err}")))?;

        match range.values.first() {
            None => {
                self.append_rows(vec![FEEDBACK_HEADER.iter().map(|h| h.to_string()).collect()])?;
                info!(tab = %self.config.tab, "wrote feedback header row");
            }
            Some(first) if first.iter().all(|v| v.as_str().is_some_and(str::is_empty)) => {
                self.append_rows(vec![FEEDBACK_HEADER.iter().map(|h| h.to_string()).collect()])?;
                info!(tab = %self.config.tab, "wrote feedback header row");
            }
            Some(first) => {
                let found = first
                    .iter()
                    .map(|v| v.as_str().unwrap_or_default().trim().to_string())
                    .collect::<Vec<_>>();
                if found != FEEDBACK_HEADER {
                    return Err(FeedbackError::Remote(format!(
                        "sheet header [{}] does not match expected [{}]",
                        found.join(", "),
                        FEEDBACK_HEADER.join(", ")
                    )));
                }
            }
        }

        self.header_checked.store(true, Ordering::Release);
        Ok(())
    }

    fn append_rows(&self, rows: Vec<Vec<String>>) -> Result<(), FeedbackError> {
        let url = self.values_url(&format!("{}!A1", self.config.tab), true)?;
        let body = json!({ "values": rows });
        check_status(
            self.client
                .post(url)
                .bearer_auth(&self.config.token)
                .json(&body)
                .send()?,
        )?;
        Ok(())
    }
}

fn check_status(resp: Response) -> Result<Response, FeedbackError> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(FeedbackError::Auth(status.as_u16()));
    }
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        return Err(FeedbackError::Remote(format!("http {status}: {body}")));
    }
    Ok(resp)
}

impl FeedbackSink for SheetsSink {
    fn name(&self) -> &str {
        "sheets"
    }

    fn append(&self, record: &FeedbackRecord) -> Result<(), FeedbackError> {
        self.ensure_header()?;
        self.append_rows(vec![record.to_row()])
    }
}
