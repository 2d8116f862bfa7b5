use std::path::Path;

use rusqlite::{Connection, params};

use super::{FeedbackRecord, FeedbackSink, Judgement};
use crate::error::FeedbackError;

/// Local feedback table, for running without a remote spreadsheet.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    pub fn open(path: &Path) -> Result<Self, FeedbackError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self, FeedbackError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn count(&self) -> Result<usize, FeedbackError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM feedback", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Most recent first.
    pub fn recent(&self, limit: usize) -> Result<Vec<FeedbackRecord>, FeedbackError> {
        let mut stmt = self.conn.prepare(
            "SELECT submitted_at, player_1, player_2, rank_1, rank_2, p1, judgement, suggestion
             FROM feedback ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            let judgement: String = row.get(6)?;
            Ok(FeedbackRecord {
                submitted_at: row.get(0)?,
                player_1: row.get(1)?,
                player_2: row.get(2)?,
                rank_1: row.get(3)?,
                rank_2: row.get(4)?,
                p1: row.get(5)?,
                judgement: Judgement::from_label(&judgement).unwrap_or(Judgement::NotSure),
                suggestion: row.get(7)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn init_schema(conn: &Connection) -> Result<(), FeedbackError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS feedback (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            submitted_at TEXT NOT NULL,
            player_1 TEXT NOT NULL,
            player_2 TEXT NOT NULL,
            rank_1 INTEGER NOT NULL,
            rank_2 INTEGER NOT NULL,
            p1 REAL NOT NULL,
            judgement TEXT NOT NULL,
            suggestion TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

impl FeedbackSink for SqliteSink {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn append(&self, record: &FeedbackRecord) -> Result<(), FeedbackError> {
        self.conn.execute(
            "INSERT INTO feedback
             (submitted_at, player_1, player_2, rank_1, rank_2, p1, judgement, suggestion)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.submitted_at,
                record.player_1,
                record.player_2,
                record.rank_1,
                record.rank_2,
                record.p1,
                record.judgement.label(),
                record.suggestion,
            ],
        )?;
        Ok(())
    }
}
