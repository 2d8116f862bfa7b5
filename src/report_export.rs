use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::encoding::Category;
use crate::explain::AttributionResult;
use crate::state::PredictionView;

pub struct ExportReport {
    pub path: PathBuf,
    pub prediction_rows: usize,
    pub attribution_rows: usize,
}

/// A fresh workbook path under `dir`. Millisecond timestamps, with a counter suffix
/// when a file of that name already exists.
pub fn default_export_path(dir: &Path) -> PathBuf {
    let stem = format!("prediction_{}", Utc::now().format("%Y%m%d_%H%M%S_%3f"));
    let mut path = dir.join(format!("{stem}.xlsx"));
    let mut counter = 1;
    while path.exists() {
        path = dir.join(format!("{stem}_{counter}.xlsx"));
        counter += 1;
    }
    path
}

pub fn export_prediction(
    path: &Path,
    view: &PredictionView,
    attribution: Option<&AttributionResult>,
) -> Result<ExportReport> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create export dir {}", parent.display()))?;
    }

    let setup = &view.setup;
    let record = &view.record;
    let prediction_rows = vec![
        vec!["Field".to_string(), "Value".to_string()],
        vec!["Surface".to_string(), setup.surface.label().to_string()],
        vec!["Court".to_string(), setup.court.label().to_string()],
        vec!["Series".to_string(), setup.series.label().to_string()],
        vec!["Round".to_string(), setup.round.label().to_string()],
        vec!["Best of".to_string(), setup.best_of.to_string()],
        vec!["Player 1".to_string(), setup.player_1.clone()],
        vec!["Player 2".to_string(), setup.player_2.clone()],
        vec!["Rank 1".to_string(), record.rank_1.to_string()],
        vec!["Rank 2".to_string(), record.rank_2.to_string()],
        vec!["Rank Diff".to_string(), record.rank_diff.to_string()],
        vec!["Win Probability P1".to_string(), format!("{:.4}", view.result.p1)],
        vec!["Win Probability P2".to_string(), format!("{:.4}", view.result.p2)],
    ];

    let mut attribution_rows = Vec::new();
    if let Some(attr) = attribution {
        attribution_rows.push(vec![
            "Feature".to_string(),
            "Value".to_string(),
            "Contribution".to_string(),
        ]);
        for c in &attr.contributions {
            attribution_rows.push(vec![
                c.feature.clone(),
                format_value(c.value),
                format!("{:+.6}", c.contribution),
            ]);
        }
        attribution_rows.push(vec![
            "Baseline".to_string(),
            String::new(),
            format!("{:.6}", attr.baseline),
        ]);
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Prediction")?;
        write_rows(sheet, &prediction_rows)?;
    }
    if !attribution_rows.is_empty() {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Attribution")?;
        write_rows(sheet, &attribution_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        path: path.to_path_buf(),
        prediction_rows: prediction_rows.len().saturating_sub(1),
        attribution_rows: attribution_rows.len().saturating_sub(2),
    })
}

fn format_value(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v}")
    }
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
