use std::time::Duration;

use crate::client::Predictor;
use crate::error::BulkError;
use crate::history::HistoryStore;
use crate::models::{
    BulkOutcome, BulkProgress, BulkRow, BulkSummary, PredictionInput, RiskLevel, RowResult,
};

const REQUIRED_COLUMNS: [&str; 3] = ["marks", "attendance", "feedback"];

pub const DEFAULT_ROW_PAUSE: Duration = Duration::from_millis(100);

/// Parses `marks,attendance,feedback` rows, one per non-blank line. Columns match
/// case-insensitively in any order; extra columns are ignored. Quotes are ordinary
/// characters. Numbers that fail to parse become `NaN` and are rejected later by
/// request validation.
pub fn parse_csv(text: &str) -> Result<Vec<BulkRow>, BulkError> {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    if lines.is_empty() {
        return Err(BulkError::Empty);
    }

    let joined = lines.join("\n");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(joined.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.to_lowercase())
        .collect();
    let position = |name: &str| headers.iter().position(|header| header == name);

    let (marks_idx, attendance_idx, feedback_idx) =
        match (position("marks"), position("attendance"), position("feedback")) {
            (Some(m), Some(a), Some(f)) => (m, a, f),
            _ => {
                let missing = REQUIRED_COLUMNS
                    .into_iter()
                    .filter(|name| position(*name).is_none())
                    .collect();
                return Err(BulkError::MissingColumns { missing });
            }
        };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(BulkRow {
            marks: parse_number(record.get(marks_idx)),
            attendance: parse_number(record.get(attendance_idx)),
            feedback: record.get(feedback_idx).unwrap_or_default().to_string(),
        });
    }

    Ok(rows)
}

/// Reads the leading decimal number of a cell, so `72%` is 72 and `65 marks` is 65.
fn parse_number(cell: Option<&str>) -> f64 {
    let Some(value) = cell.map(str::trim_start) else {
        return f64::NAN;
    };
    let bytes = value.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_end = digits_from(end);
    let mut mantissa_end = int_end;
    if bytes.get(int_end) == Some(&b'.') {
        mantissa_end = digits_from(int_end + 1);
    }
    let has_digits = int_end > end || mantissa_end > int_end + 1;
    if !has_digits {
        return f64::NAN;
    }
    end = mantissa_end;

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_start = end + 1;
        if matches!(bytes.get(exp_start), Some(b'+' | b'-')) {
            exp_start += 1;
        }
        let exp_end = digits_from(exp_start);
        if exp_end > exp_start {
            end = exp_end;
        }
    }

    value[..end].parse::<f64>().unwrap_or(f64::NAN)
}

#[derive(Debug, Clone)]
pub struct BulkOptions {
    /// Sleep after every row, successful or not.
    pub row_pause: Duration,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            row_pause: DEFAULT_ROW_PAUSE,
        }
    }
}

/// Predicts each row in input order, one call at a time. A failing row is recorded and
/// the run continues; successful rows land in `history` as soon as they complete.
pub async fn run_bulk<F>(
    rows: Vec<BulkRow>,
    predictor: &dyn Predictor,
    history: &mut HistoryStore,
    options: &BulkOptions,
    mut on_progress: F,
) -> BulkSummary
where
    F: FnMut(BulkProgress),
{
    let total = rows.len();
    let mut summary = BulkSummary {
        total,
        ..BulkSummary::default()
    };

    for (index, row) in rows.into_iter().enumerate() {
        let request = row.to_request();
        let result = match predictor.predict(&request).await {
            Ok(prediction) => {
                if let Err(err) = history
                    .append(PredictionInput::from_result(&request, prediction.clone()))
                    .await
                {
                    tracing::warn!(row = index + 1, error = %err, "row predicted but history was not saved");
                }
                summary.successful += 1;
                if prediction.risk == RiskLevel::AtRisk {
                    summary.at_risk += 1;
                }
                RowResult::Success(prediction)
            }
            Err(err) => {
                tracing::warn!(row = index + 1, error = %err, "row prediction failed");
                summary.failed += 1;
                RowResult::Failure {
                    error: err.to_string(),
                }
            }
        };
        summary.outcomes.push(BulkOutcome { row, result });

        on_progress(BulkProgress {
            attempted: index + 1,
            total,
        });

        if !options.row_pause.is_zero() {
            tokio::time::sleep(options.row_pause).await;
        }
    }

    tracing::info!(
        total = summary.total,
        successful = summary.successful,
        failed = summary.failed,
        at_risk = summary.at_risk,
        "bulk run complete"
    );
    summary
}

/// Parses `text` and runs every row. Structural CSV errors abort before any prediction.
pub async fn import_csv<F>(
    text: &str,
    predictor: &dyn Predictor,
    history: &mut HistoryStore,
    options: &BulkOptions,
    on_progress: F,
) -> Result<BulkSummary, BulkError>
where
    F: FnMut(BulkProgress),
{
    let rows = parse_csv(text)?;
    tracing::info!(rows = rows.len(), "starting bulk run");
    Ok(run_bulk(rows, predictor, history, options, on_progress).await)
}
