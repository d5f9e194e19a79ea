use crate::models::{AnalyticsSummary, PredictionRecord, RangeBreakdown, RiskCount, RiskLevel};

pub const MARKS_RANGES: [&str; 4] = ["0-40", "41-60", "61-80", "81-100"];
pub const ATTENDANCE_RANGES: [&str; 4] = ["40-60%", "61-75%", "76-90%", "91-100%"];

pub fn summarize(records: &[PredictionRecord]) -> AnalyticsSummary {
    let total = records.len();
    let at_risk_count = records
        .iter()
        .filter(|record| record.risk == RiskLevel::AtRisk)
        .count();

    let risk_distribution = RiskLevel::ALL
        .into_iter()
        .map(|risk| RiskCount {
            risk,
            students: records.iter().filter(|record| record.risk == risk).count(),
        })
        .collect();

    AnalyticsSummary {
        total,
        at_risk_count,
        at_risk_percentage: if total == 0 {
            0.0
        } else {
            at_risk_count as f64 / total as f64 * 100.0
        },
        average_marks: average_marks(records),
        risk_distribution,
        marks_ranges: breakdown(records, &MARKS_RANGES, |record| {
            marks_bucket(record.marks)
        }),
        attendance_ranges: breakdown(records, &ATTENDANCE_RANGES, |record| {
            attendance_bucket(record.attendance)
        }),
    }
}

/// Mean marks rounded to one decimal place; 0 for an empty history.
pub fn average_marks(records: &[PredictionRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let mean = records.iter().map(|record| record.marks).sum::<f64>() / records.len() as f64;
    (mean * 10.0).round() / 10.0
}

/// Index into [`MARKS_RANGES`]; each upper bound belongs to the lower bucket.
pub fn marks_bucket(marks: f64) -> usize {
    match marks {
        m if m <= 40.0 => 0,
        m if m <= 60.0 => 1,
        m if m <= 80.0 => 2,
        _ => 3,
    }
}

/// Index into [`ATTENDANCE_RANGES`]; each upper bound belongs to the lower bucket.
pub fn attendance_bucket(attendance: f64) -> usize {
    match attendance {
        a if a <= 60.0 => 0,
        a if a <= 75.0 => 1,
        a if a <= 90.0 => 2,
        _ => 3,
    }
}

fn breakdown<F>(
    records: &[PredictionRecord],
    labels: &[&'static str; 4],
    bucket: F,
) -> Vec<RangeBreakdown>
where
    F: Fn(&PredictionRecord) -> usize,
{
    let mut ranges: Vec<RangeBreakdown> = labels
        .iter()
        .map(|&range| RangeBreakdown {
            range,
            ..RangeBreakdown::default()
        })
        .collect();

    for record in records {
        let entry = &mut ranges[bucket(record)];
        match record.risk {
            RiskLevel::Good => entry.good += 1,
            RiskLevel::Average => entry.average += 1,
            RiskLevel::AtRisk => entry.at_risk += 1,
        }
    }

    ranges
}
