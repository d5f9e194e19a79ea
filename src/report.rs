use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::analytics;
use crate::models::{PredictionRecord, RangeBreakdown};

fn write_ranges(output: &mut String, title: &str, ranges: &[RangeBreakdown]) {
    let _ = writeln!(output, "## {title}");
    let _ = writeln!(output, "| Range | Good | Average | At-Risk |");
    let _ = writeln!(output, "|---|---|---|---|");
    for range in ranges {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} |",
            range.range, range.good, range.average, range.at_risk
        );
    }
    let _ = writeln!(output);
}

pub fn build_report(generated_at: DateTime<Utc>, records: &[PredictionRecord]) -> String {
    let summary = analytics::summarize(records);

    let mut output = String::new();

    let _ = writeln!(output, "# Academic Risk Report");
    let _ = writeln!(
        output,
        "Generated {} from {} predictions",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        summary.total
    );
    let _ = writeln!(output);

    if records.is_empty() {
        let _ = writeln!(output, "No predictions recorded yet.");
        return output;
    }

    let _ = writeln!(output, "## Overview");
    let _ = writeln!(
        output,
        "- At-risk students: {} ({:.1}%)",
        summary.at_risk_count, summary.at_risk_percentage
    );
    let _ = writeln!(output, "- Average marks: {:.1}", summary.average_marks);
    let _ = writeln!(output);

    let _ = writeln!(output, "## Risk Mix");
    for entry in &summary.risk_distribution {
        let _ = writeln!(output, "- {}: {} students", entry.risk, entry.students);
    }
    let _ = writeln!(output);

    write_ranges(&mut output, "Marks vs Risk", &summary.marks_ranges);
    write_ranges(&mut output, "Attendance Impact", &summary.attendance_ranges);

    let _ = writeln!(output, "## Recent Predictions");
    for record in records.iter().take(10) {
        let _ = writeln!(
            output,
            "- {}: marks {}, attendance {}% -> {} ({} feedback)",
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.marks,
            record.attendance,
            record.risk,
            record.sentiment
        );
        if !record.reasons.is_empty() {
            let _ = writeln!(output, "  - {}", record.reasons.join("; "));
        }
    }

    output
}
