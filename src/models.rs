use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PredictError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Good,
    Average,
    #[serde(rename = "At-Risk")]
    AtRisk,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Good, RiskLevel::Average, RiskLevel::AtRisk];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Good => "Good",
            RiskLevel::Average => "Average",
            RiskLevel::AtRisk => "At-Risk",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        };
        f.write_str(label)
    }
}

/// Body sent to `POST {base}/predict`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRequest {
    pub marks: f64,
    pub attendance: f64,
    pub feedback: String,
}

impl PredictionRequest {
    /// Rejects values outside the form's domains. `NaN` never passes.
    pub fn validate(&self) -> Result<(), PredictError> {
        if !(0.0..=100.0).contains(&self.marks) {
            return Err(PredictError::InvalidInput(format!(
                "marks must be between 0 and 100, got {}",
                self.marks
            )));
        }
        if !(40.0..=100.0).contains(&self.attendance) {
            return Err(PredictError::InvalidInput(format!(
                "attendance must be between 40 and 100, got {}",
                self.attendance
            )));
        }
        Ok(())
    }
}

/// Success body of `POST {base}/predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub risk: RiskLevel,
    pub sentiment: Sentiment,
    #[serde(default)]
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionInput {
    pub marks: f64,
    pub attendance: f64,
    pub feedback: String,
    pub risk: RiskLevel,
    pub sentiment: Sentiment,
    pub reasons: Vec<String>,
}

impl PredictionInput {
    pub fn from_result(request: &PredictionRequest, result: PredictionResult) -> Self {
        Self {
            marks: request.marks,
            attendance: request.attendance,
            feedback: request.feedback.clone(),
            risk: result.risk,
            sentiment: result.sentiment,
            reasons: result.reasons,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: String,
    pub marks: f64,
    pub attendance: f64,
    pub feedback: String,
    pub risk: RiskLevel,
    pub sentiment: Sentiment,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(rename = "timestamp", alias = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkRow {
    pub marks: f64,
    pub attendance: f64,
    pub feedback: String,
}

impl BulkRow {
    pub fn to_request(&self) -> PredictionRequest {
        PredictionRequest {
            marks: self.marks,
            attendance: self.attendance,
            feedback: self.feedback.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowResult {
    Success(PredictionResult),
    Failure { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkOutcome {
    pub row: BulkRow,
    pub result: RowResult,
}

impl BulkOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.result, RowResult::Success(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub at_risk: usize,
    pub outcomes: Vec<BulkOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulkProgress {
    pub attempted: usize,
    pub total: usize,
}

impl BulkProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.attempted as f64 / self.total as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskCount {
    pub risk: RiskLevel,
    pub students: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RangeBreakdown {
    pub range: &'static str,
    pub good: usize,
    pub average: usize,
    pub at_risk: usize,
}

impl RangeBreakdown {
    pub fn total(&self) -> usize {
        self.good + self.average + self.at_risk
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total: usize,
    pub at_risk_count: usize,
    pub at_risk_percentage: f64,
    pub average_marks: f64,
    pub risk_distribution: Vec<RiskCount>,
    pub marks_ranges: Vec<RangeBreakdown>,
    pub attendance_ranges: Vec<RangeBreakdown>,
}
