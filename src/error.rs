use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to connect to the prediction API at {base_url}; ensure the backend is running")]
    Unreachable {
        base_url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-OK status with a `detail` message in the body, surfaced verbatim.
    #[error("{detail}")]
    Rejected { status: u16, detail: String },

    #[error("prediction failed (status {status}); ensure the backend is running on {base_url}")]
    Failed { status: u16, base_url: String },

    #[error("prediction API returned an unreadable response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum BulkError {
    #[error("CSV input is empty; expected a header row")]
    Empty,

    #[error("CSV must contain marks, attendance, and feedback columns (missing: {})", .missing.join(", "))]
    MissingColumns { missing: Vec<&'static str> },

    #[error("failed to read CSV input: {0}")]
    Csv(#[from] csv::Error),
}
