use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::PredictError;
use crate::models::{PredictionRequest, PredictionResult};

pub const DEFAULT_API_URL: &str = "https://ai-student-risk-backend.onrender.com";

/// One awaited prediction per call; implemented over HTTP by [`PredictionClient`].
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Single-attempt client for the prediction endpoint. No retries, no timeout.
pub struct PredictionClient {
    client: Client,
    base_url: String,
}

impl PredictionClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET {base}/health`; any OK status is healthy, everything else is not.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => {
                tracing::debug!(status = %response.status(), "health check response");
                response.status().is_success()
            }
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "health check failed");
                false
            }
        }
    }

    fn unreachable(&self, source: reqwest::Error) -> PredictError {
        PredictError::Unreachable {
            base_url: self.base_url.clone(),
            source,
        }
    }
}

#[async_trait]
impl Predictor for PredictionClient {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictError> {
        request.validate()?;

        let url = format!("{}/predict", self.base_url);
        tracing::debug!(url = %url, marks = request.marks, attendance = request.attendance, "sending prediction request");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|err| self.unreachable(err))?;

        let status = response.status();
        let body = response.text().await.map_err(|err| self.unreachable(err))?;
        tracing::debug!(status = %status, "prediction response");

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), body = %body, "prediction rejected");
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|parsed| parsed.detail);
            return Err(match detail {
                Some(detail) => PredictError::Rejected {
                    status: status.as_u16(),
                    detail,
                },
                None => PredictError::Failed {
                    status: status.as_u16(),
                    base_url: self.base_url.clone(),
                },
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
