use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::models::{ExplainRequest, ExplainResponse};

pub const AI_FALLBACK_MESSAGE: &str =
    "AI explanation is currently unavailable. Please refer to the standard explanation above.";

/// Produces prose for a snippet and its expected output. Never fails: callers
/// get a fallback message instead of an error.
#[async_trait]
pub trait ExplanationService: Send + Sync {
    async fn request_ai_explanation(&self, code: &str, correct_output: &str) -> String;
}

/// Calls the explanation proxy over HTTP.
#[derive(Clone)]
pub struct ExplanationClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ExplanationClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/explain", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_explanation(&self, code: &str, correct_output: &str) -> Result<String> {
        let body = ExplainRequest {
            code: code.to_string(),
            correct_output: correct_output.to_string(),
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to call explanation endpoint")?;

        if !response.status().is_success() {
            anyhow::bail!("Explanation endpoint returned status: {}", response.status());
        }

        let body: ExplainResponse = response
            .json()
            .await
            .context("Invalid explanation response format")?;

        Ok(body.explanation)
    }
}

#[async_trait]
impl ExplanationService for ExplanationClient {
    async fn request_ai_explanation(&self, code: &str, correct_output: &str) -> String {
        match self.fetch_explanation(code, correct_output).await {
            Ok(explanation) => explanation,
            Err(e) => {
                tracing::warn!("AI explanation unavailable: {:#}", e);
                AI_FALLBACK_MESSAGE.to_string()
            }
        }
    }
}
