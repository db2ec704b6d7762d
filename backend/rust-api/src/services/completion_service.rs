use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::CompletionSettings;
use crate::metrics::COMPLETION_DURATION_SECONDS;

pub const TEMPERATURE: f64 = 0.7;
pub const MAX_TOKENS: u32 = 800;

pub const SYSTEM_PROMPT: &str = "You are an expert JavaScript teacher specializing in explaining hoisting concepts.
Your job is to analyze code snippets and explain WHY they produce specific outputs, focusing on:
- How hoisting works in this specific code
- Step-by-step execution flow
- Why variables/functions behave the way they do
- Common pitfalls and misconceptions

Be detailed but clear. Use examples from the actual code provided.";

pub fn user_prompt(code: &str, correct_output: &str) -> String {
    format!(
        "Analyze this JavaScript code and explain why it produces the output \"{output}\":

```javascript
{code}
```

Provide a detailed, step-by-step explanation of:
1. What gets hoisted and how
2. The execution order after hoisting
3. Why the output is specifically \"{output}\"
4. Key learning points about hoisting from this example

Keep it educational and easy to understand.",
        output = correct_output,
        code = code,
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl ChatCompletionRequest {
    pub fn explain_hoisting(model: &str, code: &str, correct_output: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt(code, correct_output),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion API key not configured")]
    MissingApiKey,
    #[error("failed to call completion API: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    Upstream(String),
    #[error("completion response contained no message content")]
    EmptyResponse,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn explain(&self, code: &str, correct_output: &str) -> Result<String, CompletionError>;

    fn is_configured(&self) -> bool {
        true
    }

    fn model(&self) -> &str;
}

/// OpenAI-compatible chat completion endpoint (Groq by default).
pub struct ChatCompletionClient {
    http: reqwest::Client,
    settings: CompletionSettings,
}

impl ChatCompletionClient {
    pub fn new(settings: CompletionSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    async fn send(&self, api_key: &str, request: &ChatCompletionRequest) -> Result<String, CompletionError> {
        let response = self
            .http
            .post(&self.settings.url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body: serde_json::Value = response.json().await?;

        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("Completion API error")
                .to_string();
            tracing::warn!("Completion API returned {}: {}", status, message);
            return Err(CompletionError::Upstream(message));
        }

        extract_content(&body)
    }
}

fn extract_content(body: &serde_json::Value) -> Result<String, CompletionError> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or(CompletionError::EmptyResponse)
}

#[async_trait]
impl CompletionProvider for ChatCompletionClient {
    async fn explain(&self, code: &str, correct_output: &str) -> Result<String, CompletionError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(CompletionError::MissingApiKey)?;

        let request =
            ChatCompletionRequest::explain_hoisting(&self.settings.model, code, correct_output);

        tracing::info!("Sending completion request with model: {}", self.settings.model);
        let start = Instant::now();
        let result = self.send(api_key, &request).await;

        let status = if result.is_ok() { "success" } else { "error" };
        COMPLETION_DURATION_SECONDS
            .with_label_values(&[status])
            .observe(start.elapsed().as_secs_f64());

        result
    }

    fn is_configured(&self) -> bool {
        self.settings.api_key.is_some()
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}
