use async_trait::async_trait;
use axum::Router;
use std::sync::Arc;

use hoistspace_api::config::{CompletionSettings, ProxySettings};
use hoistspace_api::create_router;
use hoistspace_api::services::completion_service::{CompletionError, CompletionProvider};
use hoistspace_api::services::AppState;

pub const TEST_API_KEY: &str = "test-anon-key";
pub const TEST_METRICS_AUTH: &str = "admin:secret";

/// Completion provider that answers from memory.
pub struct StubCompletion {
    pub reply: Result<String, String>,
}

#[async_trait]
impl CompletionProvider for StubCompletion {
    async fn explain(&self, code: &str, correct_output: &str) -> Result<String, CompletionError> {
        match &self.reply {
            Ok(text) => Ok(format!("{} ({} -> {})", text, code, correct_output)),
            Err(message) => Err(CompletionError::Upstream(message.clone())),
        }
    }

    fn model(&self) -> &str {
        "stub-model"
    }
}

pub fn test_settings() -> ProxySettings {
    ProxySettings {
        api_key: TEST_API_KEY.to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        metrics_auth: TEST_METRICS_AUTH.to_string(),
        completion: CompletionSettings {
            url: "http://127.0.0.1:1/unused".to_string(),
            api_key: Some("unused".to_string()),
            model: "stub-model".to_string(),
        },
    }
}

pub fn create_test_app(reply: Result<&str, &str>) -> Router {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let provider = StubCompletion {
        reply: reply.map(str::to_string).map_err(str::to_string),
    };
    let state = AppState::with_provider(test_settings(), Arc::new(provider));
    create_router(Arc::new(state))
}
