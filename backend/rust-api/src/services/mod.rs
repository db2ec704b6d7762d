use std::sync::Arc;

use crate::config::ProxySettings;
use completion_service::{ChatCompletionClient, CompletionProvider};

pub mod completion_service;
pub mod explanation_client;
pub mod identity;
pub mod memory_store;
pub mod question_source;
pub mod quiz_controller;
pub mod quiz_state;
pub mod quiz_store;

/// Shared state of the explanation proxy.
pub struct AppState {
    pub settings: ProxySettings,
    pub completion: Arc<dyn CompletionProvider>,
}

impl AppState {
    pub fn new(settings: ProxySettings) -> Self {
        if settings.completion.api_key.is_none() {
            tracing::warn!("Completion API key is not set; /explain will answer with errors");
        }
        let completion = Arc::new(ChatCompletionClient::new(settings.completion.clone()));
        Self::with_provider(settings, completion)
    }

    pub fn with_provider(settings: ProxySettings, completion: Arc<dyn CompletionProvider>) -> Self {
        Self {
            settings,
            completion,
        }
    }
}
