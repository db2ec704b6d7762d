use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::Arc;

use super::quiz_store::QuestionStore;
use crate::models::Question;

/// Maps a uniform sample in `[0, 1)` onto an index into a pool of `count` items.
pub fn select_index(sample: f64, count: usize) -> usize {
    let index = (sample * count as f64).floor() as usize;
    index.min(count.saturating_sub(1))
}

pub struct QuestionSource {
    store: Arc<dyn QuestionStore>,
    rng: Box<dyn RngCore + Send>,
    current: Option<Question>,
    is_loading: bool,
}

impl QuestionSource {
    pub fn new(store: Arc<dyn QuestionStore>) -> Self {
        Self::with_rng(store, StdRng::from_os_rng())
    }

    pub fn with_rng(store: Arc<dyn QuestionStore>, rng: impl RngCore + Send + 'static) -> Self {
        Self {
            store,
            rng: Box::new(rng),
            current: None,
            // Nothing has been fetched yet
            is_loading: true,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Fetches the pool and replaces the current question with a random pick.
    ///
    /// An empty pool clears the current question. A failed fetch is logged and
    /// keeps whatever was shown before.
    pub async fn load_random_question(&mut self) -> Option<&Question> {
        self.is_loading = true;

        match self.store.list_questions().await {
            Ok(questions) if questions.is_empty() => {
                tracing::warn!("Question store returned no questions");
                self.current = None;
            }
            Ok(mut questions) => {
                let index = select_index(self.rng.random::<f64>(), questions.len());
                let question = questions.swap_remove(index);
                tracing::debug!(
                    "Selected question {} ({} of {})",
                    question.id,
                    index + 1,
                    questions.len() + 1
                );
                self.current = Some(question);
            }
            Err(e) => {
                tracing::error!("Error loading question: {}", e);
            }
        }

        self.is_loading = false;
        self.current.as_ref()
    }
}
