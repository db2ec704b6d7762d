use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::quiz_store::{AttemptStore, QuestionStore, StoreError};
use crate::models::{AttemptRecord, Question};

/// Process-local question pool and attempt log, used for offline runs and tests.
#[derive(Default)]
pub struct MemoryQuizStore {
    questions: Mutex<Vec<Question>>,
    attempts: Mutex<Vec<AttemptRecord>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryQuizStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_questions(questions: Vec<Question>) -> Self {
        Self {
            questions: Mutex::new(questions),
            ..Self::default()
        }
    }

    pub fn replace_questions(&self, questions: Vec<Question>) {
        *self.questions.lock().unwrap_or_else(|e| e.into_inner()) = questions;
    }

    pub fn attempts(&self) -> Vec<AttemptRecord> {
        self.attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuestionStore for MemoryQuizStore {
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("question reads disabled".to_string()));
        }

        let mut questions = self
            .questions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        questions.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(questions)
    }
}

#[async_trait]
impl AttemptStore for MemoryQuizStore {
    async fn record_attempt(&self, attempt: &AttemptRecord) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("attempt writes disabled".to_string()));
        }

        self.attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(attempt.clone());
        Ok(())
    }
}
