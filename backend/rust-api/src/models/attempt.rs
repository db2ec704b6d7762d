use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One accepted submission, appended to `user_progress` and never read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub user_id: String,
    pub question_id: String,
    pub is_correct: bool,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn new(user_id: impl Into<String>, question_id: impl Into<String>, is_correct: bool) -> Self {
        Self {
            user_id: user_id.into(),
            question_id: question_id.into(),
            is_correct,
            attempts: 1,
            created_at: Utc::now(),
        }
    }
}
