use std::sync::Arc;
use tokio::task::JoinHandle;

use super::quiz_store::AttemptStore;
use crate::metrics::record_answer;
use crate::models::{AttemptRecord, Question};

/// Lower-cases, trims, and collapses internal whitespace runs to a single space.
pub fn normalize_answer(answer: &str) -> String {
    answer
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn answers_match(user_answer: &str, correct_output: &str) -> bool {
    normalize_answer(user_answer) == normalize_answer(correct_output)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStatus {
    Unanswered,
    Incorrect,
    Correct,
}

#[derive(Debug)]
pub enum Submission {
    /// Empty answer, or the question is already answered correctly.
    Ignored,
    Evaluated {
        is_correct: bool,
        /// Detached attempt write. Awaiting it is optional.
        persistence: JoinHandle<()>,
    },
}

impl Submission {
    pub fn is_correct(&self) -> Option<bool> {
        match self {
            Submission::Ignored => None,
            Submission::Evaluated { is_correct, .. } => Some(*is_correct),
        }
    }
}

pub struct QuizStateMachine {
    user_id: String,
    attempts: Arc<dyn AttemptStore>,
    user_answer: String,
    is_correct: Option<bool>,
    show_result: bool,
    score: u32,
    total_attempts: u32,
    explanation_open: bool,
    // Question the current verdict belongs to
    answered_question: Option<String>,
}

impl QuizStateMachine {
    pub fn new(user_id: impl Into<String>, attempts: Arc<dyn AttemptStore>) -> Self {
        Self {
            user_id: user_id.into(),
            attempts,
            user_answer: String::new(),
            is_correct: None,
            show_result: false,
            score: 0,
            total_attempts: 0,
            explanation_open: false,
            answered_question: None,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn user_answer(&self) -> &str {
        &self.user_answer
    }

    pub fn is_correct(&self) -> Option<bool> {
        self.is_correct
    }

    pub fn show_result(&self) -> bool {
        self.show_result
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn total_attempts(&self) -> u32 {
        self.total_attempts
    }

    pub fn explanation_open(&self) -> bool {
        self.explanation_open
    }

    pub fn status(&self) -> AnswerStatus {
        match (self.show_result, self.is_correct) {
            (true, Some(true)) => AnswerStatus::Correct,
            (true, Some(false)) => AnswerStatus::Incorrect,
            _ => AnswerStatus::Unanswered,
        }
    }

    /// A correct answer is final until the next question loads.
    pub fn input_locked(&self) -> bool {
        self.status() == AnswerStatus::Correct
    }

    pub fn set_answer(&mut self, answer: impl Into<String>) {
        if self.input_locked() {
            tracing::debug!("Answer input is locked after a correct submission");
            return;
        }
        self.user_answer = answer.into();
    }

    /// Evaluates the in-progress answer against `question` and dispatches the
    /// attempt write. State is updated before the write is spawned, and the
    /// write's outcome never comes back into it.
    pub fn submit_answer(&mut self, question: &Question) -> Submission {
        if self.user_answer.trim().is_empty() {
            return Submission::Ignored;
        }

        if self.answered_question.as_deref() != Some(question.id.as_str()) {
            // A verdict for another question must never leak onto this one
            self.is_correct = None;
            self.show_result = false;
        } else if self.input_locked() {
            tracing::debug!("Question {} already answered correctly", question.id);
            return Submission::Ignored;
        }

        let correct = answers_match(&self.user_answer, &question.correct_output);

        self.is_correct = Some(correct);
        self.show_result = true;
        self.answered_question = Some(question.id.clone());
        self.total_attempts += 1;
        if correct {
            self.score += 1;
        }
        record_answer(correct);

        tracing::info!(
            "Answer evaluated: question={}, correct={}, score={}/{}",
            question.id,
            correct,
            self.score,
            self.total_attempts
        );

        let persistence = self.dispatch_attempt(AttemptRecord::new(
            self.user_id.clone(),
            question.id.clone(),
            correct,
        ));

        Submission::Evaluated {
            is_correct: correct,
            persistence,
        }
    }

    fn dispatch_attempt(&self, attempt: AttemptRecord) -> JoinHandle<()> {
        let attempts = self.attempts.clone();

        tokio::spawn(async move {
            if let Err(e) = attempts.record_attempt(&attempt).await {
                tracing::error!("Error saving progress: {}", e);
            } else {
                tracing::debug!("Progress saved for question {}", attempt.question_id);
            }
        })
    }

    /// Clears the answer and verdict. Score and attempt count are kept.
    pub fn reset_for_next_question(&mut self) {
        self.user_answer.clear();
        self.is_correct = None;
        self.show_result = false;
        self.answered_question = None;
    }

    pub fn open_explanation(&mut self) {
        self.explanation_open = true;
    }

    pub fn close_explanation(&mut self) {
        self.explanation_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;
    use crate::services::memory_store::MemoryQuizStore;
    use chrono::Utc;

    fn question(id: &str, correct_output: &str) -> Question {
        Question {
            id: id.to_string(),
            code: "console.log(a, b);\nvar a;\nlet b = 10;".to_string(),
            correct_output: correct_output.to_string(),
            explanation: "static".to_string(),
            difficulty: Difficulty::Medium,
            category: "var".to_string(),
            created_at: Utc::now(),
        }
    }

    fn machine() -> (QuizStateMachine, Arc<MemoryQuizStore>) {
        let store = Arc::new(MemoryQuizStore::new());
        (QuizStateMachine::new("user-1", store.clone()), store)
    }

    async fn settle(submission: Submission) -> Option<bool> {
        match submission {
            Submission::Ignored => None,
            Submission::Evaluated {
                is_correct,
                persistence,
            } => {
                persistence.await.unwrap();
                Some(is_correct)
            }
        }
    }

    #[test]
    fn normalization_ignores_case_and_spacing() {
        assert_eq!(normalize_answer("  Undefined   10 "), "undefined 10");
        assert_eq!(normalize_answer("A\t\nB"), "a b");
        assert!(answers_match("Undefined   10", "undefined 10"));
        assert!(answers_match("REFERENCEERROR", " ReferenceError"));
        assert!(!answers_match("undefined10", "undefined 10"));
    }

    #[tokio::test]
    async fn matching_answer_scores_and_records_attempt() {
        let (mut quiz, store) = machine();
        let q = question("q1", "undefined 10");

        quiz.set_answer("Undefined  10 ");
        assert_eq!(settle(quiz.submit_answer(&q)).await, Some(true));

        assert_eq!(quiz.is_correct(), Some(true));
        assert!(quiz.show_result());
        assert_eq!(quiz.score(), 1);
        assert_eq!(quiz.total_attempts(), 1);

        let attempts = store.attempts();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].user_id, "user-1");
        assert_eq!(attempts[0].question_id, "q1");
        assert!(attempts[0].is_correct);
        assert_eq!(attempts[0].attempts, 1);
    }

    #[tokio::test]
    async fn blank_answer_changes_nothing() {
        let (mut quiz, store) = machine();
        let q = question("q1", "undefined");

        for blank in ["", "   ", "\t\n"] {
            quiz.set_answer(blank);
            assert!(matches!(quiz.submit_answer(&q), Submission::Ignored));
        }

        assert_eq!(quiz.score(), 0);
        assert_eq!(quiz.total_attempts(), 0);
        assert!(!quiz.show_result());
        assert!(store.attempts().is_empty());
    }

    #[tokio::test]
    async fn correct_answer_is_terminal() {
        let (mut quiz, store) = machine();
        let q = question("q1", "1");

        quiz.set_answer("1");
        settle(quiz.submit_answer(&q)).await;

        quiz.set_answer("something else");
        assert_eq!(quiz.user_answer(), "1");
        assert!(matches!(quiz.submit_answer(&q), Submission::Ignored));

        assert_eq!(quiz.is_correct(), Some(true));
        assert_eq!(quiz.score(), 1);
        assert_eq!(quiz.total_attempts(), 1);
        assert_eq!(store.attempts().len(), 1);
    }

    #[tokio::test]
    async fn incorrect_answer_can_be_resubmitted() {
        let (mut quiz, store) = machine();
        let q = question("q1", "undefined 10");

        quiz.set_answer("10 10");
        assert_eq!(settle(quiz.submit_answer(&q)).await, Some(false));
        assert_eq!(quiz.status(), AnswerStatus::Incorrect);
        assert_eq!(quiz.score(), 0);
        assert_eq!(quiz.total_attempts(), 1);

        quiz.set_answer("undefined 10");
        assert_eq!(settle(quiz.submit_answer(&q)).await, Some(true));
        assert_eq!(quiz.score(), 1);
        assert_eq!(quiz.total_attempts(), 2);

        let verdicts: Vec<bool> = store.attempts().iter().map(|a| a.is_correct).collect();
        assert_eq!(verdicts, vec![false, true]);
    }

    #[tokio::test]
    async fn reset_keeps_counters() {
        let (mut quiz, _store) = machine();
        let q = question("q1", "1");

        quiz.set_answer("1");
        settle(quiz.submit_answer(&q)).await;
        quiz.reset_for_next_question();

        assert_eq!(quiz.user_answer(), "");
        assert_eq!(quiz.is_correct(), None);
        assert!(!quiz.show_result());
        assert_eq!(quiz.status(), AnswerStatus::Unanswered);
        assert_eq!(quiz.score(), 1);
        assert_eq!(quiz.total_attempts(), 1);
    }

    #[tokio::test]
    async fn failed_write_does_not_roll_back_state() {
        let (mut quiz, store) = machine();
        store.set_fail_writes(true);
        let q = question("q1", "1");

        quiz.set_answer("1");
        assert_eq!(settle(quiz.submit_answer(&q)).await, Some(true));

        assert_eq!(quiz.score(), 1);
        assert_eq!(quiz.total_attempts(), 1);
        assert!(store.attempts().is_empty());
    }

    #[tokio::test]
    async fn verdict_for_another_question_is_not_reused() {
        let (mut quiz, _store) = machine();
        let first = question("q1", "1");
        let second = question("q2", "2");

        quiz.set_answer("1");
        settle(quiz.submit_answer(&first)).await;

        // Without a reset the lock still holds for the answered question only
        assert!(matches!(quiz.submit_answer(&first), Submission::Ignored));
        assert_eq!(settle(quiz.submit_answer(&second)).await, Some(false));
        assert_eq!(quiz.total_attempts(), 2);
    }

    #[test]
    fn explanation_visibility_toggles() {
        let (mut quiz, _store) = machine();
        assert!(!quiz.explanation_open());
        quiz.open_explanation();
        assert!(quiz.explanation_open());
        quiz.close_explanation();
        assert!(!quiz.explanation_open());
    }
}
