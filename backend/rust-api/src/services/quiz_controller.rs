use std::sync::Arc;

use super::explanation_client::ExplanationService;
use super::question_source::QuestionSource;
use super::quiz_state::{QuizStateMachine, Submission};
use super::quiz_store::AttemptStore;
use crate::presentation::View;

#[derive(Debug, Default)]
struct ExplanationPanel {
    ai_explanation: Option<String>,
    ai_pending: bool,
}

/// Snapshot of what an AI explanation request is about.
#[derive(Debug, Clone)]
pub struct AiRequest {
    pub question_id: String,
    pub code: String,
    pub correct_output: String,
}

/// Single owner of the quiz session. The front end only reads `view()` and
/// calls the intent methods.
pub struct QuizController {
    questions: QuestionSource,
    quiz: QuizStateMachine,
    panel: ExplanationPanel,
    explainer: Arc<dyn ExplanationService>,
}

impl QuizController {
    pub fn new(
        user_id: impl Into<String>,
        questions: QuestionSource,
        attempts: Arc<dyn AttemptStore>,
        explainer: Arc<dyn ExplanationService>,
    ) -> Self {
        Self {
            questions,
            quiz: QuizStateMachine::new(user_id, attempts),
            panel: ExplanationPanel::default(),
            explainer,
        }
    }

    pub fn questions(&self) -> &QuestionSource {
        &self.questions
    }

    pub fn quiz(&self) -> &QuizStateMachine {
        &self.quiz
    }

    pub fn explainer(&self) -> Arc<dyn ExplanationService> {
        self.explainer.clone()
    }

    pub fn ai_explanation(&self) -> Option<&str> {
        self.panel.ai_explanation.as_deref()
    }

    pub fn ai_pending(&self) -> bool {
        self.panel.ai_pending
    }

    pub async fn start(&mut self) {
        tracing::info!("Starting quiz for user {}", self.quiz.user_id());
        self.questions.load_random_question().await;
    }

    /// Clears every per-question field before the new question is fetched.
    pub async fn next_question(&mut self) {
        self.quiz.reset_for_next_question();
        self.quiz.close_explanation();
        self.panel = ExplanationPanel::default();
        self.questions.load_random_question().await;
    }

    pub async fn skip(&mut self) {
        tracing::debug!("Skipping current question");
        self.next_question().await;
    }

    pub fn set_answer(&mut self, answer: impl Into<String>) {
        self.quiz.set_answer(answer);
    }

    pub fn submit(&mut self) -> Submission {
        match self.questions.current_question() {
            Some(question) => self.quiz.submit_answer(question),
            None => Submission::Ignored,
        }
    }

    /// Opens the modal; only offered once a result is showing.
    pub fn open_explanation(&mut self) -> bool {
        if self.questions.current_question().is_none() || !self.quiz.show_result() {
            return false;
        }
        self.quiz.open_explanation();
        true
    }

    pub fn close_explanation(&mut self) {
        self.quiz.close_explanation();
    }

    /// Marks an AI request as pending. Returns `None` while one is already in
    /// flight, once an explanation is shown, or when the modal is closed.
    pub fn begin_ai_explanation(&mut self) -> Option<AiRequest> {
        if !self.quiz.explanation_open()
            || self.panel.ai_pending
            || self.panel.ai_explanation.is_some()
        {
            return None;
        }
        let question = self.questions.current_question()?;

        self.panel.ai_pending = true;
        Some(AiRequest {
            question_id: question.id.clone(),
            code: question.code.clone(),
            correct_output: question.correct_output.clone(),
        })
    }

    pub fn finish_ai_explanation(&mut self, request: &AiRequest, explanation: String) {
        let current_id = self.questions.current_question().map(|q| q.id.as_str());
        if !self.panel.ai_pending || current_id != Some(request.question_id.as_str()) {
            tracing::debug!("Dropping AI explanation for question {}", request.question_id);
            return;
        }
        self.panel.ai_pending = false;
        self.panel.ai_explanation = Some(explanation);
    }

    pub async fn request_ai_explanation(&mut self) -> Option<&str> {
        let request = self.begin_ai_explanation()?;
        let explanation = self
            .explainer
            .request_ai_explanation(&request.code, &request.correct_output)
            .await;
        self.finish_ai_explanation(&request, explanation);
        self.ai_explanation()
    }

    pub fn view(&self) -> View<'_> {
        View::build(
            &self.questions,
            &self.quiz,
            self.panel.ai_explanation.as_deref(),
            self.panel.ai_pending,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, Question};
    use crate::services::memory_store::MemoryQuizStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingExplainer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExplanationService for CountingExplainer {
        async fn request_ai_explanation(&self, code: &str, correct_output: &str) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            format!("{} prints {}", code, correct_output)
        }
    }

    fn question(id: &str, output: &str) -> Question {
        Question {
            id: id.to_string(),
            code: format!("// {}", id),
            correct_output: output.to_string(),
            explanation: "static explanation".to_string(),
            difficulty: Difficulty::Easy,
            category: "var".to_string(),
            created_at: Utc::now(),
        }
    }

    async fn controller(pool: Vec<Question>) -> (QuizController, Arc<CountingExplainer>) {
        let store = Arc::new(MemoryQuizStore::with_questions(pool));
        let explainer = Arc::new(CountingExplainer {
            calls: AtomicUsize::new(0),
        });
        let source = QuestionSource::with_rng(store.clone(), StdRng::seed_from_u64(9));
        let mut controller = QuizController::new("user-1", source, store, explainer.clone());
        controller.start().await;
        (controller, explainer)
    }

    #[tokio::test]
    async fn explanation_requires_a_result() {
        let (mut controller, _) = controller(vec![question("q1", "1")]).await;

        assert!(!controller.open_explanation());

        controller.set_answer("2");
        controller.submit();
        assert!(controller.open_explanation());
        assert!(controller.quiz().explanation_open());
    }

    #[tokio::test]
    async fn one_ai_request_per_question() {
        let (mut controller, explainer) = controller(vec![question("q1", "1")]).await;
        controller.set_answer("1");
        controller.submit();
        controller.open_explanation();

        let text = controller.request_ai_explanation().await.map(str::to_string);
        assert_eq!(text.as_deref(), Some("// q1 prints 1"));

        assert!(controller.request_ai_explanation().await.is_none());
        controller.close_explanation();
        controller.open_explanation();
        assert!(controller.begin_ai_explanation().is_none());
        assert_eq!(explainer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pending_request_blocks_another() {
        let (mut controller, _) = controller(vec![question("q1", "1")]).await;
        controller.set_answer("0");
        controller.submit();
        controller.open_explanation();

        let request = controller.begin_ai_explanation().unwrap();
        assert!(controller.ai_pending());
        assert!(controller.begin_ai_explanation().is_none());

        controller.finish_ai_explanation(&request, "done".to_string());
        assert!(!controller.ai_pending());
        assert_eq!(controller.ai_explanation(), Some("done"));
    }

    #[tokio::test]
    async fn next_question_clears_per_question_state() {
        let (mut controller, _) = controller(vec![question("q1", "1")]).await;
        controller.set_answer("1");
        controller.submit();
        controller.open_explanation();
        let request = controller.begin_ai_explanation().unwrap();

        controller.next_question().await;

        assert_eq!(controller.quiz().user_answer(), "");
        assert_eq!(controller.quiz().is_correct(), None);
        assert!(!controller.quiz().show_result());
        assert!(!controller.quiz().explanation_open());
        assert!(!controller.ai_pending());
        assert_eq!(controller.quiz().score(), 1);
        assert_eq!(controller.quiz().total_attempts(), 1);

        // A late answer for the previous request is dropped
        controller.finish_ai_explanation(&request, "late".to_string());
        assert!(controller.ai_explanation().is_none());
    }

    #[tokio::test]
    async fn submit_without_question_is_ignored() {
        let (mut controller, _) = controller(Vec::new()).await;
        controller.set_answer("undefined");
        assert!(matches!(controller.submit(), Submission::Ignored));
        assert_eq!(controller.quiz().total_attempts(), 0);
    }
}
