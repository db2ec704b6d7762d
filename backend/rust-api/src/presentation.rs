//! Terminal rendering of the quiz.
//!
//! [`View`] is derived from controller state on every frame and holds no state
//! of its own; [`render`] turns it into text.

use std::fmt::{self, Write as _};

use crate::models::Question;
use crate::services::question_source::QuestionSource;
use crate::services::quiz_state::{AnswerStatus, QuizStateMachine};

pub const LOADING_TEXT: &str = "Loading question...";
pub const EMPTY_TEXT: &str = "No questions available";

pub const QUICK_TIPS: &[&str] = &[
    "Variable declarations (var) are hoisted but not initialized",
    "Function declarations are fully hoisted",
    "let/const are hoisted but in the temporal dead zone",
    "Function expressions are not hoisted",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Submit,
    Skip,
    Explain,
    NextQuestion,
    RequestAiExplanation,
    CloseExplanation,
}

impl Action {
    pub fn command(&self) -> &'static str {
        match self {
            Action::Submit => "<answer>",
            Action::Skip => ":skip",
            Action::Explain => ":why",
            Action::NextQuestion => ":next",
            Action::RequestAiExplanation => ":ai",
            Action::CloseExplanation => ":close",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::Submit => "Run Code",
            Action::Skip => "Skip to next question",
            Action::Explain => "Why is this the output?",
            Action::NextQuestion => "Next Question",
            Action::RequestAiExplanation => "Get AI-Powered Detailed Explanation",
            Action::CloseExplanation => "Close",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiSection<'a> {
    Offer,
    Pending,
    Ready(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalView<'a> {
    pub explanation: &'a str,
    pub ai: AiSection<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizView<'a> {
    pub score: u32,
    pub total_attempts: u32,
    pub question: &'a Question,
    pub user_answer: &'a str,
    pub status: AnswerStatus,
    pub input_locked: bool,
    pub actions: Vec<Action>,
    pub modal: Option<ModalView<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View<'a> {
    Loading,
    Empty,
    Quiz(QuizView<'a>),
}

impl<'a> View<'a> {
    pub fn build(
        questions: &'a QuestionSource,
        quiz: &'a QuizStateMachine,
        ai_explanation: Option<&'a str>,
        ai_pending: bool,
    ) -> Self {
        if questions.is_loading() {
            return View::Loading;
        }
        let Some(question) = questions.current_question() else {
            return View::Empty;
        };

        let status = quiz.status();
        let input_locked = quiz.input_locked();

        let modal = quiz.explanation_open().then(|| ModalView {
            explanation: &question.explanation,
            ai: match (ai_explanation, ai_pending) {
                (_, true) => AiSection::Pending,
                (Some(text), false) => AiSection::Ready(text),
                (None, false) => AiSection::Offer,
            },
        });

        let mut actions = Vec::new();
        if let Some(modal) = &modal {
            if modal.ai == AiSection::Offer {
                actions.push(Action::RequestAiExplanation);
            }
            actions.push(Action::CloseExplanation);
        } else {
            if !input_locked {
                actions.push(Action::Submit);
            }
            actions.push(Action::Skip);
            if status != AnswerStatus::Unanswered {
                actions.push(Action::Explain);
            }
            if status == AnswerStatus::Correct {
                actions.push(Action::NextQuestion);
            }
        }

        View::Quiz(QuizView {
            score: quiz.score(),
            total_attempts: quiz.total_attempts(),
            question,
            user_answer: quiz.user_answer(),
            status,
            input_locked,
            actions,
            modal,
        })
    }
}

/// One line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Answer(String),
    Skip,
    Next,
    Why,
    Ai,
    Close,
    Quit,
    Unknown(String),
}

/// Lines starting with `:` are commands. A leading `::` submits the rest of
/// the line, starting with a single `:`, as an answer.
pub fn parse_command(line: &str) -> Command {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim();
    if let Some(answer) = trimmed.strip_prefix("::") {
        return Command::Answer(format!(":{}", answer));
    }
    if !trimmed.starts_with(':') {
        return Command::Answer(line.to_string());
    }
    match trimmed.to_lowercase().as_str() {
        ":skip" | ":s" => Command::Skip,
        ":next" | ":n" => Command::Next,
        ":why" | ":w" => Command::Why,
        ":ai" => Command::Ai,
        ":close" | ":c" => Command::Close,
        ":quit" | ":q" => Command::Quit,
        _ => Command::Unknown(trimmed.to_string()),
    }
}

const RULE: &str = "────────────────────────────────────────────────────────────";

pub fn render(view: &View<'_>) -> String {
    match view {
        View::Loading => format!("{}\n", LOADING_TEXT),
        View::Empty => format!("{}\n", EMPTY_TEXT),
        View::Quiz(quiz) => render_quiz(quiz),
    }
}

fn render_quiz(view: &QuizView<'_>) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    match write_quiz(&mut out, view) {
        Ok(()) => out,
        Err(_) => String::new(),
    }
}

fn write_quiz(out: &mut String, view: &QuizView<'_>) -> fmt::Result {
    let question = view.question;

    writeln!(out, "HoistSpace · Master JavaScript Hoisting Concepts")?;
    writeln!(
        out,
        "Score: {} / {}    Difficulty: {}",
        view.score, view.total_attempts, question.difficulty
    )?;
    writeln!(out, "{}", RULE)?;

    writeln!(out, "Code Snippet [{}]", question.category.replace('-', " "))?;
    out.push_str(&render_code(&question.code));
    writeln!(out, "{}", RULE)?;

    writeln!(out, "Output")?;
    match view.status {
        AnswerStatus::Unanswered => writeln!(out, "  Run code to see output...")?,
        AnswerStatus::Correct => {
            writeln!(out, "  ✓ Correct!")?;
            writeln!(out, "  Your answer: {}", display_answer(view.user_answer))?;
            writeln!(out, "  Great job! Use \"Next Question\" to continue.")?;
        }
        AnswerStatus::Incorrect => {
            writeln!(out, "  ✗ Incorrect")?;
            writeln!(out, "  Your answer: {}", display_answer(view.user_answer))?;
            writeln!(out, "  Expected: {}", question.correct_output)?;
        }
    }
    writeln!(out, "{}", RULE)?;

    if let Some(modal) = &view.modal {
        write_modal(out, modal)?;
    } else {
        writeln!(out, "Quick Tips")?;
        for tip in QUICK_TIPS {
            writeln!(out, "  • {}", tip)?;
        }
        writeln!(out, "{}", RULE)?;
    }

    if view.input_locked {
        writeln!(out, "Answer locked until the next question.")?;
    }
    for action in &view.actions {
        writeln!(out, "  {:<10} {}", action.command(), action.label())?;
    }
    writeln!(out, "  {:<10} Quit", ":quit")
}

fn write_modal(out: &mut String, modal: &ModalView<'_>) -> fmt::Result {
    writeln!(out, "Explanation")?;
    writeln!(out, "{}", modal.explanation)?;
    writeln!(out)?;

    match modal.ai {
        AiSection::Offer => {}
        AiSection::Pending => writeln!(out, "Generating AI explanation...")?,
        AiSection::Ready(text) => {
            writeln!(out, "AI Explanation")?;
            writeln!(out, "{}", text)?;
        }
    }
    writeln!(out, "{}", RULE)
}

/// Numbers each line of the snippet, keeping blank lines visible.
pub fn render_code(code: &str) -> String {
    let lines: Vec<&str> = code.split('\n').collect();
    let width = lines.len().to_string().len();

    lines
        .iter()
        .enumerate()
        .map(|(index, line)| format!("{:>width$} │ {}\n", index + 1, line, width = width))
        .collect()
}

fn display_answer(answer: &str) -> &str {
    if answer.is_empty() {
        "(empty)"
    } else {
        answer
    }
}
