pub mod attempt;
pub mod explanation;
pub mod question;

pub use attempt::AttemptRecord;
pub use explanation::{ExplainErrorBody, ExplainRequest, ExplainResponse};
pub use question::{Difficulty, Question};
