pub mod generator;
pub mod llm;
pub mod prompt;
pub mod schema;

pub use generator::QuestionGenerator;
pub use llm::{ChatClient, QuestionSource};
pub use schema::{QuestionSet, QuestionsResponse};
