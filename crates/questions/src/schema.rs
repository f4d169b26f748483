use serde::{Deserialize, Serialize};

/// Questions generated for one chunk. `questions` is empty when generation
/// failed for that chunk; the pipeline keeps going.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSet {
    pub chunk_id: String,
    pub text: String,
    pub questions: Vec<String>,
}

/// The structured payload the model must return.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionsResponse {
    pub questions: Vec<String>,
}
