use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::prompt;
use crate::schema::QuestionsResponse;

/// Capability consumed by the generator: one chunk's text in, its question
/// list out.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn questions_for(&self, chunk_text: &str) -> Result<Vec<String>>;
}

/// OpenAI-compatible chat-completions client.
#[derive(Clone)]
pub struct ChatClient {
    base_url: String,
    api_key: String,
    model: String,
    grade_level: u8,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl ChatClient {
    pub fn new(base_url: String, api_key: String, model: String, grade_level: u8) -> Self {
        Self {
            base_url,
            api_key,
            model,
            grade_level,
            client: reqwest::Client::new(),
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send chat request")?;

        if !response.status().is_success() {
            anyhow::bail!("Chat request failed: {}", response.status());
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat response")?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .context("Chat response contained no choices")?;

        Ok(choice.message.content)
    }

    /// Prompt for questions and parse the structured payload. One invalid
    /// payload gets a correction round-trip; a second failure surfaces as a
    /// parse error.
    pub async fn generate_questions(&self, chunk_text: &str) -> Result<QuestionsResponse> {
        let prompt = prompt::build_question_prompt(chunk_text, self.grade_level);
        let response = self.generate(&prompt).await?;

        match serde_json::from_str::<QuestionsResponse>(&response) {
            Ok(parsed) => Ok(parsed),
            Err(_) => {
                let corrected = self.generate(&prompt::build_retry_prompt(&response)).await?;
                serde_json::from_str(&corrected)
                    .context("Model returned an invalid questions payload after correction")
            }
        }
    }
}

#[async_trait]
impl QuestionSource for ChatClient {
    async fn questions_for(&self, chunk_text: &str) -> Result<Vec<String>> {
        Ok(self.generate_questions(chunk_text).await?.questions)
    }
}
