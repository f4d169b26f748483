use anyhow::Result;
use std::sync::Arc;

use index::{OpenAiEmbeddings, QdrantStore};
use pipeline::{Pipeline, PipelineConfig};
use questions::ChatClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = PipelineConfig::from_env()?;

    let embedder = Arc::new(OpenAiEmbeddings::new(
        config.embedding.base_url.clone(),
        config.embedding.api_key.clone(),
        config.embedding.model.clone(),
    ));
    let store = Arc::new(QdrantStore::new(config.vector_store.base_url.clone()));
    let question_source = Arc::new(ChatClient::new(
        config.chat.base_url.clone(),
        config.chat.api_key.clone(),
        config.chat.model.clone(),
        config.chat.grade_level,
    ));

    let pipeline = Pipeline::new(config, embedder, store, question_source);
    pipeline.run().await
}
