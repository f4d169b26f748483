use futures_util::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

use ingest::Chunk;

use crate::llm::QuestionSource;
use crate::schema::QuestionSet;

/// Generates questions for every chunk with a fixed pool of workers. Each
/// worker pulls the next chunk from a shared cursor and owns its result;
/// one chunk's failure yields an empty question list for that chunk only.
/// Output is re-sorted by (page, window_index) so artifact order does not
/// depend on task completion order.
pub struct QuestionGenerator {
    source: Arc<dyn QuestionSource>,
    pool_size: usize,
}

impl QuestionGenerator {
    pub fn new(source: Arc<dyn QuestionSource>, pool_size: usize) -> Self {
        Self {
            source,
            pool_size: pool_size.max(1),
        }
    }

    pub async fn generate_for_chunks(&self, chunks: &[Chunk]) -> Vec<QuestionSet> {
        if chunks.is_empty() {
            return Vec::new();
        }
        info!(chunks = chunks.len(), workers = self.pool_size, "generating questions");

        let chunks: Arc<Vec<Chunk>> = Arc::new(chunks.to_vec());
        let cursor = Arc::new(AtomicUsize::new(0));
        let workers = self.pool_size.min(chunks.len());

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let chunks = Arc::clone(&chunks);
            let cursor = Arc::clone(&cursor);
            let source = Arc::clone(&self.source);

            handles.push(tokio::spawn(async move {
                let mut sets = Vec::new();
                loop {
                    let i = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(chunk) = chunks.get(i) else {
                        break;
                    };
                    let questions = match source.questions_for(&chunk.text).await {
                        Ok(questions) => questions,
                        Err(e) => {
                            warn!(chunk_id = %chunk.id, error = %e, "question generation failed");
                            Vec::new()
                        }
                    };
                    sets.push(QuestionSet {
                        chunk_id: chunk.id.clone(),
                        text: chunk.text.clone(),
                        questions,
                    });
                }
                sets
            }));
        }

        let mut all: Vec<QuestionSet> = Vec::with_capacity(chunks.len());
        for outcome in join_all(handles).await {
            match outcome {
                Ok(sets) => all.extend(sets),
                Err(e) => warn!(error = %e, "question worker panicked"),
            }
        }

        all.sort_by_key(|set| Chunk::parse_id(&set.chunk_id).unwrap_or((u32::MAX, u32::MAX)));
        all
    }
}
