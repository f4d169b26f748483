use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use index::{EmbeddingGateway, ScoredChunk, VectorIndex};
use questions::QuestionSet;

/// One flattened (chunk, question) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalQuery {
    pub chunk_id: String,
    pub text: String,
    pub question: String,
}

/// A query together with its ranked retrieval matches, best first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub question_data: RetrievalQuery,
    pub similar_chunks: Vec<ScoredChunk>,
}

/// Flatten every question of every set into a (chunk, question) pool,
/// keeping the sets' order.
pub fn flatten_questions(question_sets: &[QuestionSet]) -> Vec<RetrievalQuery> {
    let mut pool = Vec::new();
    for set in question_sets {
        for question in &set.questions {
            pool.push(RetrievalQuery {
                chunk_id: set.chunk_id.clone(),
                text: set.text.clone(),
                question: question.clone(),
            });
        }
    }
    pool
}

/// Uniform sample without replacement. Pools no larger than `sample_size`
/// are used whole. Unseeded by default; a seed makes the draw reproducible.
pub fn sample_queries(
    pool: Vec<RetrievalQuery>,
    sample_size: usize,
    seed: Option<u64>,
) -> Vec<RetrievalQuery> {
    if pool.len() <= sample_size {
        return pool;
    }
    match seed {
        Some(seed) => {
            let mut rng = StdRng::seed_from_u64(seed);
            pool.choose_multiple(&mut rng, sample_size).cloned().collect()
        }
        None => {
            let mut rng = rand::thread_rng();
            pool.choose_multiple(&mut rng, sample_size).cloned().collect()
        }
    }
}

/// Re-embeds sampled questions and queries the vector index for their
/// nearest chunks. A per-question embedding or query failure records an
/// empty match list for that question only.
pub struct RetrievalRunner {
    gateway: EmbeddingGateway,
    index: VectorIndex,
    top_k: usize,
}

impl RetrievalRunner {
    pub fn new(gateway: EmbeddingGateway, index: VectorIndex, top_k: usize) -> Self {
        Self {
            gateway,
            index,
            top_k,
        }
    }

    pub async fn run(
        &self,
        question_sets: &[QuestionSet],
        sample_size: usize,
        seed: Option<u64>,
    ) -> Vec<RetrievalResult> {
        let pool = flatten_questions(question_sets);
        let selected = sample_queries(pool, sample_size, seed);
        info!(selected = selected.len(), "selected questions for retrieval");

        let mut results = Vec::with_capacity(selected.len());
        for query in selected {
            let similar_chunks = self.retrieve(&query).await;
            results.push(RetrievalResult {
                question_data: query,
                similar_chunks,
            });
        }
        results
    }

    async fn retrieve(&self, query: &RetrievalQuery) -> Vec<ScoredChunk> {
        match self.gateway.embed(&query.question).await {
            Ok(embedding) => self.index.query(&embedding, self.top_k).await,
            Err(e) => {
                warn!(chunk_id = %query.chunk_id, error = %e, "question embedding failed");
                Vec::new()
            }
        }
    }
}
