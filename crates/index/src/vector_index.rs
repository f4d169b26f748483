use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

use ingest::ChunkingConfig;

use crate::embeddings::EmbeddingVector;

/// One ranked retrieval match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub id: String,
    pub score: f32,
}

/// Call contract of the external vector store.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn create_index(&self, name: &str, dimension: usize) -> Result<()>;

    async fn upsert(
        &self,
        name: &str,
        namespace: &str,
        vectors: &[EmbeddingVector],
    ) -> Result<()>;

    async fn query(
        &self,
        name: &str,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>>;
}

/// Deterministic index name for a chunking configuration, so repeated runs
/// against the same document address the same logical index.
pub fn index_name(config: &ChunkingConfig, source_id: &str) -> String {
    format!("{}-{}-{}", config.size, config.overlap, source_id)
}

/// Upsert/query façade over one logical index. Store failures are logged
/// and surfaced as `false` / empty results, never raised.
pub struct VectorIndex {
    store: Arc<dyn VectorStore>,
    name: String,
    namespace: String,
    ready_delay: Duration,
}

impl VectorIndex {
    pub fn new(
        store: Arc<dyn VectorStore>,
        name: String,
        namespace: String,
        ready_delay: Duration,
    ) -> Self {
        Self {
            store,
            name,
            namespace,
            ready_delay,
        }
    }

    /// Create the index if it does not exist yet. Creation failure is
    /// treated as "already exists"; after a fresh create the store gets a
    /// fixed delay to reach a ready state.
    pub async fn ensure(&self, dimension: usize) {
        match self.store.create_index(&self.name, dimension).await {
            Ok(()) => {
                info!(index = %self.name, dimension, "created vector index");
                sleep(self.ready_delay).await;
            }
            Err(e) => {
                info!(index = %self.name, error = %e, "index creation skipped");
            }
        }
    }

    pub async fn upsert(&self, vectors: &[EmbeddingVector]) -> bool {
        match self
            .store
            .upsert(&self.name, &self.namespace, vectors)
            .await
        {
            Ok(()) => {
                info!(index = %self.name, vectors = vectors.len(), "upserted vectors");
                true
            }
            Err(e) => {
                error!(index = %self.name, error = %e, "vector upsert failed");
                false
            }
        }
    }

    pub async fn query(&self, vector: &[f32], top_k: usize) -> Vec<ScoredChunk> {
        match self
            .store
            .query(&self.name, &self.namespace, vector, top_k)
            .await
        {
            Ok(matches) => matches,
            Err(e) => {
                error!(index = %self.name, error = %e, "vector query failed");
                Vec::new()
            }
        }
    }
}

/// Qdrant-style REST client. Chunk ids are hashed to numeric point ids;
/// the original string id and the namespace travel in the payload.
pub struct QdrantStore {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: String,
}

#[derive(Serialize)]
struct UpsertPoints {
    points: Vec<Point>,
}

#[derive(Serialize)]
struct Point {
    id: u64,
    vector: Vec<f32>,
    payload: PointPayload,
}

#[derive(Serialize)]
struct PointPayload {
    chunk_id: String,
    namespace: String,
}

#[derive(Serialize)]
struct SearchRequest {
    vector: Vec<f32>,
    limit: usize,
    with_payload: bool,
    filter: SearchFilter,
}

#[derive(Serialize)]
struct SearchFilter {
    must: Vec<FieldMatch>,
}

#[derive(Serialize)]
struct FieldMatch {
    key: String,
    r#match: MatchValue,
}

#[derive(Serialize)]
struct MatchValue {
    value: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    score: f32,
    payload: HitPayload,
}

#[derive(Deserialize)]
struct HitPayload {
    chunk_id: String,
}

impl QdrantStore {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn hash_to_u64(s: &str) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn create_index(&self, name: &str, dimension: usize) -> Result<()> {
        let url = format!("{}/collections/{}", self.base_url, name);
        let request = CreateCollection {
            vectors: VectorParams {
                size: dimension,
                distance: "Cosine".to_string(),
            },
        };

        let response = self
            .client
            .put(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send create-index request")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to create index: {}", error_text);
        }

        Ok(())
    }

    async fn upsert(
        &self,
        name: &str,
        namespace: &str,
        vectors: &[EmbeddingVector],
    ) -> Result<()> {
        let url = format!("{}/collections/{}/points", self.base_url, name);

        let points = vectors
            .iter()
            .map(|v| Point {
                id: Self::hash_to_u64(&v.id),
                vector: v.values.clone(),
                payload: PointPayload {
                    chunk_id: v.id.clone(),
                    namespace: namespace.to_string(),
                },
            })
            .collect();

        let response = self
            .client
            .put(&url)
            .json(&UpsertPoints { points })
            .send()
            .await
            .context("Failed to send upsert request")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to upsert vectors: {}", error_text);
        }

        Ok(())
    }

    async fn query(
        &self,
        name: &str,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let url = format!("{}/collections/{}/points/search", self.base_url, name);

        let request = SearchRequest {
            vector: vector.to_vec(),
            limit: top_k,
            with_payload: true,
            filter: SearchFilter {
                must: vec![FieldMatch {
                    key: "namespace".to_string(),
                    r#match: MatchValue {
                        value: namespace.to_string(),
                    },
                }],
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send search request")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Vector search failed: {}", error_text);
        }

        let search_response: SearchResponse = response
            .json()
            .await
            .context("Failed to parse search response")?;

        Ok(search_response
            .result
            .into_iter()
            .map(|hit| ScoredChunk {
                id: hit.payload.chunk_id,
                score: hit.score,
            })
            .collect())
    }
}
