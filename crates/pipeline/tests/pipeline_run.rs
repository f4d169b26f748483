//! End-to-end pipeline runs against in-memory fakes of the embedding
//! provider, vector store, and question source.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eval::EvalMetrics;
use index::{BatchOptions, EmbeddingProvider, EmbeddingVector, ScoredChunk, VectorStore};
use ingest::ChunkingConfig;
use pipeline::{Pipeline, PipelineConfig, StageSet};
use questions::QuestionSource;

/// Deterministic embeddings: identical texts get identical vectors.
struct HashEmbedder;

fn embed_text(text: &str) -> Vec<f32> {
    (0..8u64)
        .map(|dim| {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            text.hash(&mut hasher);
            dim.hash(&mut hasher);
            (hasher.finish() % 1000) as f32 / 1000.0
        })
        .collect()
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        Ok(embed_text(text))
    }
}

/// Brute-force cosine search over vectors held in memory.
#[derive(Default)]
struct MemoryStore {
    indexes: Mutex<HashMap<String, Vec<(String, String, Vec<f32>)>>>,
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn create_index(&self, name: &str, _dimension: usize) -> Result<()> {
        let mut indexes = self.indexes.lock().unwrap();
        if indexes.contains_key(name) {
            anyhow::bail!("index {} already exists", name);
        }
        indexes.insert(name.to_string(), Vec::new());
        Ok(())
    }

    async fn upsert(&self, name: &str, namespace: &str, vectors: &[EmbeddingVector]) -> Result<()> {
        let mut indexes = self.indexes.lock().unwrap();
        let index = indexes
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!("unknown index {}", name))?;
        for vector in vectors {
            index.push((
                namespace.to_string(),
                vector.id.clone(),
                vector.values.clone(),
            ));
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
        let indexes = self.indexes.lock().unwrap();
        let index = indexes
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("unknown index {}", name))?;

        let mut matches: Vec<ScoredChunk> = index
            .iter()
            .filter(|(ns, _, _)| ns == namespace)
            .map(|(_, id, values)| ScoredChunk {
                id: id.clone(),
                score: cosine(vector, values),
            })
            .collect();
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        matches.truncate(top_k);
        Ok(matches)
    }
}

/// Echoes each chunk's text back as its single question, so the question
/// embedding matches its ground-truth chunk exactly.
struct EchoQuestions;

#[async_trait]
impl QuestionSource for EchoQuestions {
    async fn questions_for(&self, chunk_text: &str) -> Result<Vec<String>> {
        Ok(vec![chunk_text.to_string()])
    }
}

fn test_config(dir: &std::path::Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.extract_file = dir.join("extract.json");
    config.output_dir = dir.to_path_buf();
    config.chunk_configs = vec![ChunkingConfig::new(12, 3).unwrap()];
    config.batch = BatchOptions {
        batch_size: 5,
        delay_between_items: Duration::ZERO,
        delay_between_batches: Duration::ZERO,
        max_attempts: 2,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
    };
    config.vector_store.ready_delay = Duration::ZERO;
    config.top_k = 3;
    config.eval_k = 2;
    config.question_workers = 2;
    config.sample_seed = Some(42);
    config
}

fn write_extract(dir: &std::path::Path) {
    let pages: Vec<serde_json::Value> = (1..=2)
        .map(|page| {
            let text = (0..30)
                .map(|w| format!("p{}w{}", page, w))
                .collect::<Vec<_>>()
                .join(" ");
            serde_json::json!({"page": page, "text": text})
        })
        .collect();
    std::fs::write(
        dir.join("extract.json"),
        serde_json::to_string_pretty(&pages).unwrap(),
    )
    .unwrap();
}

fn build_pipeline(config: PipelineConfig) -> Pipeline {
    Pipeline::new(
        config,
        Arc::new(HashEmbedder),
        Arc::new(MemoryStore::default()),
        Arc::new(EchoQuestions),
    )
}

#[tokio::test]
async fn full_run_writes_every_artifact_and_scores_retrieval() {
    let dir = tempfile::tempdir().unwrap();
    write_extract(dir.path());

    build_pipeline(test_config(dir.path())).run().await.unwrap();

    for name in [
        "chunks-12-3.json",
        "vectors-12-3.json",
        "questions-12-3.json",
        "retrievers-12-3.json",
        "evals-12-3.json",
    ] {
        assert!(dir.path().join(name).exists(), "missing artifact {}", name);
    }

    let metrics: EvalMetrics =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("evals-12-3.json")).unwrap())
            .unwrap();
    // Every question is its chunk's exact text, so the true chunk ranks
    // first: recall 1.0, and precision = recall / k at k = 2.
    assert_eq!(metrics.recall, 1.0);
    assert_eq!(metrics.precision, 0.5);
}

#[tokio::test]
async fn rerun_skips_completed_stages_and_leaves_artifacts_untouched() {
    let dir = tempfile::tempdir().unwrap();
    write_extract(dir.path());

    build_pipeline(test_config(dir.path())).run().await.unwrap();

    let chunks_before = std::fs::read(dir.path().join("chunks-12-3.json")).unwrap();
    let vectors_before = std::fs::read(dir.path().join("vectors-12-3.json")).unwrap();

    // Second run against the same directory, with fresh collaborators: the
    // checkpoints gate every stage.
    build_pipeline(test_config(dir.path())).run().await.unwrap();

    assert_eq!(
        chunks_before,
        std::fs::read(dir.path().join("chunks-12-3.json")).unwrap()
    );
    assert_eq!(
        vectors_before,
        std::fs::read(dir.path().join("vectors-12-3.json")).unwrap()
    );
}

#[tokio::test]
async fn later_stage_without_its_checkpoints_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.stages = StageSet::parse("evaluate").unwrap();

    let err = build_pipeline(config).run().await.unwrap_err();
    assert!(err.to_string().contains("checkpoint"), "got: {}", err);
}

#[tokio::test]
async fn chunk_only_run_stops_after_chunking() {
    let dir = tempfile::tempdir().unwrap();
    write_extract(dir.path());

    let mut config = test_config(dir.path());
    config.stages = StageSet::parse("chunk").unwrap();
    build_pipeline(config).run().await.unwrap();

    assert!(dir.path().join("chunks-12-3.json").exists());
    assert!(!dir.path().join("vectors-12-3.json").exists());
}
