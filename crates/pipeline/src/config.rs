use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use index::BatchOptions;
use ingest::ChunkingConfig;

use crate::stages::StageSet;

/// Everything one pipeline run needs, constructed once at process start
/// and passed by reference into the orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub extract_file: PathBuf,
    pub output_dir: PathBuf,
    pub chunk_configs: Vec<ChunkingConfig>,
    pub stages: StageSet,

    pub embedding: EmbeddingConfig,
    pub chat: ChatConfig,
    pub vector_store: VectorStoreConfig,
    pub batch: BatchOptions,

    /// Top-K nearest chunks fetched per retrieval query.
    pub top_k: usize,
    /// K used for Recall@K / Precision@K.
    pub eval_k: usize,
    pub question_workers: usize,
    /// Fix the retrieval sample for reproducible evaluation runs.
    pub sample_seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub grade_level: u8,
}

#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    pub base_url: String,
    pub namespace: String,
    /// Fixed wait after creating a fresh index, before the first upsert.
    pub ready_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extract_file: PathBuf::from("output/extract.json"),
            output_dir: PathBuf::from("output"),
            chunk_configs: vec![ChunkingConfig {
                size: 100,
                overlap: 10,
            }],
            stages: StageSet::all(),
            embedding: EmbeddingConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                api_key: String::new(),
                model: "text-embedding-3-small".to_string(),
            },
            chat: ChatConfig {
                base_url: "https://openrouter.ai/api/v1".to_string(),
                api_key: String::new(),
                model: "x-ai/grok-4-fast:free".to_string(),
                grade_level: 2,
            },
            vector_store: VectorStoreConfig {
                base_url: "http://localhost:6333".to_string(),
                namespace: "default".to_string(),
                ready_delay: Duration::from_secs(10),
            },
            batch: BatchOptions::default(),
            top_k: 10,
            eval_k: 2,
            question_workers: 3,
            sample_seed: None,
        }
    }
}

impl PipelineConfig {
    /// Defaults with environment overrides for keys, endpoints, chunking
    /// geometry, and the stage subset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("RAG_EXTRACT_FILE") {
            config.extract_file = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var("RAG_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Ok(spec) = std::env::var("RAG_CHUNK_CONFIGS") {
            config.chunk_configs = parse_chunk_configs(&spec)?;
        }
        if let Ok(spec) = std::env::var("RAG_STAGES") {
            config.stages = StageSet::parse(&spec)?;
        }
        if let Ok(seed) = std::env::var("RAG_SAMPLE_SEED") {
            config.sample_seed = Some(seed.parse().context("RAG_SAMPLE_SEED must be a number")?);
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.embedding.api_key = key;
        }
        if let Ok(url) = std::env::var("RAG_EMBEDDING_URL") {
            config.embedding.base_url = url;
        }
        if let Ok(model) = std::env::var("RAG_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }

        if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            config.chat.api_key = key;
        }
        if let Ok(url) = std::env::var("RAG_CHAT_URL") {
            config.chat.base_url = url;
        }
        if let Ok(model) = std::env::var("RAG_CHAT_MODEL") {
            config.chat.model = model;
        }

        if let Ok(url) = std::env::var("RAG_VECTOR_STORE_URL") {
            config.vector_store.base_url = url;
        }
        if let Ok(namespace) = std::env::var("RAG_VECTOR_NAMESPACE") {
            config.vector_store.namespace = namespace;
        }

        Ok(config)
    }
}

/// Parse "size-overlap" pairs, e.g. "100-10,256-64".
fn parse_chunk_configs(spec: &str) -> Result<Vec<ChunkingConfig>> {
    let mut configs = Vec::new();
    for entry in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (size, overlap) = entry
            .split_once('-')
            .context(format!("chunk config must be size-overlap: {}", entry))?;
        let size = size
            .parse()
            .context(format!("invalid chunk size in: {}", entry))?;
        let overlap = overlap
            .parse()
            .context(format!("invalid chunk overlap in: {}", entry))?;
        configs.push(ChunkingConfig::new(size, overlap)?);
    }
    if configs.is_empty() {
        anyhow::bail!("no chunking configurations given");
    }
    Ok(configs)
}
