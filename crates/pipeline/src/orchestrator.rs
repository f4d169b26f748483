use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::fs;
use tracing::{error, info};

use eval::EvalMetrics;
use index::{EmbeddingGateway, EmbeddingProvider, VectorIndex, VectorStore, index_name};
use ingest::{Chunk, Chunker, ChunkingConfig, ExtractReader, Page};
use questions::{QuestionGenerator, QuestionSet, QuestionSource};
use retrieval::{RetrievalResult, RetrievalRunner};

use crate::artifacts::{self, ArtifactPaths};
use crate::config::PipelineConfig;
use crate::stages::Stage;

/// Sequences the pipeline stages for every chunking configuration, gated
/// by checkpoint artifacts. A stage failure aborts the current
/// configuration only; malformed input fails the run before any work.
pub struct Pipeline {
    config: PipelineConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    question_source: Arc<dyn QuestionSource>,
    source_id: String,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        question_source: Arc<dyn QuestionSource>,
    ) -> Self {
        let source_id = ingest::source_id(&config.extract_file.to_string_lossy());
        Self {
            config,
            embedder,
            store,
            question_source,
            source_id,
        }
    }

    pub async fn run(&self) -> Result<()> {
        info!("starting RAG pipeline");
        fs::create_dir_all(&self.config.output_dir)
            .await
            .context("Failed to create output directory")?;

        self.precheck()?;

        let pages = if self.needs_extract() {
            Some(ExtractReader::load(&self.config.extract_file).await?)
        } else {
            None
        };

        for chunk_config in &self.config.chunk_configs {
            let key = chunk_config.key();
            info!(key = %key, "processing configuration");

            match self.run_config(chunk_config, pages.as_deref()).await {
                Ok(Some(metrics)) => info!(
                    key = %key,
                    recall = metrics.recall,
                    precision = metrics.precision,
                    "configuration complete"
                ),
                Ok(None) => info!(key = %key, "requested stages complete"),
                Err(e) => error!(key = %key, error = %e, "aborted configuration"),
            }
        }

        info!("RAG pipeline finished");
        Ok(())
    }

    /// Fail fast on malformed input: bad window geometry, or a stage
    /// subset that needs a checkpoint no earlier stage will produce.
    fn precheck(&self) -> Result<()> {
        if self.config.chunk_configs.is_empty() {
            anyhow::bail!("no chunking configurations given");
        }

        for chunk_config in &self.config.chunk_configs {
            chunk_config.validate()?;

            let paths = self.paths(chunk_config);
            for stage in Stage::ALL {
                if self.config.stages.contains(stage) || !self.config.stages.needs(stage) {
                    continue;
                }
                let artifact = match stage {
                    Stage::Chunk => paths.chunks(),
                    Stage::Vectorize => paths.vectors(),
                    Stage::Questions => paths.questions(),
                    Stage::Retrievers => paths.retrievers(),
                    Stage::Evaluate => continue,
                };
                if !artifact.exists() {
                    anyhow::bail!(
                        "stage '{}' was not requested but a later stage needs its checkpoint {:?}",
                        stage.label(),
                        artifact
                    );
                }
            }
        }
        Ok(())
    }

    fn needs_extract(&self) -> bool {
        self.config.stages.contains(Stage::Chunk)
            && self
                .config
                .chunk_configs
                .iter()
                .any(|c| !self.paths(c).chunks().exists())
    }

    async fn run_config(
        &self,
        chunk_config: &ChunkingConfig,
        pages: Option<&[Page]>,
    ) -> Result<Option<EvalMetrics>> {
        let key = chunk_config.key();
        let paths = self.paths(chunk_config);
        let stages = &self.config.stages;

        // Chunking
        let chunks: Vec<Chunk> = if paths.chunks().exists() {
            info!(path = ?paths.chunks(), "found chunk checkpoint");
            artifacts::read_json(&paths.chunks()).await?
        } else {
            let pages = pages.context("document extract was not loaded")?;
            let chunker = Chunker::new(*chunk_config)?;
            let chunks = chunker.chunk_pages(pages);
            info!(key = %key, chunks = chunks.len(), "created chunks");
            artifacts::write_json(&paths.chunks(), &chunks).await?;
            chunks
        };
        if !stages.needs(Stage::Vectorize) {
            return Ok(None);
        }

        // Vector creation and upsert. When the checkpoint exists the index
        // is assumed populated from the run that wrote it.
        if paths.vectors().exists() {
            info!(path = ?paths.vectors(), "found vector checkpoint");
        } else {
            let gateway = self.gateway();
            let vectors = gateway.embed_chunks(&chunks).await?;
            artifacts::write_json(&paths.vectors(), &vectors).await?;

            let dimension = vectors
                .first()
                .map(|v| v.values.len())
                .context("no vectors produced")?;
            let vector_index = self.vector_index(chunk_config);
            vector_index.ensure(dimension).await;
            if !vector_index.upsert(&vectors).await {
                anyhow::bail!("vector upsert failed for configuration {}", key);
            }
        }
        if !stages.needs(Stage::Questions) {
            return Ok(None);
        }

        // Question generation
        let question_sets: Vec<QuestionSet> = if paths.questions().exists() {
            info!(path = ?paths.questions(), "found questions checkpoint");
            artifacts::read_json(&paths.questions()).await?
        } else {
            let generator = QuestionGenerator::new(
                Arc::clone(&self.question_source),
                self.config.question_workers,
            );
            let sets = generator.generate_for_chunks(&chunks).await;
            artifacts::write_json(&paths.questions(), &sets).await?;
            sets
        };
        if !stages.needs(Stage::Retrievers) {
            return Ok(None);
        }

        // Retrieval
        let results: Vec<RetrievalResult> = if paths.retrievers().exists() {
            info!(path = ?paths.retrievers(), "found retrievers checkpoint");
            artifacts::read_json(&paths.retrievers()).await?
        } else {
            let runner = RetrievalRunner::new(
                self.gateway(),
                self.vector_index(chunk_config),
                self.config.top_k,
            );
            let total: usize = question_sets.iter().map(|s| s.questions.len()).sum();
            let results = runner
                .run(&question_sets, sample_size(total), self.config.sample_seed)
                .await;
            if results.is_empty() {
                anyhow::bail!("no retrieval results produced for configuration {}", key);
            }
            artifacts::write_json(&paths.retrievers(), &results).await?;
            results
        };
        if !stages.needs(Stage::Evaluate) {
            return Ok(None);
        }

        // Evaluation
        let metrics = if paths.evals().exists() {
            info!(path = ?paths.evals(), "found evals checkpoint");
            artifacts::read_json(&paths.evals()).await?
        } else {
            let metrics = eval::evaluate(&results, self.config.eval_k);
            artifacts::write_json(&paths.evals(), &metrics).await?;
            metrics
        };

        Ok(Some(metrics))
    }

    fn paths(&self, chunk_config: &ChunkingConfig) -> ArtifactPaths {
        ArtifactPaths::new(&self.config.output_dir, &chunk_config.key())
    }

    fn gateway(&self) -> EmbeddingGateway {
        EmbeddingGateway::new(Arc::clone(&self.embedder), self.config.batch.clone())
    }

    fn vector_index(&self, chunk_config: &ChunkingConfig) -> VectorIndex {
        VectorIndex::new(
            Arc::clone(&self.store),
            index_name(chunk_config, &self.source_id),
            self.config.vector_store.namespace.clone(),
            self.config.vector_store.ready_delay,
        )
    }
}

/// Test at least 10 questions, else 30% of the pool, capped at the pool
/// itself.
fn sample_size(total: usize) -> usize {
    let fraction = ((total as f64) * 0.3).ceil() as usize;
    fraction.min(total).max(10)
}
