use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use ingest::Chunk;

use crate::embeddings::{EmbeddingProvider, EmbeddingVector};
use crate::retry::RetryPolicy;

/// Rate-limit and retry knobs for the batch driver.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub batch_size: usize,
    pub delay_between_items: Duration,
    pub delay_between_batches: Duration,
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            delay_between_items: Duration::from_millis(100),
            delay_between_batches: Duration::from_secs(1),
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// Rate-limited, retrying front of the embedding provider. Single calls
/// retry with exponential backoff; the batch driver additionally tolerates
/// per-item failures by skipping the item.
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingProvider>,
    retry: RetryPolicy,
    options: BatchOptions,
}

impl EmbeddingGateway {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, options: BatchOptions) -> Self {
        let retry = RetryPolicy::new(
            options.max_attempts,
            options.initial_backoff,
            options.max_backoff,
        );
        Self {
            provider,
            retry,
            options,
        }
    }

    /// Embed one text, retrying on any failure. The last attempt's error
    /// propagates to the caller.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.retry
            .retry("embed", || self.provider.embed_one(text))
            .await
    }

    /// Batch driver: embeds chunks in order, skipping items that exhaust
    /// their retry budget. Returns only successful vectors, preserving the
    /// input order; producing zero vectors is an error.
    pub async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<EmbeddingVector>> {
        info!(
            chunks = chunks.len(),
            batch_size = self.options.batch_size,
            "generating embeddings"
        );

        let mut vectors: Vec<EmbeddingVector> = Vec::with_capacity(chunks.len());
        let mut dimension: Option<usize> = None;

        for (batch_index, batch) in chunks.chunks(self.options.batch_size.max(1)).enumerate() {
            if batch_index > 0 {
                sleep(self.options.delay_between_batches).await;
            }
            info!(batch = batch_index, items = batch.len(), "processing batch");

            for chunk in batch {
                match self.embed(&chunk.text).await {
                    Ok(values) => {
                        // All vectors for one configuration share the
                        // dimensionality of the first one produced.
                        match dimension {
                            None => dimension = Some(values.len()),
                            Some(expected) if expected != values.len() => {
                                warn!(
                                    chunk_id = %chunk.id,
                                    expected,
                                    got = values.len(),
                                    "embedding dimension mismatch, skipping chunk"
                                );
                                continue;
                            }
                            Some(_) => {}
                        }
                        vectors.push(EmbeddingVector {
                            id: chunk.id.clone(),
                            values,
                        });
                    }
                    Err(e) => {
                        warn!(chunk_id = %chunk.id, error = %e, "embedding failed, skipping chunk");
                    }
                }
                sleep(self.options.delay_between_items).await;
            }
        }

        if vectors.is_empty() {
            anyhow::bail!("no vectors produced for {} chunks", chunks.len());
        }

        info!(vectors = vectors.len(), "embeddings complete");
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_options() -> BatchOptions {
        BatchOptions {
            batch_size: 5,
            delay_between_items: Duration::ZERO,
            delay_between_batches: Duration::ZERO,
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    fn chunks(count: usize) -> Vec<Chunk> {
        (0..count)
            .map(|i| Chunk::new(1, i as u32, format!("text {}", i)))
            .collect()
    }

    /// Fails every attempt for one specific chunk text.
    struct FlakyProvider {
        poison: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyProvider {
        async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text == self.poison {
                anyhow::bail!("provider rejected {}", text);
            }
            Ok(vec![1.0, 2.0, 3.0])
        }
    }

    #[tokio::test]
    async fn batch_driver_skips_permanently_failing_item() {
        let provider = Arc::new(FlakyProvider {
            poison: "text 7".to_string(),
            calls: AtomicUsize::new(0),
        });
        let gateway = EmbeddingGateway::new(provider.clone(), fast_options());

        let vectors = gateway.embed_chunks(&chunks(12)).await.unwrap();

        assert_eq!(vectors.len(), 11);
        let expected: Vec<String> = (0..12)
            .filter(|i| *i != 7)
            .map(|i| format!("1-{}", i))
            .collect();
        let got: Vec<String> = vectors.iter().map(|v| v.id.clone()).collect();
        assert_eq!(got, expected);
        // 11 successes + 2 attempts on the poisoned chunk.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 13);
    }

    #[tokio::test]
    async fn zero_vectors_is_an_error() {
        let provider = Arc::new(FlakyProvider {
            poison: "text 0".to_string(),
            calls: AtomicUsize::new(0),
        });
        let gateway = EmbeddingGateway::new(provider, fast_options());

        assert!(gateway.embed_chunks(&chunks(1)).await.is_err());
    }

    #[tokio::test]
    async fn single_embed_propagates_exhausted_retries() {
        let provider = Arc::new(FlakyProvider {
            poison: "bad".to_string(),
            calls: AtomicUsize::new(0),
        });
        let gateway = EmbeddingGateway::new(provider.clone(), fast_options());

        assert!(gateway.embed("bad").await.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    struct ShrinkingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for ShrinkingProvider {
        async fn embed_one(&self, _text: &str) -> Result<Vec<f32>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n == 1 {
                Ok(vec![1.0])
            } else {
                Ok(vec![1.0, 2.0])
            }
        }
    }

    #[tokio::test]
    async fn dimension_drift_counts_as_item_failure() {
        let provider = Arc::new(ShrinkingProvider {
            calls: AtomicUsize::new(0),
        });
        let gateway = EmbeddingGateway::new(provider, fast_options());

        let vectors = gateway.embed_chunks(&chunks(3)).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.values.len() == 2));
    }
}
