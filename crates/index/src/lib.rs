pub mod embeddings;
pub mod gateway;
pub mod retry;
pub mod vector_index;

pub use embeddings::{EmbeddingProvider, EmbeddingVector, OpenAiEmbeddings};
pub use gateway::{BatchOptions, EmbeddingGateway};
pub use retry::RetryPolicy;
pub use vector_index::{QdrantStore, ScoredChunk, VectorIndex, VectorStore, index_name};
