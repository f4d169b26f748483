pub mod runner;

pub use index::ScoredChunk;
pub use runner::{RetrievalQuery, RetrievalResult, RetrievalRunner, flatten_questions, sample_queries};
