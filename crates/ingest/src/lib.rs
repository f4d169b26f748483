pub mod chunk;
pub mod chunker;
pub mod reader;

pub use chunk::{Chunk, ChunkingConfig, Page};
pub use chunker::Chunker;
pub use reader::ExtractReader;

use sha2::{Digest, Sha256};

/// Generate a stable source identifier from the extract file path, used to
/// address the same logical vector index across runs.
pub fn source_id(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..6])
}
