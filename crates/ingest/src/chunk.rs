use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One page of extracted document text, as produced by the extraction step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub text: String,
}

/// A window of page text. The id encodes the window's position as
/// "{page}-{window_index}" and is the ground-truth key for retrieval scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
}

impl Chunk {
    pub fn new(page: u32, window_index: u32, text: String) -> Self {
        Self {
            id: format!("{}-{}", page, window_index),
            text,
        }
    }

    /// Split a "{page}-{window_index}" id back into its numeric parts.
    pub fn parse_id(id: &str) -> Option<(u32, u32)> {
        let (page, window) = id.split_once('-')?;
        Some((page.parse().ok()?, window.parse().ok()?))
    }
}

/// Window geometry for one chunking run. `size` and `overlap` are measured
/// in whitespace-delimited tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub size: usize,
    pub overlap: usize,
}

impl ChunkingConfig {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        let config = Self { size, overlap };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            anyhow::bail!("chunk size must be greater than zero");
        }
        if self.overlap >= self.size {
            anyhow::bail!(
                "chunk overlap {} must be smaller than chunk size {}",
                self.overlap,
                self.size
            );
        }
        Ok(())
    }

    /// Artifact key for this configuration.
    pub fn key(&self) -> String {
        format!("{}-{}", self.size, self.overlap)
    }

    /// Tokens the window advances by.
    pub fn step(&self) -> usize {
        self.size - self.overlap
    }
}
