use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

use crate::chunk::Page;

/// Loads the extraction collaborator's output: an ordered JSON array of
/// `{page, text}` records.
pub struct ExtractReader;

impl ExtractReader {
    pub async fn load(path: &Path) -> Result<Vec<Page>> {
        let data = fs::read_to_string(path)
            .await
            .context(format!("Failed to read extract file: {:?}", path))?;
        Self::parse(&data).context(format!("Invalid extract file: {:?}", path))
    }

    pub fn parse(data: &str) -> Result<Vec<Page>> {
        let pages: Vec<Page> = serde_json::from_str(data)?;
        if pages.is_empty() {
            anyhow::bail!("document extract contains no pages");
        }
        Ok(pages)
    }
}
