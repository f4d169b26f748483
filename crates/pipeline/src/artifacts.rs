use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Checkpoint file locations for one configuration key. The presence of an
/// artifact is the sole signal that its stage already completed.
pub struct ArtifactPaths {
    dir: PathBuf,
    key: String,
}

impl ArtifactPaths {
    pub fn new(dir: &Path, key: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            key: key.to_string(),
        }
    }

    pub fn chunks(&self) -> PathBuf {
        self.dir.join(format!("chunks-{}.json", self.key))
    }

    pub fn vectors(&self) -> PathBuf {
        self.dir.join(format!("vectors-{}.json", self.key))
    }

    pub fn questions(&self) -> PathBuf {
        self.dir.join(format!("questions-{}.json", self.key))
    }

    pub fn retrievers(&self) -> PathBuf {
        self.dir.join(format!("retrievers-{}.json", self.key))
    }

    pub fn evals(&self) -> PathBuf {
        self.dir.join(format!("evals-{}.json", self.key))
    }
}

/// Write a JSON artifact atomically: serialize to a temp sibling, then
/// rename onto the final path. A crashed write never leaves a partial
/// artifact where the checkpoint check would find it.
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize artifact")?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, json)
        .await
        .context(format!("Failed to write artifact: {:?}", tmp))?;
    fs::rename(&tmp, path)
        .await
        .context(format!("Failed to finalize artifact: {:?}", path))?;
    Ok(())
}

pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)
        .await
        .context(format!("Failed to read artifact: {:?}", path))?;
    serde_json::from_str(&data).context(format!("Malformed artifact: {:?}", path))
}
