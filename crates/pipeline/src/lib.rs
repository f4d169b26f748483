pub mod artifacts;
pub mod config;
pub mod orchestrator;
pub mod stages;

pub use config::{ChatConfig, EmbeddingConfig, PipelineConfig, VectorStoreConfig};
pub use orchestrator::Pipeline;
pub use stages::{Stage, StageSet};
