use anyhow::Result;

/// Pipeline stages in execution order. The derived ordering is the stage
/// sequence, so "is this needed" reduces to an `>=` check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Chunk,
    Vectorize,
    Questions,
    Retrievers,
    Evaluate,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Chunk,
        Stage::Vectorize,
        Stage::Questions,
        Stage::Retrievers,
        Stage::Evaluate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Chunk => "chunk",
            Stage::Vectorize => "vectorize",
            Stage::Questions => "questions",
            Stage::Retrievers => "retrievers",
            Stage::Evaluate => "evaluate",
        }
    }
}

/// The subset of stages a run was asked to execute.
#[derive(Debug, Clone)]
pub struct StageSet(Vec<Stage>);

impl StageSet {
    pub fn all() -> Self {
        Self(Stage::ALL.to_vec())
    }

    /// Parse a comma-separated stage list, e.g. "chunk,vectorize".
    pub fn parse(spec: &str) -> Result<Self> {
        let mut stages = Vec::new();
        for name in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let stage = Stage::ALL
                .iter()
                .find(|s| s.label() == name)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("unknown pipeline stage: {}", name))?;
            if !stages.contains(&stage) {
                stages.push(stage);
            }
        }
        if stages.is_empty() {
            anyhow::bail!("no pipeline stages requested");
        }
        Ok(Self(stages))
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.0.contains(&stage)
    }

    /// A stage must run (or load its checkpoint) when it or any later
    /// stage was requested.
    pub fn needs(&self, stage: Stage) -> bool {
        self.0.iter().any(|s| *s >= stage)
    }
}
