pub mod metrics;

pub use metrics::{EvalMetrics, evaluate, precision_at_k, recall_at_k};
