// Data processing pipeline: ingestion, processing, and orchestration

pub mod ingestion;
pub mod orchestrator;
pub mod processing;

pub use orchestrator::{Analysis, Pipeline, PipelineConfig, PipelineResult};
