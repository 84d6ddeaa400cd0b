//! Pipeline orchestration

mod orchestrator;

pub use orchestrator::PipelineOrchestrator;
