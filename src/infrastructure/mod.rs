//! Infrastructure layer - LLM agents, retrieval sources and the pipeline orchestrator

pub mod agents;
pub mod llm;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod retrieval;
