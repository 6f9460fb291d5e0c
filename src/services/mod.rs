pub mod launcher;
pub mod memory_reader;
pub mod orchestrator;
pub mod readiness;
pub mod termination;

pub use orchestrator::{SampleOrchestrator, Sampler};
