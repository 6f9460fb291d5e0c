pub mod process;
pub mod stats;

pub use process::TargetConfig;
pub use stats::{AggregateMemory, AggregateResult, MeasurementResult, MemorySample};
