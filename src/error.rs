use std::io;
use std::time::Duration;
use thiserror::Error;

/// 一次测量运行中可能出现的致命错误
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Server startup timeout after {}ms", .elapsed.as_millis())]
    StartupTimeout { elapsed: Duration },

    #[error("Server closed its notification channel before becoming ready ({}ms)", .elapsed.as_millis())]
    NotReady { elapsed: Duration },

    #[error("Failed to get memory usage of PID {pid}: {reason}")]
    MemoryRead { pid: u32, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, BenchError>;
