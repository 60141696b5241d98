//! Error taxonomy for setup, per-block I/O, and the top-level receiver loop.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to open input file {path}: {source}")]
    OpenFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to launch hardware source command {command}: {source}")]
    SpawnHardware {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Error)]
pub enum BlockError {
    #[error("I/O error reading a block: {0}")]
    Io(#[from] std::io::Error),
    #[error("short read: expected {expected} bytes, got {got}")]
    WrongLength { expected: usize, got: usize },
    #[error("end of input")]
    Eof,
}

#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("setup failed: {0}")]
    Setup(#[from] SetupError),
    #[error("block source failed: {0}")]
    Block(#[from] BlockError),
    #[error("worker thread panicked")]
    WorkerPanicked,
}
