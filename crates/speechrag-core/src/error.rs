use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Document not found at {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("Document produced no chunks")]
    EmptyCorpus,

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error("Index holds no chunks")]
    EmptyIndex,

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Service not ready: {0}")]
    NotReady(String),

    #[error("{stage} failed: {source}")]
    Capability {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Index storage failed: {0}")]
    Storage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn capability(stage: &'static str, source: anyhow::Error) -> Self {
        Self::Capability { stage, source }
    }

    /// True for errors a caller can resolve by initializing and retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotReady(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
