use thiserror::Error;

use crate::annotator::RunPhase;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Duplicate geometry key: {0}")]
    DuplicateKey(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown geometry key: {0}")]
    UnknownKey(String),

    #[error("Pair evaluation failed: {0}")]
    PairEvaluation(String),

    #[error("Wire encoding failed: {0}")]
    Wire(String),

    #[cfg(feature = "parallel")]
    #[error("Worker pool could not be started: {0}")]
    WorkerPoolInit(#[from] rayon::ThreadPoolBuildError),

    #[error("Run cancelled during {0}")]
    Cancelled(RunPhase),
}

pub type Result<T> = std::result::Result<T, EngineError>;
