use flv_mux::{EncoderError, MuxError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mux error: {0}")]
    Mux(#[from] MuxError),

    #[error("Encoder error: {0}")]
    Encoder(#[from] EncoderError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Verification failed: {0}")]
    Verify(String),

    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
