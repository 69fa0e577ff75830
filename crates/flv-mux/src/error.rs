use amf0::{Amf0ReadError, Amf0WriteError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MuxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("AMF0 encoding failed: {0}")]
    Amf0Write(#[from] Amf0WriteError),
    #[error("AMF0 decoding failed: {0}")]
    Amf0Read(#[from] Amf0ReadError),
    #[error("Tag body too large: {0} bytes")]
    TagTooLarge(usize),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Session task is no longer running")]
    SessionClosed,
}
