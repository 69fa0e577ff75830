use std::io;

use super::define::Amf0Marker;

/// Errors that can occur when decoding AMF0 data.
#[derive(Debug, thiserror::Error)]
pub enum Amf0ReadError {
    /// The marker byte is not an AMF0 marker.
    #[error("unknown marker: {0}")]
    UnknownMarker(u8),
    /// The marker is valid AMF0 but this decoder does not handle it.
    #[error("unsupported type: {0:?}")]
    UnsupportedType(Amf0Marker),
    /// A string was not valid UTF-8.
    #[error("string parse error: {0}")]
    StringParseError(#[from] std::str::Utf8Error),
    /// The input ended early.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// `decode_with_type` found a different marker.
    #[error("wrong type: expected {expected:?}, got {got:?}")]
    WrongType {
        /// The marker that was asked for.
        expected: Amf0Marker,
        /// The marker that was found.
        got: Amf0Marker,
    },
}

/// Errors that can occur when encoding AMF0 data.
#[derive(Debug, thiserror::Error)]
pub enum Amf0WriteError {
    /// A string or key exceeded `u16::MAX` bytes.
    #[error("normal string too long")]
    NormalStringTooLong,
    /// An ECMA array had more than `u32::MAX` entries.
    #[error("too many properties")]
    TooManyProperties,
    /// The writer failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
