//! The encoder side of a session.
//!
//! A [`VideoSource`] is started with a [`SourceOutput`] and posts everything
//! it produces through it. The output only enqueues; all muxing happens on
//! the session task, so a source may call it from any thread.

use std::fmt;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::error::MuxError;
use crate::session::Command;
use crate::timestamp::MediaTime;

/// One encoded video sample.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessUnit {
    /// NAL units with 4-byte big-endian length prefixes.
    pub payload: Bytes,
    pub is_keyframe: bool,
    pub presentation_time: MediaTime,
    /// `None` when the encoder has no separate decode time for the sample.
    pub decode_time: Option<MediaTime>,
}

/// What the encoder reports when its output format is set or changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescription {
    /// Serialized AVCDecoderConfigurationRecord, if one could be extracted.
    pub configuration_record: Option<Bytes>,
    pub width: u32,
    pub height: u32,
}

impl FormatDescription {
    pub fn new(configuration_record: Option<Bytes>, width: u32, height: u32) -> Self {
        Self {
            configuration_record,
            width,
            height,
        }
    }
}

/// Encoder settings, used for the metadata tag.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    /// Bits per second.
    pub bitrate: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            frame_rate: 30.0,
            bitrate: 2_000_000,
        }
    }
}

impl fmt::Display for VideoSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} @ {}fps, {}bps",
            self.width, self.height, self.frame_rate, self.bitrate
        )
    }
}

/// Failures reported by the encoder. They are forwarded to the listener
/// as-is; the session does not retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncoderError {
    #[error("Failed to create encoder session (status {status})")]
    FailedToCreate { status: i32 },
    #[error("Failed to prepare encoder session (status {status})")]
    FailedToPrepare { status: i32 },
    #[error("Failed to encode frame (status {status})")]
    FailedToEncodeFrame { status: i32 },
    #[error("Failed to set encoder option {option} (status {status})")]
    FailedToSetOption { option: String, status: i32 },
    #[error("Source error: {0}")]
    Source(String),
}

/// Produces encoded video for a session.
///
/// The session calls these from its own task; implementations must not
/// block in them. Long-running work belongs on a separate task that posts
/// through the [`SourceOutput`].
pub trait VideoSource: Send + 'static {
    fn settings(&self) -> VideoSettings;

    /// The format currently configured, if any. Fed through the sequence
    /// header path right after a session starts.
    fn format_description(&self) -> Option<FormatDescription>;

    fn start_encoding(&mut self, output: SourceOutput);

    fn stop_encoding(&mut self);
}

/// Callback handle handed to a source on start.
///
/// Every handle is bound to the start that created it. Once the session is
/// stopped or restarted, whatever the handle still posts is discarded.
#[derive(Debug, Clone)]
pub struct SourceOutput {
    epoch: u64,
    commands: mpsc::UnboundedSender<Command>,
}

impl SourceOutput {
    pub(crate) fn new(epoch: u64, commands: mpsc::UnboundedSender<Command>) -> Self {
        Self { epoch, commands }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// True once the session task has gone away.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    pub fn on_format_description(
        &self,
        description: Option<FormatDescription>,
    ) -> Result<(), MuxError> {
        self.send(Command::FormatDescription {
            epoch: self.epoch,
            description,
        })
    }

    pub fn on_access_unit(&self, unit: AccessUnit) -> Result<(), MuxError> {
        self.send(Command::AccessUnit {
            epoch: self.epoch,
            unit,
        })
    }

    pub fn on_encoder_error(&self, error: EncoderError) -> Result<(), MuxError> {
        self.send(Command::EncoderError {
            epoch: self.epoch,
            error,
        })
    }

    fn send(&self, command: Command) -> Result<(), MuxError> {
        self.commands
            .send(command)
            .map_err(|_| MuxError::SessionClosed)
    }
}
