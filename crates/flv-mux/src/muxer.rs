//! # HTTP-FLV muxer
//!
//! The synchronous core of a session. It turns session starts, format
//! descriptions and access units into the chunks of an FLV byte stream:
//!
//! 1. file header (9 bytes, no leading previous-tag-size)
//! 2. `onMetaData` script tag
//! 3. AVC sequence-header tag
//! 4. AVC data tags
//!
//! Data tags are held back until a sequence header went out in the current
//! session. Samples whose decode time runs backwards are dropped, never
//! re-stamped, so the output timeline stays monotonic.

use std::fmt;

use bytes::Bytes;

use crate::error::MuxError;
use crate::header::FlvHeader;
use crate::script::{Amf0MetadataSerializer, MetadataSerializer, ON_METADATA, StreamMetadata};
use crate::source::{AccessUnit, FormatDescription};
use crate::tag::{FlvTagType, TagMuxer};
use crate::timestamp::{MediaTime, TimestampError, TimestampNormalizer};
use crate::video::{VideoFrameType, avc_nalu_body, avc_sequence_header_body};

/// Why an access unit produced no tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DropReason {
    /// No sequence header was emitted in this session yet.
    NoSequenceHeader,
    /// The decode time is earlier than the last accepted one.
    TimestampRegression { delta_ms: f64 },
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::NoSequenceHeader => write!(f, "no sequence header yet"),
            DropReason::TimestampRegression { delta_ms } => {
                write!(f, "decode time regressed by {:.3}ms", -delta_ms)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MuxOutcome {
    /// A framed data tag, ready to send.
    Emitted(Bytes),
    Dropped(DropReason),
}

pub struct HttpFlvMuxer<S = Amf0MetadataSerializer> {
    tags: TagMuxer,
    timestamps: TimestampNormalizer,
    sequence_header_sent: bool,
    serializer: S,
}

impl HttpFlvMuxer {
    pub fn new() -> Self {
        Self::with_serializer(Amf0MetadataSerializer)
    }
}

impl Default for HttpFlvMuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: MetadataSerializer> HttpFlvMuxer<S> {
    pub fn with_serializer(serializer: S) -> Self {
        Self {
            tags: TagMuxer::new(),
            timestamps: TimestampNormalizer::new(),
            sequence_header_sent: false,
            serializer,
        }
    }

    /// Resets all session state and returns the file header followed by the
    /// metadata tag, as two separate chunks.
    pub fn begin_session(&mut self, metadata: &StreamMetadata) -> Result<Vec<Bytes>, MuxError> {
        self.reset();

        let header = FlvHeader::video_only().mux()?;
        let body = self
            .serializer
            .serialize(ON_METADATA, &metadata.properties())?;
        let script_tag = self.tags.mux(FlvTagType::ScriptData, &body, 0)?;

        Ok(vec![header, script_tag])
    }

    /// Emits a sequence-header tag for the description's configuration
    /// record. Without a record nothing is emitted and the gate keeps its
    /// current state.
    ///
    /// The tag is stamped with the last emitted data timestamp, so a format
    /// change mid-stream never moves the timeline backwards.
    pub fn on_format_description(
        &mut self,
        description: Option<&FormatDescription>,
    ) -> Result<Option<Bytes>, MuxError> {
        let Some(record) = description.and_then(|d| d.configuration_record.as_ref()) else {
            return Ok(None);
        };

        let body = avc_sequence_header_body(record)?;
        let tag = self
            .tags
            .mux(FlvTagType::Video, &body, self.timestamps.last_timestamp_ms())?;
        self.sequence_header_sent = true;

        Ok(Some(tag))
    }

    pub fn on_access_unit(&mut self, unit: &AccessUnit) -> Result<MuxOutcome, MuxError> {
        if !self.sequence_header_sent {
            return Ok(MuxOutcome::Dropped(DropReason::NoSequenceHeader));
        }

        let timestamp = match self
            .timestamps
            .compute(unit.presentation_time, unit.decode_time)
        {
            Ok(timestamp) => timestamp,
            Err(TimestampError::Regression { delta_ms }) => {
                return Ok(MuxOutcome::Dropped(DropReason::TimestampRegression {
                    delta_ms,
                }));
            }
        };

        let body = avc_nalu_body(
            VideoFrameType::from_keyframe(unit.is_keyframe),
            timestamp.composition_time_ms,
            &unit.payload,
        )?;
        let tag = self
            .tags
            .mux(FlvTagType::Video, &body, timestamp.timestamp_ms)?;
        self.timestamps.commit(&timestamp);

        Ok(MuxOutcome::Emitted(tag))
    }

    pub fn reset(&mut self) {
        self.tags.reset();
        self.timestamps.reset();
        self.sequence_header_sent = false;
    }

    pub fn previous_tag_size(&self) -> u32 {
        self.tags.previous_tag_size()
    }

    pub fn sequence_header_sent(&self) -> bool {
        self.sequence_header_sent
    }

    pub fn last_decode_time(&self) -> Option<MediaTime> {
        self.timestamps.last_decode_time()
    }

    pub fn last_timestamp_ms(&self) -> u32 {
        self.timestamps.last_timestamp_ms()
    }
}

impl<S> fmt::Debug for HttpFlvMuxer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpFlvMuxer")
            .field("tags", &self.tags)
            .field("timestamps", &self.timestamps)
            .field("sequence_header_sent", &self.sequence_header_sent)
            .finish_non_exhaustive()
    }
}
