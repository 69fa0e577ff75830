//! Reads a written FLV stream back and checks its framing.

use std::fmt;
use std::io::Cursor;
use std::path::Path;

use bytes::Bytes;
use flv_mux::header::FlvHeader;
use flv_mux::script::ScriptData;
use flv_mux::tag::{FlvTag, FlvTagType, read_previous_tag_size};
use flv_mux::video::VideoTagBody;
use tracing::debug;

use crate::error::AppError;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub script_tags: usize,
    pub sequence_headers: usize,
    pub video_frames: usize,
    pub keyframes: usize,
    pub last_timestamp_ms: u32,
    pub bytes: usize,
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes: {} script tag(s), {} sequence header(s), {} frame(s) ({} keyframes), last timestamp {}ms",
            self.bytes,
            self.script_tags,
            self.sequence_headers,
            self.video_frames,
            self.keyframes,
            self.last_timestamp_ms
        )
    }
}

pub async fn verify_file(path: &Path) -> Result<VerifyReport, AppError> {
    let data = tokio::fs::read(path).await?;
    verify_bytes(Bytes::from(data))
}

/// Walks every tag, checking previous-tag sizes, timestamp order and that
/// no frame comes before a sequence header.
pub fn verify_bytes(data: Bytes) -> Result<VerifyReport, AppError> {
    let mut report = VerifyReport {
        bytes: data.len(),
        ..Default::default()
    };
    let total = data.len() as u64;
    let mut reader = Cursor::new(data);

    let header = FlvHeader::parse(&mut reader).map_err(|e| verify_error(0, e))?;
    debug!("{header}");

    let mut expected_previous = 0u32;
    let mut index = 0usize;
    while reader.position() < total {
        let previous = read_previous_tag_size(&mut reader).map_err(|e| verify_error(index, e))?;
        if previous != expected_previous {
            return Err(verify_error(
                index,
                format!("previous tag size {previous}, expected {expected_previous}"),
            ));
        }
        // a stream may end with the trailing previous-tag-size alone
        if reader.position() == total {
            break;
        }

        let tag = FlvTag::demux(&mut reader).map_err(|e| verify_error(index, e))?;
        if tag.timestamp_ms < report.last_timestamp_ms {
            return Err(verify_error(
                index,
                format!(
                    "timestamp {}ms after {}ms",
                    tag.timestamp_ms, report.last_timestamp_ms
                ),
            ));
        }

        match tag.tag_type {
            FlvTagType::ScriptData => {
                let script = ScriptData::demux(&mut Cursor::new(tag.data.clone()))
                    .map_err(|e| verify_error(index, e))?;
                debug!("Script tag: {script}");
                report.script_tags += 1;
            }
            FlvTagType::Video => {
                let body = VideoTagBody::demux(&mut Cursor::new(tag.data.clone()))
                    .map_err(|e| verify_error(index, e))?;
                if body.is_sequence_header() {
                    report.sequence_headers += 1;
                } else {
                    if report.sequence_headers == 0 {
                        return Err(verify_error(index, "frame before any sequence header"));
                    }
                    report.video_frames += 1;
                    if body.is_keyframe() {
                        report.keyframes += 1;
                    }
                }
            }
            other => {
                return Err(verify_error(index, format!("unexpected tag type {other:?}")));
            }
        }

        report.last_timestamp_ms = tag.timestamp_ms;
        expected_previous = tag.size() as u32;
        index += 1;
    }

    Ok(report)
}

fn verify_error(index: usize, reason: impl fmt::Display) -> AppError {
    AppError::Verify(format!("tag {index}: {reason}"))
}
