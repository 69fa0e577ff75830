use std::io;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;

use crate::error::MuxError;

/// Tag header: type(1) size(3) timestamp(3) timestamp extended(1) stream id(3).
pub const TAG_HEADER_SIZE: usize = 11;
/// Width of the previous-tag-size field that precedes every tag.
pub const PREVIOUS_TAG_SIZE_LEN: usize = 4;
/// Largest body the 24-bit size field can describe.
pub const MAX_TAG_DATA_SIZE: usize = 0xFF_FFFF;

/// FLV Tag Type
///
/// Defined by:
/// - video_file_format_spec_v10.pdf (Chapter 1 - The FLV File Format - FLV tags)
/// - video_file_format_spec_v10_1.pdf (Annex E.4.1 - FLV Tag)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlvTagType {
    Audio,
    Video,
    ScriptData,
    Unknown(u8),
}

impl From<u8> for FlvTagType {
    fn from(value: u8) -> Self {
        match value {
            8 => FlvTagType::Audio,
            9 => FlvTagType::Video,
            18 => FlvTagType::ScriptData,
            _ => FlvTagType::Unknown(value),
        }
    }
}

impl From<FlvTagType> for u8 {
    fn from(value: FlvTagType) -> Self {
        match value {
            FlvTagType::Audio => 8,
            FlvTagType::Video => 9,
            FlvTagType::ScriptData => 18,
            FlvTagType::Unknown(value) => value,
        }
    }
}

/// Frames one tag: the 4-byte `previous_tag_size`, the 11-byte tag header
/// and `body`, all big-endian.
///
/// The timestamp is split into its low 24 bits and the extended high byte.
/// The stream id is always zero.
pub fn make_tag(
    tag_type: FlvTagType,
    body: &[u8],
    timestamp_ms: u32,
    previous_tag_size: u32,
) -> Result<Bytes, MuxError> {
    if body.len() > MAX_TAG_DATA_SIZE {
        return Err(MuxError::TagTooLarge(body.len()));
    }

    let mut buffer = Vec::with_capacity(PREVIOUS_TAG_SIZE_LEN + TAG_HEADER_SIZE + body.len());
    buffer.write_u32::<BigEndian>(previous_tag_size)?;
    buffer.write_u8(tag_type.into())?;
    buffer.write_u24::<BigEndian>(body.len() as u32)?;
    buffer.write_u24::<BigEndian>(timestamp_ms & 0xFF_FFFF)?;
    buffer.write_u8(((timestamp_ms >> 24) & 0xFF) as u8)?;
    buffer.write_u24::<BigEndian>(0)?;
    buffer.extend_from_slice(body);

    Ok(Bytes::from(buffer))
}

/// Frames tags back to back, remembering how long the last one was.
#[derive(Debug, Default)]
pub struct TagMuxer {
    previous_tag_size: u32,
}

impl TagMuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte length (header + body) of the last tag produced, 0 before the first.
    pub fn previous_tag_size(&self) -> u32 {
        self.previous_tag_size
    }

    pub fn mux(
        &mut self,
        tag_type: FlvTagType,
        body: &[u8],
        timestamp_ms: u32,
    ) -> Result<Bytes, MuxError> {
        let tag = make_tag(tag_type, body, timestamp_ms, self.previous_tag_size)?;
        self.previous_tag_size = (TAG_HEADER_SIZE + body.len()) as u32;
        Ok(tag)
    }

    pub fn reset(&mut self) {
        self.previous_tag_size = 0;
    }
}

/// A framed tag read back from a byte stream.
#[derive(Debug, Clone, PartialEq)]
pub struct FlvTag {
    pub tag_type: FlvTagType,
    /// A timestamp in milliseconds
    pub timestamp_ms: u32,
    pub stream_id: u32,
    pub data: Bytes,
}

impl FlvTag {
    /// Demux a tag (header and body, without the previous-tag-size field).
    ///
    /// The reader will be advanced to the end of the tag. The body is sliced
    /// out of the underlying [`Bytes`] without copying.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> io::Result<Self> {
        let tag_type = FlvTagType::from(reader.read_u8()?);
        let data_size = reader.read_u24::<BigEndian>()? as usize;
        // 24 bits plus an extended byte holding bits 24..32
        let timestamp_ms = reader.read_u24::<BigEndian>()? | ((reader.read_u8()? as u32) << 24);
        let stream_id = reader.read_u24::<BigEndian>()?;

        let start = reader.position() as usize;
        let end = start + data_size;
        if end > reader.get_ref().len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("tag body truncated: want {data_size} bytes"),
            ));
        }
        let data = reader.get_ref().slice(start..end);
        reader.set_position(end as u64);

        Ok(FlvTag {
            tag_type,
            timestamp_ms,
            stream_id,
            data,
        })
    }

    /// Size of the tag as counted by the following previous-tag-size field.
    pub fn size(&self) -> usize {
        TAG_HEADER_SIZE + self.data.len()
    }
}

pub fn read_previous_tag_size(reader: &mut io::Cursor<Bytes>) -> io::Result<u32> {
    reader.read_u32::<BigEndian>()
}
