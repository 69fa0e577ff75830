use std::fmt::Display;
use std::io;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;

/// Size of the FLV file header, also the value of its data-offset field.
pub const FLV_HEADER_SIZE: usize = 9;

const FLV_SIGNATURE: u32 = 0x464C56; // "FLV"
const FLAG_AUDIO: u8 = 0b0000_0100;
const FLAG_VIDEO: u8 = 0b0000_0001;

// Struct representing the FLV header, 9 bytes in total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlvHeader {
    // The version of the FLV file format, always 0x01 when we write it
    pub version: u8,
    pub has_audio: bool,
    pub has_video: bool,
}

impl Display for FlvHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FLV Header: version={}, audio={}, video={}",
            self.version, self.has_audio, self.has_video
        )
    }
}

impl FlvHeader {
    pub fn new(has_audio: bool, has_video: bool) -> Self {
        Self {
            version: 1,
            has_audio,
            has_video,
        }
    }

    /// Header of a live capture stream: video track only.
    pub fn video_only() -> Self {
        Self::new(false, true)
    }

    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.has_audio {
            flags |= FLAG_AUDIO;
        }
        if self.has_video {
            flags |= FLAG_VIDEO;
        }
        flags
    }

    /// Serializes the 9 header bytes. The leading previous-tag-size of the
    /// first tag is not part of the header; the tag muxer writes it.
    pub fn mux(&self) -> io::Result<Bytes> {
        let mut buffer = Vec::with_capacity(FLV_HEADER_SIZE);
        buffer.write_u24::<BigEndian>(FLV_SIGNATURE)?;
        buffer.write_u8(self.version)?;
        buffer.write_u8(self.flags())?;
        buffer.write_u32::<BigEndian>(FLV_HEADER_SIZE as u32)?;
        Ok(Bytes::from(buffer))
    }

    /// Parses the FLV header from a byte stream, leaving the reader just past it.
    ///
    /// On a signature mismatch the reader is moved back to where it started.
    pub fn parse(reader: &mut io::Cursor<Bytes>) -> io::Result<Self> {
        let start = reader.position();

        let signature = reader.read_u24::<BigEndian>()?;
        if signature != FLV_SIGNATURE {
            reader.set_position(start);
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid FLV signature",
            ));
        }

        let version = reader.read_u8()?;
        let flags = reader.read_u8()?;
        let data_offset = reader.read_u32::<BigEndian>()? as usize;

        if data_offset != FLV_HEADER_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid FLV header size: {data_offset}"),
            ));
        }

        Ok(FlvHeader {
            version,
            has_audio: flags & FLAG_AUDIO != 0,
            has_video: flags & FLAG_VIDEO != 0,
        })
    }
}
