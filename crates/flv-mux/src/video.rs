//! AVC video tag bodies.
//!
//! Every video tag body starts with a byte packing the frame type (high
//! nibble) and the codec id (low nibble). AVC bodies follow it with the AVC
//! packet type and a signed 24-bit composition time:
//!
//! ```text
//! frame_type<<4 | codec_id | packet_type | composition_time (i24) | data
//! ```
//!
//! Sequence headers carry the AVCDecoderConfigurationRecord as `data` with a
//! zero composition time. NALU packets carry one access unit in AVCC form.

use std::fmt;
use std::io;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;

/// Smallest and largest composition time the signed 24-bit field can hold.
pub const MIN_COMPOSITION_TIME: i32 = -0x80_0000;
pub const MAX_COMPOSITION_TIME: i32 = 0x7F_FFFF;

/// Length of the fixed AVC prefix: flags, packet type, composition time.
pub const AVC_BODY_PREFIX_LEN: usize = 5;

/// FLV Video Frame Type
///
/// Defined by:
/// - video_file_format_spec_v10.pdf (Chapter 1 - The FLV File Format - Video tags)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VideoFrameType {
    KeyFrame = 1,
    InterFrame = 2,
    DisposableInterFrame = 3,
    GeneratedKeyFrame = 4,
    VideoInfoFrame = 5,
}

impl TryFrom<u8> for VideoFrameType {
    type Error = io::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::KeyFrame),
            2 => Ok(Self::InterFrame),
            3 => Ok(Self::DisposableInterFrame),
            4 => Ok(Self::GeneratedKeyFrame),
            5 => Ok(Self::VideoInfoFrame),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid video frame type: {value}"),
            )),
        }
    }
}

impl VideoFrameType {
    pub fn from_keyframe(is_keyframe: bool) -> Self {
        if is_keyframe {
            Self::KeyFrame
        } else {
            Self::InterFrame
        }
    }
}

/// FLV Video Codec ID. Only AVC is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VideoCodecId {
    SorensonH263 = 2,
    ScreenVideo = 3,
    On2VP6 = 4,
    On2VP6Alpha = 5,
    ScreenVideoV2 = 6,
    Avc = 7,
}

impl TryFrom<u8> for VideoCodecId {
    type Error = io::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Self::SorensonH263),
            3 => Ok(Self::ScreenVideo),
            4 => Ok(Self::On2VP6),
            5 => Ok(Self::On2VP6Alpha),
            6 => Ok(Self::ScreenVideoV2),
            7 => Ok(Self::Avc),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported video codec id: {value}"),
            )),
        }
    }
}

/// FLV AVC Packet Type, chapter 1 - AVCVIDEODATA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AvcPacketType {
    SequenceHeader = 0,
    Nalu = 1,
    EndOfSequence = 2,
}

impl TryFrom<u8> for AvcPacketType {
    type Error = io::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::SequenceHeader),
            1 => Ok(Self::Nalu),
            2 => Ok(Self::EndOfSequence),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid AVC packet type: {value}"),
            )),
        }
    }
}

fn write_avc_body(
    frame_type: VideoFrameType,
    packet_type: AvcPacketType,
    composition_time_ms: i32,
    data: &[u8],
) -> io::Result<Bytes> {
    let composition_time = composition_time_ms.clamp(MIN_COMPOSITION_TIME, MAX_COMPOSITION_TIME);

    let mut buffer = Vec::with_capacity(AVC_BODY_PREFIX_LEN + data.len());
    buffer.write_u8(((frame_type as u8) << 4) | VideoCodecId::Avc as u8)?;
    buffer.write_u8(packet_type as u8)?;
    // two's complement, masked to the 24-bit field
    buffer.write_u24::<BigEndian>((composition_time as u32) & 0xFF_FFFF)?;
    buffer.extend_from_slice(data);
    Ok(Bytes::from(buffer))
}

/// Body of an AVC sequence-header tag: `17 00 00 00 00` + record.
pub fn avc_sequence_header_body(configuration_record: &[u8]) -> io::Result<Bytes> {
    write_avc_body(
        VideoFrameType::KeyFrame,
        AvcPacketType::SequenceHeader,
        0,
        configuration_record,
    )
}

/// Body of an AVC data tag. The composition time is clamped to the i24 range.
pub fn avc_nalu_body(
    frame_type: VideoFrameType,
    composition_time_ms: i32,
    payload: &[u8],
) -> io::Result<Bytes> {
    write_avc_body(frame_type, AvcPacketType::Nalu, composition_time_ms, payload)
}

/// A parsed AVC video tag body.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoTagBody {
    pub frame_type: VideoFrameType,
    pub codec_id: VideoCodecId,
    pub packet_type: AvcPacketType,
    pub composition_time_ms: i32,
    pub data: Bytes,
}

impl VideoTagBody {
    /// Demux an AVC video tag body. The reader is consumed entirely.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> io::Result<Self> {
        let flags = reader.read_u8()?;
        let frame_type = VideoFrameType::try_from(flags >> 4)?;
        let codec_id = VideoCodecId::try_from(flags & 0x0F)?;
        if codec_id != VideoCodecId::Avc {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected AVC video, got {codec_id:?}"),
            ));
        }
        let packet_type = AvcPacketType::try_from(reader.read_u8()?)?;
        let composition_time_ms = reader.read_i24::<BigEndian>()?;

        let position = (reader.position() as usize).min(reader.get_ref().len());
        let data = reader.get_ref().slice(position..);
        reader.set_position(reader.get_ref().len() as u64);

        Ok(Self {
            frame_type,
            codec_id,
            packet_type,
            composition_time_ms,
            data,
        })
    }

    pub fn is_sequence_header(&self) -> bool {
        self.packet_type == AvcPacketType::SequenceHeader
    }

    pub fn is_keyframe(&self) -> bool {
        self.frame_type == VideoFrameType::KeyFrame
    }
}

impl fmt::Display for VideoTagBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} {:?} [CTS: {}ms] ({} bytes)",
            self.frame_type,
            self.packet_type,
            self.composition_time_ms,
            self.data.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_sequence_header_body() {
        let body = avc_sequence_header_body(&[0xAA, 0xBB]).unwrap();
        assert_eq!(body.as_ref(), &[0x17, 0x00, 0x00, 0x00, 0x00, 0xAA, 0xBB]);
    }

    #[test]
    fn test_nalu_bodies() {
        let key = avc_nalu_body(VideoFrameType::KeyFrame, 0, &[0xCC]).unwrap();
        assert_eq!(key.as_ref(), &[0x17, 0x01, 0x00, 0x00, 0x00, 0xCC]);

        let inter = avc_nalu_body(VideoFrameType::InterFrame, 80, &[0xDD]).unwrap();
        assert_eq!(inter.as_ref(), &[0x27, 0x01, 0x00, 0x00, 0x50, 0xDD]);
    }

    #[test]
    fn test_negative_composition_time() {
        let body = avc_nalu_body(VideoFrameType::InterFrame, -40, &[]).unwrap();
        assert_eq!(&body[2..5], &[0xFF, 0xFF, 0xD8]);

        let parsed = VideoTagBody::demux(&mut Cursor::new(body)).unwrap();
        assert_eq!(parsed.composition_time_ms, -40);
    }

    #[test]
    fn test_composition_time_is_clamped() {
        let body = avc_nalu_body(VideoFrameType::InterFrame, i32::MAX, &[]).unwrap();
        assert_eq!(&body[2..5], &[0x7F, 0xFF, 0xFF]);

        let body = avc_nalu_body(VideoFrameType::InterFrame, i32::MIN, &[]).unwrap();
        assert_eq!(&body[2..5], &[0x80, 0x00, 0x00]);
    }

    #[test]
    fn test_demux_roundtrip() {
        let body = avc_nalu_body(VideoFrameType::KeyFrame, 33, &[0, 0, 0, 1, 0x65]).unwrap();
        let parsed = VideoTagBody::demux(&mut Cursor::new(body)).unwrap();

        assert!(parsed.is_keyframe());
        assert!(!parsed.is_sequence_header());
        assert_eq!(parsed.codec_id, VideoCodecId::Avc);
        assert_eq!(parsed.composition_time_ms, 33);
        assert_eq!(parsed.data.as_ref(), &[0, 0, 0, 1, 0x65]);
    }

    #[test]
    fn test_demux_rejects_other_codecs() {
        let mut reader = Cursor::new(Bytes::from_static(&[0x12, 0x01, 0x00, 0x00, 0x00]));
        let err = VideoTagBody::demux(&mut reader).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
