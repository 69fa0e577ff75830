//! # Script metadata
//!
//! The `onMetaData` script tag that opens every session. Its body is an AMF0
//! string naming the handler followed by an ECMA array of stream properties:
//!
//! ```text
//! 02 00 0A "onMetaData" 08 <count u32> { key value }* 00 00 09
//! ```
//!
//! Serialization sits behind [`MetadataSerializer`] so that hosts can swap
//! the encoder; [`Amf0MetadataSerializer`] is the one used by default.

use std::borrow::Cow;
use std::{fmt, io};

use amf0::{Amf0Decoder, Amf0Encoder, Amf0Marker, Amf0Value};
use bytes::Bytes;
use tracing::warn;

use crate::error::MuxError;
use crate::source::VideoSettings;
use crate::video::VideoCodecId;

pub const ON_METADATA: &str = "onMetaData";

/// Properties written into the metadata tag.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMetadata {
    pub width: f64,
    pub height: f64,
    pub frame_rate: f64,
    /// Kilobits per second.
    pub video_data_rate_kbps: f64,
    pub video_codec_id: f64,
    /// Always 0 for a live stream.
    pub duration: f64,
}

impl StreamMetadata {
    /// Ordered AMF0 properties: width, height, framerate, videodatarate,
    /// videocodecid, duration.
    pub fn properties(&self) -> Vec<(Cow<'static, str>, Amf0Value<'static>)> {
        vec![
            ("width".into(), Amf0Value::Number(self.width)),
            ("height".into(), Amf0Value::Number(self.height)),
            ("framerate".into(), Amf0Value::Number(self.frame_rate)),
            (
                "videodatarate".into(),
                Amf0Value::Number(self.video_data_rate_kbps),
            ),
            ("videocodecid".into(), Amf0Value::Number(self.video_codec_id)),
            ("duration".into(), Amf0Value::Number(self.duration)),
        ]
    }
}

impl From<&VideoSettings> for StreamMetadata {
    fn from(settings: &VideoSettings) -> Self {
        Self {
            width: settings.width as f64,
            height: settings.height as f64,
            frame_rate: settings.frame_rate,
            video_data_rate_kbps: (settings.bitrate / 1000) as f64,
            video_codec_id: VideoCodecId::Avc as u8 as f64,
            duration: 0.0,
        }
    }
}

impl fmt::Display for StreamMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} @ {}fps, {}kbps",
            self.width, self.height, self.frame_rate, self.video_data_rate_kbps
        )
    }
}

/// Turns a handler name and ordered properties into a script tag body.
pub trait MetadataSerializer: Send + Sync {
    fn serialize(
        &self,
        name: &str,
        properties: &[(Cow<'_, str>, Amf0Value<'_>)],
    ) -> Result<Bytes, MuxError>;
}

/// Writes the name as an AMF0 string and the properties as an ECMA array.
#[derive(Debug, Default, Clone, Copy)]
pub struct Amf0MetadataSerializer;

impl MetadataSerializer for Amf0MetadataSerializer {
    fn serialize(
        &self,
        name: &str,
        properties: &[(Cow<'_, str>, Amf0Value<'_>)],
    ) -> Result<Bytes, MuxError> {
        let mut buffer = Vec::new();
        Amf0Encoder::encode_string(&mut buffer, name)?;
        Amf0Encoder::encode_ecma_array(&mut buffer, properties)?;
        Ok(Bytes::from(buffer))
    }
}

/// A decoded script tag body.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptData {
    /// The handler name, `onMetaData` for the tags this crate writes
    pub name: String,
    /// Values following the name
    pub data: Vec<Amf0Value<'static>>,
}

impl ScriptData {
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> io::Result<Self> {
        let position = (reader.position() as usize).min(reader.get_ref().len());
        let buf = reader.get_ref().slice(position..);
        reader.set_position(reader.get_ref().len() as u64);

        let mut amf0_reader = Amf0Decoder::new(&buf);

        let name = match amf0_reader.decode_with_type(Amf0Marker::String) {
            Ok(Amf0Value::String(name)) => name.into_owned(),
            Ok(other) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Invalid script data name: {other:?}"),
                ));
            }
            Err(e) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Invalid script data name: {e}"),
                ));
            }
        };

        let mut data = Vec::new();
        for value in amf0_reader {
            match value {
                Ok(value) => data.push(value.into_owned()),
                Err(e) if data.is_empty() => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Failed to parse script data: {e}"),
                    ));
                }
                Err(e) => {
                    warn!("Partial script data parsed with error: {e}");
                    break;
                }
            }
        }

        Ok(Self { name, data })
    }

    /// Looks a property up in the first object or ECMA array.
    pub fn property(&self, key: &str) -> Option<&Amf0Value<'static>> {
        self.data.iter().find_map(|value| value.get(key))
    }
}

impl fmt::Display for ScriptData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} values)", self.name, self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn settings() -> VideoSettings {
        VideoSettings {
            width: 1280,
            height: 720,
            frame_rate: 30.0,
            bitrate: 2_500_000,
        }
    }

    #[test]
    fn test_metadata_from_settings() {
        let metadata = StreamMetadata::from(&settings());

        assert_eq!(metadata.width, 1280.0);
        assert_eq!(metadata.height, 720.0);
        assert_eq!(metadata.video_data_rate_kbps, 2500.0);
        assert_eq!(metadata.video_codec_id, 7.0);
        assert_eq!(metadata.duration, 0.0);
    }

    #[test]
    fn test_property_order() {
        let keys: Vec<_> = StreamMetadata::from(&settings())
            .properties()
            .into_iter()
            .map(|(key, _)| key)
            .collect();

        assert_eq!(
            keys,
            [
                "width",
                "height",
                "framerate",
                "videodatarate",
                "videocodecid",
                "duration"
            ]
        );
    }

    #[test]
    fn test_amf0_body_bytes() {
        let body = Amf0MetadataSerializer
            .serialize(ON_METADATA, &[("width".into(), Amf0Value::Number(1.0))])
            .unwrap();

        let mut expected = vec![0x02, 0x00, 0x0A];
        expected.extend_from_slice(b"onMetaData");
        expected.extend_from_slice(&[0x08, 0x00, 0x00, 0x00, 0x01, 0x00, 0x05]);
        expected.extend_from_slice(b"width");
        expected.push(0x00);
        expected.extend_from_slice(&1.0f64.to_be_bytes());
        expected.extend_from_slice(&[0x00, 0x00, 0x09]);

        assert_eq!(body.as_ref(), expected.as_slice());
    }

    #[test]
    fn test_demux_metadata() {
        let metadata = StreamMetadata::from(&settings());
        let body = Amf0MetadataSerializer
            .serialize(ON_METADATA, &metadata.properties())
            .unwrap();

        let script = ScriptData::demux(&mut Cursor::new(body)).unwrap();
        assert_eq!(script.name, ON_METADATA);
        assert_eq!(script.data.len(), 1);
        assert_eq!(script.property("width"), Some(&Amf0Value::Number(1280.0)));
        assert_eq!(script.property("framerate"), Some(&Amf0Value::Number(30.0)));
        assert_eq!(script.property("audiocodecid"), None);
    }

    #[test]
    fn test_demux_rejects_missing_name() {
        let mut reader = Cursor::new(Bytes::from_static(&[0x05, 0x05]));
        let err = ScriptData::demux(&mut reader).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
