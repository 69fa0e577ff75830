//! # FLV Mux
//!
//! Packages a live H.264 elementary stream into an HTTP-FLV byte stream.
//!
//! An encoder ([`VideoSource`]) posts configuration records and encoded
//! samples; a session ([`HttpFlvStream`]) turns them into the FLV file
//! header, an `onMetaData` script tag, the AVC sequence header and one data
//! tag per sample, each prefixed by the size of the tag before it. The
//! chunks go to a [`StreamListener`] in order, ready to be written to a
//! chunked HTTP response or a file.
//!
//! The synchronous core ([`HttpFlvMuxer`]) can also be driven directly:
//!
//! ```rust
//! use bytes::Bytes;
//! use flv_mux::{AccessUnit, FormatDescription, HttpFlvMuxer, MediaTime, MuxOutcome, StreamMetadata, VideoSettings};
//!
//! let mut muxer = HttpFlvMuxer::new();
//! let opening = muxer.begin_session(&StreamMetadata::from(&VideoSettings::default())).unwrap();
//! assert_eq!(&opening[0][..3], b"FLV");
//!
//! let description = FormatDescription::new(Some(Bytes::from_static(&[0xAA, 0xBB])), 1280, 720);
//! let sequence_header = muxer.on_format_description(Some(&description)).unwrap();
//! assert!(sequence_header.is_some());
//!
//! let unit = AccessUnit {
//!     payload: Bytes::from_static(&[0, 0, 0, 1, 0x65]),
//!     is_keyframe: true,
//!     presentation_time: MediaTime::ZERO,
//!     decode_time: None,
//! };
//! assert!(matches!(muxer.on_access_unit(&unit).unwrap(), MuxOutcome::Emitted(_)));
//! ```
//!
//! ## Specifications
//!
//! - [Flash Video File Format Specification v10](https://www.adobe.com/content/dam/acom/en/devnet/flv/video_file_format_spec_v10.pdf)
//! - ISO/IEC 14496-15, AVCDecoderConfigurationRecord
//!
//! ## License
//!
//! MIT License
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]

pub mod avc;
pub mod config;
pub mod error;
pub mod header;
pub mod muxer;
pub mod script;
pub mod session;
pub mod sink;
pub mod source;
pub mod tag;
pub mod timestamp;
pub mod video;

#[cfg(test)]
pub mod test_utils;

pub use avc::AvcDecoderConfigurationRecord;
pub use config::SessionConfig;
pub use error::MuxError;
pub use muxer::{DropReason, HttpFlvMuxer, MuxOutcome};
pub use script::{Amf0MetadataSerializer, MetadataSerializer, StreamMetadata};
pub use session::{HttpFlvStream, SessionSnapshot, SessionState};
pub use sink::{StreamEvent, StreamListener};
pub use source::{AccessUnit, EncoderError, FormatDescription, SourceOutput, VideoSettings, VideoSource};
pub use timestamp::MediaTime;
