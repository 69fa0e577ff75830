//! AMF0 value model, encoder and decoder.
//!
//! Covers the subset of AMF0 that FLV script tags use in practice: numbers,
//! booleans, strings, null, anonymous objects and ECMA arrays.
//!
//! # Examples
//!
//! ```rust
//! # fn test() -> Result<(), Box<dyn std::error::Error>> {
//! use amf0::{Amf0Decoder, Amf0Encoder, Amf0Value};
//!
//! let mut buffer = Vec::new();
//! Amf0Encoder::encode_string(&mut buffer, "onMetaData")?;
//! Amf0Encoder::encode_ecma_array(&mut buffer, &[("width".into(), Amf0Value::Number(1280.0))])?;
//!
//! let mut reader = Amf0Decoder::new(&buffer);
//! assert_eq!(reader.decode()?, Amf0Value::String("onMetaData".into()));
//! # Ok(())
//! # }
//! # test().expect("test failed");
//! ```
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

mod decode;
mod define;
mod encode;
mod errors;

pub use crate::decode::Amf0Decoder;
pub use crate::define::{Amf0Marker, Amf0Properties, Amf0Value};
pub use crate::encode::Amf0Encoder;
pub use crate::errors::{Amf0ReadError, Amf0WriteError};
