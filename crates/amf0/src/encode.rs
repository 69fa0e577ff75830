use std::borrow::Cow;
use std::io;

use byteorder::{BigEndian, WriteBytesExt};

use super::define::Amf0Marker;
use super::{Amf0Value, Amf0WriteError};

/// AMF0 encoder.
///
/// Writes values into any [`io::Write`].
pub struct Amf0Encoder;

impl Amf0Encoder {
    /// Encode any supported AMF0 value.
    pub fn encode(writer: &mut impl io::Write, value: &Amf0Value) -> Result<(), Amf0WriteError> {
        match value {
            Amf0Value::Number(val) => Self::encode_number(writer, *val),
            Amf0Value::Boolean(val) => Self::encode_bool(writer, *val),
            Amf0Value::String(val) => Self::encode_string(writer, val),
            Amf0Value::Object(props) => Self::encode_object(writer, props),
            Amf0Value::Null => Self::encode_null(writer),
            Amf0Value::EcmaArray(props) => Self::encode_ecma_array(writer, props),
        }
    }

    /// Encode a number.
    pub fn encode_number(writer: &mut impl io::Write, value: f64) -> Result<(), Amf0WriteError> {
        writer.write_u8(Amf0Marker::Number as u8)?;
        writer.write_f64::<BigEndian>(value)?;
        Ok(())
    }

    /// Encode a boolean.
    pub fn encode_bool(writer: &mut impl io::Write, value: bool) -> Result<(), Amf0WriteError> {
        writer.write_u8(Amf0Marker::Boolean as u8)?;
        writer.write_u8(value as u8)?;
        Ok(())
    }

    /// Encode a string (at most `u16::MAX` bytes).
    pub fn encode_string(writer: &mut impl io::Write, value: &str) -> Result<(), Amf0WriteError> {
        writer.write_u8(Amf0Marker::String as u8)?;
        Self::write_utf8(writer, value)
    }

    /// Encode null.
    pub fn encode_null(writer: &mut impl io::Write) -> Result<(), Amf0WriteError> {
        writer.write_u8(Amf0Marker::Null as u8)?;
        Ok(())
    }

    /// Encode an anonymous object.
    pub fn encode_object(
        writer: &mut impl io::Write,
        properties: &[(Cow<'_, str>, Amf0Value<'_>)],
    ) -> Result<(), Amf0WriteError> {
        writer.write_u8(Amf0Marker::Object as u8)?;
        Self::write_properties(writer, properties)
    }

    /// Encode an ECMA array. The associative count is written up front and
    /// the pairs keep the order they are given in.
    pub fn encode_ecma_array(
        writer: &mut impl io::Write,
        properties: &[(Cow<'_, str>, Amf0Value<'_>)],
    ) -> Result<(), Amf0WriteError> {
        let count =
            u32::try_from(properties.len()).map_err(|_| Amf0WriteError::TooManyProperties)?;
        writer.write_u8(Amf0Marker::EcmaArray as u8)?;
        writer.write_u32::<BigEndian>(count)?;
        Self::write_properties(writer, properties)
    }

    /// Write the object-end sequence (`00 00 09`).
    pub fn object_eof(writer: &mut impl io::Write) -> Result<(), Amf0WriteError> {
        writer.write_u24::<BigEndian>(Amf0Marker::ObjectEnd as u32)?;
        Ok(())
    }

    fn write_properties(
        writer: &mut impl io::Write,
        properties: &[(Cow<'_, str>, Amf0Value<'_>)],
    ) -> Result<(), Amf0WriteError> {
        for (key, value) in properties {
            Self::write_utf8(writer, key)?;
            Self::encode(writer, value)?;
        }
        Self::object_eof(writer)
    }

    // UTF-8 without marker: u16 length then bytes. Used for strings and keys.
    fn write_utf8(writer: &mut impl io::Write, value: &str) -> Result<(), Amf0WriteError> {
        let len = u16::try_from(value.len()).map_err(|_| Amf0WriteError::NormalStringTooLong)?;
        writer.write_u16::<BigEndian>(len)?;
        writer.write_all(value.as_bytes())?;
        Ok(())
    }
}
