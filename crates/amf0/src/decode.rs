use std::borrow::Cow;
use std::io::{Cursor, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};
use num_traits::FromPrimitive;

use super::{Amf0Marker, Amf0ReadError, Amf0Value};

/// An AMF0 decoder over a borrowed buffer.
///
/// Strings and keys borrow from the input, so decoding does not allocate
/// for text.
pub struct Amf0Decoder<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Amf0Decoder<'a> {
    /// Create a decoder reading from the start of `buff`.
    pub const fn new(buff: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(buff),
        }
    }

    /// True once every byte has been consumed.
    pub const fn is_empty(&self) -> bool {
        self.cursor.get_ref().len() <= self.cursor.position() as usize
    }

    /// Decode the next value.
    pub fn decode(&mut self) -> Result<Amf0Value<'a>, Amf0ReadError> {
        let marker = self.read_marker()?;

        match marker {
            Amf0Marker::Number => Ok(Amf0Value::Number(self.cursor.read_f64::<BigEndian>()?)),
            Amf0Marker::Boolean => Ok(Amf0Value::Boolean(self.cursor.read_u8()? != 0)),
            Amf0Marker::String => Ok(Amf0Value::String(self.read_utf8()?)),
            Amf0Marker::Object => Ok(Amf0Value::Object(self.read_properties(None)?.into())),
            Amf0Marker::Null | Amf0Marker::Undefined => Ok(Amf0Value::Null),
            Amf0Marker::EcmaArray => {
                let count = self.cursor.read_u32::<BigEndian>()?;
                Ok(Amf0Value::EcmaArray(self.read_properties(Some(count))?.into()))
            }
            _ => Err(Amf0ReadError::UnsupportedType(marker)),
        }
    }

    /// Decode the next value, failing if it does not carry `expected`.
    /// The cursor is left untouched on a mismatch.
    pub fn decode_with_type(&mut self, expected: Amf0Marker) -> Result<Amf0Value<'a>, Amf0ReadError> {
        let start = self.cursor.position();
        let got = self.read_marker()?;
        self.cursor.set_position(start);

        if got != expected {
            return Err(Amf0ReadError::WrongType { expected, got });
        }

        self.decode()
    }

    fn read_marker(&mut self) -> Result<Amf0Marker, Amf0ReadError> {
        let byte = self.cursor.read_u8()?;
        Amf0Marker::from_u8(byte).ok_or(Amf0ReadError::UnknownMarker(byte))
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Amf0ReadError> {
        let buff: &'a [u8] = *self.cursor.get_ref();
        let start = self.cursor.position() as usize;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= buff.len())
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::UnexpectedEof))?;
        self.cursor.set_position(end as u64);
        Ok(&buff[start..end])
    }

    fn read_utf8(&mut self) -> Result<Cow<'a, str>, Amf0ReadError> {
        let len = self.cursor.read_u16::<BigEndian>()?;
        let bytes = self.read_bytes(len as usize)?;
        Ok(Cow::Borrowed(std::str::from_utf8(bytes)?))
    }

    // Consumes `00 00 09` if it is next, otherwise rewinds.
    fn try_read_object_end(&mut self) -> Result<bool, Amf0ReadError> {
        let start = self.cursor.position();
        match self.cursor.read_u24::<BigEndian>() {
            Ok(value) if value == Amf0Marker::ObjectEnd as u32 => Ok(true),
            _ => {
                self.cursor.seek(SeekFrom::Start(start))?;
                Ok(false)
            }
        }
    }

    // Objects are terminated by the end sequence. ECMA arrays carry a count,
    // and writers disagree on whether the end sequence follows, so both are
    // accepted.
    fn read_properties(
        &mut self,
        count: Option<u32>,
    ) -> Result<Vec<(Cow<'a, str>, Amf0Value<'a>)>, Amf0ReadError> {
        let mut properties = Vec::new();

        loop {
            if self.try_read_object_end()? {
                break;
            }
            if let Some(count) = count {
                if properties.len() == count as usize {
                    break;
                }
            }
            let key = self.read_utf8()?;
            let value = self.decode()?;
            properties.push((key, value));
        }

        Ok(properties)
    }
}

impl<'a> Iterator for Amf0Decoder<'a> {
    type Item = Result<Amf0Value<'a>, Amf0ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_empty() {
            return None;
        }
        Some(self.decode())
    }
}
