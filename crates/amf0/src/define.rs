use std::borrow::Cow;

use num_derive::FromPrimitive;

/// AMF0 type markers, amf0_spec_121207.pdf section 2.1.
///
/// Only a subset is encodable, the rest is listed so that the decoder can
/// report exactly what it ran into.
#[derive(Debug, PartialEq, Eq, Clone, Copy, FromPrimitive)]
#[repr(u8)]
pub enum Amf0Marker {
    /// number-marker
    Number = 0x00,
    /// boolean-marker
    Boolean = 0x01,
    /// string-marker
    String = 0x02,
    /// object-marker
    Object = 0x03,
    /// movieclip-marker (reserved)
    MovieClip = 0x04,
    /// null-marker
    Null = 0x05,
    /// undefined-marker
    Undefined = 0x06,
    /// reference-marker
    Reference = 0x07,
    /// ecma-array-marker
    EcmaArray = 0x08,
    /// object-end-marker
    ObjectEnd = 0x09,
    /// strict-array-marker
    StrictArray = 0x0a,
    /// date-marker
    Date = 0x0b,
    /// long-string-marker
    LongString = 0x0c,
    /// unsupported-marker
    Unsupported = 0x0d,
    /// recordset-marker (reserved)
    Recordset = 0x0e,
    /// xml-document-marker
    XmlDocument = 0x0f,
    /// typed-object-marker
    TypedObject = 0x10,
    /// avmplus-object-marker
    AvmPlusObject = 0x11,
}

/// Ordered key/value pairs of an object or ECMA array.
pub type Amf0Properties<'a> = Cow<'a, [(Cow<'a, str>, Amf0Value<'a>)]>;

/// AMF0 values.
#[derive(PartialEq, Clone, Debug)]
pub enum Amf0Value<'a> {
    /// Number, section 2.2
    Number(f64),
    /// Boolean, section 2.3
    Boolean(bool),
    /// String, section 2.4
    String(Cow<'a, str>),
    /// Anonymous object, section 2.5
    Object(Amf0Properties<'a>),
    /// Null, section 2.7
    Null,
    /// ECMA array, section 2.10. Keeps insertion order.
    EcmaArray(Amf0Properties<'a>),
}

impl Amf0Value<'_> {
    /// The marker this value is written with.
    pub fn marker(&self) -> Amf0Marker {
        match self {
            Self::Number(_) => Amf0Marker::Number,
            Self::Boolean(_) => Amf0Marker::Boolean,
            Self::String(_) => Amf0Marker::String,
            Self::Object(_) => Amf0Marker::Object,
            Self::Null => Amf0Marker::Null,
            Self::EcmaArray(_) => Amf0Marker::EcmaArray,
        }
    }

    /// Numeric payload, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Looks up a property by key on objects and ECMA arrays.
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Object(props) | Self::EcmaArray(props) => {
                props.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Detaches the value from the buffer it was decoded from.
    pub fn into_owned(self) -> Amf0Value<'static> {
        fn own_props(props: Amf0Properties<'_>) -> Amf0Properties<'static> {
            props
                .into_owned()
                .into_iter()
                .map(|(k, v)| (Cow::Owned(k.into_owned()), v.into_owned()))
                .collect::<Vec<_>>()
                .into()
        }

        match self {
            Self::Number(n) => Amf0Value::Number(n),
            Self::Boolean(b) => Amf0Value::Boolean(b),
            Self::String(s) => Amf0Value::String(Cow::Owned(s.into_owned())),
            Self::Object(props) => Amf0Value::Object(own_props(props)),
            Self::Null => Amf0Value::Null,
            Self::EcmaArray(props) => Amf0Value::EcmaArray(own_props(props)),
        }
    }
}
