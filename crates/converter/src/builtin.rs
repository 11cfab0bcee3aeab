use bytes::Bytes;
use paste::paste;

use crate::converter::{Converter, expect_data, expect_wire_schema};
use crate::error::{Error, Result};
use crate::map::ConverterMap;
use crate::types::{DataType, Payload};

/// Converter for the absence of a value, `()` <-> `void`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoneConverter;

impl Converter<Bytes> for NoneConverter {
    fn data_type(&self) -> DataType {
        DataType::of::<()>()
    }

    fn wire_schema(&self) -> &str {
        "void"
    }

    fn serialize(&self, data: &Payload) -> Result<(Bytes, String)> {
        expect_data::<()>(self.data_type(), data)?;
        Ok((Bytes::new(), self.wire_schema().to_string()))
    }

    fn deserialize(&self, _wire: &Bytes, wire_schema: &str) -> Result<Payload> {
        expect_wire_schema(self.wire_schema(), wire_schema)?;
        Ok(Payload::new(()))
    }
}

/// Character encoding used by [`StringConverter`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Any valid UTF-8.
    #[default]
    Utf8,

    /// 7-bit ASCII only.
    Ascii,
}

/// Converter for `String` values.
#[derive(Clone, Debug)]
pub struct StringConverter {
    wire_schema: String,
    encoding: Encoding,
}

impl StringConverter {
    /// UTF-8 strings under the `utf-8-string` wire-schema.
    #[must_use]
    pub fn new() -> Self {
        Self::with_wire_schema("utf-8-string", Encoding::Utf8)
    }

    /// ASCII strings under the `ascii-string` wire-schema.
    #[must_use]
    pub fn ascii() -> Self {
        Self::with_wire_schema("ascii-string", Encoding::Ascii)
    }

    /// Strings in `encoding` under a custom wire-schema.
    pub fn with_wire_schema(wire_schema: impl Into<String>, encoding: Encoding) -> Self {
        Self {
            wire_schema: wire_schema.into(),
            encoding,
        }
    }

    /// The encoding enforced by this converter.
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl Default for StringConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter<Bytes> for StringConverter {
    fn data_type(&self) -> DataType {
        DataType::of::<String>()
    }

    fn wire_schema(&self) -> &str {
        &self.wire_schema
    }

    fn serialize(&self, data: &Payload) -> Result<(Bytes, String)> {
        let value = expect_data::<String>(self.data_type(), data)?;
        if self.encoding == Encoding::Ascii && !value.is_ascii() {
            return Err(Error::SerializationFailed(format!(
                "string contains non-ascii characters: {value:?}"
            )));
        }

        Ok((Bytes::copy_from_slice(value.as_bytes()), self.wire_schema.clone()))
    }

    fn deserialize(&self, wire: &Bytes, wire_schema: &str) -> Result<Payload> {
        expect_wire_schema(&self.wire_schema, wire_schema)?;
        if self.encoding == Encoding::Ascii && !wire.is_ascii() {
            return Err(Error::DeserializationFailed(
                "wire data contains non-ascii bytes".to_string(),
            ));
        }

        let value = String::from_utf8(wire.to_vec())
            .map_err(|e| Error::DeserializationFailed(e.to_string()))?;
        Ok(Payload::new(value))
    }
}

/// Converter passing `Bytes` through unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct BytesConverter;

impl Converter<Bytes> for BytesConverter {
    fn data_type(&self) -> DataType {
        DataType::of::<Bytes>()
    }

    fn wire_schema(&self) -> &str {
        "bytes"
    }

    fn serialize(&self, data: &Payload) -> Result<(Bytes, String)> {
        let value = expect_data::<Bytes>(self.data_type(), data)?;
        Ok((value.clone(), self.wire_schema().to_string()))
    }

    fn deserialize(&self, wire: &Bytes, wire_schema: &str) -> Result<Payload> {
        expect_wire_schema(self.wire_schema(), wire_schema)?;
        Ok(Payload::new(wire.clone()))
    }
}

/// Converter for `bool` values, encoded as a single `0` or `1` byte.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoolConverter;

impl Converter<Bytes> for BoolConverter {
    fn data_type(&self) -> DataType {
        DataType::of::<bool>()
    }

    fn wire_schema(&self) -> &str {
        "bool"
    }

    fn serialize(&self, data: &Payload) -> Result<(Bytes, String)> {
        let value = expect_data::<bool>(self.data_type(), data)?;
        Ok((
            Bytes::copy_from_slice(&[u8::from(*value)]),
            self.wire_schema().to_string(),
        ))
    }

    fn deserialize(&self, wire: &Bytes, wire_schema: &str) -> Result<Payload> {
        expect_wire_schema(self.wire_schema(), wire_schema)?;
        match &wire[..] {
            [0] => Ok(Payload::new(false)),
            [1] => Ok(Payload::new(true)),
            other => Err(Error::DeserializationFailed(format!(
                "invalid bool encoding {other:?}"
            ))),
        }
    }
}

macro_rules! scalar_converter {
    ($schema:ident, $ty:ty) => {
        paste! {
            #[doc = concat!("Converter for `", stringify!($ty), "` values, little endian under `", stringify!($schema), "`.")]
            #[derive(Clone, Copy, Debug, Default)]
            pub struct [<$schema:camel Converter>];

            impl Converter<Bytes> for [<$schema:camel Converter>] {
                fn data_type(&self) -> DataType {
                    DataType::of::<$ty>()
                }

                fn wire_schema(&self) -> &str {
                    stringify!($schema)
                }

                fn serialize(&self, data: &Payload) -> Result<(Bytes, String)> {
                    let value = expect_data::<$ty>(self.data_type(), data)?;
                    Ok((
                        Bytes::copy_from_slice(&value.to_le_bytes()),
                        self.wire_schema().to_string(),
                    ))
                }

                fn deserialize(&self, wire: &Bytes, wire_schema: &str) -> Result<Payload> {
                    expect_wire_schema(self.wire_schema(), wire_schema)?;
                    let raw = <[u8; std::mem::size_of::<$ty>()]>::try_from(&wire[..]).map_err(|_| {
                        Error::DeserializationFailed(format!(
                            "expected {} bytes for {}, got {}",
                            std::mem::size_of::<$ty>(),
                            stringify!($schema),
                            wire.len()
                        ))
                    })?;
                    Ok(Payload::new(<$ty>::from_le_bytes(raw)))
                }
            }
        }
    };
}

scalar_converter!(int32, i32);
scalar_converter!(int64, i64);
scalar_converter!(uint32, u32);
scalar_converter!(uint64, u64);
scalar_converter!(float, f32);
scalar_converter!(double, f64);

/// The default converters for `Bytes` wire data.
///
/// Protocol buffer messages and the ASCII string variant are not included.
#[must_use]
pub fn default_converter_map() -> ConverterMap<Bytes> {
    let mut map = ConverterMap::new();
    map.insert(NoneConverter);
    map.insert(StringConverter::new());
    map.insert(BytesConverter);
    map.insert(BoolConverter);
    map.insert(Int32Converter);
    map.insert(Int64Converter);
    map.insert(Uint32Converter);
    map.insert(Uint64Converter);
    map.insert(FloatConverter);
    map.insert(DoubleConverter);
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::ConverterSelectionStrategy;

    use proptest::prelude::*;

    fn round_trip<C: Converter<Bytes>>(converter: &C, payload: &Payload) -> Payload {
        let (wire, wire_schema) = converter.serialize(payload).unwrap();
        assert_eq!(wire_schema, converter.wire_schema());
        converter.deserialize(&wire, &wire_schema).unwrap()
    }

    #[test]
    fn test_none_converter() {
        let (wire, wire_schema) = NoneConverter.serialize(&Payload::new(())).unwrap();

        assert!(wire.is_empty());
        assert_eq!(wire_schema, "void");
        assert!(NoneConverter.deserialize(&wire, "void").unwrap().is::<()>());
    }

    #[test]
    fn test_string_converter_rejects_wrong_input() {
        let converter = StringConverter::new();

        assert!(matches!(
            converter.serialize(&Payload::new(5_i64)),
            Err(Error::DataTypeMismatch { .. })
        ));
        assert!(matches!(
            converter.deserialize(&Bytes::from_static(b"abc"), "ascii-string"),
            Err(Error::WireSchemaMismatch { .. })
        ));
        assert!(matches!(
            converter.deserialize(&Bytes::from_static(&[0xff, 0xfe]), "utf-8-string"),
            Err(Error::DeserializationFailed(_))
        ));
    }

    #[test]
    fn test_ascii_string_converter() {
        let converter = StringConverter::ascii();

        let payload = round_trip(&converter, &Payload::new(String::from("plain")));
        assert_eq!(payload.cloned::<String>().unwrap(), "plain");

        assert!(matches!(
            converter.serialize(&Payload::new(String::from("größe"))),
            Err(Error::SerializationFailed(_))
        ));
        assert!(
            converter
                .deserialize(&Bytes::from("größe"), "ascii-string")
                .is_err()
        );
    }

    #[test]
    fn test_bool_converter() {
        assert!(*round_trip(&BoolConverter, &Payload::new(true)).downcast_ref::<bool>().unwrap());
        assert!(!*round_trip(&BoolConverter, &Payload::new(false)).downcast_ref::<bool>().unwrap());
        assert!(
            BoolConverter
                .deserialize(&Bytes::from_static(&[2]), "bool")
                .is_err()
        );
    }

    #[test]
    fn test_scalar_converters() {
        let (wire, wire_schema) = Int64Converter.serialize(&Payload::new(-2_i64)).unwrap();
        assert_eq!(wire_schema, "int64");
        assert_eq!(&wire[..], (-2_i64).to_le_bytes());

        let payload = round_trip(&Uint32Converter, &Payload::new(7_u32));
        assert_eq!(payload.cloned::<u32>(), Some(7));
        let payload = round_trip(&DoubleConverter, &Payload::new(0.25_f64));
        assert_eq!(payload.cloned::<f64>(), Some(0.25));

        assert!(matches!(
            Int32Converter.deserialize(&Bytes::from_static(&[1, 2]), "int32"),
            Err(Error::DeserializationFailed(_))
        ));
    }

    #[test]
    fn test_default_converter_map() {
        let map = default_converter_map();

        assert_eq!(map.len(), 10);
        for wire_schema in [
            "void",
            "utf-8-string",
            "bytes",
            "bool",
            "int32",
            "int64",
            "uint32",
            "uint64",
            "float",
            "double",
        ] {
            assert!(map.has_converter_for_wire_schema(wire_schema), "{wire_schema}");
        }
        assert!(!map.has_converter_for_wire_schema("ascii-string"));
        assert_eq!(
            map.get_converter_for_data_type(&DataType::of::<String>())
                .unwrap()
                .wire_schema(),
            "utf-8-string"
        );
    }

    proptest! {
        #[test]
        fn prop_string_round_trip(value in any::<String>()) {
            let converter = StringConverter::new();
            let payload = round_trip(&converter, &Payload::new(value.clone()));
            prop_assert_eq!(payload.cloned::<String>(), Some(value));
        }

        #[test]
        fn prop_int64_round_trip(value in any::<i64>()) {
            let payload = round_trip(&Int64Converter, &Payload::new(value));
            prop_assert_eq!(payload.cloned::<i64>(), Some(value));
        }
    }
}
