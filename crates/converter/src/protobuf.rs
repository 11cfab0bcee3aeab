use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use prost::{Message, Name};

use crate::converter::{Converter, expect_data, expect_wire_schema};
use crate::error::{Error, Result};
use crate::types::{DataType, Payload};

/// Converter for protocol buffer messages of type `M`.
///
/// The wire-schema is the fully qualified message name with a leading dot,
/// e.g. `.rsb.rpc.AddOneRequest`.
pub struct ProtocolBufferConverter<M> {
    wire_schema: String,
    _message: PhantomData<fn() -> M>,
}

impl<M: Message + Name + Default + 'static> ProtocolBufferConverter<M> {
    /// Creates the converter for `M`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            wire_schema: format!(".{}", M::full_name()),
            _message: PhantomData,
        }
    }
}

impl<M: Message + Name + Default + 'static> Default for ProtocolBufferConverter<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for ProtocolBufferConverter<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProtocolBufferConverter")
            .field(&self.wire_schema)
            .finish()
    }
}

impl<M: Message + Name + Default + 'static> Converter<Bytes> for ProtocolBufferConverter<M> {
    fn data_type(&self) -> DataType {
        DataType::of::<M>()
    }

    fn wire_schema(&self) -> &str {
        &self.wire_schema
    }

    fn serialize(&self, data: &Payload) -> Result<(Bytes, String)> {
        let message = expect_data::<M>(self.data_type(), data)?;
        Ok((Bytes::from(message.encode_to_vec()), self.wire_schema.clone()))
    }

    fn deserialize(&self, wire: &Bytes, wire_schema: &str) -> Result<Payload> {
        expect_wire_schema(&self.wire_schema, wire_schema)?;
        let message = M::decode(wire.clone()).map_err(|e| Error::DeserializationFailed(e.to_string()))?;
        Ok(Payload::new(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, prost::Message)]
    struct Reading {
        #[prost(string, tag = "1")]
        sensor: String,
        #[prost(int64, tag = "2")]
        value: i64,
    }

    impl Name for Reading {
        const NAME: &'static str = "Reading";
        const PACKAGE: &'static str = "scopebus.test";
    }

    #[test]
    fn test_wire_schema_is_full_name() {
        let converter = ProtocolBufferConverter::<Reading>::new();

        assert_eq!(converter.wire_schema(), ".scopebus.test.Reading");
        assert_eq!(converter.data_type(), DataType::of::<Reading>());
    }

    #[test]
    fn test_round_trip() {
        let converter = ProtocolBufferConverter::<Reading>::new();
        let reading = Reading {
            sensor: "temperature".to_string(),
            value: 21,
        };

        let (wire, wire_schema) = converter.serialize(&Payload::new(reading.clone())).unwrap();
        let payload = converter.deserialize(&wire, &wire_schema).unwrap();

        assert_eq!(payload.cloned::<Reading>(), Some(reading));
    }

    #[test]
    fn test_malformed_data() {
        let converter = ProtocolBufferConverter::<Reading>::new();

        assert!(matches!(
            converter.deserialize(&Bytes::from_static(&[0x0a, 0xff]), ".scopebus.test.Reading"),
            Err(Error::DeserializationFailed(_))
        ));
        assert!(matches!(
            converter.deserialize(&Bytes::new(), ".other.Message"),
            Err(Error::WireSchemaMismatch { .. })
        ));
    }
}
