use bytes::Bytes;

use crate::converter::{Converter, expect_data, expect_wire_schema};
use crate::error::{Error, Result};
use crate::types::{DataType, Payload};

/// Claims the `utf-8-string` wire-schema for `f64` values.
#[derive(Debug)]
pub struct FloatAsStringConverter;

impl Converter<Bytes> for FloatAsStringConverter {
    fn data_type(&self) -> DataType {
        DataType::of::<f64>()
    }

    fn wire_schema(&self) -> &str {
        "utf-8-string"
    }

    fn serialize(&self, data: &Payload) -> Result<(Bytes, String)> {
        let value = expect_data::<f64>(self.data_type(), data)?;
        Ok((Bytes::from(value.to_string()), self.wire_schema().to_string()))
    }

    fn deserialize(&self, wire: &Bytes, wire_schema: &str) -> Result<Payload> {
        expect_wire_schema(self.wire_schema(), wire_schema)?;
        std::str::from_utf8(wire)
            .ok()
            .and_then(|text| text.parse::<f64>().ok())
            .map(Payload::new)
            .ok_or_else(|| Error::DeserializationFailed("not a float".to_string()))
    }
}
