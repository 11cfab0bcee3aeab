use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{DataType, Payload, WireType};

/// Shared handle to a converter for wire type `W`.
pub type ConverterRef<W> = Arc<dyn Converter<W>>;

/// Bidirectional mapping between one application data type and the wire
/// type `W`, under one wire-schema.
///
/// Converters are immutable once constructed.
pub trait Converter<W: 'static>: Debug + Send + Sync + 'static {
    /// The application type this converter serializes and produces.
    fn data_type(&self) -> DataType;

    /// The wire-schema this converter writes and understands.
    fn wire_schema(&self) -> &str;

    /// The wire type this converter serializes to.
    fn wire_type(&self) -> WireType {
        WireType::of::<W>()
    }

    /// Serializes `data`, returning the wire data and its wire-schema.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is not of this converter's data-type or
    /// cannot be encoded.
    fn serialize(&self, data: &Payload) -> Result<(W, String)>;

    /// Deserializes `wire` which was tagged with `wire_schema`.
    ///
    /// # Errors
    ///
    /// Returns an error if the wire-schema is not understood or the data is
    /// malformed.
    fn deserialize(&self, wire: &W, wire_schema: &str) -> Result<Payload>;
}

/// Borrows the payload value, failing if it is not of the converter's type.
pub(crate) fn expect_data<T: Any>(expected: DataType, data: &Payload) -> Result<&T> {
    data.downcast_ref::<T>().ok_or(Error::DataTypeMismatch {
        expected,
        actual: data.data_type(),
    })
}

pub(crate) fn expect_wire_schema(expected: &str, actual: &str) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::WireSchemaMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}
