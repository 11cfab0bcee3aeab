use std::fmt::Debug;

use crate::converter::ConverterRef;
use crate::error::{ConverterQuery, Error, Result};
use crate::types::{DataType, WireType};

/// Selects converters for one wire type `W`.
///
/// Implementors provide the `find_*` lookups which report an ordinary miss as
/// `None`. The `get_*` methods turn a miss into [`Error::UnknownConverter`].
///
/// Strategies are expected to be fully populated before they are shared with
/// ports; lookups are then read-only and safe from any thread.
pub trait ConverterSelectionStrategy<W: 'static>: Debug + Send + Sync {
    /// Finds the converter able to deserialize `wire_schema`.
    fn find_converter_for_wire_schema(&self, wire_schema: &str) -> Option<ConverterRef<W>>;

    /// Finds the converter able to serialize data of `data_type`.
    fn find_converter_for_data_type(&self, data_type: &DataType) -> Option<ConverterRef<W>>;

    /// All converters, in lookup order.
    fn converters(&self) -> Vec<ConverterRef<W>>;

    /// The wire type this strategy selects converters for.
    fn wire_type(&self) -> WireType {
        WireType::of::<W>()
    }

    /// Whether a converter for `wire_schema` is available.
    fn has_converter_for_wire_schema(&self, wire_schema: &str) -> bool {
        self.find_converter_for_wire_schema(wire_schema).is_some()
    }

    /// Returns the converter for `wire_schema`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownConverter`] if none is registered.
    fn get_converter_for_wire_schema(&self, wire_schema: &str) -> Result<ConverterRef<W>> {
        self.find_converter_for_wire_schema(wire_schema)
            .ok_or_else(|| Error::UnknownConverter(ConverterQuery::WireSchema(wire_schema.to_string())))
    }

    /// Whether a converter for `data_type` is available.
    fn has_converter_for_data_type(&self, data_type: &DataType) -> bool {
        self.find_converter_for_data_type(data_type).is_some()
    }

    /// Returns the converter for `data_type`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownConverter`] if none is registered.
    fn get_converter_for_data_type(&self, data_type: &DataType) -> Result<ConverterRef<W>> {
        self.find_converter_for_data_type(data_type)
            .ok_or(Error::UnknownConverter(ConverterQuery::DataType(*data_type)))
    }
}
