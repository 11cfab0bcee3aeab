use std::fmt;

use thiserror::Error;

use crate::types::DataType;

/// Result type alias for converter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The key a failed converter lookup was searching for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConverterQuery {
    /// Lookup by wire-schema (deserialization path).
    WireSchema(String),

    /// Lookup by data-type (serialization path).
    DataType(DataType),
}

impl fmt::Display for ConverterQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WireSchema(wire_schema) => write!(f, "wire-schema `{wire_schema}`"),
            Self::DataType(data_type) => write!(f, "data-type `{data_type}`"),
        }
    }
}

/// Errors raised while registering, selecting or running converters.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// No converter matches the requested wire-schema or data-type.
    #[error("no converter available for {0}")]
    UnknownConverter(ConverterQuery),

    /// A wire-schema would resolve to more than one data-type.
    #[error(
        "ambiguous converter with data-type `{requested}` for wire-schema `{wire_schema}` \
         (registered converter is for data-type `{registered}`)"
    )]
    AmbiguousConverter {
        /// The contested wire-schema.
        wire_schema: String,
        /// Data-type of the converter already registered.
        registered: DataType,
        /// Data-type of the rejected converter.
        requested: DataType,
    },

    /// A converter with the same key exists and replacement was not requested.
    #[error("there already is a converter with wire-schema `{wire_schema}` and data-type `{data_type}`")]
    DuplicateConverter {
        /// Wire-schema of the key.
        wire_schema: String,
        /// Data-type of the key.
        data_type: DataType,
    },

    /// The converter was handed data of a type it does not handle.
    #[error("converter for data-type `{expected}` cannot serialize data of type `{actual}`")]
    DataTypeMismatch {
        /// Data-type the converter handles.
        expected: DataType,
        /// Data-type of the supplied payload.
        actual: DataType,
    },

    /// The converter was asked to decode a wire-schema it does not understand.
    #[error("converter for wire-schema `{expected}` cannot deserialize wire-schema `{actual}`")]
    WireSchemaMismatch {
        /// Wire-schema the converter handles.
        expected: String,
        /// Wire-schema carried with the data.
        actual: String,
    },

    /// Encoding the payload failed.
    #[error("failed to serialize: {0}")]
    SerializationFailed(String),

    /// Decoding the wire data failed.
    #[error("failed to deserialize: {0}")]
    DeserializationFailed(String),
}
