//! Converter resolution for the scope bus.
//!
//! A [`Converter`] maps one application data type to and from one wire
//! representation under a wire-schema tag. Ports select converters through a
//! [`ConverterSelectionStrategy`]; three strategies are provided:
//!
//! - [`ConverterMap`]: exact matches keyed by (wire-schema, data-type).
//! - [`UnambiguousConverterMap`]: like `ConverterMap`, but a wire-schema may
//!   only ever resolve to one data-type.
//! - [`PredicateConverterList`]: ordered chain of predicates, first match wins.
//!
//! The process-wide [`ConverterRegistry`] holds the default strategy per wire
//! type and is populated with the builtin converters for [`bytes::Bytes`].
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

/// Builtin converters for `Bytes` wire data.
pub mod builtin;

mod converter;
mod error;

/// Exact-match converter map.
pub mod map;

/// Chain-of-responsibility converter selection.
pub mod predicate;

/// Protocol buffer message converter.
pub mod protobuf;

/// Process-wide default converters.
pub mod registry;

/// The converter selection strategy interface.
pub mod selection;

#[cfg(test)]
mod testing;

mod types;

/// Converter map rejecting ambiguous wire-schemas.
pub mod unambiguous;

pub use builtin::{
    BoolConverter, BytesConverter, DoubleConverter, Encoding, FloatConverter, Int32Converter,
    Int64Converter, NoneConverter, StringConverter, Uint32Converter, Uint64Converter,
    default_converter_map,
};
pub use converter::{Converter, ConverterRef};
pub use error::{ConverterQuery, Error, Result};
pub use map::ConverterMap;
pub use predicate::{DataTypePredicate, PredicateConverterList, WireSchemaPredicate};
pub use protobuf::ProtocolBufferConverter;
pub use registry::ConverterRegistry;
pub use selection::ConverterSelectionStrategy;
pub use types::{DataType, Payload, WireType};
pub use unambiguous::UnambiguousConverterMap;
