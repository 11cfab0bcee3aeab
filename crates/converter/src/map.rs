use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::converter::{Converter, ConverterRef};
use crate::error::{Error, Result};
use crate::selection::ConverterSelectionStrategy;
use crate::types::{DataType, WireType};

type Key = (String, DataType);

/// Converters for wire type `W` keyed by (wire-schema, data-type).
///
/// Entries keep their registration order. When several converters match a
/// lookup (e.g. two data-types sharing one wire-schema), the one registered
/// first is returned. Replacing a converter keeps its original position.
pub struct ConverterMap<W: 'static> {
    converters: IndexMap<Key, ConverterRef<W>>,
}

impl<W: 'static> ConverterMap<W> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            converters: IndexMap::new(),
        }
    }

    /// Registers `converter`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateConverter`] if a converter with the same
    /// wire-schema and data-type exists and `replace_existing` is false.
    pub fn add_converter<C: Converter<W>>(&mut self, converter: C, replace_existing: bool) -> Result<()> {
        self.add_converter_ref(Arc::new(converter), replace_existing)
    }

    /// Registers an already shared converter.
    ///
    /// # Errors
    ///
    /// See [`ConverterMap::add_converter`].
    pub fn add_converter_ref(&mut self, converter: ConverterRef<W>, replace_existing: bool) -> Result<()> {
        let key = (converter.wire_schema().to_string(), converter.data_type());
        if !replace_existing && self.converters.contains_key(&key) {
            return Err(Error::DuplicateConverter {
                wire_schema: key.0,
                data_type: key.1,
            });
        }

        debug!(
            "registering converter {} <-> {} for wire-type {}",
            key.0,
            key.1,
            WireType::of::<W>()
        );
        self.converters.insert(key, converter);
        Ok(())
    }

    /// Inserts without the duplicate check; used for the builtin set.
    pub(crate) fn insert<C: Converter<W>>(&mut self, converter: C) {
        let key = (converter.wire_schema().to_string(), converter.data_type());
        self.converters.insert(key, Arc::new(converter));
    }

    /// Whether a converter is registered under exactly this key.
    #[must_use]
    pub fn contains(&self, wire_schema: &str, data_type: &DataType) -> bool {
        self.converters
            .contains_key(&(wire_schema.to_string(), *data_type))
    }

    /// Iterates over the registered converters in lookup order.
    pub fn iter(&self) -> impl Iterator<Item = &ConverterRef<W>> {
        self.converters.values()
    }

    /// Number of registered converters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Whether no converter is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl<W: 'static> ConverterSelectionStrategy<W> for ConverterMap<W> {
    fn find_converter_for_wire_schema(&self, wire_schema: &str) -> Option<ConverterRef<W>> {
        self.converters
            .iter()
            .find(|((converter_wire_schema, _), _)| converter_wire_schema == wire_schema)
            .map(|(_, converter)| Arc::clone(converter))
    }

    fn find_converter_for_data_type(&self, data_type: &DataType) -> Option<ConverterRef<W>> {
        self.converters
            .iter()
            .find(|((_, converter_data_type), _)| converter_data_type == data_type)
            .map(|(_, converter)| Arc::clone(converter))
    }

    fn converters(&self) -> Vec<ConverterRef<W>> {
        self.converters.values().cloned().collect()
    }
}

impl<W: 'static> Clone for ConverterMap<W> {
    fn clone(&self) -> Self {
        Self {
            converters: self.converters.clone(),
        }
    }
}

impl<W: 'static> Default for ConverterMap<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: 'static> fmt::Debug for ConverterMap<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterMap")
            .field("wire_type", &WireType::of::<W>())
            .field("converters", &self.converters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<W: 'static> fmt::Display for ConverterMap<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConverterMap(wire-type = {})", WireType::of::<W>())?;
        for (wire_schema, data_type) in self.converters.keys() {
            write!(f, "\n\t{wire_schema} <-> {data_type}")?;
        }
        Ok(())
    }
}
