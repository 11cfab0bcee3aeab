use std::fmt;
use std::sync::Arc;

use crate::converter::{Converter, ConverterRef};
use crate::error::{Error, Result};
use crate::map::ConverterMap;
use crate::selection::ConverterSelectionStrategy;
use crate::types::DataType;

/// A [`ConverterMap`] in which a wire-schema maps to at most one data-type.
///
/// Registering a converter whose wire-schema is already bound to a different
/// data-type fails with [`Error::AmbiguousConverter`], whatever the value of
/// `replace_existing`. Deserialization through this map is therefore
/// deterministic.
pub struct UnambiguousConverterMap<W: 'static> {
    inner: ConverterMap<W>,
}

impl<W: 'static> UnambiguousConverterMap<W> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: ConverterMap::new(),
        }
    }

    /// Registers `converter`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AmbiguousConverter`] on a wire-schema collision with a
    /// differently typed converter, or [`Error::DuplicateConverter`] as
    /// [`ConverterMap::add_converter`] does.
    pub fn add_converter<C: Converter<W>>(&mut self, converter: C, replace_existing: bool) -> Result<()> {
        self.add_converter_ref(Arc::new(converter), replace_existing)
    }

    /// Registers an already shared converter.
    ///
    /// # Errors
    ///
    /// See [`UnambiguousConverterMap::add_converter`].
    pub fn add_converter_ref(&mut self, converter: ConverterRef<W>, replace_existing: bool) -> Result<()> {
        if let Some(registered) = self
            .inner
            .iter()
            .find(|registered| {
                registered.wire_schema() == converter.wire_schema()
                    && registered.data_type() != converter.data_type()
            })
        {
            return Err(Error::AmbiguousConverter {
                wire_schema: converter.wire_schema().to_string(),
                registered: registered.data_type(),
                requested: converter.data_type(),
            });
        }

        self.inner.add_converter_ref(converter, replace_existing)
    }

    /// Number of registered converters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no converter is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<W: 'static> ConverterSelectionStrategy<W> for UnambiguousConverterMap<W> {
    fn find_converter_for_wire_schema(&self, wire_schema: &str) -> Option<ConverterRef<W>> {
        self.inner.find_converter_for_wire_schema(wire_schema)
    }

    fn find_converter_for_data_type(&self, data_type: &DataType) -> Option<ConverterRef<W>> {
        self.inner.find_converter_for_data_type(data_type)
    }

    fn converters(&self) -> Vec<ConverterRef<W>> {
        self.inner.converters()
    }
}

impl<W: 'static> Clone for UnambiguousConverterMap<W> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<W: 'static> Default for UnambiguousConverterMap<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: 'static> fmt::Debug for UnambiguousConverterMap<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UnambiguousConverterMap").field(&self.inner).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::StringConverter;
    use crate::testing::FloatAsStringConverter;

    use bytes::Bytes;

    #[test]
    fn test_add_converter() {
        let mut map = UnambiguousConverterMap::<Bytes>::new();
        map.add_converter(StringConverter::new(), false).unwrap();

        assert!(matches!(
            map.add_converter(FloatAsStringConverter, false),
            Err(Error::AmbiguousConverter { ref wire_schema, .. }) if wire_schema == "utf-8-string"
        ));
        assert!(matches!(
            map.add_converter(FloatAsStringConverter, true),
            Err(Error::AmbiguousConverter { .. })
        ));
        map.add_converter(StringConverter::new(), true).unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(
            map.get_converter_for_wire_schema("utf-8-string")
                .unwrap()
                .data_type(),
            DataType::of::<String>()
        );
    }

    #[test]
    fn test_ambiguity_independent_of_first_replace_flag() {
        let mut map = UnambiguousConverterMap::<Bytes>::new();
        map.add_converter(FloatAsStringConverter, true).unwrap();

        let result = map.add_converter(StringConverter::new(), false);
        assert!(matches!(
            result,
            Err(Error::AmbiguousConverter { registered, requested, .. })
                if registered == DataType::of::<f64>() && requested == DataType::of::<String>()
        ));
        assert!(!map.has_converter_for_data_type(&DataType::of::<String>()));
    }

    #[test]
    fn test_duplicate_still_rejected() {
        let mut map = UnambiguousConverterMap::<Bytes>::new();
        map.add_converter(StringConverter::new(), false).unwrap();

        assert!(matches!(
            map.add_converter(StringConverter::new(), false),
            Err(Error::DuplicateConverter { .. })
        ));
    }
}
