use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::converter::{Converter, ConverterRef};
use crate::selection::ConverterSelectionStrategy;
use crate::types::{DataType, WireType};

/// Predicate deciding whether a converter handles a wire-schema.
pub type WireSchemaPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Predicate deciding whether a converter handles a data-type.
pub type DataTypePredicate = Arc<dyn Fn(&DataType) -> bool + Send + Sync>;

struct Entry<W: 'static> {
    wire_schema_predicate: WireSchemaPredicate,
    data_type_predicate: DataTypePredicate,
    converter: ConverterRef<W>,
}

impl<W: 'static> Clone for Entry<W> {
    fn clone(&self) -> Self {
        Self {
            wire_schema_predicate: Arc::clone(&self.wire_schema_predicate),
            data_type_predicate: Arc::clone(&self.data_type_predicate),
            converter: Arc::clone(&self.converter),
        }
    }
}

/// Chain-of-responsibility converter selection.
///
/// Each converter is registered together with a wire-schema predicate and a
/// data-type predicate. A lookup walks the entries in registration order and
/// returns the first converter whose predicate accepts the query, so a broad
/// predicate registered early shadows specific ones registered after it.
/// Callers are responsible for ordering.
pub struct PredicateConverterList<W: 'static> {
    entries: Vec<Entry<W>>,
}

impl<W: 'static> PredicateConverterList<W> {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends `converter`, matching exactly its own wire-schema and data-type.
    pub fn add_converter<C: Converter<W>>(&mut self, converter: C) {
        self.add_converter_ref(Arc::new(converter));
    }

    /// Appends a shared converter with exact-match predicates.
    pub fn add_converter_ref(&mut self, converter: ConverterRef<W>) {
        let wire_schema_predicate = exact_wire_schema(&converter);
        let data_type_predicate = exact_data_type(&converter);
        self.push(converter, wire_schema_predicate, data_type_predicate);
    }

    /// Appends `converter` selected for wire-schemas accepted by `predicate`.
    pub fn add_converter_with_wire_schema_predicate<C, P>(&mut self, converter: C, predicate: P)
    where
        C: Converter<W>,
        P: Fn(&str) -> bool + Send + Sync + 'static,
    {
        let converter: ConverterRef<W> = Arc::new(converter);
        let data_type_predicate = exact_data_type(&converter);
        self.push(converter, Arc::new(predicate), data_type_predicate);
    }

    /// Appends `converter` selected for data-types accepted by `predicate`.
    pub fn add_converter_with_data_type_predicate<C, P>(&mut self, converter: C, predicate: P)
    where
        C: Converter<W>,
        P: Fn(&DataType) -> bool + Send + Sync + 'static,
    {
        let converter: ConverterRef<W> = Arc::new(converter);
        let wire_schema_predicate = exact_wire_schema(&converter);
        self.push(converter, wire_schema_predicate, Arc::new(predicate));
    }

    /// Appends `converter` with both predicates supplied by the caller.
    pub fn add_converter_with_predicates(
        &mut self,
        converter: ConverterRef<W>,
        wire_schema_predicate: WireSchemaPredicate,
        data_type_predicate: DataTypePredicate,
    ) {
        self.push(converter, wire_schema_predicate, data_type_predicate);
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(
        &mut self,
        converter: ConverterRef<W>,
        wire_schema_predicate: WireSchemaPredicate,
        data_type_predicate: DataTypePredicate,
    ) {
        debug!(
            "appending converter {} <-> {} at position {}",
            converter.wire_schema(),
            converter.data_type(),
            self.entries.len()
        );
        self.entries.push(Entry {
            wire_schema_predicate,
            data_type_predicate,
            converter,
        });
    }
}

fn exact_wire_schema<W: 'static>(converter: &ConverterRef<W>) -> WireSchemaPredicate {
    let wire_schema = converter.wire_schema().to_string();
    Arc::new(move |candidate| candidate == wire_schema)
}

fn exact_data_type<W: 'static>(converter: &ConverterRef<W>) -> DataTypePredicate {
    let data_type = converter.data_type();
    Arc::new(move |candidate| *candidate == data_type)
}

impl<W: 'static> ConverterSelectionStrategy<W> for PredicateConverterList<W> {
    fn find_converter_for_wire_schema(&self, wire_schema: &str) -> Option<ConverterRef<W>> {
        self.entries
            .iter()
            .find(|entry| (entry.wire_schema_predicate)(wire_schema))
            .map(|entry| Arc::clone(&entry.converter))
    }

    fn find_converter_for_data_type(&self, data_type: &DataType) -> Option<ConverterRef<W>> {
        self.entries
            .iter()
            .find(|entry| (entry.data_type_predicate)(data_type))
            .map(|entry| Arc::clone(&entry.converter))
    }

    fn converters(&self) -> Vec<ConverterRef<W>> {
        self.entries
            .iter()
            .map(|entry| Arc::clone(&entry.converter))
            .collect()
    }
}

impl<W: 'static> Clone for PredicateConverterList<W> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<W: 'static> Default for PredicateConverterList<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: 'static> fmt::Debug for PredicateConverterList<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateConverterList")
            .field("wire_type", &WireType::of::<W>())
            .field(
                "converters",
                &self
                    .entries
                    .iter()
                    .map(|entry| &entry.converter)
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{Int64Converter, StringConverter};
    use crate::testing::FloatAsStringConverter;

    use bytes::Bytes;

    #[test]
    fn test_add_converter() {
        let mut list = PredicateConverterList::<Bytes>::new();
        list.add_converter(StringConverter::new());
        list.add_converter_with_wire_schema_predicate(StringConverter::new(), |_| true);
        list.add_converter_with_data_type_predicate(StringConverter::new(), |_| true);

        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_first_match_wins() {
        let catch_all: ConverterRef<Bytes> = Arc::new(FloatAsStringConverter);
        let specific: ConverterRef<Bytes> = Arc::new(Int64Converter);

        let mut list = PredicateConverterList::new();
        list.add_converter_with_predicates(
            Arc::clone(&catch_all),
            Arc::new(|_: &str| true),
            Arc::new(|_: &DataType| true),
        );
        list.add_converter_ref(Arc::clone(&specific));

        let found = list.get_converter_for_wire_schema("int64").unwrap();
        assert!(Arc::ptr_eq(&found, &catch_all));
        let found = list
            .get_converter_for_data_type(&DataType::of::<i64>())
            .unwrap();
        assert!(Arc::ptr_eq(&found, &catch_all));
    }

    #[test]
    fn test_specific_before_broad() {
        let specific: ConverterRef<Bytes> = Arc::new(StringConverter::new());
        let broad: ConverterRef<Bytes> = Arc::new(FloatAsStringConverter);

        let mut list = PredicateConverterList::new();
        list.add_converter_ref(Arc::clone(&specific));
        list.add_converter_with_predicates(
            Arc::clone(&broad),
            Arc::new(|schema: &str| schema.ends_with("-string")),
            Arc::new(|_: &DataType| true),
        );

        let found = list.get_converter_for_wire_schema("utf-8-string").unwrap();
        assert!(Arc::ptr_eq(&found, &specific));
        let found = list.get_converter_for_wire_schema("ascii-string").unwrap();
        assert!(Arc::ptr_eq(&found, &broad));
        let found = list.get_converter_for_data_type(&DataType::of::<u8>()).unwrap();
        assert!(Arc::ptr_eq(&found, &broad));
    }

    #[test]
    fn test_no_match() {
        let mut list = PredicateConverterList::<Bytes>::new();
        list.add_converter(StringConverter::new());

        assert!(!list.has_converter_for_wire_schema("int64"));
        assert!(list.get_converter_for_data_type(&DataType::of::<i64>()).is_err());
    }
}
