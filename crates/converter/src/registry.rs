use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

use crate::builtin::default_converter_map;
use crate::converter::{Converter, ConverterRef};
use crate::error::Result;
use crate::map::ConverterMap;
use crate::types::WireType;

static GLOBAL: LazyLock<ConverterRegistry> = LazyLock::new(ConverterRegistry::with_builtin_converters);

/// Default converter maps, one per wire type.
///
/// Maps are handed out as immutable snapshots. Registering a converter
/// replaces the map for its wire type, so snapshots taken earlier do not see
/// the new converter while snapshots taken afterwards do.
pub struct ConverterRegistry {
    maps: RwLock<HashMap<WireType, Box<dyn Any + Send + Sync>>>,
}

impl ConverterRegistry {
    /// The process-wide registry, populated with the builtin `Bytes`
    /// converters on first use.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Creates a registry without any converters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            maps: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry holding the builtin `Bytes` converters.
    #[must_use]
    pub fn with_builtin_converters() -> Self {
        let registry = Self::new();
        registry.maps.write().insert(
            WireType::of::<Bytes>(),
            Box::new(Arc::new(default_converter_map())),
        );
        registry
    }

    /// Snapshot of the default converter map for wire type `W`.
    ///
    /// The map of a wire type nobody registered converters for is created
    /// empty on first use and kept for the lifetime of the registry.
    #[must_use]
    pub fn converter_map<W: Send + Sync + 'static>(&self) -> Arc<ConverterMap<W>> {
        let wire_type = WireType::of::<W>();
        let existing = Self::lookup::<W>(&self.maps.read(), wire_type);
        if let Some(map) = existing {
            return map;
        }

        let mut maps = self.maps.write();
        if let Some(map) = Self::lookup::<W>(&maps, wire_type) {
            return map;
        }
        debug!("creating default converters for {}", wire_type);
        let map = Arc::new(ConverterMap::<W>::new());
        maps.insert(wire_type, Box::new(Arc::clone(&map)));
        map
    }

    fn lookup<W: Send + Sync + 'static>(
        maps: &HashMap<WireType, Box<dyn Any + Send + Sync>>,
        wire_type: WireType,
    ) -> Option<Arc<ConverterMap<W>>> {
        maps.get(&wire_type)
            .and_then(|entry| entry.downcast_ref::<Arc<ConverterMap<W>>>())
            .map(Arc::clone)
    }

    /// Adds `converter` to the default map of its wire type.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DuplicateConverter`] if the key is taken and
    /// `replace_existing` is false.
    pub fn register_converter<W, C>(&self, converter: C, replace_existing: bool) -> Result<()>
    where
        W: Send + Sync + 'static,
        C: Converter<W>,
    {
        self.register_converter_ref(Arc::new(converter), replace_existing)
    }

    /// Adds an already shared converter to the default map of its wire type.
    ///
    /// # Errors
    ///
    /// See [`ConverterRegistry::register_converter`].
    pub fn register_converter_ref<W: Send + Sync + 'static>(
        &self,
        converter: ConverterRef<W>,
        replace_existing: bool,
    ) -> Result<()> {
        let wire_type = WireType::of::<W>();
        let mut maps = self.maps.write();

        let mut updated = Self::lookup::<W>(&maps, wire_type)
            .map_or_else(ConverterMap::new, |map| ConverterMap::clone(&map));
        updated.add_converter_ref(converter, replace_existing)?;

        debug!("default converters for {} now hold {} entries", wire_type, updated.len());
        maps.insert(wire_type, Box::new(Arc::new(updated)));
        Ok(())
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("wire_types", &self.maps.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::StringConverter;
    use crate::selection::ConverterSelectionStrategy;
    use crate::testing::FloatAsStringConverter;
    use crate::types::DataType;

    #[test]
    fn test_builtin_converters() {
        let registry = ConverterRegistry::with_builtin_converters();
        let map = registry.converter_map::<Bytes>();

        assert!(map.has_converter_for_wire_schema("void"));
        assert!(map.has_converter_for_wire_schema("utf-8-string"));
        assert!(map.has_converter_for_data_type(&DataType::of::<u64>()));
    }

    #[test]
    fn test_global_registry_has_builtins() {
        let map = ConverterRegistry::global().converter_map::<Bytes>();

        assert!(map.has_converter_for_data_type(&DataType::of::<()>()));
        assert!(map.has_converter_for_data_type(&DataType::of::<String>()));
    }

    #[test]
    fn test_unknown_wire_type_is_empty() {
        let registry = ConverterRegistry::with_builtin_converters();

        assert!(registry.converter_map::<Vec<u8>>().is_empty());
    }

    #[test]
    fn test_lazily_created_map_persists() {
        let registry = ConverterRegistry::new();

        let first = registry.converter_map::<Vec<u8>>();
        let second = registry.converter_map::<Vec<u8>>();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_register_is_copy_on_write() {
        let registry = ConverterRegistry::with_builtin_converters();
        let before = registry.converter_map::<Bytes>();

        registry
            .register_converter(StringConverter::ascii(), false)
            .unwrap();
        let after = registry.converter_map::<Bytes>();

        assert!(!before.has_converter_for_wire_schema("ascii-string"));
        assert!(after.has_converter_for_wire_schema("ascii-string"));
        assert_eq!(after.len(), before.len() + 1);
    }

    #[test]
    fn test_register_duplicate() {
        let registry = ConverterRegistry::with_builtin_converters();

        assert!(
            registry
                .register_converter(StringConverter::new(), false)
                .is_err()
        );
        registry
            .register_converter(StringConverter::new(), true)
            .unwrap();
        registry
            .register_converter(FloatAsStringConverter, false)
            .unwrap();

        let map = registry.converter_map::<Bytes>();
        assert_eq!(
            map.get_converter_for_wire_schema("utf-8-string")
                .unwrap()
                .data_type(),
            DataType::of::<String>()
        );
    }
}
