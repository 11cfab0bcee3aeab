use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

macro_rules! define_type_tag {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy)]
        pub struct $name {
            id: TypeId,
            name: &'static str,
        }

        impl $name {
            #[doc = concat!("Returns the `", stringify!($name), "` tag of `T`.")]
            #[must_use]
            pub fn of<T: Any>() -> Self {
                Self {
                    id: TypeId::of::<T>(),
                    name: std::any::type_name::<T>(),
                }
            }

            /// The Rust type id behind this tag.
            #[must_use]
            pub const fn type_id(&self) -> TypeId {
                self.id
            }

            /// Human readable type name (for diagnostics only).
            #[must_use]
            pub const fn name(&self) -> &'static str {
                self.name
            }

            /// Whether this tag identifies `T`.
            #[must_use]
            pub fn is<T: Any>(&self) -> bool {
                self.id == TypeId::of::<T>()
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.name)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name)
            }
        }
    };
}

define_type_tag!(
    DataType,
    "Identifies an application-level type a converter can produce or consume."
);

define_type_tag!(
    WireType,
    "Identifies the serialized representation a port operates on."
);

/// A type-erased application value tagged with its [`DataType`].
///
/// Cloning is cheap; the value itself is shared.
#[derive(Clone)]
pub struct Payload {
    data_type: DataType,
    value: Arc<dyn Any + Send + Sync>,
}

impl Payload {
    /// Wraps `value`.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an already shared value.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            data_type: DataType::of::<T>(),
            value,
        }
    }

    /// The data-type of the wrapped value.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Whether the wrapped value is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.data_type.is::<T>()
    }

    /// Borrows the wrapped value as `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.value).downcast_ref::<T>()
    }

    /// Returns a clone of the wrapped value as `T`.
    #[must_use]
    pub fn cloned<T: Any + Clone>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    /// Converts into the shared value, giving the payload back on type mismatch.
    ///
    /// # Errors
    ///
    /// Returns `self` unchanged if the value is not a `T`.
    pub fn downcast<T: Any + Send + Sync>(self) -> Result<Arc<T>, Self> {
        let data_type = self.data_type;
        Arc::downcast::<T>(self.value).map_err(|value| Self { data_type, value })
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Payload").field(&self.data_type.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_identity() {
        assert_eq!(DataType::of::<String>(), DataType::of::<String>());
        assert_ne!(DataType::of::<String>(), DataType::of::<&'static str>());
        assert!(DataType::of::<()>().is::<()>());
        assert_eq!(DataType::of::<u64>().name(), "u64");
    }

    #[test]
    fn test_payload_downcast() {
        let payload = Payload::new(String::from("hello"));

        assert!(payload.is::<String>());
        assert_eq!(payload.downcast_ref::<String>().map(String::as_str), Some("hello"));
        assert!(payload.downcast_ref::<u32>().is_none());

        let payload = payload.downcast::<u32>().unwrap_err();
        assert_eq!(*payload.downcast::<String>().unwrap(), "hello");
    }
}
