use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use scopebus_converter::{ConverterSelectionStrategy, WireType};
use tracing::trace;

use crate::error::{Error, Result};
use crate::event::{Event, EventId, MetaData};
use crate::scope::Scope;

/// An event in wire form: the payload is serialized to `W` and tagged with
/// its wire-schema.
#[derive(Clone, Debug)]
pub struct Notification<W> {
    /// Event id.
    pub id: EventId,
    /// Event scope.
    pub scope: Scope,
    /// Event method tag.
    pub method: Option<String>,
    /// Wire-schema of `data`.
    pub wire_schema: String,
    /// Serialized payload.
    pub data: W,
    /// Event metadata.
    pub meta_data: MetaData,
    /// Event causes.
    pub causes: Vec<EventId>,
}

/// Converts between [`Event`]s and [`Notification`]s with one converter
/// selection strategy.
///
/// Transports embed a codec in each port.
pub struct EventCodec<W: 'static> {
    converters: Arc<dyn ConverterSelectionStrategy<W>>,
}

impl<W: 'static> EventCodec<W> {
    /// Creates a codec using `converters`.
    #[must_use]
    pub fn new(converters: Arc<dyn ConverterSelectionStrategy<W>>) -> Self {
        Self { converters }
    }

    /// The converters used by this codec.
    #[must_use]
    pub fn converters(&self) -> &Arc<dyn ConverterSelectionStrategy<W>> {
        &self.converters
    }

    /// The wire type of this codec.
    #[must_use]
    pub fn wire_type(&self) -> WireType {
        WireType::of::<W>()
    }

    /// Serializes the payload of `event`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::MissingEventId`] if the event has no id, or with a
    /// converter error if no converter handles the payload data-type.
    pub fn encode(&self, event: &Event) -> Result<Notification<W>> {
        let id = event.id.ok_or(Error::MissingEventId)?;
        let converter = self
            .converters
            .get_converter_for_data_type(&event.data.data_type())?;
        let (data, wire_schema) = converter.serialize(&event.data)?;
        trace!("encoded {} as {}", event, wire_schema);

        Ok(Notification {
            id,
            scope: event.scope.clone(),
            method: event.method.clone(),
            wire_schema,
            data,
            meta_data: event.meta_data.clone(),
            causes: event.causes.clone(),
        })
    }

    /// Deserializes `notification` and stamps the receive time.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Undecodable`] if no converter handles the
    /// wire-schema or the data is malformed.
    pub fn decode(&self, notification: Notification<W>) -> Result<Event> {
        let data = match self
            .converters
            .get_converter_for_wire_schema(&notification.wire_schema)
            .and_then(|converter| converter.deserialize(&notification.data, &notification.wire_schema))
        {
            Ok(data) => data,
            Err(source) => {
                return Err(Error::Undecodable {
                    id: notification.id,
                    scope: notification.scope,
                    method: notification.method,
                    causes: notification.causes,
                    source,
                });
            }
        };

        let mut meta_data = notification.meta_data;
        meta_data.receive_time = Some(SystemTime::now());

        Ok(Event {
            id: Some(notification.id),
            scope: notification.scope,
            method: notification.method,
            data,
            meta_data,
            causes: notification.causes,
        })
    }
}

impl<W: 'static> Clone for EventCodec<W> {
    fn clone(&self) -> Self {
        Self {
            converters: Arc::clone(&self.converters),
        }
    }
}

impl<W: 'static> fmt::Debug for EventCodec<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventCodec")
            .field("converters", &self.converters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bytes::Bytes;
    use scopebus_converter::{ConverterMap, ConverterRegistry};
    use uuid::Uuid;

    fn codec() -> EventCodec<Bytes> {
        EventCodec::new(ConverterRegistry::with_builtin_converters().converter_map::<Bytes>())
    }

    #[test]
    fn test_encode_decode() {
        let codec = codec();
        let id = EventId::new(Uuid::new_v4(), 1);
        let mut event = Event::with_data(Scope::new("/a").unwrap(), String::from("hello"))
            .with_method("REQUEST")
            .with_user_info("key", "value");
        event.id = Some(id);

        let notification = codec.encode(&event).unwrap();
        assert_eq!(notification.wire_schema, "utf-8-string");
        assert_eq!(notification.data, Bytes::from("hello"));

        let decoded = codec.decode(notification).unwrap();
        assert_eq!(decoded.id, Some(id));
        assert_eq!(decoded.scope, event.scope);
        assert!(decoded.has_method("REQUEST"));
        assert_eq!(decoded.data.cloned::<String>().unwrap(), "hello");
        assert_eq!(decoded.meta_data.user_info("key"), Some("value"));
        assert!(decoded.meta_data.receive_time.is_some());
    }

    #[test]
    fn test_encode_requires_id() {
        let event = Event::with_data(Scope::root(), ());

        assert!(matches!(codec().encode(&event), Err(Error::MissingEventId)));
    }

    #[test]
    fn test_unknown_converter() {
        let codec = EventCodec::<Bytes>::new(Arc::new(ConverterMap::new()));
        let mut event = Event::with_data(Scope::root(), 1_u64);
        event.id = Some(EventId::new(Uuid::new_v4(), 0));

        assert!(matches!(
            codec.encode(&event),
            Err(Error::Converter(scopebus_converter::Error::UnknownConverter(_)))
        ));

        let mut event = event.with_method("REPLY").with_cause(EventId::new(Uuid::new_v4(), 3));
        event.id = Some(EventId::new(Uuid::new_v4(), 1));
        let notification = self::codec().encode(&event).unwrap();
        match codec.decode(notification) {
            Err(Error::Undecodable {
                id,
                scope,
                method,
                causes,
                source: scopebus_converter::Error::UnknownConverter(_),
            }) => {
                assert_eq!(Some(id), event.id);
                assert_eq!(scope, event.scope);
                assert_eq!(method.as_deref(), Some("REPLY"));
                assert_eq!(causes, event.causes);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
