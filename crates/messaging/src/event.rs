use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

use scopebus_converter::Payload;
use uuid::Uuid;

use crate::scope::Scope;

/// Unique identity of an event: the sending participant plus a sequence number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId {
    participant_id: Uuid,
    sequence_number: u64,
}

impl EventId {
    /// Creates an id.
    #[must_use]
    pub const fn new(participant_id: Uuid, sequence_number: u64) -> Self {
        Self {
            participant_id,
            sequence_number,
        }
    }

    /// Id of the participant that sent the event.
    #[must_use]
    pub const fn participant_id(&self) -> Uuid {
        self.participant_id
    }

    /// Position of the event in the sender's sequence.
    #[must_use]
    pub const fn sequence_number(&self) -> u64 {
        self.sequence_number
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:08x}", self.participant_id, self.sequence_number)
    }
}

/// Timestamps and user supplied annotations of an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetaData {
    /// When the event object was created.
    pub create_time: SystemTime,
    /// When a port handed the event to its transport.
    pub send_time: Option<SystemTime>,
    /// When the receiving port decoded the event.
    pub receive_time: Option<SystemTime>,
    /// When the event was passed to the observer.
    pub deliver_time: Option<SystemTime>,
    /// Free-form key/value annotations.
    pub user_infos: BTreeMap<String, String>,
    /// Free-form named timestamps.
    pub user_times: BTreeMap<String, SystemTime>,
}

impl MetaData {
    /// Metadata with the create time set to now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            create_time: SystemTime::now(),
            send_time: None,
            receive_time: None,
            deliver_time: None,
            user_infos: BTreeMap::new(),
            user_times: BTreeMap::new(),
        }
    }

    /// Looks up a user info.
    #[must_use]
    pub fn user_info(&self, key: &str) -> Option<&str> {
        self.user_infos.get(key).map(String::as_str)
    }

    /// Sets a user info, returning the previous value.
    pub fn set_user_info(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.user_infos.insert(key.into(), value.into())
    }

    /// Sets a user time, returning the previous value.
    pub fn set_user_time(&mut self, key: impl Into<String>, time: SystemTime) -> Option<SystemTime> {
        self.user_times.insert(key.into(), time)
    }
}

impl Default for MetaData {
    fn default() -> Self {
        Self::new()
    }
}

/// A unit of communication on the bus.
#[derive(Clone, Debug)]
pub struct Event {
    /// Assigned by the publishing informer.
    pub id: Option<EventId>,
    /// Address of the event.
    pub scope: Scope,
    /// Optional tag, e.g. `REQUEST` or `REPLY`.
    pub method: Option<String>,
    /// The application value.
    pub data: Payload,
    /// Timestamps and annotations.
    pub meta_data: MetaData,
    /// Ids of the events that caused this one.
    pub causes: Vec<EventId>,
}

impl Event {
    /// Creates an event on `scope` carrying `data`.
    #[must_use]
    pub fn new(scope: Scope, data: Payload) -> Self {
        Self {
            id: None,
            scope,
            method: None,
            data,
            meta_data: MetaData::new(),
            causes: Vec::new(),
        }
    }

    /// Creates an event carrying `value`.
    pub fn with_data<T: Any + Send + Sync>(scope: Scope, value: T) -> Self {
        Self::new(scope, Payload::new(value))
    }

    /// Sets the method tag.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Adds a cause.
    #[must_use]
    pub fn with_cause(mut self, cause: EventId) -> Self {
        self.causes.push(cause);
        self
    }

    /// Sets a user info.
    #[must_use]
    pub fn with_user_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta_data.set_user_info(key, value);
        self
    }

    /// Whether the method tag equals `method`.
    #[must_use]
    pub fn has_method(&self, method: &str) -> bool {
        self.method.as_deref() == Some(method)
    }

    /// Whether `id` is among the causes.
    #[must_use]
    pub fn is_caused_by(&self, id: &EventId) -> bool {
        self.causes.contains(id)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event[")?;
        match &self.id {
            Some(id) => write!(f, "id = {id}, ")?,
            None => write!(f, "id = <unassigned>, ")?,
        }
        write!(f, "scope = {}, ", self.scope)?;
        if let Some(method) = &self.method {
            write!(f, "method = {method}, ")?;
        }
        write!(f, "type = {}, causes = {}]", self.data.data_type(), self.causes.len())
    }
}
