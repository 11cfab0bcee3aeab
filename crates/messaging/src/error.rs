use std::time::Duration;

use thiserror::Error;

use crate::event::EventId;
use crate::scope::Scope;

/// Result type alias for bus operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by ports and participants.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// Converter lookup or conversion failed.
    #[error(transparent)]
    Converter(#[from] scopebus_converter::Error),

    /// An inbound notification could not be turned into an event.
    ///
    /// Carries the envelope so receivers can relate the failure to the
    /// request or reply it belongs to.
    #[error("cannot decode event {id} on {scope}: {source}")]
    Undecodable {
        /// Id of the notification.
        id: EventId,
        /// Scope of the notification.
        scope: Scope,
        /// Method tag of the notification.
        method: Option<String>,
        /// Causes of the notification.
        causes: Vec<EventId>,
        /// The converter failure.
        source: scopebus_converter::Error,
    },

    /// A scope string could not be parsed.
    #[error("invalid scope `{scope}`: {reason}")]
    InvalidScope {
        /// The offending input.
        scope: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// An event was published on a scope the informer does not cover.
    #[error("event scope {event} is not {informer} or a sub-scope of it")]
    ScopeMismatch {
        /// Scope of the informer.
        informer: String,
        /// Scope of the rejected event.
        event: String,
    },

    /// The port or participant is not active.
    #[error("port is not active")]
    Inactive,

    /// An event without id was handed to a port.
    #[error("event has no id")]
    MissingEventId,

    /// The transport failed to carry a notification.
    #[error("transport error: {0}")]
    Transport(String),

    /// A channel to a delivery task was closed.
    #[error("channel closed")]
    ChannelClosed,

    /// Waiting for an event timed out.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}
