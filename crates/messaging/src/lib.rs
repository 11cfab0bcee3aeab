//! Transport-agnostic scope bus.
//!
//! Events are addressed by hierarchical [`Scope`]s and carry type-erased
//! payloads. A [`Port`] converts payloads to the wire representation of its
//! transport with the converters of a
//! [`scopebus_converter::ConverterSelectionStrategy`]. Participants
//! ([`Informer`], [`Listener`], [`Reader`]) are created through a [`Factory`].
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Participant configuration.
pub mod config;

mod error;

/// Events and their metadata.
pub mod event;

/// Participant factory.
pub mod factory;

/// Event filters.
pub mod filter;

/// Publishing participant.
pub mod informer;

/// Push-style receiving participant.
pub mod listener;

/// Wire-level event records.
pub mod notification;

/// Transport ports and connectors.
pub mod port;

/// Quality of service settings.
pub mod qos;

/// Pull-style receiving participant.
pub mod reader;

/// Hierarchical event addresses.
pub mod scope;

pub use config::ParticipantConfig;
pub use error::{Error, Result};
pub use event::{Event, EventId, MetaData};
pub use factory::Factory;
pub use filter::{Filter, FilterAction, MethodFilter, ScopeFilter};
pub use informer::Informer;
pub use listener::{Handler, Listener};
pub use notification::{EventCodec, Notification};
pub use port::{Connector, ErrorAction, ObserverAction, Port};
pub use qos::{Ordering, QualityOfServiceSpec, Reliability};
pub use reader::Reader;
pub use scope::Scope;
