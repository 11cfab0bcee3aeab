use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

use scopebus_converter::Payload;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::ParticipantConfig;
use crate::error::{Error, Result};
use crate::event::{Event, EventId};
use crate::port::Port;
use crate::scope::Scope;

/// Publishes events on a scope.
#[derive(Debug)]
pub struct Informer {
    id: Uuid,
    scope: Scope,
    port: Box<dyn Port>,
    sequence_number: AtomicU64,
}

impl Informer {
    /// Creates an informer on `scope` and activates `port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be configured or activated.
    pub async fn new(scope: Scope, port: Box<dyn Port>, config: &ParticipantConfig) -> Result<Self> {
        port.set_quality_of_service_spec(config.quality_of_service)
            .await?;
        port.activate().await?;

        let id = Uuid::new_v4();
        debug!("informer {} active on {}", id, scope);

        Ok(Self {
            id,
            scope,
            port,
            sequence_number: AtomicU64::new(0),
        })
    }

    /// Participant id, shared by the ids of all events this informer sends.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The scope this informer publishes on.
    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Reserves the next event id.
    pub fn next_event_id(&self) -> EventId {
        EventId::new(self.id, self.sequence_number.fetch_add(1, Ordering::Relaxed))
    }

    /// Publishes `data` on the informer scope.
    ///
    /// # Errors
    ///
    /// See [`Informer::publish_event`].
    pub async fn publish<T: Any + Send + Sync>(&self, data: T) -> Result<EventId> {
        let event = Event::new(self.scope.clone(), Payload::new(data));
        let event = self.publish_event(event).await?;
        event.id.ok_or(Error::MissingEventId)
    }

    /// Publishes `event`, returning it with id and send time filled in.
    ///
    /// Events without id get the next id of this informer; an id reserved
    /// with [`Informer::next_event_id`] is kept.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::ScopeMismatch`] if the event scope is not covered
    /// by the informer scope, or with the port's error.
    #[instrument(skip(self, event), fields(informer = %self.id))]
    pub async fn publish_event(&self, mut event: Event) -> Result<Event> {
        if !event.scope.is_covered_by(&self.scope) {
            return Err(Error::ScopeMismatch {
                informer: self.scope.to_string(),
                event: event.scope.to_string(),
            });
        }

        if event.id.is_none() {
            event.id = Some(self.next_event_id());
        }

        self.port.publish(&mut event).await?;
        debug!("published {}", event);
        Ok(event)
    }

    /// Deactivates the port. Further publishing fails.
    ///
    /// # Errors
    ///
    /// Returns the port's error.
    pub async fn deactivate(&self) -> Result<()> {
        self.port.deactivate().await
    }
}
