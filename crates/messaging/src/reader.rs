use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::config::ParticipantConfig;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::filter::{FilterAction, ScopeFilter};
use crate::port::Port;
use crate::scope::Scope;

/// Receives events on a scope on demand.
///
/// Events are queued from activation on and returned in delivery order.
#[derive(Debug)]
pub struct Reader {
    id: Uuid,
    scope: Scope,
    port: Box<dyn Port>,
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl Reader {
    /// Creates a reader on `scope` and activates `port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be configured or activated.
    pub async fn new(scope: Scope, port: Box<dyn Port>, config: &ParticipantConfig) -> Result<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();

        port.set_observer_action(Some(Arc::new(move |event: Event| {
            let _ = sender.send(event);
        })));
        port.filter_notify(Arc::new(ScopeFilter::new(scope.clone())), FilterAction::Add)
            .await?;
        port.set_quality_of_service_spec(config.quality_of_service)
            .await?;
        port.activate().await?;

        let id = Uuid::new_v4();
        debug!("reader {} active on {}", id, scope);

        Ok(Self {
            id,
            scope,
            port,
            receiver,
        })
    }

    /// Participant id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The scope this reader receives events for.
    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Waits for the next event.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::ChannelClosed`] once the reader is deactivated and
    /// the queue is drained.
    pub async fn read(&mut self) -> Result<Event> {
        self.receiver.recv().await.ok_or(Error::ChannelClosed)
    }

    /// Waits at most `timeout` for the next event.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Timeout`] if no event arrived in time, or as
    /// [`Reader::read`].
    pub async fn read_timeout(&mut self, timeout: Duration) -> Result<Event> {
        tokio::time::timeout(timeout, self.read())
            .await
            .map_err(|_| Error::Timeout(timeout))?
    }

    /// Returns the next queued event without waiting.
    pub fn try_read(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }

    /// Stops delivery. Queued events can still be read.
    ///
    /// # Errors
    ///
    /// Returns the port's error.
    pub async fn deactivate(&self) -> Result<()> {
        self.port.deactivate().await?;
        self.port.set_observer_action(None);
        Ok(())
    }
}
