use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::ParticipantConfig;
use crate::error::Result;
use crate::event::Event;
use crate::filter::{Filter, FilterAction, ScopeFilter};
use crate::port::{ErrorAction, Port};
use crate::scope::Scope;

/// Processes events delivered to a [`Listener`].
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handles one event.
    async fn handle(&self, event: Event);
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, event: Event) {
        self(event).await;
    }
}

type Handlers = Arc<RwLock<Vec<Arc<dyn Handler>>>>;

/// Invokes handlers for events on a scope.
///
/// Events are handled one at a time in delivery order; each event is passed
/// to every handler in registration order.
pub struct Listener {
    id: Uuid,
    scope: Scope,
    port: Box<dyn Port>,
    handlers: Handlers,
    dispatcher: JoinHandle<()>,
}

impl Listener {
    /// Creates a listener on `scope` and activates `port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be configured or activated.
    pub async fn new(scope: Scope, port: Box<dyn Port>, config: &ParticipantConfig) -> Result<Self> {
        let id = Uuid::new_v4();
        let handlers: Handlers = Arc::new(RwLock::new(Vec::new()));
        let (sender, mut receiver) = mpsc::unbounded_channel::<Event>();

        let dispatcher = tokio::spawn({
            let handlers = Arc::clone(&handlers);
            async move {
                while let Some(event) = receiver.recv().await {
                    let snapshot = handlers.read().clone();
                    trace!("listener {} dispatching {} to {} handlers", id, event, snapshot.len());
                    for handler in snapshot {
                        handler.handle(event.clone()).await;
                    }
                }
                debug!("listener {} dispatcher stopped", id);
            }
        });

        port.set_observer_action(Some(Arc::new(move |event: Event| {
            let _ = sender.send(event);
        })));
        port.filter_notify(Arc::new(ScopeFilter::new(scope.clone())), FilterAction::Add)
            .await?;
        port.set_quality_of_service_spec(config.quality_of_service)
            .await?;
        port.activate().await?;
        debug!("listener {} active on {}", id, scope);

        Ok(Self {
            id,
            scope,
            port,
            handlers,
            dispatcher,
        })
    }

    /// Participant id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The scope this listener receives events for.
    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Appends a handler.
    pub fn add_handler(&self, handler: Arc<dyn Handler>) {
        self.handlers.write().push(handler);
    }

    /// Removes a handler previously added; returns whether it was present.
    pub fn remove_handler(&self, handler: &Arc<dyn Handler>) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|candidate| !Arc::ptr_eq(candidate, handler));
        handlers.len() != before
    }

    /// Number of installed handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Installs the callback for inbound events the port cannot decode.
    ///
    /// Such events never reach the handlers.
    pub fn set_error_action(&self, action: Option<ErrorAction>) {
        self.port.set_error_action(action);
    }

    /// Restricts delivery further with `filter`.
    ///
    /// # Errors
    ///
    /// Returns the port's error.
    pub async fn add_filter(&self, filter: Arc<dyn Filter>) -> Result<()> {
        self.port.filter_notify(filter, FilterAction::Add).await
    }

    /// Withdraws a filter added with [`Listener::add_filter`].
    ///
    /// # Errors
    ///
    /// Returns the port's error.
    pub async fn remove_filter(&self, filter: Arc<dyn Filter>) -> Result<()> {
        self.port.filter_notify(filter, FilterAction::Remove).await
    }

    /// Stops delivery. Events already queued are still handled.
    ///
    /// # Errors
    ///
    /// Returns the port's error.
    pub async fn deactivate(&self) -> Result<()> {
        self.port.deactivate().await?;
        self.port.set_observer_action(None);
        self.port.set_error_action(None);
        Ok(())
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("handlers", &self.handler_count())
            .finish_non_exhaustive()
    }
}
