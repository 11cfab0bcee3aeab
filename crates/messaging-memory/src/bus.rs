use std::fmt;
use std::sync::{Arc, LazyLock};

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use scopebus_converter::ConverterSelectionStrategy;
use scopebus_messaging::{Connector, Filter, Notification, Port};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::port::MemoryPort;

static GLOBAL_BUS: LazyLock<MemoryBus> = LazyLock::new(MemoryBus::new);

pub(crate) type Filters = Arc<RwLock<Vec<Arc<dyn Filter>>>>;

/// Delivery target of one active port.
#[derive(Clone)]
pub(crate) struct Route {
    pub(crate) filters: Filters,
    pub(crate) sender: flume::Sender<Notification<Bytes>>,
}

impl Route {
    fn accepts(&self, notification: &Notification<Bytes>) -> bool {
        self.filters
            .read()
            .iter()
            .filter_map(|filter| filter.scope())
            .any(|scope| notification.scope.is_covered_by(scope))
    }
}

/// Routes notifications between the ports created from it.
///
/// A notification is delivered to every active port with a scope filter
/// covering the notification scope. Cloning yields a handle to the same bus.
#[derive(Clone, Default)]
pub struct MemoryBus {
    routes: Arc<DashMap<Uuid, Route>>,
}

impl MemoryBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide bus.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_BUS.clone()
    }

    /// Number of active ports.
    #[must_use]
    pub fn active_ports(&self) -> usize {
        self.routes.len()
    }

    pub(crate) fn attach(&self, port_id: Uuid, route: Route) {
        debug!("attaching port {} (active ports: {})", port_id, self.routes.len() + 1);
        self.routes.insert(port_id, route);
    }

    pub(crate) fn detach(&self, port_id: Uuid) {
        if self.routes.remove(&port_id).is_some() {
            debug!("detached port {} (active ports: {})", port_id, self.routes.len());
        }
    }

    /// Hands `notification` to all matching ports; returns how many accepted it.
    pub(crate) fn route(&self, notification: &Notification<Bytes>) -> usize {
        let mut delivered = 0;
        for entry in self.routes.iter() {
            if entry.value().accepts(notification) && entry.value().sender.send(notification.clone()).is_ok() {
                delivered += 1;
            }
        }

        trace!(
            "routed {} on {} to {} ports",
            notification.id, notification.scope, delivered
        );
        delivered
    }
}

impl Connector for MemoryBus {
    type Wire = Bytes;

    fn create_port(&self, converters: Arc<dyn ConverterSelectionStrategy<Bytes>>) -> Box<dyn Port> {
        Box::new(MemoryPort::new(self.clone(), converters))
    }
}

impl fmt::Debug for MemoryBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBus")
            .field("active_ports", &self.routes.len())
            .finish()
    }
}
