use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use scopebus_converter::{ConverterSelectionStrategy, WireType};
use scopebus_messaging::{
    Error, ErrorAction, Event, EventCodec, Filter, FilterAction, Notification, ObserverAction,
    Port, QualityOfServiceSpec, Result,
};
use tokio::sync::watch;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::bus::{Filters, MemoryBus, Route};

/// A port attached to a [`MemoryBus`].
///
/// Each active port owns one delivery task, so events published by one
/// informer reach the observer in publishing order.
pub struct MemoryPort {
    id: Uuid,
    bus: MemoryBus,
    codec: EventCodec<Bytes>,
    filters: Filters,
    observer: Arc<RwLock<Option<ObserverAction>>>,
    error_action: Arc<RwLock<Option<ErrorAction>>>,
    quality_of_service: RwLock<QualityOfServiceSpec>,
    stop_sender: Mutex<Option<watch::Sender<()>>>,
}

impl MemoryPort {
    /// Creates an inactive port on `bus`.
    #[must_use]
    pub fn new(bus: MemoryBus, converters: Arc<dyn ConverterSelectionStrategy<Bytes>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            bus,
            codec: EventCodec::new(converters),
            filters: Arc::new(RwLock::new(Vec::new())),
            observer: Arc::new(RwLock::new(None)),
            error_action: Arc::new(RwLock::new(None)),
            quality_of_service: RwLock::new(QualityOfServiceSpec::default()),
            stop_sender: Mutex::new(None),
        }
    }

    /// Port id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The quality of service last requested.
    #[must_use]
    pub fn quality_of_service(&self) -> QualityOfServiceSpec {
        *self.quality_of_service.read()
    }

    fn spawn_delivery(&self, receiver: flume::Receiver<Notification<Bytes>>) -> watch::Sender<()> {
        let (stop_sender, mut stop_receiver) = watch::channel(());
        let id = self.id;
        let codec = self.codec.clone();
        let filters = Arc::clone(&self.filters);
        let observer = Arc::clone(&self.observer);
        let error_action = Arc::clone(&self.error_action);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = stop_receiver.changed() => {
                        break;
                    }
                    notification = receiver.recv_async() => {
                        let Ok(notification) = notification else {
                            break;
                        };
                        match codec.decode(notification) {
                            Ok(event) => deliver(id, event, &filters, &observer),
                            Err(error) => {
                                warn!("port {} dropped undecodable notification: {}", id, error);
                                let action = error_action.read().clone();
                                if let Some(action) = action {
                                    action(&error);
                                }
                            }
                        }
                    }
                }
            }
            debug!("port {} delivery stopped", id);
        });

        stop_sender
    }

    fn stop(&self) -> bool {
        self.bus.detach(self.id);
        let stop_sender = self.stop_sender.lock().take();
        match stop_sender {
            Some(stop_sender) => {
                let _ = stop_sender.send(());
                true
            }
            None => false,
        }
    }
}

fn deliver(
    port_id: Uuid,
    mut event: Event,
    filters: &Filters,
    observer: &RwLock<Option<ObserverAction>>,
) {
    if !filters.read().iter().all(|filter| filter.matches(&event)) {
        trace!("port {} filtered out {}", port_id, event);
        return;
    }

    let action = observer.read().clone();
    if let Some(action) = action {
        event.meta_data.deliver_time = Some(SystemTime::now());
        action(event);
    } else {
        trace!("port {} has no observer for {}", port_id, event);
    }
}

#[async_trait]
impl Port for MemoryPort {
    fn wire_type(&self) -> WireType {
        self.codec.wire_type()
    }

    fn is_active(&self) -> bool {
        self.stop_sender.lock().is_some()
    }

    async fn activate(&self) -> Result<()> {
        let mut stop_sender = self.stop_sender.lock();
        if stop_sender.is_some() {
            return Ok(());
        }

        let (sender, receiver) = flume::unbounded();
        *stop_sender = Some(self.spawn_delivery(receiver));
        self.bus.attach(
            self.id,
            Route {
                filters: Arc::clone(&self.filters),
                sender,
            },
        );
        Ok(())
    }

    async fn deactivate(&self) -> Result<()> {
        if self.stop() {
            debug!("port {} deactivated", self.id);
        }
        Ok(())
    }

    async fn publish(&self, event: &mut Event) -> Result<()> {
        if !self.is_active() {
            return Err(Error::Inactive);
        }

        event.meta_data.send_time = Some(SystemTime::now());
        let notification = self.codec.encode(event)?;
        self.bus.route(&notification);
        Ok(())
    }

    async fn filter_notify(&self, filter: Arc<dyn Filter>, action: FilterAction) -> Result<()> {
        let mut filters = self.filters.write();
        match action {
            FilterAction::Add => filters.push(filter),
            FilterAction::Remove => filters.retain(|installed| !Arc::ptr_eq(installed, &filter)),
        }
        trace!("port {} now has {} filters", self.id, filters.len());
        Ok(())
    }

    async fn set_quality_of_service_spec(&self, spec: QualityOfServiceSpec) -> Result<()> {
        // In-process delivery is always ordered and reliable.
        *self.quality_of_service.write() = spec;
        Ok(())
    }

    fn set_observer_action(&self, action: Option<ObserverAction>) {
        *self.observer.write() = action;
    }

    fn set_error_action(&self, action: Option<ErrorAction>) {
        *self.error_action.write() = action;
    }
}

impl Drop for MemoryPort {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for MemoryPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPort")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .field("filters", &*self.filters.read())
            .finish_non_exhaustive()
    }
}
