use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use scopebus_converter::{ConverterSelectionStrategy, WireType};

use crate::error::{Error, Result};
use crate::event::Event;
use crate::filter::{Filter, FilterAction};
use crate::qos::QualityOfServiceSpec;

/// Callback receiving every inbound event that passed the port's filters.
pub type ObserverAction = Arc<dyn Fn(Event) + Send + Sync>;

/// Callback receiving inbound notifications that could not be decoded.
pub type ErrorAction = Arc<dyn Fn(&Error) + Send + Sync>;

/// The attachment of a participant to one transport.
///
/// A port serializes outbound payloads and deserializes inbound ones with the
/// converters it was created with. Its wire type is fixed for its lifetime.
/// Ports start inactive; publishing and delivery only function while active.
#[async_trait]
pub trait Port: Debug + Send + Sync {
    /// The wire type this port operates on.
    fn wire_type(&self) -> WireType;

    /// Whether the port is active.
    fn is_active(&self) -> bool;

    /// Starts publishing and delivery. Activating an active port is a no-op.
    async fn activate(&self) -> Result<()>;

    /// Stops publishing and delivery. Deactivating an inactive port is a no-op.
    async fn deactivate(&self) -> Result<()>;

    /// Serializes `event` and hands it to the transport.
    ///
    /// Stamps the send time into the event metadata.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Inactive`] if the port is not active, or with a
    /// converter error if no converter handles the payload data-type.
    async fn publish(&self, event: &mut Event) -> Result<()>;

    /// Installs or withdraws `filter`.
    async fn filter_notify(&self, filter: Arc<dyn Filter>, action: FilterAction) -> Result<()>;

    /// Requests a quality of service from the transport.
    async fn set_quality_of_service_spec(&self, spec: QualityOfServiceSpec) -> Result<()>;

    /// Replaces the callback for inbound events.
    ///
    /// Safe to call while events are being delivered; every delivery uses
    /// either the old or the new callback.
    fn set_observer_action(&self, action: Option<ObserverAction>);

    /// Replaces the callback for undecodable inbound notifications.
    ///
    /// Transports that never decode inbound data may ignore it.
    fn set_error_action(&self, _action: Option<ErrorAction>) {}
}

/// Creates ports attached to one transport.
pub trait Connector: Debug + Send + Sync {
    /// The wire type of the ports this connector creates.
    type Wire: Send + Sync + 'static;

    /// Creates an inactive port using `converters`.
    fn create_port(&self, converters: Arc<dyn ConverterSelectionStrategy<Self::Wire>>) -> Box<dyn Port>;
}
