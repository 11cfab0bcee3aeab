use std::fmt;
use std::sync::Arc;

use scopebus_converter::{ConverterRegistry, ConverterSelectionStrategy};

use crate::config::ParticipantConfig;
use crate::error::Result;
use crate::informer::Informer;
use crate::listener::Listener;
use crate::port::{Connector, Port};
use crate::reader::Reader;
use crate::scope::Scope;

/// Creates participants attached to one transport.
///
/// Unless configured otherwise, ports use the default converters for `W`
/// from the global [`ConverterRegistry`], as of factory creation.
pub struct Factory<W: Send + Sync + 'static> {
    connector: Arc<dyn Connector<Wire = W>>,
    converters: Arc<dyn ConverterSelectionStrategy<W>>,
    config: ParticipantConfig,
}

impl<W: Send + Sync + 'static> Factory<W> {
    /// Creates a factory for `connector`.
    pub fn new(connector: Arc<dyn Connector<Wire = W>>) -> Self {
        Self {
            connector,
            converters: ConverterRegistry::global().converter_map::<W>(),
            config: ParticipantConfig::default(),
        }
    }

    /// Uses `converters` for all ports created from now on.
    #[must_use]
    pub fn with_converters(mut self, converters: Arc<dyn ConverterSelectionStrategy<W>>) -> Self {
        self.converters = converters;
        self
    }

    /// Uses `config` for all participants created from now on.
    #[must_use]
    pub const fn with_config(mut self, config: ParticipantConfig) -> Self {
        self.config = config;
        self
    }

    /// The converters handed to new ports.
    #[must_use]
    pub const fn converters(&self) -> &Arc<dyn ConverterSelectionStrategy<W>> {
        &self.converters
    }

    /// The participant configuration.
    #[must_use]
    pub const fn config(&self) -> &ParticipantConfig {
        &self.config
    }

    /// Creates an inactive port.
    #[must_use]
    pub fn create_port(&self) -> Box<dyn Port> {
        self.connector.create_port(Arc::clone(&self.converters))
    }

    /// Creates an active informer on `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be activated.
    pub async fn create_informer(&self, scope: Scope) -> Result<Informer> {
        Informer::new(scope, self.create_port(), &self.config).await
    }

    /// Creates an active listener on `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be activated.
    pub async fn create_listener(&self, scope: Scope) -> Result<Listener> {
        Listener::new(scope, self.create_port(), &self.config).await
    }

    /// Creates an active reader on `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be activated.
    pub async fn create_reader(&self, scope: Scope) -> Result<Reader> {
        Reader::new(scope, self.create_port(), &self.config).await
    }
}

impl<W: Send + Sync + 'static> Clone for Factory<W> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            converters: Arc::clone(&self.converters),
            config: self.config,
        }
    }
}

impl<W: Send + Sync + 'static> fmt::Debug for Factory<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("connector", &self.connector)
            .field("converters", &self.converters)
            .field("config", &self.config)
            .finish()
    }
}
