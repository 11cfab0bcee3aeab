use std::any::Any;
use std::fmt::{self, Display};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexMap;
use parking_lot::Mutex;
use scopebus_converter::{ConverterSelectionStrategy, DataType};
use scopebus_messaging::{Factory, Scope};
use tracing::{info, instrument};

use crate::config::{MethodOptions, ServerConfig};
use crate::error::{Error, Result};
use crate::method::{Invoke, LocalMethod, async_invoke, blocking_invoke};

/// Serves methods below a scope.
///
/// Each method `name` receives requests on `<scope>/<name>/`. Requests are
/// dispatched on their own tasks; a method without
/// [`MethodOptions::allow_parallel_execution`] runs one invocation at a time.
pub struct LocalServer<W: Send + Sync + 'static> {
    scope: Scope,
    factory: Factory<W>,
    config: ServerConfig,
    methods: Mutex<IndexMap<String, Arc<LocalMethod>>>,
    active: AtomicBool,
}

impl<W: Send + Sync + 'static> LocalServer<W> {
    /// Creates an inactive server without methods.
    pub fn new(factory: Factory<W>, scope: Scope, config: ServerConfig) -> Self {
        Self {
            scope,
            factory,
            config,
            methods: Mutex::new(IndexMap::new()),
            active: AtomicBool::new(false),
        }
    }

    /// The scope below which methods are served.
    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Method names in registration order.
    #[must_use]
    pub fn methods(&self) -> Vec<String> {
        self.methods.lock().keys().cloned().collect()
    }

    /// Whether the server dispatches requests.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Registers an async handler with the server's default method options.
    ///
    /// # Errors
    ///
    /// See [`LocalServer::add_method_with_options`].
    pub async fn add_method<A, R, E, F, Fut>(&self, name: &str, handler: F) -> Result<()>
    where
        A: Any + Send + Sync + Clone,
        R: Any + Send + Sync,
        E: Display,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
    {
        self.add_method_with_options(name, handler, self.config.default_method_options)
            .await
    }

    /// Registers an async handler.
    ///
    /// An `Err` returned by the handler is sent to the caller as an error
    /// reply, using its `Display` output as message.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::DuplicateMethod`] if `name` is taken, with a
    /// converter error if `A` or `R` cannot be transported, or with a bus
    /// error if `name` is not a valid scope component or the server is
    /// active and the method cannot be activated.
    pub async fn add_method_with_options<A, R, E, F, Fut>(
        &self,
        name: &str,
        handler: F,
        options: MethodOptions,
    ) -> Result<()>
    where
        A: Any + Send + Sync + Clone,
        R: Any + Send + Sync,
        E: Display,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
    {
        self.register(
            name,
            DataType::of::<A>(),
            DataType::of::<R>(),
            async_invoke(handler),
            options,
        )
        .await
    }

    /// Registers a blocking handler with the server's default method options.
    ///
    /// # Errors
    ///
    /// See [`LocalServer::add_method_with_options`].
    pub async fn add_function<A, R, E, F>(&self, name: &str, handler: F) -> Result<()>
    where
        A: Any + Send + Sync + Clone,
        R: Any + Send + Sync,
        E: Display,
        F: Fn(A) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        self.add_function_with_options(name, handler, self.config.default_method_options)
            .await
    }

    /// Registers a blocking handler. It runs on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// See [`LocalServer::add_method_with_options`].
    pub async fn add_function_with_options<A, R, E, F>(
        &self,
        name: &str,
        handler: F,
        options: MethodOptions,
    ) -> Result<()>
    where
        A: Any + Send + Sync + Clone,
        R: Any + Send + Sync,
        E: Display,
        F: Fn(A) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        self.register(
            name,
            DataType::of::<A>(),
            DataType::of::<R>(),
            blocking_invoke(handler),
            options,
        )
        .await
    }

    #[instrument(skip(self, invoke), fields(server = %self.scope))]
    async fn register(
        &self,
        name: &str,
        argument_type: DataType,
        result_type: DataType,
        invoke: Invoke,
        options: MethodOptions,
    ) -> Result<()> {
        let scope = self.scope.child(name)?;
        let converters = self.factory.converters();
        converters.get_converter_for_data_type(&argument_type)?;
        converters.get_converter_for_data_type(&result_type)?;

        let method = Arc::new(LocalMethod::new(
            name,
            scope,
            argument_type,
            result_type,
            invoke,
            options,
        ));
        {
            let mut methods = self.methods.lock();
            if methods.contains_key(name) {
                return Err(Error::DuplicateMethod(name.to_string()));
            }
            methods.insert(name.to_string(), Arc::clone(&method));
        }

        if self.is_active() {
            method.activate(&self.factory).await?;
        }
        info!("registered method {}", name);
        Ok(())
    }

    /// Starts dispatching requests to all methods.
    ///
    /// # Errors
    ///
    /// Returns the bus error of the first method that fails to activate.
    #[instrument(skip(self), fields(server = %self.scope))]
    pub async fn activate(&self) -> Result<()> {
        self.active.store(true, Ordering::Release);
        for method in self.snapshot() {
            method.activate(&self.factory).await?;
        }
        info!("server active");
        Ok(())
    }

    /// Stops dispatching. Invocations in flight still reply.
    ///
    /// # Errors
    ///
    /// Returns the bus error of the first method that fails to deactivate.
    #[instrument(skip(self), fields(server = %self.scope))]
    pub async fn deactivate(&self) -> Result<()> {
        self.active.store(false, Ordering::Release);
        for method in self.snapshot() {
            method.deactivate().await?;
        }
        info!("server inactive");
        Ok(())
    }

    fn snapshot(&self) -> Vec<Arc<LocalMethod>> {
        self.methods.lock().values().cloned().collect()
    }
}

impl<W: Send + Sync + 'static> fmt::Debug for LocalServer<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalServer")
            .field("scope", &self.scope)
            .field("active", &self.is_active())
            .field("methods", &self.snapshot())
            .finish_non_exhaustive()
    }
}
