use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use scopebus_converter::{ConverterSelectionStrategy, DataType, Payload};
use scopebus_messaging::{Event, Factory, Informer, Listener, MethodFilter, Scope, ScopeFilter};
use tokio::sync::{OnceCell, oneshot};
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::future::{PendingCalls, RpcFuture};
use crate::protocol::{REPLY, REQUEST};

/// Bus participants of one remote method, created on first call.
struct Endpoint {
    informer: Informer,
    listener: Listener,
}

struct MethodCore<W: Send + Sync + 'static> {
    name: String,
    scope: Scope,
    factory: Factory<W>,
    pending: PendingCalls,
    endpoint: OnceCell<Endpoint>,
    active: AtomicBool,
}

impl<W: Send + Sync + 'static> MethodCore<W> {
    async fn endpoint(&self) -> Result<&Endpoint> {
        self.endpoint
            .get_or_try_init(|| async {
                let listener = self.factory.create_listener(self.scope.clone()).await?;
                listener
                    .add_filter(Arc::new(ScopeFilter::exact(self.scope.clone())))
                    .await?;
                listener
                    .add_filter(Arc::new(MethodFilter::new(REPLY)))
                    .await?;

                let pending = Arc::clone(&self.pending);
                listener.add_handler(Arc::new(move |reply: Event| {
                    let pending = Arc::clone(&pending);
                    async move { complete(&pending, reply) }
                }));
                listener.set_error_action(Some(Arc::new({
                    let pending = Arc::clone(&self.pending);
                    let scope = self.scope.clone();
                    move |error: &scopebus_messaging::Error| fail(&pending, &scope, error)
                })));

                let informer = self.factory.create_informer(self.scope.clone()).await?;
                debug!("remote method {} connected on {}", self.name, self.scope);
                Ok::<_, Error>(Endpoint { informer, listener })
            })
            .await
    }

    async fn deactivate(&self) -> Result<()> {
        self.active.store(false, Ordering::Release);
        if let Some(endpoint) = self.endpoint.get() {
            endpoint.listener.deactivate().await?;
            endpoint.informer.deactivate().await?;
        }
        self.pending.clear();
        Ok(())
    }
}

fn complete(pending: &PendingCalls, reply: Event) {
    let sender = reply
        .causes
        .iter()
        .find_map(|cause| pending.remove(cause).map(|(_, sender)| sender));

    match sender {
        Some(sender) => {
            if sender.send(Ok(reply)).is_err() {
                debug!("caller stopped waiting for the reply");
            }
        }
        None => debug!("dropping reply {} without pending call", reply),
    }
}

/// Fails the pending call an undecodable reply belongs to.
fn fail(pending: &PendingCalls, scope: &Scope, error: &scopebus_messaging::Error) {
    let scopebus_messaging::Error::Undecodable {
        id,
        scope: reply_scope,
        method,
        causes,
        source,
    } = error
    else {
        return;
    };
    if reply_scope != scope || method.as_deref() != Some(REPLY) {
        return;
    }

    let sender = causes
        .iter()
        .find_map(|cause| pending.remove(cause).map(|(_, sender)| sender));
    match sender {
        Some(sender) => {
            warn!("reply {} cannot be decoded: {}", id, source);
            if sender.send(Err(source.clone())).is_err() {
                debug!("caller stopped waiting for the reply");
            }
        }
        None => debug!("dropping undecodable reply {} without pending call", id),
    }
}

/// Calls methods of a server on another participant.
pub struct RemoteServer<W: Send + Sync + 'static> {
    scope: Scope,
    factory: Factory<W>,
    config: ClientConfig,
    methods: Mutex<HashMap<String, Arc<MethodCore<W>>>>,
}

impl<W: Send + Sync + 'static> RemoteServer<W> {
    /// Creates a client for the server on `scope`.
    pub fn new(factory: Factory<W>, scope: Scope, config: ClientConfig) -> Self {
        Self {
            scope,
            factory,
            config,
            methods: Mutex::new(HashMap::new()),
        }
    }

    /// The scope of the remote server.
    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Declares method `name` taking `A` and returning `R`.
    ///
    /// Methods of the same name share their bus participants and pending
    /// calls.
    ///
    /// # Errors
    ///
    /// Fails if `name` is not a valid scope component, or with
    /// [`scopebus_converter::Error::UnknownConverter`] if `A` or `R` has no
    /// converter.
    pub fn method<A, R>(&self, name: &str) -> Result<RemoteMethod<W, A, R>>
    where
        A: Any + Send + Sync,
        R: Any + Send + Sync + Clone,
    {
        let converters = self.factory.converters();
        converters.get_converter_for_data_type(&DataType::of::<A>())?;
        converters.get_converter_for_data_type(&DataType::of::<R>())?;

        let mut methods = self.methods.lock();
        let core = if let Some(core) = methods.get(name) {
            Arc::clone(core)
        } else {
            let core = Arc::new(MethodCore {
                name: name.to_string(),
                scope: self.scope.child(name)?,
                factory: self.factory.clone(),
                pending: PendingCalls::default(),
                endpoint: OnceCell::new(),
                active: AtomicBool::new(true),
            });
            methods.insert(name.to_string(), Arc::clone(&core));
            core
        };

        Ok(RemoteMethod {
            core,
            timeout: self.config.default_timeout,
            _signature: PhantomData,
        })
    }

    /// Calls `name` and waits for the result.
    ///
    /// # Errors
    ///
    /// See [`RemoteMethod::call`].
    pub async fn call<A, R>(&self, name: &str, argument: A) -> Result<R>
    where
        A: Any + Send + Sync,
        R: Any + Send + Sync + Clone,
    {
        self.method::<A, R>(name)?.call(argument).await
    }

    /// Calls `name` without waiting for the result.
    ///
    /// # Errors
    ///
    /// See [`RemoteMethod::call_async`].
    pub async fn call_async<A, R>(&self, name: &str, argument: A) -> Result<RpcFuture<R>>
    where
        A: Any + Send + Sync,
        R: Any + Send + Sync + Clone,
    {
        self.method::<A, R>(name)?.call_async(argument).await
    }

    /// Disconnects all methods. Pending calls fail with
    /// [`Error::ChannelClosed`], further calls with [`Error::Inactive`].
    ///
    /// # Errors
    ///
    /// Returns the bus error of the first method that fails to deactivate.
    pub async fn deactivate(&self) -> Result<()> {
        let methods: Vec<_> = self.methods.lock().values().cloned().collect();
        for method in methods {
            method.deactivate().await?;
        }
        Ok(())
    }
}

impl<W: Send + Sync + 'static> fmt::Debug for RemoteServer<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteServer")
            .field("scope", &self.scope)
            .field("methods", &self.methods.lock().keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A method of a [`RemoteServer`] taking `A` and returning `R`.
pub struct RemoteMethod<W: Send + Sync + 'static, A, R> {
    core: Arc<MethodCore<W>>,
    timeout: Duration,
    _signature: PhantomData<fn(A) -> R>,
}

impl<W, A, R> RemoteMethod<W, A, R>
where
    W: Send + Sync + 'static,
    A: Any + Send + Sync,
    R: Any + Send + Sync + Clone,
{
    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Number of calls of this method awaiting their reply.
    #[must_use]
    pub fn pending_calls(&self) -> usize {
        self.core.pending.len()
    }

    /// Calls the method and waits up to the configured timeout.
    ///
    /// # Errors
    ///
    /// See [`RemoteMethod::call_with_timeout`].
    pub async fn call(&self, argument: A) -> Result<R> {
        self.call_with_timeout(argument, self.timeout).await
    }

    /// Calls the method and waits up to `timeout`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Timeout`] if no reply arrived in time, with
    /// [`Error::RemoteInvocation`] if the server replied with an error, or
    /// as [`RemoteMethod::call_async`].
    pub async fn call_with_timeout(&self, argument: A, timeout: Duration) -> Result<R> {
        self.call_async(argument).await?.get_timeout(timeout).await
    }

    /// Publishes the request and returns without waiting for the reply.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Inactive`] after [`RemoteServer::deactivate`], or
    /// with the bus error if the request cannot be published.
    #[instrument(skip(self, argument), fields(method = %self.core.name))]
    pub async fn call_async(&self, argument: A) -> Result<RpcFuture<R>> {
        if !self.core.active.load(Ordering::Acquire) {
            return Err(Error::Inactive);
        }
        let endpoint = self.core.endpoint().await?;

        let request_id = endpoint.informer.next_event_id();
        let (sender, receiver) = oneshot::channel();
        self.core.pending.insert(request_id, sender);

        let mut request = Event::new(self.core.scope.clone(), Payload::new(argument)).with_method(REQUEST);
        request.id = Some(request_id);
        if let Err(error) = endpoint.informer.publish_event(request).await {
            self.core.pending.remove(&request_id);
            return Err(error.into());
        }
        debug!("sent request {} ({} pending)", request_id, self.core.pending.len());

        Ok(RpcFuture::new(
            self.core.name.clone(),
            request_id,
            receiver,
            Arc::clone(&self.core.pending),
        ))
    }
}

impl<W: Send + Sync + 'static, A, R> Clone for RemoteMethod<W, A, R> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            timeout: self.timeout,
            _signature: PhantomData,
        }
    }
}

impl<W: Send + Sync + 'static, A, R> fmt::Debug for RemoteMethod<W, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteMethod")
            .field("name", &self.core.name)
            .field("scope", &self.core.scope)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
