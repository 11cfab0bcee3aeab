use std::any::Any;
use std::fmt::{self, Display};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use scopebus_converter::{DataType, Payload};
use scopebus_messaging::{Event, Factory, Informer, Listener, MethodFilter, Scope, ScopeFilter};
use tokio::sync::Mutex;
use tracing::{debug, instrument, trace, warn};

use crate::config::MethodOptions;
use crate::error::{ErrorKind, Result};
use crate::protocol::{self, Failure, REQUEST};

/// Type-erased handler invocation.
pub(crate) type Invoke =
    Arc<dyn Fn(Payload) -> BoxFuture<'static, std::result::Result<Payload, Failure>> + Send + Sync>;

/// Wraps an async handler.
pub(crate) fn async_invoke<A, R, E, F, Fut>(handler: F) -> Invoke
where
    A: Any + Send + Sync + Clone,
    R: Any + Send + Sync,
    E: Display,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
{
    let handler = Arc::new(handler);
    Arc::new(move |payload: Payload| {
        let handler = Arc::clone(&handler);
        async move {
            let argument = take_argument::<A>(payload)?;
            match handler(argument).await {
                Ok(result) => Ok(Payload::new(result)),
                Err(error) => Err(Failure::new(ErrorKind::Handler, error.to_string())),
            }
        }
        .boxed()
    })
}

/// Wraps a blocking handler; it runs on the blocking thread pool.
pub(crate) fn blocking_invoke<A, R, E, F>(handler: F) -> Invoke
where
    A: Any + Send + Sync + Clone,
    R: Any + Send + Sync,
    E: Display,
    F: Fn(A) -> std::result::Result<R, E> + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    Arc::new(move |payload: Payload| {
        let handler = Arc::clone(&handler);
        async move {
            let argument = take_argument::<A>(payload)?;
            let outcome =
                tokio::task::spawn_blocking(move || handler(argument).map_err(|error| error.to_string()))
                    .await;
            match outcome {
                Ok(Ok(result)) => Ok(Payload::new(result)),
                Ok(Err(message)) => Err(Failure::new(ErrorKind::Handler, message)),
                Err(join_error) if join_error.is_panic() => {
                    Err(Failure::from_panic(&*join_error.into_panic()))
                }
                Err(join_error) => Err(Failure::new(ErrorKind::Handler, join_error.to_string())),
            }
        }
        .boxed()
    })
}

fn take_argument<A: Any + Send + Sync + Clone>(payload: Payload) -> std::result::Result<A, Failure> {
    payload.downcast::<A>().map(Arc::unwrap_or_clone).map_err(|payload| {
        Failure::new(
            ErrorKind::Argument,
            format!(
                "expected argument of type `{}`, got `{}`",
                DataType::of::<A>(),
                payload.data_type()
            ),
        )
    })
}

/// What a request handler task needs; shared with the listener.
struct Dispatch {
    name: String,
    invoke: Invoke,
    exclusive: Option<Mutex<()>>,
}

impl Dispatch {
    #[instrument(skip(self, request, informer), fields(method = %self.name))]
    async fn handle(&self, request: Event, informer: &Informer) {
        let Some(request_id) = request.id else {
            warn!("dropping request without id");
            return;
        };

        let outcome = {
            let _guard = match &self.exclusive {
                Some(lock) => Some(lock.lock().await),
                None => None,
            };
            trace!("invoking for request {}", request_id);
            AssertUnwindSafe((self.invoke)(request.data))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(Failure::from_panic(&*panic)))
        };

        if let Err(failure) = &outcome {
            debug!("request {} failed ({}): {}", request_id, failure.kind, failure.message);
        }

        let scope = informer.scope().clone();
        match informer
            .publish_event(protocol::reply(scope.clone(), request_id, outcome))
            .await
        {
            Ok(_) => {}
            Err(scopebus_messaging::Error::Converter(error)) => {
                warn!("result of request {} not serializable: {}", request_id, error);
                let failure = Failure::new(ErrorKind::Conversion, error.to_string());
                if let Err(error) = informer
                    .publish_event(protocol::reply(scope, request_id, Err(failure)))
                    .await
                {
                    warn!("failed to reply to request {}: {}", request_id, error);
                }
            }
            Err(error) => warn!("failed to reply to request {}: {}", request_id, error),
        }
    }

    /// Answers a request whose argument cannot be decoded.
    fn reject(&self, informer: &Arc<Informer>, error: &scopebus_messaging::Error) {
        let scopebus_messaging::Error::Undecodable {
            id,
            scope,
            method,
            source,
            ..
        } = error
        else {
            return;
        };
        if scope != informer.scope() || method.as_deref() != Some(REQUEST) {
            return;
        }

        warn!("argument of request {} to {} cannot be decoded: {}", id, self.name, source);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no runtime to reply to request {}", id);
            return;
        };
        let reply = protocol::reply(
            scope.clone(),
            *id,
            Err(Failure::new(ErrorKind::Conversion, source.to_string())),
        );
        let informer = Arc::clone(informer);
        let request_id = *id;
        runtime.spawn(async move {
            if let Err(error) = informer.publish_event(reply).await {
                warn!("failed to reply to request {}: {}", request_id, error);
            }
        });
    }
}

/// A method registered on a [`crate::LocalServer`].
pub(crate) struct LocalMethod {
    scope: Scope,
    argument_type: DataType,
    result_type: DataType,
    dispatch: Arc<Dispatch>,
    listener: Mutex<Option<Listener>>,
}

impl LocalMethod {
    pub(crate) fn new(
        name: &str,
        scope: Scope,
        argument_type: DataType,
        result_type: DataType,
        invoke: Invoke,
        options: MethodOptions,
    ) -> Self {
        Self {
            scope,
            argument_type,
            result_type,
            dispatch: Arc::new(Dispatch {
                name: name.to_string(),
                invoke,
                exclusive: (!options.allow_parallel_execution).then(|| Mutex::new(())),
            }),
            listener: Mutex::new(None),
        }
    }

    /// Starts receiving requests. Does nothing if already active.
    pub(crate) async fn activate<W: Send + Sync + 'static>(&self, factory: &Factory<W>) -> Result<()> {
        let mut active = self.listener.lock().await;
        if active.is_some() {
            return Ok(());
        }

        let informer = Arc::new(factory.create_informer(self.scope.clone()).await?);
        let listener = factory.create_listener(self.scope.clone()).await?;
        // Requests for methods of servers nested below this one share the
        // route but not the scope.
        listener
            .add_filter(Arc::new(ScopeFilter::exact(self.scope.clone())))
            .await?;
        listener
            .add_filter(Arc::new(MethodFilter::new(REQUEST)))
            .await?;

        listener.set_error_action(Some(Arc::new({
            let dispatch = Arc::clone(&self.dispatch);
            let informer = Arc::clone(&informer);
            move |error: &scopebus_messaging::Error| dispatch.reject(&informer, error)
        })));

        let dispatch = Arc::clone(&self.dispatch);
        listener.add_handler(Arc::new(move |request: Event| {
            let dispatch = Arc::clone(&dispatch);
            let informer = Arc::clone(&informer);
            async move {
                tokio::spawn(async move { dispatch.handle(request, &informer).await });
            }
        }));

        debug!("method {} active on {}", self.dispatch.name, self.scope);
        *active = Some(listener);
        Ok(())
    }

    /// Stops receiving requests. Invocations in flight still reply.
    pub(crate) async fn deactivate(&self) -> Result<()> {
        let Some(listener) = self.listener.lock().await.take() else {
            return Ok(());
        };

        listener.deactivate().await?;
        debug!("method {} deactivated", self.dispatch.name);
        Ok(())
    }
}

impl fmt::Debug for LocalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalMethod")
            .field("name", &self.dispatch.name)
            .field("scope", &self.scope)
            .field("argument_type", &self.argument_type)
            .field("result_type", &self.result_type)
            .field("parallel", &self.dispatch.exclusive.is_none())
            .finish_non_exhaustive()
    }
}
