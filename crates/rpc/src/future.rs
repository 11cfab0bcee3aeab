use std::any::Any;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use dashmap::DashMap;
use scopebus_messaging::{Event, EventId};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::error::{Error, Result};
use crate::protocol::decode_reply;

/// A reply event, or the reason it could not be decoded.
pub(crate) type Reply = std::result::Result<Event, scopebus_converter::Error>;

/// Calls awaiting their reply, keyed by request id.
pub(crate) type PendingCalls = Arc<DashMap<EventId, oneshot::Sender<Reply>>>;

/// The pending result of an asynchronous call.
///
/// Await it directly or use [`RpcFuture::get`]; [`RpcFuture::get_timeout`]
/// and [`RpcFuture::try_get`] leave the future usable when no reply has
/// arrived yet. Dropping the future abandons the call.
pub struct RpcFuture<R> {
    method: String,
    request_id: EventId,
    receiver: Option<oneshot::Receiver<Reply>>,
    pending: PendingCalls,
    _result: PhantomData<fn() -> R>,
}

impl<R: Any + Send + Sync + Clone> RpcFuture<R> {
    pub(crate) const fn new(
        method: String,
        request_id: EventId,
        receiver: oneshot::Receiver<Reply>,
        pending: PendingCalls,
    ) -> Self {
        Self {
            method,
            request_id,
            receiver: Some(receiver),
            pending,
            _result: PhantomData,
        }
    }

    /// Id of the request event.
    #[must_use]
    pub const fn request_id(&self) -> EventId {
        self.request_id
    }

    /// Waits for the result.
    ///
    /// # Errors
    ///
    /// Returns the remote error, a converter error if the reply could not be
    /// decoded, or [`Error::UnexpectedReply`] if the reply has another type
    /// than `R`.
    pub async fn get(self) -> Result<R> {
        self.await
    }

    /// Waits at most `timeout` for the result.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Timeout`] if no reply arrived in time; the future
    /// can then be waited on again. Otherwise as [`RpcFuture::get`].
    pub async fn get_timeout(&mut self, timeout: Duration) -> Result<R> {
        let receiver = self.receiver.as_mut().ok_or(Error::ResultTaken)?;
        let reply = tokio::time::timeout(timeout, receiver)
            .await
            .map_err(|_| Error::Timeout(timeout))?;
        self.receiver = None;
        self.complete(reply.ok())
    }

    /// Returns the result if the reply has arrived, without waiting.
    pub fn try_get(&mut self) -> Option<Result<R>> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Some(Err(Error::ResultTaken));
        };
        let reply = match receiver.try_recv() {
            Ok(reply) => Some(reply),
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => None,
        };
        self.receiver = None;
        Some(self.complete(reply))
    }

    fn complete(&self, reply: Option<Reply>) -> Result<R> {
        let reply = reply.ok_or(Error::ChannelClosed)??;
        decode_reply(&self.method, reply)
    }
}

impl<R: Any + Send + Sync + Clone> Future for RpcFuture<R> {
    type Output = Result<R>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let Some(receiver) = this.receiver.as_mut() else {
            return Poll::Ready(Err(Error::ResultTaken));
        };
        let reply = ready!(Pin::new(receiver).poll(cx));
        this.receiver = None;
        Poll::Ready(this.complete(reply.ok()))
    }
}

impl<R> Drop for RpcFuture<R> {
    fn drop(&mut self) {
        self.pending.remove(&self.request_id);
    }
}

impl<R> fmt::Debug for RpcFuture<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcFuture")
            .field("method", &self.method)
            .field("request_id", &self.request_id)
            .field("done", &self.receiver.is_none())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use scopebus_messaging::Scope;
    use uuid::Uuid;

    use crate::protocol::REPLY;

    fn pending_future(pending: &PendingCalls) -> RpcFuture<i64> {
        let request_id = EventId::new(Uuid::new_v4(), 0);
        let (sender, receiver) = oneshot::channel();
        pending.insert(request_id, sender);
        RpcFuture::new("addone".to_string(), request_id, receiver, Arc::clone(pending))
    }

    fn complete(pending: &PendingCalls, request_id: EventId, value: i64) {
        let (_, sender) = pending.remove(&request_id).unwrap();
        let reply = Event::with_data(Scope::root(), value)
            .with_method(REPLY)
            .with_cause(request_id);
        sender.send(Ok(reply)).unwrap();
    }

    #[tokio::test]
    async fn test_get_timeout_can_be_retried() {
        let pending = PendingCalls::default();
        let mut future = pending_future(&pending);

        assert!(matches!(
            future.get_timeout(Duration::from_millis(10)).await,
            Err(Error::Timeout(_))
        ));
        assert!(future.try_get().is_none());

        complete(&pending, future.request_id(), 42);

        assert_eq!(future.get_timeout(Duration::from_secs(1)).await.unwrap(), 42);
        assert!(matches!(future.try_get(), Some(Err(Error::ResultTaken))));
    }

    #[tokio::test]
    async fn test_await() {
        let pending = PendingCalls::default();
        let future = pending_future(&pending);

        complete(&pending, future.request_id(), 1);

        assert_eq!(future.await.unwrap(), 1);
    }

    #[test]
    fn test_drop_evicts_pending_entry() {
        let pending = PendingCalls::default();
        let future = pending_future(&pending);
        assert_eq!(pending.len(), 1);

        drop(future);

        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_reply() {
        let pending = PendingCalls::default();
        let future = pending_future(&pending);
        let (_, sender) = pending.remove(&future.request_id()).unwrap();

        let failure = scopebus_converter::Error::UnknownConverter(
            scopebus_converter::ConverterQuery::WireSchema("double".to_string()),
        );
        sender.send(Err(failure)).unwrap();

        assert!(matches!(
            future.await,
            Err(Error::Converter(scopebus_converter::Error::UnknownConverter(_)))
        ));
    }

    #[test]
    fn test_abandoned_reply_channel() {
        let pending = PendingCalls::default();
        let mut future = pending_future(&pending);

        pending.clear();

        assert!(matches!(future.try_get(), Some(Err(Error::ChannelClosed))));
    }
}
