//! Request and reply events.
//!
//! A request is published on `<server scope>/<method>/` with method tag
//! [`REQUEST`]. The reply goes to the same scope with method tag [`REPLY`]
//! and the request id among its causes. Error replies carry the message as
//! a `String` payload and the [`ERROR_KIND_KEY`] user info.

use std::any::Any;
use std::sync::Arc;

use scopebus_converter::{DataType, Payload};
use scopebus_messaging::{Event, EventId, Scope};

use crate::error::{Error, ErrorKind, Result};

/// Method tag of request events.
pub const REQUEST: &str = "REQUEST";

/// Method tag of reply events.
pub const REPLY: &str = "REPLY";

/// User info key marking error replies.
pub const ERROR_KIND_KEY: &str = "rpc:error-kind";

/// A failed invocation, sent back as an error reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Failure {
    pub(crate) kind: ErrorKind,
    pub(crate) message: String,
}

impl Failure {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn from_panic(panic: &(dyn Any + Send)) -> Self {
        let message = panic
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "handler panicked".to_string());
        Self::new(ErrorKind::Panic, message)
    }
}

pub(crate) fn reply(scope: Scope, request_id: EventId, outcome: std::result::Result<Payload, Failure>) -> Event {
    let event = match outcome {
        Ok(result) => Event::new(scope, result),
        Err(failure) => Event::with_data(scope, failure.message)
            .with_user_info(ERROR_KIND_KEY, failure.kind.as_str()),
    };
    event.with_method(REPLY).with_cause(request_id)
}

/// Extracts the result of `method` from a reply event.
pub(crate) fn decode_reply<R: Any + Send + Sync + Clone>(method: &str, reply: Event) -> Result<R> {
    if let Some(kind) = reply.meta_data.user_info(ERROR_KIND_KEY) {
        return Err(Error::RemoteInvocation {
            method: method.to_string(),
            kind: ErrorKind::from_wire(kind),
            message: reply
                .data
                .cloned::<String>()
                .unwrap_or_else(|| format!("<{}>", reply.data.data_type())),
        });
    }

    let actual = reply.data.data_type();
    reply
        .data
        .downcast::<R>()
        .map(Arc::unwrap_or_clone)
        .map_err(|_| Error::UnexpectedReply {
            method: method.to_string(),
            expected: DataType::of::<R>(),
            actual,
        })
}
