//! Error types for remote procedure calls.

use std::fmt;
use std::time::Duration;

use scopebus_converter::DataType;
use thiserror::Error;

/// Result type alias for RPC operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for RPC operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Errors of the underlying bus.
    #[error(transparent)]
    Messaging(#[from] scopebus_messaging::Error),

    /// Converter lookup or conversion errors.
    #[error(transparent)]
    Converter(#[from] scopebus_converter::Error),

    /// A method with this name is already registered on the server.
    #[error("method `{0}` is already registered")]
    DuplicateMethod(String),

    /// The remote side answered with an error reply.
    #[error("remote call of `{method}` failed ({kind}): {message}")]
    RemoteInvocation {
        /// Name of the called method.
        method: String,
        /// What went wrong on the remote side.
        kind: ErrorKind,
        /// Error message sent by the remote side.
        message: String,
    },

    /// No reply arrived in time.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The method was deactivated.
    #[error("method is not active")]
    Inactive,

    /// The reply channel was dropped before a reply arrived.
    #[error("Channel closed")]
    ChannelClosed,

    /// The reply payload does not have the declared result type.
    #[error("reply of `{method}` carries `{actual}`, expected `{expected}`")]
    UnexpectedReply {
        /// Name of the called method.
        method: String,
        /// Declared result type.
        expected: DataType,
        /// Type of the received payload.
        actual: DataType,
    },

    /// The result of the call was already taken from the future.
    #[error("result already taken")]
    ResultTaken,
}

/// Classification of error replies, sent as the `rpc:error-kind` user info.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The handler returned an error.
    Handler,
    /// The handler panicked.
    Panic,
    /// The request payload had the wrong type.
    Argument,
    /// The result could not be serialized.
    Conversion,
}

impl ErrorKind {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Handler => "handler",
            Self::Panic => "panic",
            Self::Argument => "argument",
            Self::Conversion => "conversion",
        }
    }

    /// Parses the wire representation. Unknown values are treated as
    /// [`ErrorKind::Handler`].
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "panic" => Self::Panic,
            "argument" => Self::Argument,
            "conversion" => Self::Conversion,
            _ => Self::Handler,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_wire_names() {
        for kind in [
            ErrorKind::Handler,
            ErrorKind::Panic,
            ErrorKind::Argument,
            ErrorKind::Conversion,
        ] {
            assert_eq!(ErrorKind::from_wire(kind.as_str()), kind);
        }
        assert_eq!(ErrorKind::from_wire("something-else"), ErrorKind::Handler);
    }

    #[test]
    fn test_remote_invocation_display() {
        let error = Error::RemoteInvocation {
            method: "addone".to_string(),
            kind: ErrorKind::Panic,
            message: "boom".to_string(),
        };
        assert_eq!(error.to_string(), "remote call of `addone` failed (panic): boom");
    }
}
