//! Server and client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-method dispatch options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodOptions {
    /// Whether invocations of the method may overlap.
    pub allow_parallel_execution: bool,
}

impl MethodOptions {
    /// Options for a method whose invocations may overlap.
    #[must_use]
    pub const fn parallel() -> Self {
        Self {
            allow_parallel_execution: true,
        }
    }
}

/// Configuration for a [`crate::LocalServer`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Options of methods added without explicit options.
    pub default_method_options: MethodOptions,
}

impl ServerConfig {
    /// Set the options of methods added without explicit options.
    #[must_use]
    pub const fn with_default_method_options(mut self, options: MethodOptions) -> Self {
        self.default_method_options = options;
        self
    }
}

/// Configuration for a [`crate::RemoteServer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// How long synchronous calls wait for the reply.
    pub default_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(25),
        }
    }
}

impl ClientConfig {
    /// Set the default call timeout.
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert!(!ServerConfig::default().default_method_options.allow_parallel_execution);
        assert_eq!(ClientConfig::default().default_timeout, Duration::from_secs(25));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let client: ClientConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(client, ClientConfig::default());

        let server: ServerConfig =
            serde_json::from_str(r#"{"default_method_options": {"allow_parallel_execution": true}}"#)
                .unwrap();
        assert_eq!(server.default_method_options, MethodOptions::parallel());
    }
}
