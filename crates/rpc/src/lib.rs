//! Request/reply calls over the scope bus.
//!
//! A [`LocalServer`] exposes methods below a scope; a [`RemoteServer`] on the
//! same bus calls them. Arguments and results are ordinary bus payloads, so
//! any type with a registered converter can be passed.
//!
//! # Example
//!
//! ```no_run
//! use std::convert::Infallible;
//! use std::sync::Arc;
//!
//! use scopebus_messaging::{Factory, Scope};
//! use scopebus_messaging_memory::MemoryBus;
//! use scopebus_rpc::{ClientConfig, LocalServer, RemoteServer, ServerConfig};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let factory = Factory::new(Arc::new(MemoryBus::global()));
//!     let scope = Scope::new("/calculator")?;
//!
//!     let server = LocalServer::new(factory.clone(), scope.clone(), ServerConfig::default());
//!     server
//!         .add_method("addone", |x: i64| async move { Ok::<_, Infallible>(x + 1) })
//!         .await?;
//!     server.activate().await?;
//!
//!     let client = RemoteServer::new(factory, scope, ClientConfig::default());
//!     let result: i64 = client.call("addone", 41_i64).await?;
//!     assert_eq!(result, 42);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod client;
pub mod config;
pub mod error;
mod future;
mod method;
pub mod protocol;
mod server;

pub use client::{RemoteMethod, RemoteServer};
pub use config::{ClientConfig, MethodOptions, ServerConfig};
pub use error::{Error, ErrorKind, Result};
pub use future::RpcFuture;
pub use server::LocalServer;
