//! In-process transport for the scope bus.
//!
//! A [`MemoryBus`] routes notifications between the [`MemoryPort`]s created
//! from it. Payloads still go through the converters of each port, so the
//! bus exercises the same serialization path as a network transport.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod bus;
mod port;

pub use bus::MemoryBus;
pub use port::MemoryPort;
