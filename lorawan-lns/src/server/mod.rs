//! Basics Station-facing network server.

pub mod listener;
pub mod reassembly;
pub mod session;
pub mod transport;

pub use listener::{Server, ServerConfig};
