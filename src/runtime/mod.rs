//! Single-threaded runtime for the key-value server.
//!
//! Readiness-based I/O using mio (epoll on Linux, kqueue on macOS):
//! - `ConnectionTable`: every monitored socket with its role and interest
//! - `listener`: bind setup and accept draining
//! - `EventLoop`: the wait/dispatch loop that owns table and store

mod connection;
mod event_loop;
mod listener;

pub use connection::{Connection, ConnectionTable, Handle, Readiness, Role};
pub use event_loop::EventLoop;

use crate::config::Config;
use crate::storage::Store;

/// Bind and serve until a fatal error.
pub fn run<S: Store>(config: &Config, store: S) -> std::io::Result<()> {
    let mut event_loop = EventLoop::bind(config, store)?;
    event_loop.run()
}
