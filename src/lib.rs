//! pollkv: a single-threaded key-value server.
//!
//! One event loop multiplexes the listening socket and every client
//! connection over a single readiness wait, and serves a two-verb text
//! protocol against an in-memory store:
//! - `SET <key> <value...>` stores a value
//! - `GET <key>` reads it back
//!
//! Configuration via CLI arguments or TOML file; an interactive client
//! ships alongside the server.

pub mod client;
pub mod config;
pub mod protocol;
pub mod runtime;
pub mod storage;
