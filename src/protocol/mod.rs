//! Plain-text key-value protocol.
//!
//! ## Protocol Format
//!
//! ```text
//! Request:  SET <key> <value...>\n
//! Response: OK\n | ERR setting value\n
//!
//! Request:  GET <key>\n
//! Response: <value>\n | (nil)\n
//!
//! Anything else:
//! Response: ERR unknown command\n
//! ```
//!
//! There is no framing beyond "whatever one read returned": each read is
//! processed as exactly one command.

pub mod handler;
pub mod parser;

pub use handler::{execute, process, Response};
pub use parser::{parse, Command};
