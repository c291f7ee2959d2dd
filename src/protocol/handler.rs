//! Command execution and response encoding.

use super::parser::{parse, Command};
use crate::storage::Store;
use bytes::{BufMut, BytesMut};
use tracing::{trace, warn};

/// Reply sent back for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `OK\n`
    Ok,
    /// `<value>\n`
    Value(Vec<u8>),
    /// `(nil)\n`
    Nil,
    /// `ERR setting value\n`
    SetFailed,
    /// `ERR unknown command\n`
    UnknownCommand,
}

impl Response {
    /// Append the wire form of this response to `out`.
    pub fn write_to(&self, out: &mut BytesMut) {
        match self {
            Response::Ok => out.extend_from_slice(b"OK\n"),
            Response::Value(value) => {
                out.reserve(value.len() + 1);
                out.extend_from_slice(value);
                out.put_u8(b'\n');
            }
            Response::Nil => out.extend_from_slice(b"(nil)\n"),
            Response::SetFailed => out.extend_from_slice(b"ERR setting value\n"),
            Response::UnknownCommand => out.extend_from_slice(b"ERR unknown command\n"),
        }
    }

    /// Wire form of this response in a fresh buffer.
    #[cfg(test)]
    pub fn encode(&self) -> BytesMut {
        let mut out = BytesMut::new();
        self.write_to(&mut out);
        out
    }
}

/// Run a parsed command against the store.
pub fn execute<S: Store + ?Sized>(command: Command, store: &mut S) -> Response {
    match command {
        Command::Set { key, value } => match store.set(&key, &value) {
            Ok(()) => Response::Ok,
            Err(e) => {
                warn!(
                    key = %String::from_utf8_lossy(&key),
                    error = %e,
                    "Failed to store value"
                );
                Response::SetFailed
            }
        },
        Command::Get { key } => match store.get(&key) {
            Some(value) => Response::Value(value.to_vec()),
            None => Response::Nil,
        },
        Command::Unknown => Response::UnknownCommand,
    }
}

/// Parse one read's payload and execute it.
pub fn process<S: Store + ?Sized>(input: &[u8], store: &mut S) -> Response {
    let command = parse(input);
    trace!(?command, "Processing command");
    execute(command, store)
}
