//! Connection table for the event loop.
//!
//! Every monitored socket, the listener included, lives in one slab-backed
//! table keyed by its mio `Token`. Each entry records its role, the
//! readiness interest it is registered with, and the readiness the last
//! wait reported for it.

use bytes::{Buf, BytesMut};
use mio::event::{Event, Source};
use mio::net::{TcpListener, TcpStream};
use mio::{Interest, Registry, Token};
use slab::Slab;
use std::io::{self, Write};
use std::net::SocketAddr;

/// What a table entry is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The bound, listening socket.
    Listener,
    /// An accepted client connection.
    Client,
}

/// Socket owned by a table entry. Dropping it closes the descriptor.
#[derive(Debug)]
pub enum Handle {
    Listener(TcpListener),
    Client(TcpStream),
}

impl Handle {
    pub fn role(&self) -> Role {
        match self {
            Handle::Listener(_) => Role::Listener,
            Handle::Client(_) => Role::Client,
        }
    }
}

impl Source for Handle {
    fn register(&mut self, registry: &Registry, token: Token, interests: Interest) -> io::Result<()> {
        match self {
            Handle::Listener(listener) => listener.register(registry, token, interests),
            Handle::Client(stream) => stream.register(registry, token, interests),
        }
    }

    fn reregister(
        &mut self,
        registry: &Registry,
        token: Token,
        interests: Interest,
    ) -> io::Result<()> {
        match self {
            Handle::Listener(listener) => listener.reregister(registry, token, interests),
            Handle::Client(stream) => stream.reregister(registry, token, interests),
        }
    }

    fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        match self {
            Handle::Listener(listener) => listener.deregister(registry),
            Handle::Client(stream) => stream.deregister(registry),
        }
    }
}

/// Readiness reported for an entry by one wait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,
    pub read_closed: bool,
    pub write_closed: bool,
    pub error: bool,
}

impl Readiness {
    pub fn from_event(event: &Event) -> Self {
        Self {
            readable: event.is_readable(),
            writable: event.is_writable(),
            read_closed: event.is_read_closed(),
            write_closed: event.is_write_closed(),
            error: event.is_error(),
        }
    }

    /// Combine two reports for the same entry.
    pub fn merge(self, other: Readiness) -> Self {
        Self {
            readable: self.readable || other.readable,
            writable: self.writable || other.writable,
            read_closed: self.read_closed || other.read_closed,
            write_closed: self.write_closed || other.write_closed,
            error: self.error || other.error,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Readiness::default()
    }

    /// Error, or both directions closed. A read-side close alone is not a
    /// hangup: the final bytes and the EOF are still delivered by a read.
    pub fn is_hangup(&self) -> bool {
        self.error || (self.read_closed && self.write_closed)
    }
}

/// A single table entry.
#[derive(Debug)]
pub struct Connection {
    handle: Handle,
    interest: Interest,
    readiness: Readiness,
    peer: Option<SocketAddr>,
    /// Response bytes the socket has not accepted yet.
    pending: BytesMut,
}

impl Connection {
    pub fn role(&self) -> Role {
        self.handle.role()
    }

    pub fn interest(&self) -> Interest {
        self.interest
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn listener(&self) -> Option<&TcpListener> {
        match &self.handle {
            Handle::Listener(listener) => Some(listener),
            Handle::Client(_) => None,
        }
    }

    pub fn stream_mut(&mut self) -> Option<&mut TcpStream> {
        match &mut self.handle {
            Handle::Client(stream) => Some(stream),
            Handle::Listener(_) => None,
        }
    }

    /// Output buffer; anything appended is sent by the next `flush`.
    pub fn output(&mut self) -> &mut BytesMut {
        &mut self.pending
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Write as much pending output as the socket accepts without blocking.
    pub fn flush(&mut self) -> io::Result<()> {
        let Handle::Client(stream) = &mut self.handle else {
            return Ok(());
        };

        while !self.pending.is_empty() {
            match stream.write(&self.pending) {
                Ok(0) => {
                    return Err(io::Error::new(io::ErrorKind::WriteZero, "write returned 0"));
                }
                Ok(n) => self.pending.advance(n),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Writable only while output is queued, so a client that stops
    /// reading cannot make the server buffer replies without bound.
    fn wanted_interest(&self) -> Interest {
        if self.has_pending() {
            Interest::WRITABLE
        } else {
            Interest::READABLE
        }
    }
}

/// Registry of every monitored socket.
///
/// Slab keys double as mio tokens, so removing one entry never moves
/// another: a pass over a snapshot of ready tokens cannot skip or revisit
/// a neighbour of a removed entry.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    entries: Slab<Connection>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` for read readiness and store it.
    pub fn add(
        &mut self,
        registry: &Registry,
        mut handle: Handle,
        peer: Option<SocketAddr>,
    ) -> io::Result<Token> {
        let entry = self.entries.vacant_entry();
        let token = Token(entry.key());
        handle.register(registry, token, Interest::READABLE)?;

        entry.insert(Connection {
            handle,
            interest: Interest::READABLE,
            readiness: Readiness::default(),
            peer,
            pending: BytesMut::new(),
        });
        Ok(token)
    }

    /// Deregister and remove an entry. The socket closes when the returned
    /// connection is dropped.
    pub fn remove(&mut self, registry: &Registry, token: Token) -> Option<Connection> {
        let mut conn = self.entries.try_remove(token.0)?;
        let _ = conn.handle.deregister(registry);
        Some(conn)
    }

    pub fn get(&self, token: Token) -> Option<&Connection> {
        self.entries.get(token.0)
    }

    pub fn get_mut(&mut self, token: Token) -> Option<&mut Connection> {
        self.entries.get_mut(token.0)
    }

    pub fn contains(&self, token: Token) -> bool {
        self.entries.contains(token.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn client_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, conn)| conn.role() == Role::Client)
            .count()
    }

    /// Every entry with the interest it is registered for, in token order.
    pub fn snapshot(&self) -> Vec<(Token, Role, Interest)> {
        self.entries
            .iter()
            .map(|(key, conn)| (Token(key), conn.role(), conn.interest))
            .collect()
    }

    /// Record readiness reported by a wait. Returns `false` for a token
    /// with no live entry.
    pub fn record(&mut self, token: Token, readiness: Readiness) -> bool {
        match self.entries.get_mut(token.0) {
            Some(conn) => {
                conn.readiness = conn.readiness.merge(readiness);
                true
            }
            None => false,
        }
    }

    /// Take every entry's recorded readiness, in token order, leaving it
    /// cleared for the next wait.
    pub fn take_ready(&mut self) -> Vec<(Token, Readiness)> {
        self.entries
            .iter_mut()
            .filter(|(_, conn)| !conn.readiness.is_empty())
            .map(|(key, conn)| (Token(key), std::mem::take(&mut conn.readiness)))
            .collect()
    }

    /// Re-register an entry, widening interest to writable while output is
    /// pending. Re-registering also re-arms edge-triggered backends, so data
    /// still queued in the socket produces a fresh readiness event.
    pub fn rearm(&mut self, registry: &Registry, token: Token) -> io::Result<()> {
        let conn = self
            .entries
            .get_mut(token.0)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "connection not found"))?;

        let interest = conn.wanted_interest();
        conn.handle.reregister(registry, token, interest)?;
        conn.interest = interest;
        Ok(())
    }
}
