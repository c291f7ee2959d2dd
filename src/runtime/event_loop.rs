//! mio event loop implementation.
//!
//! Readiness-based model: one wait covers the listener and every client,
//! then each ready entry is serviced with non-blocking syscalls. The loop
//! owns the connection table and the store; nothing else touches either.
//!
//! Each readable event gets exactly one bounded read, and the bytes from
//! that read are processed as one command. There is no reassembly of
//! commands split across reads and no splitting of several commands that
//! arrive together.

use crate::config::Config;
use crate::protocol;
use crate::runtime::connection::{ConnectionTable, Handle, Readiness, Role};
use crate::runtime::listener;
use crate::storage::Store;
use mio::{Events, Poll, Token};
use std::io::{self, Read};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Single-threaded server loop.
pub struct EventLoop<S> {
    poll: Poll,
    events: Events,
    table: ConnectionTable,
    listener: Token,
    local_addr: SocketAddr,
    store: S,
    /// Fixed read buffer shared by all connections.
    buffer: Vec<u8>,
    timeout: Option<Duration>,
}

impl<S: Store> EventLoop<S> {
    /// Bind the listener and register it as the first table entry.
    ///
    /// Any failure here is a setup error: the server cannot run without
    /// its listening socket.
    pub fn bind(config: &Config, store: S) -> io::Result<Self> {
        let listener = listener::bind(config.listen, config.backlog)?;
        let local_addr = listener.local_addr()?;

        let poll = Poll::new()?;
        let mut table = ConnectionTable::new();
        let listener = table.add(poll.registry(), Handle::Listener(listener), None)?;

        info!(
            addr = %local_addr,
            backlog = config.backlog,
            buffer_size = config.buffer_size,
            "Listening"
        );

        Ok(Self {
            poll,
            events: Events::with_capacity(config.max_events),
            table,
            listener,
            local_addr,
            store,
            buffer: vec![0u8; config.buffer_size],
            timeout: config.poll_timeout,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn table(&self) -> &ConnectionTable {
        &self.table
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Serve forever. Only a fatal wait or registration error returns.
    pub fn run(&mut self) -> io::Result<()> {
        let timeout = self.timeout;
        loop {
            self.turn(timeout)?;
        }
    }

    /// One wait followed by one pass over the ready entries.
    ///
    /// Returns the number of entries serviced.
    pub fn turn(&mut self, timeout: Option<Duration>) -> io::Result<usize> {
        self.wait(timeout)?;

        for event in self.events.iter() {
            let readiness = Readiness::from_event(event);
            if !self.table.record(event.token(), readiness) {
                trace!(token = event.token().0, "Readiness for closed entry ignored");
            }
        }

        let ready = self.table.take_ready();
        let serviced = ready.len();

        for (token, readiness) in ready {
            if token == self.listener {
                self.accept_pending(readiness)?;
            } else if let Err(e) = self.service_client(token, readiness) {
                self.close(token, &e);
            }
        }

        Ok(serviced)
    }

    /// Block until some entry is ready, retrying when a signal interrupts
    /// the wait.
    fn wait(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        loop {
            match self.poll.poll(&mut self.events, timeout) {
                Ok(()) => return Ok(()),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {
                    trace!("Wait interrupted, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn accept_pending(&mut self, readiness: Readiness) -> io::Result<()> {
        if !readiness.readable {
            warn!(?readiness, "Unexpected listener readiness");
            return Ok(());
        }

        let accepted = match self.table.get(self.listener).and_then(|c| c.listener()) {
            Some(listener) => listener::drain(listener),
            None => return Ok(()),
        };

        for (stream, peer) in accepted {
            match self
                .table
                .add(self.poll.registry(), Handle::Client(stream), Some(peer))
            {
                Ok(token) => debug!(conn_id = token.0, peer = %peer, "Accepted connection"),
                Err(e) => warn!(peer = %peer, error = %e, "Failed to register connection"),
            }
        }

        // Connections still queued after a hard accept error need a fresh event.
        self.table.rearm(self.poll.registry(), self.listener)
    }

    /// Service one ready client. Any error means the connection is done.
    fn service_client(&mut self, token: Token, readiness: Readiness) -> io::Result<()> {
        if readiness.is_hangup() {
            return Err(io::Error::new(io::ErrorKind::ConnectionAborted, "hangup"));
        }

        let conn = self
            .table
            .get_mut(token)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "connection not found"))?;
        debug_assert_eq!(conn.role(), Role::Client);

        if readiness.writable {
            conn.flush()?;
        }

        // Input waits in the socket until queued output drains; the rearm
        // below switches back to readable and re-reports it.
        if readiness.readable && !conn.has_pending() {
            let stream = conn
                .stream_mut()
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "not a client"))?;

            let n = match stream.read(&mut self.buffer) {
                Ok(0) => {
                    return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "peer closed"));
                }
                Ok(n) => n,
                Err(ref e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::Interrupted =>
                {
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            let response = protocol::process(&self.buffer[..n], &mut self.store);
            response.write_to(conn.output());
            conn.flush()?;
        }

        self.table.rearm(self.poll.registry(), token)
    }

    fn close(&mut self, token: Token, reason: &io::Error) {
        if let Some(conn) = self.table.remove(self.poll.registry(), token) {
            debug!(
                conn_id = token.0,
                peer = ?conn.peer(),
                reason = %reason,
                "Connection closed"
            );
        }
    }
}
