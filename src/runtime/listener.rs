//! Listening socket setup and connection acceptance.

use mio::net::{TcpListener, TcpStream};
use std::io;
use std::net::SocketAddr;
use tracing::error;

/// Create a non-blocking listener bound to `addr` with `SO_REUSEADDR`.
pub fn bind(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    Ok(TcpListener::from_std(socket.into()))
}

/// Accept every connection currently queued on `listener`.
///
/// Stops at "would block" or at the first hard error; a hard error is
/// logged and leaves the listener usable. mio hands back accepted streams
/// already in non-blocking mode.
pub fn drain(listener: &TcpListener) -> Vec<(TcpStream, SocketAddr)> {
    let mut accepted = Vec::new();
    loop {
        match listener.accept() {
            Ok((stream, peer)) => accepted.push((stream, peer)),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                error!(error = %e, "Accept error");
                break;
            }
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[test]
    fn test_bind_ephemeral_port() {
        let listener = bind(loopback(), 10).unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[test]
    fn test_drain_with_nothing_pending() {
        let listener = bind(loopback(), 10).unwrap();
        assert!(drain(&listener).is_empty());
    }

    #[test]
    fn test_drain_accepts_all_pending() {
        let listener = bind(loopback(), 10).unwrap();
        let addr = listener.local_addr().unwrap();

        let _clients: Vec<std::net::TcpStream> = (0..4)
            .map(|_| std::net::TcpStream::connect(addr).unwrap())
            .collect();

        let mut accepted = Vec::new();
        for _ in 0..100 {
            accepted.extend(drain(&listener));
            if accepted.len() == 4 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(accepted.len(), 4);
        assert!(drain(&listener).is_empty());
    }

    #[test]
    fn test_bind_conflict_is_error() {
        let first = bind(loopback(), 10).unwrap();
        let taken = first.local_addr().unwrap();

        // SO_REUSEADDR does not allow two live listeners on one port.
        assert!(bind(taken, 10).is_err());
    }
}
