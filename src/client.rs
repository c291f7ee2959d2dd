//! Interactive client for the pollkv server.
//!
//! Reads commands from stdin one line at a time, sends each as a single
//! newline-terminated request, and prints the server's reply.

use bytes::{BufMut, BytesMut};
use clap::Parser;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info};

const PROMPT: &[u8] = b"> ";

/// Command-line arguments for the client
#[derive(Parser, Debug)]
#[command(name = "pollkv-cli")]
#[command(version)]
#[command(about = "Interactive client for the pollkv server", long_about = None)]
pub struct ClientArgs {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:1234")]
    pub server: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// Run the prompt loop until stdin closes or the user types `quit`/`exit`.
pub async fn run(args: ClientArgs) -> io::Result<()> {
    let mut stream = TcpStream::connect(&args.server).await?;
    info!(server = %args.server, "Connected");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(PROMPT).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
            break;
        }

        let reply = exchange(&mut stream, &line).await?;
        stdout.write_all(&reply).await?;
    }

    debug!("Session ended");
    Ok(())
}

/// Send one command and read until a newline-terminated reply arrives.
///
/// The reply is returned as raw bytes; stored values need not be UTF-8.
pub async fn exchange<S>(stream: &mut S, command: &str) -> io::Result<BytesMut>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut request = BytesMut::with_capacity(command.len() + 1);
    request.extend_from_slice(command.as_bytes());
    request.put_u8(b'\n');
    stream.write_all(&request).await?;

    let mut reply = BytesMut::with_capacity(1024);
    loop {
        if stream.read_buf(&mut reply).await? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            ));
        }
        if reply.ends_with(b"\n") {
            break;
        }
    }

    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_exchange_set() {
        let mut mock = Builder::new().write(b"SET a 1\n").read(b"OK\n").build();
        assert_eq!(&exchange(&mut mock, "SET a 1").await.unwrap()[..], b"OK\n");
    }

    #[tokio::test]
    async fn test_exchange_reply_in_pieces() {
        let mut mock = Builder::new()
            .write(b"GET greeting\n")
            .read(b"hello ")
            .read(b"world\n")
            .build();
        assert_eq!(
            &exchange(&mut mock, "GET greeting").await.unwrap()[..],
            b"hello world\n"
        );
    }

    #[tokio::test]
    async fn test_exchange_keeps_value_spacing() {
        let mut mock = Builder::new()
            .write(b"SET k  a b \n")
            .read(b"OK\n")
            .build();
        assert_eq!(&exchange(&mut mock, "SET k  a b ").await.unwrap()[..], b"OK\n");
    }

    #[tokio::test]
    async fn test_exchange_binary_reply() {
        let mut mock = Builder::new().write(b"GET k\n").read(b"\xff\x80\n").build();
        assert_eq!(&exchange(&mut mock, "GET k").await.unwrap()[..], b"\xff\x80\n");
    }

    #[tokio::test]
    async fn test_exchange_server_closed() {
        let mut mock = Builder::new().write(b"GET a\n").build();
        let err = exchange(&mut mock, "GET a").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_client_args_defaults() {
        let args = ClientArgs::parse_from(["pollkv-cli"]);
        assert_eq!(args.server, "127.0.0.1:1234");
        assert_eq!(args.log_level, "warn");
    }
}
