//! Text command parser.
//!
//! One read's payload is one command line. The line is split on ASCII
//! whitespace; the first token is the verb. Keys and values are taken as
//! raw bytes and never decoded.

/// Parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `SET <key> <value...>`; the value keeps its internal spacing.
    Set { key: Vec<u8>, value: Vec<u8> },
    /// `GET <key>`.
    Get { key: Vec<u8> },
    /// Empty line or unrecognised verb.
    Unknown,
}

/// Parse a single command from the bytes of one read.
///
/// Missing arguments are not rejected: `SET` with no key yields an empty
/// key and value, `GET` with no key yields an empty key.
pub fn parse(input: &[u8]) -> Command {
    let line = strip_line_ending(input);

    let (verb, rest) = next_token(line);
    match verb {
        b"SET" => {
            let (key, rest) = next_token(rest);
            Command::Set {
                key: key.to_vec(),
                value: trim_start(rest).to_vec(),
            }
        }
        b"GET" => {
            let (key, _) = next_token(rest);
            Command::Get { key: key.to_vec() }
        }
        _ => Command::Unknown,
    }
}

/// Split off the next whitespace-delimited token, returning it and the
/// untouched remainder (which starts at the delimiter).
fn next_token(s: &[u8]) -> (&[u8], &[u8]) {
    let s = trim_start(s);
    match s.iter().position(u8::is_ascii_whitespace) {
        Some(end) => s.split_at(end),
        None => (s, &s[s.len()..]),
    }
}

fn trim_start(s: &[u8]) -> &[u8] {
    let start = s
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(s.len());
    &s[start..]
}

/// Drop a single trailing `\n` or `\r\n`.
fn strip_line_ending(s: &[u8]) -> &[u8] {
    s.strip_suffix(b"\r\n")
        .or_else(|| s.strip_suffix(b"\n"))
        .unwrap_or(s)
}
