use std::fmt;

use crate::POP3State;

/// Why a connection attempt failed before a session existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    Timeout,
    ProxyRejected,
    TlsFailed,
    DnsOrRefused,
}

impl fmt::Display for ConnectFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let reason = match *self {
            ConnectFailure::Timeout => "timed out",
            ConnectFailure::ProxyRejected => "rejected by SOCKS5 proxy",
            ConnectFailure::TlsFailed => "TLS handshake failed",
            ConnectFailure::DnsOrRefused => "unreachable",
        };
        f.write_str(reason)
    }
}

/// Local contract violations and unparsable server replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolFailure {
    /// The command is not legal in the session's current state. Nothing was
    /// sent to the server.
    IllegalState {
        command: &'static str,
        state: POP3State,
    },
    MalformedResponse(String),
    SessionClosed,
}

impl fmt::Display for ProtocolFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ProtocolFailure::IllegalState { command, ref state } => {
                write!(f, "{} is not allowed in state {:?}", command, state)
            }
            ProtocolFailure::MalformedResponse(ref line) => {
                write!(f, "malformed response: {:?}", line)
            }
            ProtocolFailure::SessionClosed => f.write_str("session is closed"),
        }
    }
}

error_chain! {
    foreign_links {
        Io(::std::io::Error);
        SslStack(::openssl::error::ErrorStack);
        MailParse(::mailparse::MailParseError);
    }

    errors {
        Connect(reason: ConnectFailure, detail: String) {
            description("unable to connect to POP3 server")
            display("unable to connect to POP3 server, {}: {}", reason, detail)
        }
        Protocol(failure: ProtocolFailure) {
            description("POP3 protocol error")
            display("POP3 protocol error: {}", failure)
        }
        Auth(text: String) {
            description("authentication rejected")
            display("authentication rejected: {}", text)
        }
        Server(text: String) {
            description("server replied -ERR")
            display("server replied -ERR: {}", text)
        }
        DeleRejected(id: u32, confirmed: Vec<u32>, text: String) {
            description("DELE rejected")
            display("DELE {} rejected after {} confirmed deletion(s): {}", id, confirmed.len(), text)
        }
    }
}

impl Error {
    /// Whether this error leaves the connection unusable. Framing is
    /// undefined after an I/O error or an unparsable reply, so the session
    /// closes on either.
    pub fn is_fatal(&self) -> bool {
        match *self.kind() {
            ErrorKind::Io(_) => true,
            ErrorKind::Protocol(ProtocolFailure::MalformedResponse(_)) => true,
            ErrorKind::Protocol(ProtocolFailure::SessionClosed) => true,
            _ => false,
        }
    }

    /// The server's literal `-ERR` text, if this error carries one.
    pub fn server_text(&self) -> Option<&str> {
        match *self.kind() {
            ErrorKind::Auth(ref text)
            | ErrorKind::Server(ref text)
            | ErrorKind::DeleRejected(_, _, ref text) => Some(text),
            _ => None,
        }
    }
}

pub(crate) fn malformed<T: Into<String>>(line: T) -> Error {
    ErrorKind::Protocol(ProtocolFailure::MalformedResponse(line.into())).into()
}

pub(crate) fn connect_failure<T: fmt::Display>(reason: ConnectFailure, detail: T) -> Error {
    ErrorKind::Connect(reason, detail.to_string()).into()
}
