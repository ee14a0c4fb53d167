//! A blocking POP3 client.
//!
//! A [`POP3Connection`] owns one connection to a server, optionally tunnelled
//! through a SOCKS5 proxy and wrapped in TLS, and tracks the RFC 1939 session
//! state. Commands issued in the wrong state fail before anything is sent.
//!
//! ```no_run
//! use pop3_client::{ConnectionOptions, POP3Connection};
//!
//! # fn main() -> pop3_client::errors::Result<()> {
//! let options = ConnectionOptions::new("pop.example.org", 995).tls(true);
//! let mut conn = POP3Connection::new(&options)?;
//! conn.login("alice", "secret")?;
//! let stat = conn.stat()?;
//! println!("{} messages, {} bytes", stat.num_mails, stat.mbox_size);
//! for entry in conn.list(None)?.mailbox {
//!     let msg = conn.retr(entry.msg_id)?;
//!     println!("{:?}", msg.header("Subject"));
//! }
//! conn.quit()?;
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;

use std::io::{Read, Write};

use regex::Regex;

pub mod config;
pub mod errors;
pub mod message;
pub mod pop3result;
mod pop3resultimpl;
mod socks5;
mod tcpreader;
mod tcpstream;
#[cfg(test)]
mod testutil;
mod utils;

use errors::*;
use tcpreader::{POP3Response, TCPReader};

pub use config::{AccountConfig, AuthMethod, ConnectionOptions, Socks5Proxy};
pub use message::{Body, Header, Message, Part};
pub use pop3result::{EmailMetadata, EmailUid, POP3Capability, POP3List, POP3Stat, POP3Uidl};
pub use tcpstream::TCPStreamType;
pub use utils::dot_stuff;

/// RFC 1939 session states, as seen from the client.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum POP3State {
    AUTHORIZATION,
    TRANSACTION,
    /// QUIT sent from TRANSACTION; the server is committing deletions.
    UPDATE,
    CLOSED,
}

const AUTHORIZATION_ONLY: &[POP3State] = &[POP3State::AUTHORIZATION];
const TRANSACTION_ONLY: &[POP3State] = &[POP3State::TRANSACTION];
const EITHER: &[POP3State] = &[POP3State::AUTHORIZATION, POP3State::TRANSACTION];

/// One POP3 session. Not safe to share without external locking: the
/// protocol allows a single command in flight.
///
/// Dropping a connection without calling [`quit`](POP3Connection::quit)
/// closes the socket without committing any deletions.
pub struct POP3Connection<S: Read + Write = TCPStreamType> {
    reader: Option<TCPReader<S>>,
    state: POP3State,
    greeting: String,
    timestamp: Option<String>,
}

impl POP3Connection<TCPStreamType> {
    pub fn new(options: &ConnectionOptions) -> Result<POP3Connection<TCPStreamType>> {
        trace!("Initiate POP3 Connection to {}:{}", options.host, options.port);
        let stream = TCPStreamType::connect(options)?;
        trace!("Connection Established");
        POP3Connection::from_stream(stream)
    }

    /// Connects and logs in with the account's configured method.
    pub fn connect_and_login(account: &AccountConfig) -> Result<POP3Connection<TCPStreamType>> {
        let mut conn = POP3Connection::new(&account.connection)?;
        match account.auth {
            AuthMethod::UserPass => conn.login(&account.username, &account.password)?,
            AuthMethod::Apop => conn.apop(&account.username, &account.password)?,
        }
        Ok(conn)
    }
}

impl<S: Read + Write> POP3Connection<S> {
    /// Starts a session over an already established stream by reading the
    /// server greeting.
    pub fn from_stream(stream: S) -> Result<POP3Connection<S>> {
        let mut reader = TCPReader::new(stream);
        trace!("Reading Greeting from Server");
        let greeting = reader.read_response()?;
        if !greeting.is_ok() {
            return Err(ErrorKind::Server(greeting.text).into());
        }

        lazy_static! {
            static ref TIMESTAMP: Regex = Regex::new(r"<[^<>\s]+>").unwrap();
        }
        let timestamp = TIMESTAMP
            .find(&greeting.text)
            .map(|m| m.as_str().to_string());

        let conn = POP3Connection {
            reader: Some(reader),
            state: POP3State::AUTHORIZATION,
            greeting: greeting.text,
            timestamp,
        };
        debug!("POP3State::{:?}", conn.state);
        Ok(conn)
    }

    pub fn state(&self) -> POP3State {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == POP3State::CLOSED
    }

    /// The text of the server's `+OK` greeting.
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// The `<...>` timestamp from the greeting, present if the server
    /// supports APOP.
    pub fn apop_timestamp(&self) -> Option<&str> {
        self.timestamp.as_ref().map(String::as_str)
    }

    /// `USER` then `PASS`. A rejection leaves the session in AUTHORIZATION
    /// so another attempt can be made on the same connection.
    pub fn login(&mut self, username: &str, password: &str) -> Result<()> {
        trace!("Attempting to Login");
        self.user(username)?;
        self.pass(password)
    }

    pub fn user(&mut self, username: &str) -> Result<()> {
        self.require("USER", AUTHORIZATION_ONLY)?;
        trace!("Cmd: USER");
        let response = self.send_command("USER", Some(username))?;
        auth_result(response)
    }

    pub fn pass(&mut self, password: &str) -> Result<()> {
        self.require("PASS", AUTHORIZATION_ONLY)?;
        trace!("Cmd: PASS");
        let response = self.send_command("PASS", Some(password))?;
        auth_result(response)?;
        self.set_state(POP3State::TRANSACTION);
        Ok(())
    }

    /// Authenticates with `APOP`, which never sends the secret in the clear.
    pub fn apop(&mut self, username: &str, secret: &str) -> Result<()> {
        self.require("APOP", AUTHORIZATION_ONLY)?;
        trace!("Cmd: APOP");
        let digest = match self.timestamp {
            Some(ref timestamp) => utils::get_apop_digest(timestamp, secret),
            None => {
                return Err(ErrorKind::Auth("server does not support APOP".to_string()).into())
            }
        };
        let param = format!("{} {}", username, digest);
        let response = self.send_command("APOP", Some(&param))?;
        auth_result(response)?;
        self.set_state(POP3State::TRANSACTION);
        Ok(())
    }

    pub fn capa(&mut self) -> Result<Vec<POP3Capability>> {
        self.require("CAPA", EITHER)?;
        trace!("Cmd: CAPA");
        let block = self.expect_block("CAPA", None)?;
        let parsed = POP3Capability::parse_block(&block);
        self.check(parsed)
    }

    pub fn stat(&mut self) -> Result<POP3Stat> {
        self.require("STAT", TRANSACTION_ONLY)?;
        trace!("Cmd: STAT");
        let text = self.expect_ok("STAT", None)?;
        let parsed = POP3Stat::parse(&text);
        self.check(parsed)
    }

    /// Sizes of all messages not marked deleted, or of just one. `Some(0)` is
    /// treated like `None`; message numbers start at 1.
    pub fn list(&mut self, msgnum: Option<u32>) -> Result<POP3List> {
        self.require("LIST", TRANSACTION_ONLY)?;
        trace!("Cmd: LIST");
        let parsed = match msgnum.filter(|&n| n > 0) {
            Some(n) => {
                let text = self.expect_ok("LIST", Some(&n.to_string()))?;
                POP3List::parse_single(&text)
            }
            None => {
                let block = self.expect_block("LIST", None)?;
                POP3List::parse(&block)
            }
        };
        self.check(parsed)
    }

    /// Unique ids of all messages not marked deleted, or of just one.
    pub fn uidl(&mut self, msgnum: Option<u32>) -> Result<POP3Uidl> {
        self.require("UIDL", TRANSACTION_ONLY)?;
        trace!("Cmd: UIDL");
        let parsed = match msgnum.filter(|&n| n > 0) {
            Some(n) => {
                let text = self.expect_ok("UIDL", Some(&n.to_string()))?;
                POP3Uidl::parse_single(&text)
            }
            None => {
                let block = self.expect_block("UIDL", None)?;
                POP3Uidl::parse(&block)
            }
        };
        self.check(parsed)
    }

    pub fn retr(&mut self, msgnum: u32) -> Result<Message> {
        Message::assemble(self.retr_raw(msgnum)?)
    }

    /// The message exactly as the server sent it, dot-unstuffed.
    pub fn retr_raw(&mut self, msgnum: u32) -> Result<Vec<u8>> {
        self.require("RETR", TRANSACTION_ONLY)?;
        trace!("Cmd: RETR");
        self.expect_block("RETR", Some(&msgnum.to_string()))
    }

    /// The headers plus the first `lines` lines of the body.
    pub fn top(&mut self, msgnum: u32, lines: u32) -> Result<Message> {
        self.require("TOP", TRANSACTION_ONLY)?;
        trace!("Cmd: TOP");
        let param = format!("{} {}", msgnum, lines);
        let block = self.expect_block("TOP", Some(&param))?;
        Message::assemble_partial(block)
    }

    /// Marks messages for deletion, one `DELE` at a time, in order. Stops at
    /// the first rejection; the error lists the ids confirmed before it.
    ///
    /// An I/O failure part way through closes the session instead. `QUIT` can
    /// no longer be sent, so none of the batch is committed and the error is
    /// the plain I/O one.
    pub fn dele(&mut self, msgnums: &[u32]) -> Result<()> {
        self.require("DELE", TRANSACTION_ONLY)?;
        trace!("Cmd: DELE");
        let mut confirmed = Vec::with_capacity(msgnums.len());
        for &msgnum in msgnums {
            let response = match self.send_command("DELE", Some(&msgnum.to_string())) {
                Ok(response) => response,
                Err(e) => {
                    if !confirmed.is_empty() {
                        warn!("DELE {} failed; marks on {:?} discarded", msgnum, confirmed);
                    }
                    return Err(e);
                }
            };
            if !response.is_ok() {
                return Err(ErrorKind::DeleRejected(msgnum, confirmed, response.text).into());
            }
            confirmed.push(msgnum);
        }
        Ok(())
    }

    pub fn noop(&mut self) -> Result<()> {
        self.require("NOOP", TRANSACTION_ONLY)?;
        trace!("Cmd: NOOP");
        self.expect_ok("NOOP", None)?;
        Ok(())
    }

    /// Unmarks every message marked for deletion in this session.
    pub fn rset(&mut self) -> Result<()> {
        self.require("RSET", TRANSACTION_ONLY)?;
        trace!("Cmd: RSET");
        self.expect_ok("RSET", None)?;
        Ok(())
    }

    /// Ends the session. From TRANSACTION this commits deletions. The
    /// connection is closed whatever the server answers.
    pub fn quit(&mut self) -> Result<()> {
        self.require("QUIT", EITHER)?;
        trace!("Cmd: QUIT");
        if self.state == POP3State::TRANSACTION {
            self.set_state(POP3State::UPDATE);
        }
        let response = self.send_command("QUIT", None);
        self.close();
        match response {
            Ok(ref r) if r.is_ok() => Ok(()),
            Ok(r) => Err(ErrorKind::Server(r.text).into()),
            Err(e) => {
                warn!("QUIT did not complete cleanly: {}", e);
                Err(e)
            }
        }
    }

    fn require(&self, command: &'static str, allowed: &[POP3State]) -> Result<()> {
        if self.state == POP3State::CLOSED {
            return Err(ErrorKind::Protocol(ProtocolFailure::SessionClosed).into());
        }
        if !allowed.contains(&self.state) {
            return Err(ErrorKind::Protocol(ProtocolFailure::IllegalState {
                command,
                state: self.state,
            })
            .into());
        }
        Ok(())
    }

    fn set_state(&mut self, state: POP3State) {
        self.state = state;
        debug!("POP3State::{:?}", self.state);
    }

    /// Drops the transport. Safe to call more than once.
    fn close(&mut self) {
        if self.reader.take().is_some() {
            trace!("Connection closed");
        }
        if self.state != POP3State::CLOSED {
            self.set_state(POP3State::CLOSED);
        }
    }

    /// Closes the session if `result` carries an error that leaves the
    /// stream in an unknown position.
    fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(ref e) = result {
            if e.is_fatal() {
                error!("Closing session after fatal error: {}", e);
                self.close();
            }
        }
        result
    }

    fn send_command(&mut self, command: &str, param: Option<&str>) -> Result<POP3Response> {
        let line = match param {
            Some(x) => format!("{} {}", command, x),
            None => command.to_string(),
        };
        match command {
            "PASS" => info!("C: PASS ****"),
            "APOP" => info!("C: APOP {} ****", param.and_then(|p| p.split(' ').next()).unwrap_or("")),
            _ => info!("C: {}", line),
        }

        let result = match self.reader.as_mut() {
            Some(reader) => reader
                .write_command(&line)
                .and_then(|_| reader.read_response()),
            None => Err(ErrorKind::Protocol(ProtocolFailure::SessionClosed).into()),
        };
        self.check(result)
    }

    /// Sends a command whose reply must be `+OK`; returns the reply text.
    fn expect_ok(&mut self, command: &str, param: Option<&str>) -> Result<String> {
        let response = self.send_command(command, param)?;
        if response.is_ok() {
            Ok(response.text)
        } else {
            Err(ErrorKind::Server(response.text).into())
        }
    }

    /// Like `expect_ok`, then reads the multiline block that follows.
    fn expect_block(&mut self, command: &str, param: Option<&str>) -> Result<Vec<u8>> {
        self.expect_ok(command, param)?;
        let result = match self.reader.as_mut() {
            Some(reader) => reader.read_multiline(),
            None => Err(ErrorKind::Protocol(ProtocolFailure::SessionClosed).into()),
        };
        self.check(result)
    }
}

fn auth_result(response: POP3Response) -> Result<()> {
    if response.is_ok() {
        Ok(())
    } else {
        Err(ErrorKind::Auth(response.text).into())
    }
}
