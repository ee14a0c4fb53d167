use std::time::Duration;

use crate::errors::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// A SOCKS5 proxy to tunnel the connection through.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socks5Proxy {
    /// `host:port` of the proxy itself.
    pub addr: String,
    /// Username/password for RFC 1929 authentication.
    pub credentials: Option<(String, String)>,
}

impl Socks5Proxy {
    pub fn new<T: Into<String>>(addr: T) -> Socks5Proxy {
        Socks5Proxy {
            addr: addr.into(),
            credentials: None,
        }
    }

    pub fn with_auth<T, U, V>(addr: T, username: U, password: V) -> Socks5Proxy
    where
        T: Into<String>,
        U: Into<String>,
        V: Into<String>,
    {
        Socks5Proxy {
            addr: addr.into(),
            credentials: Some((username.into(), password.into())),
        }
    }

    /// Parses `[user:pass@]host:port`.
    pub fn parse(input: &str) -> Result<Socks5Proxy> {
        let (credentials, addr) = match input.rfind('@') {
            Some(at) => {
                let (userinfo, addr) = (&input[..at], &input[at + 1..]);
                let colon = userinfo
                    .find(':')
                    .ok_or_else(|| Error::from(format!("missing password in proxy {:?}", input)))?;
                let creds = (
                    userinfo[..colon].to_string(),
                    userinfo[colon + 1..].to_string(),
                );
                (Some(creds), addr)
            }
            None => (None, input),
        };
        match addr.rfind(':') {
            Some(colon) if colon > 0 && addr[colon + 1..].parse::<u16>().is_ok() => {}
            _ => return Err(format!("proxy address {:?} is not host:port", addr).into()),
        }
        Ok(Socks5Proxy {
            addr: addr.to_string(),
            credentials,
        })
    }
}

/// Everything needed to reach a POP3 server. Credentials are not part of
/// this; they are supplied when logging in.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    /// Accept any certificate the server presents. This is insecure and only
    /// meant for testing against servers with self-signed certificates.
    pub tls_skip_verify: bool,
    pub socks5_proxy: Option<Socks5Proxy>,
    pub dial_timeout: Duration,
    /// Applied to every socket read and write, handshakes included.
    pub read_timeout: Option<Duration>,
}

impl Default for ConnectionOptions {
    fn default() -> ConnectionOptions {
        ConnectionOptions::new("localhost", 110)
    }
}

impl ConnectionOptions {
    pub fn new<T: Into<String>>(host: T, port: u16) -> ConnectionOptions {
        ConnectionOptions {
            host: host.into(),
            port,
            tls: false,
            tls_skip_verify: false,
            socks5_proxy: None,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
        }
    }

    pub fn tls(mut self, enabled: bool) -> ConnectionOptions {
        self.tls = enabled;
        self
    }

    pub fn tls_skip_verify(mut self, skip: bool) -> ConnectionOptions {
        self.tls_skip_verify = skip;
        self
    }

    pub fn socks5_proxy(mut self, proxy: Socks5Proxy) -> ConnectionOptions {
        self.socks5_proxy = Some(proxy);
        self
    }

    pub fn dial_timeout(mut self, timeout: Duration) -> ConnectionOptions {
        self.dial_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Option<Duration>) -> ConnectionOptions {
        self.read_timeout = timeout;
        self
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    UserPass,
    Apop,
}

/// A mailbox account: where it lives and how to log in to it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub connection: ConnectionOptions,
    pub username: String,
    pub password: String,
    pub auth: AuthMethod,
}
