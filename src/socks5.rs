//! The client half of a SOCKS5 CONNECT (RFC 1928), with optional
//! username/password authentication (RFC 1929).

use std::io::{Read, Write};
use std::net::IpAddr;

use crate::errors::*;

const VERSION: u8 = 0x05;
const AUTH_VERSION: u8 = 0x01;
const METHOD_NONE: u8 = 0x00;
const METHOD_USERPASS: u8 = 0x02;
const METHOD_UNACCEPTABLE: u8 = 0xff;
const CMD_CONNECT: u8 = 0x01;
const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;

fn rejected<T: Into<String>>(detail: T) -> Error {
    ErrorKind::Connect(ConnectFailure::ProxyRejected, detail.into()).into()
}

fn reply_text(code: u8) -> &'static str {
    match code {
        0x01 => "general SOCKS server failure",
        0x02 => "connection not allowed by ruleset",
        0x03 => "network unreachable",
        0x04 => "host unreachable",
        0x05 => "connection refused",
        0x06 => "TTL expired",
        0x07 => "command not supported",
        0x08 => "address type not supported",
        _ => "unknown failure",
    }
}

/// Asks the proxy on the other end of `stream` to connect to `host:port`.
/// On success the stream is a tunnel to the destination.
pub fn handshake<S: Read + Write>(
    stream: &mut S,
    host: &str,
    port: u16,
    credentials: Option<&(String, String)>,
) -> Result<()> {
    let greeting: &[u8] = match credentials {
        Some(_) => &[VERSION, 2, METHOD_NONE, METHOD_USERPASS],
        None => &[VERSION, 1, METHOD_NONE],
    };
    stream.write_all(greeting)?;

    let mut choice = [0u8; 2];
    stream.read_exact(&mut choice)?;
    if choice[0] != VERSION {
        return Err(rejected(format!("not a SOCKS5 proxy (version {})", choice[0])));
    }
    match (choice[1], credentials) {
        (METHOD_NONE, _) => {}
        (METHOD_USERPASS, Some(&(ref user, ref pass))) => authenticate(stream, user, pass)?,
        (METHOD_UNACCEPTABLE, _) => return Err(rejected("no acceptable authentication method")),
        (method, _) => return Err(rejected(format!("unexpected authentication method {}", method))),
    }

    stream.write_all(&connect_request(host, port)?)?;

    let mut head = [0u8; 4];
    stream.read_exact(&mut head)?;
    if head[0] != VERSION {
        return Err(rejected(format!("bad reply version {}", head[0])));
    }
    if head[1] != 0x00 {
        return Err(rejected(reply_text(head[1])));
    }
    // The bound address is of no use to us, but it has to be drained.
    let addr_len = match head[3] {
        ATYP_IPV4 => 4,
        ATYP_IPV6 => 16,
        ATYP_DOMAIN => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len)?;
            len[0] as usize
        }
        other => return Err(rejected(format!("bad bound address type {}", other))),
    };
    let mut bound = vec![0u8; addr_len + 2];
    stream.read_exact(&mut bound)?;
    debug!("SOCKS5 tunnel to {}:{} established", host, port);
    Ok(())
}

fn authenticate<S: Read + Write>(stream: &mut S, user: &str, pass: &str) -> Result<()> {
    if user.len() > 255 || pass.len() > 255 {
        return Err(rejected("proxy credentials longer than 255 bytes"));
    }
    let mut request = Vec::with_capacity(3 + user.len() + pass.len());
    request.push(AUTH_VERSION);
    request.push(user.len() as u8);
    request.extend_from_slice(user.as_bytes());
    request.push(pass.len() as u8);
    request.extend_from_slice(pass.as_bytes());
    stream.write_all(&request)?;

    let mut status = [0u8; 2];
    stream.read_exact(&mut status)?;
    if status[1] != 0x00 {
        return Err(rejected("proxy authentication failed"));
    }
    Ok(())
}

fn connect_request(host: &str, port: u16) -> Result<Vec<u8>> {
    let mut request = vec![VERSION, CMD_CONNECT, 0x00];
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => {
            request.push(ATYP_IPV4);
            request.extend_from_slice(&ip.octets());
        }
        Ok(IpAddr::V6(ip)) => {
            request.push(ATYP_IPV6);
            request.extend_from_slice(&ip.octets());
        }
        Err(_) => {
            if host.is_empty() || host.len() > 255 {
                return Err(rejected(format!("cannot tunnel to host {:?}", host)));
            }
            request.push(ATYP_DOMAIN);
            request.push(host.len() as u8);
            request.extend_from_slice(host.as_bytes());
        }
    }
    request.extend_from_slice(&port.to_be_bytes());
    Ok(request)
}
