use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use openssl::ssl::{HandshakeError, SslConnector, SslMethod, SslStream, SslVerifyMode};

use crate::config::ConnectionOptions;
use crate::errors::*;
use crate::socks5;

#[derive(Debug)]
pub enum TCPStreamType {
    Plain(TcpStream),
    SSL(SslStream<TcpStream>),
}

impl Write for TCPStreamType {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match *self {
            TCPStreamType::Plain(ref mut stream) => stream.write(buf),
            TCPStreamType::SSL(ref mut stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match *self {
            TCPStreamType::Plain(ref mut stream) => stream.flush(),
            TCPStreamType::SSL(ref mut stream) => stream.flush(),
        }
    }
}

impl Read for TCPStreamType {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match *self {
            TCPStreamType::Plain(ref mut stream) => stream.read(buf),
            TCPStreamType::SSL(ref mut stream) => stream.read(buf),
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock
}

impl TCPStreamType {
    /// Dials the server, tunnelling through the SOCKS5 proxy and wrapping the
    /// socket in TLS as the options ask. A failure at any step drops whatever
    /// was opened before it.
    pub fn connect(options: &ConnectionOptions) -> Result<TCPStreamType> {
        let tcp_stream = match options.socks5_proxy {
            Some(ref proxy) => {
                debug!("Dialing SOCKS5 proxy {}", proxy.addr);
                let mut tcp_stream = dial(&proxy.addr, options.dial_timeout)?;
                apply_timeouts(&tcp_stream, options.read_timeout)?;
                socks5::handshake(
                    &mut tcp_stream,
                    &options.host,
                    options.port,
                    proxy.credentials.as_ref(),
                )
                .map_err(proxy_failure)?;
                tcp_stream
            }
            None => {
                let tcp_stream = dial((&options.host[..], options.port), options.dial_timeout)?;
                apply_timeouts(&tcp_stream, options.read_timeout)?;
                tcp_stream
            }
        };

        if !options.tls {
            debug!("Creating a Plain TCP Connection");
            return Ok(TCPStreamType::Plain(tcp_stream));
        }

        debug!("Creating a SSL Connection");
        let mut builder = SslConnector::builder(SslMethod::tls())
            .map_err(|e| connect_failure(ConnectFailure::TlsFailed, e))?;
        if options.tls_skip_verify {
            warn!("Certificate verification disabled for {}", options.host);
            builder.set_verify(SslVerifyMode::NONE);
        }
        let mut config = builder
            .build()
            .configure()
            .map_err(|e| connect_failure(ConnectFailure::TlsFailed, e))?;
        if options.tls_skip_verify {
            config.set_verify_hostname(false);
        }
        let stream = config.connect(&options.host, tcp_stream).map_err(|e| match e {
            HandshakeError::WouldBlock(_) => {
                connect_failure(ConnectFailure::Timeout, "TLS handshake timed out")
            }
            e => connect_failure(ConnectFailure::TlsFailed, e),
        })?;
        Ok(TCPStreamType::SSL(stream))
    }

    pub fn is_tls(&self) -> bool {
        match *self {
            TCPStreamType::Plain(_) => false,
            TCPStreamType::SSL(_) => true,
        }
    }
}

fn dial<A: ToSocketAddrs>(addr: A, timeout: Duration) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = addr
        .to_socket_addrs()
        .map_err(|e| connect_failure(ConnectFailure::DnsOrRefused, e))?
        .collect();
    let mut last_error = None;
    for addr in addrs {
        trace!("Dialing {} (timeout {:?})", addr, timeout);
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }
    Err(match last_error {
        Some(ref e) if is_timeout(e) => connect_failure(ConnectFailure::Timeout, e),
        Some(e) => connect_failure(ConnectFailure::DnsOrRefused, e),
        None => connect_failure(ConnectFailure::DnsOrRefused, "no addresses resolved"),
    })
}

fn apply_timeouts(stream: &TcpStream, timeout: Option<Duration>) -> Result<()> {
    stream.set_read_timeout(timeout)?;
    stream.set_write_timeout(timeout)?;
    Ok(())
}

/// Any I/O trouble mid-handshake means the proxy did not give us a tunnel.
fn proxy_failure(err: Error) -> Error {
    match *err.kind() {
        ErrorKind::Io(ref e) if is_timeout(e) => {
            connect_failure(ConnectFailure::Timeout, "SOCKS5 handshake timed out")
        }
        ErrorKind::Io(ref e) => connect_failure(ConnectFailure::ProxyRejected, e),
        _ => err,
    }
}
