//! In-memory doubles for driving the codec and session without a network.

use std::cell::RefCell;
use std::io::{self, Cursor, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::rc::Rc;
use std::thread::{self, JoinHandle};

use openssl::asn1::Asn1Time;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::ssl::{SslAcceptor, SslMethod};
use openssl::x509::{X509Builder, X509NameBuilder, X509};

/// Replays canned server bytes and records everything the client writes.
pub struct ScriptedStream {
    input: Cursor<Vec<u8>>,
    output: Rc<RefCell<Vec<u8>>>,
}

impl ScriptedStream {
    pub fn new(input: &[u8]) -> ScriptedStream {
        ScriptedStream {
            input: Cursor::new(input.to_vec()),
            output: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// A handle on the written bytes that outlives the stream itself.
    pub fn output(&self) -> Rc<RefCell<Vec<u8>>> {
        Rc::clone(&self.output)
    }

    pub fn written(&self) -> Vec<u8> {
        self.output.borrow().clone()
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The lines a client wrote, terminators stripped.
pub fn sent_lines(output: &Rc<RefCell<Vec<u8>>>) -> Vec<String> {
    String::from_utf8_lossy(&output.borrow())
        .split("\r\n")
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Accepts a single connection on a loopback port and hands it to `serve`
/// on a separate thread.
pub fn spawn_server<F>(serve: F) -> (u16, JoinHandle<()>)
where
    F: FnOnce(TcpStream) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        serve(stream);
    });
    (port, handle)
}

lazy_static! {
    static ref PRIVATE_KEY: PKey<Private> =
        PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
    static ref CERTIFICATE: X509 = {
        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", "localhost").unwrap();
        let name = name.build();

        let mut builder = X509Builder::new().unwrap();
        builder.set_version(2).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&PRIVATE_KEY).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(2).unwrap())
            .unwrap();
        builder.sign(&PRIVATE_KEY, MessageDigest::sha256()).unwrap();
        builder.build()
    };
}

/// A server-side TLS context with a throwaway self-signed certificate.
pub fn tls_acceptor() -> SslAcceptor {
    let mut acceptor = SslAcceptor::mozilla_intermediate(SslMethod::tls()).unwrap();
    acceptor.set_private_key(&PRIVATE_KEY).unwrap();
    acceptor.set_certificate(&CERTIFICATE).unwrap();
    acceptor.build()
}
