//! Turning the bytes of a `RETR` or `TOP` reply into a message.
//!
//! The header block is split off here and its fields read with `mailparse`.
//! Anything structural about the body (multipart boundaries, transfer
//! encodings) is also left to `mailparse`, and only on request.

use mailparse::{MailHeader, ParsedMail};

use crate::errors::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl<'a, 'b> From<&'a MailHeader<'b>> for Header {
    fn from(header: &'a MailHeader<'b>) -> Header {
        Header {
            name: header.get_key(),
            value: header.get_value(),
        }
    }
}

/// A message body as the MIME parser sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// A single part, transfer decoding applied.
    Flat(Vec<u8>),
    Multipart(Vec<Part>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub headers: Vec<Header>,
    pub body: Body,
}

impl Body {
    /// Every non-multipart leaf, depth first.
    pub fn text_parts(&self) -> Vec<&[u8]> {
        let mut out = Vec::new();
        self.collect_text_parts(&mut out);
        out
    }

    fn collect_text_parts<'a>(&'a self, out: &mut Vec<&'a [u8]>) {
        match *self {
            Body::Flat(ref bytes) => out.push(bytes),
            Body::Multipart(ref parts) => {
                for part in parts {
                    part.body.collect_text_parts(out);
                }
            }
        }
    }

    fn from_parsed(parsed: &ParsedMail) -> Result<Body> {
        if parsed.subparts.is_empty() {
            return Ok(Body::Flat(parsed.get_body_raw()?));
        }
        let parts = parsed
            .subparts
            .iter()
            .map(|sub| {
                Ok(Part {
                    headers: sub.headers.iter().map(Header::from).collect(),
                    body: Body::from_parsed(sub)?,
                })
            })
            .collect::<Result<_>>()?;
        Ok(Body::Multipart(parts))
    }
}

/// A retrieved message: its raw bytes, the header fields in the order they
/// appeared, and where the body starts.
#[derive(Debug, Clone)]
pub struct Message {
    raw: Vec<u8>,
    headers: Vec<Header>,
    body_start: usize,
    partial: bool,
}

impl Message {
    /// Splits `raw` at the first blank line. Duplicate headers and their
    /// casing are kept; folded values are unfolded and encoded-words
    /// decoded. A message with no blank line is all header and has an empty
    /// body.
    pub fn assemble(raw: Vec<u8>) -> Result<Message> {
        let body_start = find_body(&raw);
        let headers = {
            let (parsed, _) = mailparse::parse_headers(&raw[..body_start])?;
            parsed.iter().map(Header::from).collect()
        };
        Ok(Message {
            raw,
            headers,
            body_start,
            partial: false,
        })
    }

    /// Like `assemble`, for a `TOP` reply whose body the server cut short.
    pub fn assemble_partial(raw: Vec<u8>) -> Result<Message> {
        Ok(Message {
            partial: true,
            ..Message::assemble(raw)?
        })
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// The first value of `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
            .collect()
    }

    /// Body bytes exactly as received.
    pub fn body(&self) -> &[u8] {
        &self.raw[self.body_start..]
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.raw
    }

    /// True when the body is only a prefix of the real one (a `TOP` result);
    /// sizes from `LIST` do not apply to it.
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Hands the message to the MIME parser for structured access.
    pub fn parse_body(&self) -> Result<Body> {
        let parsed = mailparse::parse_mail(&self.raw)?;
        Body::from_parsed(&parsed)
    }
}

/// Offset just past the first blank line, or the end of `raw` if there is
/// none.
fn find_body(raw: &[u8]) -> usize {
    let mut pos = 0;
    while pos < raw.len() {
        let end = match raw[pos..].iter().position(|&b| b == b'\n') {
            Some(off) => pos + off + 1,
            None => return raw.len(),
        };
        let line = &raw[pos..end];
        if line == b"\r\n" || line == b"\n" {
            return end;
        }
        pos = end;
    }
    raw.len()
}
