use std::io::{self, BufRead, BufReader, Read, Write};

use regex::Regex;

use crate::errors::*;

const LF: u8 = 0x0a;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    OK,
    ERR,
}

/// A parsed status line: the marker and whatever text followed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct POP3Response {
    pub status: Status,
    pub text: String,
}

impl POP3Response {
    pub fn is_ok(&self) -> bool {
        self.status == Status::OK
    }
}

/// Frames a duplex byte stream into POP3 lines. Reads are buffered; writes
/// go straight to the underlying stream.
pub struct TCPReader<S: Read + Write> {
    inner: BufReader<S>,
}

impl<S: Read + Write> TCPReader<S> {
    pub fn new(stream: S) -> TCPReader<S> {
        TCPReader {
            inner: BufReader::new(stream),
        }
    }

    /// Sends one command line, appending the CRLF terminator.
    pub fn write_command(&mut self, command: &str) -> Result<()> {
        let stream = self.inner.get_mut();
        stream.write_all(command.as_bytes())?;
        stream.write_all(b"\r\n")?;
        stream.flush()?;
        Ok(())
    }

    /// Reads one line including its terminator. Running out of input before
    /// a line feed is an error: the server hung up mid-response.
    pub fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut buff = Vec::new();
        self.inner.read_until(LF, &mut buff)?;
        if buff.last() != Some(&LF) {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before end of line",
            )
            .into());
        }
        Ok(buff)
    }

    pub fn read_response(&mut self) -> Result<POP3Response> {
        let line = self.read_line()?;
        let line = String::from_utf8_lossy(&line);
        info!("S: {}", line.trim_end());
        parse_status_line(&line)
    }

    /// Reads the body of a multiline response, up to and including the lone
    /// dot line. Leading dots are unstuffed; line terminators are kept as
    /// sent so message bytes come back exactly.
    pub fn read_multiline(&mut self) -> Result<Vec<u8>> {
        let mut block = Vec::new();
        let mut lines = 0usize;
        loop {
            let line = self.read_line()?;
            if line == b".\r\n" || line == b".\n" {
                break;
            }
            let data = if line.first() == Some(&b'.') {
                &line[1..]
            } else {
                &line[..]
            };
            block.extend_from_slice(data);
            lines += 1;
        }
        trace!("S: <{} lines, {} bytes>", lines, block.len());
        Ok(block)
    }
}

/// Splits a status line into its marker and text. The text is everything
/// after the single separating space, kept verbatim up to the line ending.
pub fn parse_status_line(line: &str) -> Result<POP3Response> {
    lazy_static! {
        static ref RESPONSE: Regex =
            Regex::new(r"^(?P<status>\+OK|-ERR)(?:[ \t](?P<statustext>.*))?$").unwrap();
    }
    let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
    let caps = RESPONSE.captures(line).ok_or_else(|| malformed(line))?;
    let status = match &caps["status"] {
        "+OK" => Status::OK,
        _ => Status::ERR,
    };
    let text = caps
        .name("statustext")
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    Ok(POP3Response { status, text })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptedStream;
    use crate::utils::dot_stuff;
    use proptest::prelude::*;

    fn reader(input: &[u8]) -> TCPReader<ScriptedStream> {
        TCPReader::new(ScriptedStream::new(input))
    }

    #[test]
    fn status_lines() {
        let ok = parse_status_line("+OK 2 320\r\n").unwrap();
        assert_eq!(ok.status, Status::OK);
        assert_eq!(ok.text, "2 320");

        let bare = parse_status_line("+OK\r\n").unwrap();
        assert!(bare.is_ok());
        assert_eq!(bare.text, "");

        let err = parse_status_line("-ERR no such message\r\n").unwrap();
        assert_eq!(err.status, Status::ERR);
        assert_eq!(err.text, "no such message");
    }

    #[test]
    fn status_text_is_kept_verbatim() {
        let err = parse_status_line("-ERR no such message  \r\n").unwrap();
        assert_eq!(err.text, "no such message  ");

        let ok = parse_status_line("+OK  padded\t\r\n").unwrap();
        assert_eq!(ok.text, " padded\t");

        let empty = parse_status_line("+OK \r\n").unwrap();
        assert!(empty.is_ok());
        assert_eq!(empty.text, "");
    }

    #[test]
    fn garbage_status_is_malformed() {
        for line in &["OK fine\r\n", "+OKAY\r\n", "\r\n", "* 1 EXISTS\r\n"] {
            let err = parse_status_line(line).unwrap_err();
            assert!(err.is_fatal(), "{:?} should be malformed", line);
        }
    }

    #[test]
    fn multiline_unstuffs_and_stops_at_lone_dot() {
        let mut r = reader(b"line one\r\n..dotted\r\n.\r\n+OK next\r\n");
        let block = r.read_multiline().unwrap();
        assert_eq!(block, b"line one\r\n.dotted\r\n".to_vec());
        // the terminator is consumed, the next reply is untouched
        assert_eq!(r.read_response().unwrap().text, "next");
    }

    #[test]
    fn multiline_keeps_dot_only_lines_that_were_stuffed() {
        let mut r = reader(b"..\r\n.\r\n");
        assert_eq!(r.read_multiline().unwrap(), b".\r\n".to_vec());
    }

    #[test]
    fn multiline_eof_is_an_io_error() {
        let mut r = reader(b"partial\r\nno terminator");
        let err = r.read_multiline().unwrap_err();
        match *err.kind() {
            ErrorKind::Io(ref e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            ref other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn write_command_appends_crlf() {
        let stream = ScriptedStream::new(b"");
        let output = stream.output();
        let mut r = TCPReader::new(stream);
        r.write_command("LIST 3").unwrap();
        assert_eq!(*output.borrow(), b"LIST 3\r\n".to_vec());
    }

    proptest! {
        #[test]
        fn stuffed_bodies_read_back_exactly(lines in prop::collection::vec("[.a-z ]{0,12}", 0..8)) {
            let mut body = Vec::new();
            for line in &lines {
                body.extend_from_slice(line.as_bytes());
                body.extend_from_slice(b"\r\n");
            }
            let mut wire = dot_stuff(&body);
            wire.extend_from_slice(b".\r\n");
            let mut r = reader(&wire);
            prop_assert_eq!(r.read_multiline().unwrap(), body);
        }
    }
}
