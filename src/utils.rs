use md5::{Digest, Md5};

/// The APOP digest: MD5 over the greeting timestamp (angle brackets
/// included) followed by the shared secret, as lowercase hex.
pub fn get_apop_digest(timestamp: &str, password: &str) -> String {
    let hasher = Md5::new().chain(timestamp).chain(password);
    format!("{:x}", hasher.result())
}

/// Byte-stuffs a block for transmission as a multiline body: every line that
/// starts with `.` gets a second one. The lone-dot terminator is not added.
pub fn dot_stuff(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 8);
    let mut at_line_start = true;
    for &b in body {
        if at_line_start && b == b'.' {
            out.push(b'.');
        }
        out.push(b);
        at_line_start = b == b'\n';
    }
    out
}
