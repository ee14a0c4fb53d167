use std::str;

use regex::Regex;

use crate::errors::*;
use crate::pop3result::{EmailMetadata, EmailUid, POP3Capability, POP3List, POP3Stat, POP3Uidl};

lazy_static! {
    static ref STAT_REGEX: Regex =
        Regex::new(r"^(?P<nmsg>\d+)\s+(?P<size>\d+)(?:\s.*)?$").unwrap();
    static ref UIDL_REGEX: Regex =
        Regex::new(r"^(?P<nmsg>\d+)\s+(?P<uid>[\x21-\x7e]+)\s*$").unwrap();
}

fn number<T: str::FromStr>(digits: &str, line: &str) -> Result<T> {
    digits.parse::<T>().map_err(|_| malformed(line))
}

fn message_number(digits: &str, line: &str) -> Result<u32> {
    match number::<u32>(digits, line)? {
        0 => Err(malformed(line)),
        n => Ok(n),
    }
}

/// Splits a multiline block into its non-empty text lines.
fn block_lines(block: &[u8]) -> Result<Vec<&str>> {
    block
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(|line| {
            str::from_utf8(line).map_err(|_| malformed(String::from_utf8_lossy(line)))
        })
        .collect()
}

impl POP3Stat {
    pub fn parse(stat_line: &str) -> Result<POP3Stat> {
        let stat_cap = STAT_REGEX
            .captures(stat_line.trim())
            .ok_or_else(|| malformed(stat_line))?;
        Ok(POP3Stat {
            num_mails: number(&stat_cap["nmsg"], stat_line)?,
            mbox_size: number(&stat_cap["size"], stat_line)?,
        })
    }
}

impl EmailMetadata {
    pub fn parse(line: &str) -> Result<EmailMetadata> {
        let cap = STAT_REGEX.captures(line.trim()).ok_or_else(|| malformed(line))?;
        Ok(EmailMetadata {
            msg_id: message_number(&cap["nmsg"], line)?,
            msg_size: number(&cap["size"], line)?,
        })
    }
}

impl EmailUid {
    pub fn parse(line: &str) -> Result<EmailUid> {
        let cap = UIDL_REGEX.captures(line.trim()).ok_or_else(|| malformed(line))?;
        Ok(EmailUid {
            msg_id: message_number(&cap["nmsg"], line)?,
            uid: cap["uid"].to_string(),
        })
    }
}

impl POP3List {
    pub fn parse(list_data: &[u8]) -> Result<POP3List> {
        let mailbox = block_lines(list_data)?
            .into_iter()
            .map(EmailMetadata::parse)
            .collect::<Result<_>>()?;
        Ok(POP3List { mailbox })
    }

    pub fn parse_single(status_text: &str) -> Result<POP3List> {
        Ok(POP3List {
            mailbox: vec![EmailMetadata::parse(status_text)?],
        })
    }
}

impl POP3Uidl {
    pub fn parse(uidl_data: &[u8]) -> Result<POP3Uidl> {
        let mailbox = block_lines(uidl_data)?
            .into_iter()
            .map(EmailUid::parse)
            .collect::<Result<_>>()?;
        Ok(POP3Uidl { mailbox })
    }

    pub fn parse_single(status_text: &str) -> Result<POP3Uidl> {
        Ok(POP3Uidl {
            mailbox: vec![EmailUid::parse(status_text)?],
        })
    }
}

impl POP3Capability {
    pub fn parse_block(capa_data: &[u8]) -> Result<Vec<POP3Capability>> {
        Ok(block_lines(capa_data)?
            .into_iter()
            .filter_map(|line| {
                let mut words = line.split_whitespace();
                words.next().map(|name| POP3Capability {
                    name: name.to_ascii_uppercase(),
                    args: words.map(str::to_string).collect(),
                })
            })
            .collect())
    }
}
