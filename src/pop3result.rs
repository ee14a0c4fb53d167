#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct POP3Stat {
    pub num_mails: u32,
    pub mbox_size: u64,
}

/// One `LIST` line: a message number and its size in octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmailMetadata {
    pub msg_id: u32,
    pub msg_size: u64,
}

/// One `UIDL` line: a message number and its server-assigned unique id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailUid {
    pub msg_id: u32,
    pub uid: String,
}

/// Listings in the order the server sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct POP3List {
    pub mailbox: Vec<EmailMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct POP3Uidl {
    pub mailbox: Vec<EmailUid>,
}

/// A `CAPA` line, e.g. `SASL PLAIN LOGIN` or `TOP`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct POP3Capability {
    pub name: String,
    pub args: Vec<String>,
}

impl POP3List {
    pub fn len(&self) -> usize {
        self.mailbox.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mailbox.is_empty()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.mailbox.iter().map(|m| m.msg_id).collect()
    }

    pub fn get(&self, msg_id: u32) -> Option<&EmailMetadata> {
        self.mailbox.iter().find(|m| m.msg_id == msg_id)
    }

    pub fn total_size(&self) -> u64 {
        self.mailbox.iter().map(|m| m.msg_size).sum()
    }
}

impl POP3Uidl {
    pub fn len(&self) -> usize {
        self.mailbox.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mailbox.is_empty()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.mailbox.iter().map(|m| m.msg_id).collect()
    }

    pub fn get(&self, msg_id: u32) -> Option<&EmailUid> {
        self.mailbox.iter().find(|m| m.msg_id == msg_id)
    }

    /// Looks a message up by unique id, e.g. one remembered from an earlier
    /// session.
    pub fn find_uid(&self, uid: &str) -> Option<u32> {
        self.mailbox
            .iter()
            .find(|m| m.uid == uid)
            .map(|m| m.msg_id)
    }
}
