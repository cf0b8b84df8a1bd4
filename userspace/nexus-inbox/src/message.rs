// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bounded message model: mailbox names, payload buffers and the composed message.
//!
//! Bounds are checked on construction; nothing is silently truncated.

use core::fmt;

use crate::error::{InboxError, Result};
use crate::lane::Lane;

/// Maximum payload size in bytes.
pub const MAX_PAYLOAD_LEN: usize = 128;
/// Width of the sender/recipient name fields in bytes.
pub const MAX_NAME_LEN: usize = 32;

/// Validated mailbox name (1..=32 bytes, no NUL).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MailboxName(String);

impl MailboxName {
    /// Validates `name` against the fixed field width.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(InboxError::EmptyName);
        }
        if name.len() > MAX_NAME_LEN {
            return Err(InboxError::NameTooLong { len: name.len(), max: MAX_NAME_LEN });
        }
        if name.as_bytes().contains(&0) {
            return Err(InboxError::InvalidName);
        }
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the raw name bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for MailboxName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for MailboxName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl PartialEq<str> for MailboxName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for MailboxName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Fixed-capacity payload buffer with an explicit length.
#[derive(Clone, Copy)]
pub struct Payload {
    len: usize,
    buf: [u8; MAX_PAYLOAD_LEN],
}

impl Payload {
    /// Empty payload.
    pub const EMPTY: Self = Self { len: 0, buf: [0u8; MAX_PAYLOAD_LEN] };

    /// Copies `bytes` into a new payload; rejects anything over [`MAX_PAYLOAD_LEN`].
    pub fn new(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_PAYLOAD_LEN {
            return Err(InboxError::PayloadTooLarge { len: bytes.len(), max: MAX_PAYLOAD_LEN });
        }
        let mut payload = Self::EMPTY;
        payload.buf[..bytes.len()].copy_from_slice(bytes);
        payload.len = bytes.len();
        Ok(payload)
    }

    /// Meaningful bytes of the payload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Number of meaningful bytes.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the payload carries no data.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Payload {}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match core::str::from_utf8(self.as_bytes()) {
            Ok(text) => write!(f, "Payload({text:?})"),
            Err(_) => write!(f, "Payload({:02x?})", self.as_bytes()),
        }
    }
}

/// A routed message. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    lane: Lane,
    message_type: i32,
    correlation_id: i32,
    payload: Payload,
    sender: MailboxName,
    recipient: MailboxName,
}

impl Message {
    /// Builds a message on an arbitrary lane, validating every bound.
    pub fn new(
        lane: Lane,
        message_type: i32,
        correlation_id: i32,
        payload: &[u8],
        sender: &str,
        recipient: &str,
    ) -> Result<Self> {
        Ok(Self::from_parts(
            lane,
            message_type,
            correlation_id,
            Payload::new(payload)?,
            MailboxName::new(sender)?,
            MailboxName::new(recipient)?,
        ))
    }

    pub(crate) fn from_parts(
        lane: Lane,
        message_type: i32,
        correlation_id: i32,
        payload: Payload,
        sender: MailboxName,
        recipient: MailboxName,
    ) -> Self {
        Self { lane, message_type, correlation_id, payload, sender, recipient }
    }

    /// Builds a Command-lane message from `sender` to `recipient`.
    pub fn command(
        sender: &MailboxName,
        recipient: &str,
        message_type: i32,
        correlation_id: i32,
        payload: &[u8],
    ) -> Result<Self> {
        Self::addressed(Lane::Command, sender, recipient, message_type, correlation_id, payload)
    }

    /// Builds an Urgent-lane message from `sender` to `recipient`.
    pub fn urgent(
        sender: &MailboxName,
        recipient: &str,
        message_type: i32,
        correlation_id: i32,
        payload: &[u8],
    ) -> Result<Self> {
        Self::addressed(Lane::Urgent, sender, recipient, message_type, correlation_id, payload)
    }

    fn addressed(
        lane: Lane,
        sender: &MailboxName,
        recipient: &str,
        message_type: i32,
        correlation_id: i32,
        payload: &[u8],
    ) -> Result<Self> {
        Ok(Self::from_parts(
            lane,
            message_type,
            correlation_id,
            Payload::new(payload)?,
            sender.clone(),
            MailboxName::new(recipient)?,
        ))
    }

    /// Reply-lane answer to `original` with an empty payload.
    ///
    /// The correlation id is reused and the addresses are swapped.
    pub fn reply_to(original: &Message, message_type: i32) -> Self {
        Self::from_parts(
            Lane::Reply,
            message_type,
            original.correlation_id,
            Payload::EMPTY,
            original.recipient.clone(),
            original.sender.clone(),
        )
    }

    /// Same as [`Message::reply_to`] with `payload` attached.
    pub fn reply_with_data(original: &Message, message_type: i32, payload: &[u8]) -> Result<Self> {
        Ok(Self::from_parts(
            Lane::Reply,
            message_type,
            original.correlation_id,
            Payload::new(payload)?,
            original.recipient.clone(),
            original.sender.clone(),
        ))
    }

    /// Lane the message travels on.
    pub fn lane(&self) -> Lane {
        self.lane
    }

    /// Application-defined message type.
    pub fn message_type(&self) -> i32 {
        self.message_type
    }

    /// Correlation id pairing replies with commands.
    pub fn correlation_id(&self) -> i32 {
        self.correlation_id
    }

    /// Payload bytes.
    pub fn payload(&self) -> &[u8] {
        self.payload.as_bytes()
    }

    pub(crate) fn payload_buffer(&self) -> &Payload {
        &self.payload
    }

    /// Sending mailbox.
    pub fn sender(&self) -> &MailboxName {
        &self.sender
    }

    /// Receiving mailbox.
    pub fn recipient(&self) -> &MailboxName {
        &self.recipient
    }
}
