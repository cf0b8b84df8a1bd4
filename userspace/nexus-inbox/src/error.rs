// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for mailbox operations.
//!
//! `ChannelError` is what a transport reports; `InboxError` is what the public
//! API returns. Receive-side `WouldBlock`/`Timeout` mean "no message waiting"
//! and are never logged.

use std::path::PathBuf;

use thiserror::Error;

/// Result type returned by mailbox operations.
pub type Result<T> = core::result::Result<T, InboxError>;

/// Transport-level failures.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// Non-blocking attempt could not progress: queue empty on receive, full on send.
    #[error("operation would block")]
    WouldBlock,
    /// A bounded wait expired without progress.
    #[error("operation timed out")]
    Timeout,
    /// The channel was destroyed while in use.
    #[error("channel removed")]
    Removed,
    /// The kernel delivered a record of unexpected size.
    #[error("short record of {0} bytes")]
    ShortRecord(usize),
    /// Raw errno reported by the kernel backend.
    #[error("os error {0}")]
    Os(i32),
}

impl ChannelError {
    /// Returns `true` for the expected "nothing to do" outcomes of a receive.
    pub const fn is_empty(self) -> bool {
        matches!(self, Self::WouldBlock | Self::Timeout)
    }
}

/// Fixed-record decode failures.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// Record length does not match the fixed layout.
    #[error("record has {len} bytes, expected {expected}")]
    Truncated {
        /// Observed length.
        len: usize,
        /// Required length.
        expected: usize,
    },
    /// Payload length field exceeds the payload capacity.
    #[error("payload length {0} exceeds capacity")]
    BadLength(u32),
    /// A name field is empty or not UTF-8.
    #[error("malformed mailbox name field")]
    BadName,
}

/// Status reported by an application callback that failed to handle a message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("handler failed with status {code}: {reason}")]
pub struct HandlerError {
    /// Application-defined status code.
    pub code: i32,
    /// Human-readable reason for logs.
    pub reason: String,
}

impl HandlerError {
    /// Creates a handler error from a status code and reason.
    pub fn new(code: i32, reason: impl Into<String>) -> Self {
        Self { code, reason: reason.into() }
    }
}

/// Errors surfaced by the mailbox API.
#[derive(Debug, Error)]
pub enum InboxError {
    /// The namespace root is missing or unusable.
    #[error("namespace root {} is not an existing directory", .root.display())]
    AddressResolution {
        /// Root that failed the check.
        root: PathBuf,
    },
    /// The transport refused to open or create the channel.
    #[error("channel unavailable: {0}")]
    ChannelUnavailable(ChannelError),
    /// Enqueue into the recipient channel was rejected.
    #[error("send to '{recipient}' failed: {source}")]
    SendFailure {
        /// Recipient mailbox name.
        recipient: String,
        /// Raw transport status.
        source: ChannelError,
    },
    /// Unexpected transport failure on a receive attempt.
    #[error("receive failed: {0}")]
    Receive(ChannelError),
    /// Poll loop could not be started.
    #[error("inbox init failed: {0}")]
    InitFailure(String),
    /// Payload exceeds the fixed capacity.
    #[error("payload of {len} bytes exceeds maximum of {max}")]
    PayloadTooLarge {
        /// Offered payload length.
        len: usize,
        /// Capacity.
        max: usize,
    },
    /// Mailbox name exceeds the fixed field width.
    #[error("mailbox name of {len} bytes exceeds maximum of {max}")]
    NameTooLong {
        /// Offered name length.
        len: usize,
        /// Field width.
        max: usize,
    },
    /// Mailbox name is empty.
    #[error("mailbox name is empty")]
    EmptyName,
    /// Mailbox name contains a NUL byte.
    #[error("mailbox name contains NUL")]
    InvalidName,
    /// A received record could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] WireError),
    /// Configuration rejected.
    #[error("config error: {0}")]
    Config(String),
    /// I/O failure while loading configuration.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
