// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Lane discriminators shared by the message model, the wire record and the transports.

use core::fmt;

/// One of the three independent message categories of a mailbox.
///
/// The numeric value doubles as the transport routing discriminator (the
/// System V `mtype`), so it must stay stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Lane {
    /// Messages that must not wait behind command processing (STOP, PING).
    Urgent = 1,
    /// Replies to previously sent commands (ACK, DONE).
    Reply = 2,
    /// Commands sent from one process to another.
    Command = 3,
}

impl Lane {
    /// All lanes, in the order a poll tick services them.
    pub const ALL: [Lane; 3] = [Lane::Urgent, Lane::Reply, Lane::Command];

    /// Routing discriminator used by the transport.
    pub const fn discriminator(self) -> i64 {
        self as i64
    }

    /// Dense index for per-lane arrays.
    pub(crate) const fn index(self) -> usize {
        self as usize - 1
    }

    /// Lower-case lane label used in logs and thread names.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::Reply => "reply",
            Self::Command => "command",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable state of one lane buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaneState {
    /// Unlocked; the poll loop may receive the next message into the buffer.
    Ready,
    /// Locked; the buffer holds a message the application has not released.
    Occupied,
}
