// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Transport abstraction: a channel holds per-lane FIFO queues of fixed records.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ChannelError;
use crate::lane::Lane;
use crate::resolver::ChannelId;
use crate::wire::Record;

/// How long a send or receive may park before giving up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wait {
    /// Park until the queue makes room (send) or a record arrives (receive).
    Blocking,
    /// Single attempt; `ChannelError::WouldBlock` if it cannot complete.
    NonBlocking,
    /// Park at most this long; `ChannelError::Timeout` once it elapses.
    Timeout(Duration),
}

impl Wait {
    /// Absolute deadline for a [`Wait::Timeout`] started now; `None` when the
    /// wait is unbounded (including budgets too large to represent).
    pub fn deadline(self) -> Option<Instant> {
        match self {
            Self::Timeout(budget) => Instant::now().checked_add(budget),
            Self::Blocking | Self::NonBlocking => None,
        }
    }
}

/// Kernel-level channel a mailbox name resolves to.
///
/// Receives are restricted to one lane; records of other lanes stay queued.
pub trait Channel: Send + Sync {
    /// Identifier this channel was opened for.
    fn id(&self) -> ChannelId;

    /// Enqueues `record` on `lane`.
    fn send(&self, lane: Lane, record: &Record, wait: Wait) -> Result<(), ChannelError>;

    /// Dequeues the oldest record of `lane`.
    fn recv(&self, lane: Lane, wait: Wait) -> Result<Record, ChannelError>;

    /// Destroys the channel for every process sharing it.
    fn remove(&self) -> Result<(), ChannelError>;
}

/// Opens channels by identifier.
pub trait Transport: Send + Sync {
    /// Returns a handle to the channel `id`, creating it when absent.
    fn open_or_create(&self, id: ChannelId) -> Result<Arc<dyn Channel>, ChannelError>;
}
