// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: In-process channel registry for host builds and tests
//!
//! OWNERS: @runtime
//!
//! PUBLIC API:
//!   - struct HostTransport: registry of channels keyed by ChannelId
//!   - struct HostChannel: per-lane FIFO queues with a shared capacity
//!
//! INVARIANTS:
//!   - FIFO per lane; a receive on one lane never consumes another lane's records
//!   - Total queued records never exceed the configured capacity
//!   - A removed channel rejects every operation with ChannelError::Removed;
//!     reopening the same id creates a fresh, empty channel
//!
//! ERROR CONDITIONS:
//!   - ChannelError::WouldBlock: queue empty (recv) / full (send), non-blocking
//!   - ChannelError::Timeout: bounded wait expired
//!   - ChannelError::Removed: channel destroyed

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::channel::{Channel, Transport, Wait};
use crate::config::InboxConfig;
use crate::error::ChannelError;
use crate::lane::Lane;
use crate::resolver::ChannelId;
use crate::wire::Record;

/// Default number of records a host channel holds across all lanes.
pub const DEFAULT_CAPACITY: usize = 64;

/// Registry of in-process channels shared by every inbox created from it.
#[derive(Clone)]
pub struct HostTransport {
    registry: Arc<Registry>,
}

struct Registry {
    capacity: usize,
    channels: Mutex<HashMap<ChannelId, Arc<HostChannel>>>,
}

impl HostTransport {
    /// Creates an empty registry whose channels hold at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Registry { capacity: capacity.max(1), channels: Mutex::new(HashMap::new()) }),
        }
    }

    /// Registry sized by `config.channel_capacity`.
    pub fn from_config(config: &InboxConfig) -> Self {
        Self::new(config.channel_capacity)
    }

    /// Looks up an existing channel without creating it.
    pub fn lookup(&self, id: ChannelId) -> Option<Arc<HostChannel>> {
        self.registry.channels.lock().get(&id).cloned()
    }

    /// Number of live channels.
    pub fn channel_count(&self) -> usize {
        self.registry.channels.lock().len()
    }
}

impl Default for HostTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Transport for HostTransport {
    fn open_or_create(&self, id: ChannelId) -> Result<Arc<dyn Channel>, ChannelError> {
        let mut channels = self.registry.channels.lock();
        let channel = channels
            .entry(id)
            .or_insert_with(|| Arc::new(HostChannel::new(id, self.registry.capacity, Arc::downgrade(&self.registry))))
            .clone();
        Ok(channel)
    }
}

/// In-memory channel with one FIFO per lane.
pub struct HostChannel {
    id: ChannelId,
    capacity: usize,
    state: Mutex<QueueState>,
    arrived: Condvar,
    drained: Condvar,
    registry: Weak<Registry>,
}

struct QueueState {
    lanes: [VecDeque<Record>; 3],
    queued: usize,
    removed: bool,
}

impl HostChannel {
    fn new(id: ChannelId, capacity: usize, registry: Weak<Registry>) -> Self {
        Self {
            id,
            capacity,
            state: Mutex::new(QueueState {
                lanes: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
                queued: 0,
                removed: false,
            }),
            arrived: Condvar::new(),
            drained: Condvar::new(),
            registry,
        }
    }

    /// Records currently queued on `lane`.
    pub fn pending(&self, lane: Lane) -> usize {
        self.state.lock().lanes[lane.index()].len()
    }

    /// Parks on `cond` according to `wait`. Returns `Err` when the wait is over
    /// without the caller's condition being re-checked as satisfied.
    fn park(
        cond: &Condvar,
        state: &mut MutexGuard<'_, QueueState>,
        wait: Wait,
        deadline: Option<Instant>,
    ) -> Result<(), ChannelError> {
        match (wait, deadline) {
            (Wait::NonBlocking, _) => Err(ChannelError::WouldBlock),
            (Wait::Timeout(budget), _) if budget.is_zero() => Err(ChannelError::WouldBlock),
            (_, Some(deadline)) => {
                if cond.wait_until(state, deadline).timed_out() {
                    return Err(ChannelError::Timeout);
                }
                Ok(())
            }
            (_, None) => {
                cond.wait(state);
                Ok(())
            }
        }
    }
}

impl Channel for HostChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn send(&self, lane: Lane, record: &Record, wait: Wait) -> Result<(), ChannelError> {
        let deadline = wait.deadline();
        let mut state = self.state.lock();
        loop {
            if state.removed {
                return Err(ChannelError::Removed);
            }
            if state.queued < self.capacity {
                break;
            }
            Self::park(&self.drained, &mut state, wait, deadline)?;
        }
        state.lanes[lane.index()].push_back(*record);
        state.queued += 1;
        self.arrived.notify_all();
        Ok(())
    }

    fn recv(&self, lane: Lane, wait: Wait) -> Result<Record, ChannelError> {
        let deadline = wait.deadline();
        let mut state = self.state.lock();
        loop {
            if state.removed {
                return Err(ChannelError::Removed);
            }
            if let Some(record) = state.lanes[lane.index()].pop_front() {
                state.queued -= 1;
                self.drained.notify_all();
                return Ok(record);
            }
            Self::park(&self.arrived, &mut state, wait, deadline)?;
        }
    }

    fn remove(&self) -> Result<(), ChannelError> {
        {
            let mut state = self.state.lock();
            if state.removed {
                return Err(ChannelError::Removed);
            }
            state.removed = true;
            state.lanes.iter_mut().for_each(VecDeque::clear);
            state.queued = 0;
        }
        self.arrived.notify_all();
        self.drained.notify_all();
        if let Some(registry) = self.registry.upgrade() {
            let mut channels = registry.channels.lock();
            if channels.get(&self.id).is_some_and(|current| core::ptr::eq(Arc::as_ptr(current), self)) {
                channels.remove(&self.id);
            }
        }
        Ok(())
    }
}
