// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Single-slot lane buffers and their lock protocol.
//!
//! `Ready -> Occupied` only through [`LaneSlot::occupy`] (a successful receive);
//! `Occupied -> Ready` only through [`LaneSlot::unlock`]. Lock and unlock are
//! idempotent. Unlocking discards the held message.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::lane::{Lane, LaneState};
use crate::message::Message;

pub(crate) struct LaneSlot {
    state: Mutex<SlotState>,
    unlocked: Condvar,
    // Serialises check-unlocked -> receive -> occupy across poll contexts.
    recv_gate: Mutex<()>,
}

#[derive(Default)]
struct SlotState {
    locked: bool,
    held: Option<Message>,
}

impl LaneSlot {
    fn new() -> Self {
        Self { state: Mutex::new(SlotState::default()), unlocked: Condvar::new(), recv_gate: Mutex::new(()) }
    }

    pub(crate) fn lock(&self) {
        self.state.lock().locked = true;
    }

    pub(crate) fn unlock(&self) {
        {
            let mut state = self.state.lock();
            state.held = None;
            state.locked = false;
        }
        self.unlocked.notify_all();
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.state.lock().locked
    }

    pub(crate) fn state(&self) -> LaneState {
        if self.is_locked() {
            LaneState::Occupied
        } else {
            LaneState::Ready
        }
    }

    /// Copy of the held message; `None` while the lane is ready.
    pub(crate) fn held(&self) -> Option<Message> {
        let state = self.state.lock();
        if state.locked {
            state.held.clone()
        } else {
            None
        }
    }

    /// Moves the held message out and unlocks in one step.
    pub(crate) fn take(&self) -> Option<Message> {
        let taken = {
            let mut state = self.state.lock();
            let taken = if state.locked { state.held.take() } else { None };
            state.held = None;
            state.locked = false;
            taken
        };
        self.unlocked.notify_all();
        taken
    }

    pub(crate) fn occupy(&self, message: Message) {
        let mut state = self.state.lock();
        state.locked = true;
        state.held = Some(message);
    }

    /// Blocks until the lane is unlocked or `timeout` expires (`None` waits forever).
    /// Returns whether the lane is unlocked.
    pub(crate) fn wait_unlocked(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));
        let mut state = self.state.lock();
        while state.locked {
            match deadline {
                Some(deadline) => {
                    if self.unlocked.wait_until(&mut state, deadline).timed_out() {
                        return !state.locked;
                    }
                }
                None => self.unlocked.wait(&mut state),
            }
        }
        true
    }

    pub(crate) fn enter_receive(&self) -> MutexGuard<'_, ()> {
        self.recv_gate.lock()
    }

    /// Wakes `wait_unlocked` callers without changing state (shutdown).
    pub(crate) fn wake(&self) {
        self.unlocked.notify_all();
    }
}

/// The three lane buffers of one inbox.
pub(crate) struct Lanes {
    slots: [LaneSlot; 3],
}

impl Lanes {
    pub(crate) fn new() -> Self {
        Self { slots: [LaneSlot::new(), LaneSlot::new(), LaneSlot::new()] }
    }

    pub(crate) fn get(&self, lane: Lane) -> &LaneSlot {
        &self.slots[lane.index()]
    }

    pub(crate) fn wake_all(&self) {
        self.slots.iter().for_each(LaneSlot::wake);
    }
}
