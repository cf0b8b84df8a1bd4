// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! System V message-queue transport (feature `backend-sysv`, Linux only).
//!
//! One queue per mailbox, keyed by the [`ChannelId`]. The lane travels as the
//! message type so `msgrcv` can select a single lane while the others stay
//! queued. Timed waits poll with `IPC_NOWAIT` at millisecond granularity;
//! the kernel offers no timed receive.

use std::io;
use std::ptr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use libc::{c_int, c_long, c_void};

use crate::channel::{Channel, Transport, Wait};
use crate::error::ChannelError;
use crate::lane::Lane;
use crate::resolver::ChannelId;
use crate::wire::{Record, RECORD_LEN};

const QUEUE_MODE: c_int = 0o644;
const RETRY_STEP: Duration = Duration::from_millis(1);

#[repr(C)]
struct RawRecord {
    mtype: c_long,
    body: Record,
}

// One spare byte: an oversized foreign record is truncated into it by
// MSG_NOERROR and then rejected by length instead of wedging the lane.
const RECV_LEN: usize = RECORD_LEN + 1;

#[repr(C)]
struct RecvBuffer {
    mtype: c_long,
    body: [u8; RECV_LEN],
}

fn recv_flags(nowait: bool) -> c_int {
    let wait = if nowait { libc::IPC_NOWAIT } else { 0 };
    wait | libc::MSG_NOERROR
}

fn last_errno() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

fn map_errno(errno: i32) -> ChannelError {
    match errno {
        libc::EAGAIN | libc::ENOMSG => ChannelError::WouldBlock,
        libc::EIDRM | libc::EINVAL => ChannelError::Removed,
        other => ChannelError::Os(other),
    }
}

/// Opens System V queues keyed by channel id.
#[derive(Clone, Copy, Debug, Default)]
pub struct SysvTransport;

impl SysvTransport {
    /// Creates the transport.
    pub fn new() -> Self {
        Self
    }
}

impl Transport for SysvTransport {
    fn open_or_create(&self, id: ChannelId) -> Result<Arc<dyn Channel>, ChannelError> {
        let qid = unsafe { libc::msgget(id.raw() as libc::key_t, QUEUE_MODE | libc::IPC_CREAT) };
        if qid < 0 {
            return Err(ChannelError::Os(last_errno()));
        }
        Ok(Arc::new(SysvChannel { id, qid }))
    }
}

/// Handle to one System V queue.
#[derive(Debug)]
pub struct SysvChannel {
    id: ChannelId,
    qid: c_int,
}

impl SysvChannel {
    fn try_send(&self, raw: &RawRecord, nowait: bool) -> Result<(), ChannelError> {
        let flags = if nowait { libc::IPC_NOWAIT } else { 0 };
        loop {
            let rc = unsafe { libc::msgsnd(self.qid, raw as *const RawRecord as *const c_void, RECORD_LEN, flags) };
            if rc == 0 {
                return Ok(());
            }
            match last_errno() {
                libc::EINTR => continue,
                errno => return Err(map_errno(errno)),
            }
        }
    }

    fn try_recv(&self, lane: Lane, nowait: bool) -> Result<Record, ChannelError> {
        let mut raw = RecvBuffer { mtype: 0, body: [0u8; RECV_LEN] };
        loop {
            let received = unsafe {
                libc::msgrcv(
                    self.qid,
                    &mut raw as *mut RecvBuffer as *mut c_void,
                    RECV_LEN,
                    lane.discriminator() as c_long,
                    recv_flags(nowait),
                )
            };
            if received >= 0 {
                let received = received as usize;
                if received != RECORD_LEN {
                    return Err(ChannelError::ShortRecord(received));
                }
                let mut record = [0u8; RECORD_LEN];
                record.copy_from_slice(&raw.body[..RECORD_LEN]);
                return Ok(record);
            }
            match last_errno() {
                libc::EINTR => continue,
                errno => return Err(map_errno(errno)),
            }
        }
    }
}

/// Retries `attempt` every millisecond until it stops reporting `WouldBlock`
/// or `deadline` passes (`None`: no deadline).
fn retry_until<T>(
    deadline: Option<Instant>,
    mut attempt: impl FnMut() -> Result<T, ChannelError>,
) -> Result<T, ChannelError> {
    loop {
        match attempt() {
            Err(ChannelError::WouldBlock) => {
                let step = match deadline {
                    Some(deadline) => {
                        let now = Instant::now();
                        if now >= deadline {
                            return Err(ChannelError::Timeout);
                        }
                        RETRY_STEP.min(deadline - now)
                    }
                    None => RETRY_STEP,
                };
                thread::sleep(step);
            }
            other => return other,
        }
    }
}

impl Channel for SysvChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn send(&self, lane: Lane, record: &Record, wait: Wait) -> Result<(), ChannelError> {
        let raw = RawRecord { mtype: lane.discriminator() as c_long, body: *record };
        match wait {
            Wait::Blocking => self.try_send(&raw, false),
            Wait::NonBlocking => self.try_send(&raw, true),
            Wait::Timeout(_) => retry_until(wait.deadline(), || self.try_send(&raw, true)),
        }
    }

    fn recv(&self, lane: Lane, wait: Wait) -> Result<Record, ChannelError> {
        match wait {
            Wait::Blocking => self.try_recv(lane, false),
            Wait::NonBlocking => self.try_recv(lane, true),
            Wait::Timeout(_) => retry_until(wait.deadline(), || self.try_recv(lane, true)),
        }
    }

    fn remove(&self) -> Result<(), ChannelError> {
        let rc = unsafe { libc::msgctl(self.qid, libc::IPC_RMID, ptr::null_mut()) };
        if rc < 0 {
            return Err(map_errno(last_errno()));
        }
        Ok(())
    }
}
