// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Named three-lane priority mailboxes for cooperating processes
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests per module + `tests/inbox_e2e`
//!
//! PUBLIC API:
//!   - Inbox: owner of one mailbox (channel + three lane buffers + poll loop)
//!   - InboxHandle: cloneable view used by handlers and other threads
//!   - InboxHandler trait: `on_command` / `on_reply` / `on_urgent` callbacks
//!   - Outbox: send-only composer/sender
//!   - AddressResolver: mailbox name -> channel id -> channel
//!   - Message / MailboxName / Payload / Lane: the bounded message model
//!   - Transport / Channel traits, HostTransport (in-process), SysvTransport (feature)
//!   - InboxConfig: TOML-loadable configuration
//!
//! DEPENDENCIES:
//!   - parking_lot: lane lock state + host channel queues
//!   - crossbeam-channel: poller -> dispatch worker hand-off
//!   - log: receive/dispatch diagnostics
//!   - thiserror: error taxonomy
//!   - serde + toml: configuration
//!   - libc (feature `backend-sysv`): System V queue syscalls
//!
//! Lane protocol: a lane is `Ready` until the poll loop receives a message
//! into it, then `Occupied` until the application unlocks it. While occupied,
//! further messages for that lane stay queued in the channel in FIFO order.

#![deny(clippy::all, unsafe_code)]
#![warn(missing_docs)]

pub mod channel;
pub mod config;
pub mod error;
pub mod host;
pub mod inbox;
pub mod lane;
mod lanes;
pub mod message;
pub mod outbox;
mod poll;
pub mod resolver;
#[cfg(all(feature = "backend-sysv", target_os = "linux"))]
#[allow(unsafe_code)]
pub mod sysv;
pub mod wire;

pub use channel::{Channel, Transport, Wait};
pub use config::{InboxConfig, PollMode};
pub use error::{ChannelError, HandlerError, InboxError, Result, WireError};
pub use host::{HostChannel, HostTransport};
pub use inbox::{HandlerResult, Inbox, InboxHandle, InboxHandler};
pub use lane::{Lane, LaneState};
pub use message::{MailboxName, Message, Payload, MAX_NAME_LEN, MAX_PAYLOAD_LEN};
pub use outbox::Outbox;
pub use resolver::{AddressResolver, ChannelId, Namespace};
#[cfg(all(feature = "backend-sysv", target_os = "linux"))]
pub use sysv::{SysvChannel, SysvTransport};
