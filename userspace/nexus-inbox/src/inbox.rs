// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Inbox, one named mailbox (channel handle, three lane buffers, poll loop)
//!
//! OWNERS: @runtime
//!
//! PUBLIC API:
//!   - Inbox::init(): resolve + open the channel, start polling
//!   - Inbox::tick(): one manual poll tick (PollMode::Manual)
//!   - Inbox::quit(): stop polling, join, then destroy the channel
//!   - InboxHandle: lock/unlock/buffer/take/wait_unlocked + send/reply helpers
//!   - InboxHandler: application callbacks, one per lane
//!
//! Handlers run on the lane's dispatch worker (threaded mode) or on the caller
//! of `tick()` (manual mode). Each handler is responsible for eventually
//! unlocking its lane; until then further messages for that lane stay queued.

use core::fmt;
use core::ops::Deref;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};

use crate::channel::{Channel, Transport, Wait};
use crate::config::{InboxConfig, PollMode};
use crate::error::{ChannelError, HandlerError, InboxError, Result};
use crate::lane::{Lane, LaneState};
use crate::lanes::Lanes;
use crate::message::{MailboxName, Message};
use crate::outbox::Outbox;
use crate::poll::{self, PollLoop, PollOutcome};
use crate::resolver::{AddressResolver, ChannelId};

/// Status returned by a handler.
pub type HandlerResult = core::result::Result<(), HandlerError>;

/// Application callbacks, one per lane.
///
/// The lane stays locked when a handler returns; call [`InboxHandle::unlock`]
/// (or [`InboxHandle::take`]) once the message has been acted on.
pub trait InboxHandler: Send + Sync + 'static {
    /// Called for each Command-lane message.
    fn on_command(&self, inbox: &InboxHandle, command: &Message) -> HandlerResult;

    /// Called for each Reply-lane message.
    fn on_reply(&self, inbox: &InboxHandle, reply: &Message) -> HandlerResult;

    /// Called for each Urgent-lane message.
    fn on_urgent(&self, inbox: &InboxHandle, urgent: &Message) -> HandlerResult;
}

pub(crate) struct Shared {
    pub(crate) name: MailboxName,
    pub(crate) channel: Arc<dyn Channel>,
    pub(crate) lanes: Lanes,
    pub(crate) running: AtomicBool,
    pub(crate) tick: Duration,
    outbox: Outbox,
    handler: Box<dyn InboxHandler>,
}

/// Cloneable view of an inbox, handed to handlers and usable from any thread.
#[derive(Clone)]
pub struct InboxHandle {
    pub(crate) shared: Arc<Shared>,
}

impl InboxHandle {
    /// Mailbox name of this inbox.
    pub fn name(&self) -> &MailboxName {
        &self.shared.name
    }

    /// Identifier of the channel backing this inbox.
    pub fn channel_id(&self) -> ChannelId {
        self.shared.channel.id()
    }

    /// Returns `false` once `quit()` has begun, or once a receive found the
    /// channel removed by someone else. Polling does not resume after that;
    /// the mailbox has to be claimed again with [`Inbox::init`].
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Locks `lane`; the poll loop stops receiving on it. Idempotent.
    pub fn lock(&self, lane: Lane) {
        self.shared.lanes.get(lane).lock();
    }

    /// Unlocks `lane`, discarding the held message. Idempotent.
    pub fn unlock(&self, lane: Lane) {
        self.shared.lanes.get(lane).unlock();
    }

    /// Returns `true` while `lane` is locked.
    pub fn is_locked(&self, lane: Lane) -> bool {
        self.shared.lanes.get(lane).is_locked()
    }

    /// Current state of `lane`.
    pub fn lane_state(&self, lane: Lane) -> LaneState {
        self.shared.lanes.get(lane).state()
    }

    /// Copy of the message held in `lane`; `None` while the lane is ready.
    pub fn buffer(&self, lane: Lane) -> Option<Message> {
        self.shared.lanes.get(lane).held()
    }

    /// Copies the held message out of `lane` and unlocks it atomically.
    pub fn take(&self, lane: Lane) -> Option<Message> {
        self.shared.lanes.get(lane).take()
    }

    /// Blocks until `lane` is unlocked or `timeout` expires (`None` waits forever).
    pub fn wait_unlocked(&self, lane: Lane, timeout: Option<Duration>) -> bool {
        self.shared.lanes.get(lane).wait_unlocked(timeout)
    }

    /// Sends a hand-crafted message.
    pub fn send(&self, message: &Message) -> Result<()> {
        self.shared.outbox.send(message)
    }

    /// Sends a command from this inbox to `recipient`.
    pub fn create_command(
        &self,
        recipient: &str,
        message_type: i32,
        correlation_id: i32,
        payload: &[u8],
    ) -> Result<()> {
        self.shared.outbox.create_command(&self.shared.name, recipient, message_type, correlation_id, payload)
    }

    /// Sends an urgent message from this inbox to `recipient`.
    pub fn create_urgent(&self, recipient: &str, message_type: i32, correlation_id: i32, payload: &[u8]) -> Result<()> {
        self.shared.outbox.create_urgent(&self.shared.name, recipient, message_type, correlation_id, payload)
    }

    /// Replies to `original` with an empty payload.
    pub fn reply(&self, original: &Message, message_type: i32) -> Result<()> {
        self.shared.outbox.reply(original, message_type)
    }

    /// Replies to `original` carrying `payload`.
    pub fn reply_with_data(&self, original: &Message, message_type: i32, payload: &[u8]) -> Result<()> {
        self.shared.outbox.reply_with_data(original, message_type, payload)
    }

    pub(crate) fn dispatch(&self, lane: Lane, message: &Message) -> HandlerResult {
        let handler = &self.shared.handler;
        match lane {
            Lane::Command => handler.on_command(self, message),
            Lane::Reply => handler.on_reply(self, message),
            Lane::Urgent => handler.on_urgent(self, message),
        }
    }
}

impl fmt::Debug for InboxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboxHandle")
            .field("name", &self.shared.name)
            .field("channel", &self.channel_id())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Undoes a half-finished init: stops the lanes and destroys the channel.
fn abandon_init(shared: &Shared, err: io::Error) -> InboxError {
    shared.running.store(false, Ordering::Release);
    if let Err(remove_err) = shared.channel.remove() {
        error!(
            "nexus-inbox: {}: removing channel {} after failed init: {remove_err}",
            shared.name,
            shared.channel.id()
        );
    }
    InboxError::InitFailure(err.to_string())
}

/// Owner of a mailbox. Dropping it performs the same shutdown as [`Inbox::quit`].
pub struct Inbox {
    handle: InboxHandle,
    poller: Option<PollLoop>,
    mode: PollMode,
    closed: bool,
}

impl Inbox {
    /// Claims mailbox `name`: resolves and opens its channel, starts with all
    /// lanes ready and, in threaded mode, spawns the poll loop.
    ///
    /// `name` must be unique across every cooperating process.
    pub fn init(
        name: &str,
        config: &InboxConfig,
        transport: Arc<dyn Transport>,
        handler: impl InboxHandler,
    ) -> Result<Self> {
        config.validate()?;
        let name = MailboxName::new(name)?;
        let resolver = AddressResolver::from_config(config, transport);
        let id = resolver.resolve(&name)?;
        let channel = resolver.open_or_create(id)?;
        let shared = Arc::new(Shared {
            name,
            channel,
            lanes: Lanes::new(),
            running: AtomicBool::new(true),
            tick: config.tick(),
            outbox: Outbox::new(resolver),
            handler: Box::new(handler),
        });
        let handle = InboxHandle { shared };
        let poller = match config.poll_mode {
            PollMode::Threaded => Some(PollLoop::spawn(&handle).map_err(|err| abandon_init(&handle.shared, err))?),
            PollMode::Manual => None,
        };
        let namespace = handle.shared.outbox.resolver().namespace();
        info!(
            "nexus-inbox: {}: inbox ready on channel {id} (root {}, token {}, {:?} polling)",
            handle.shared.name,
            namespace.root().display(),
            namespace.token(),
            config.poll_mode
        );
        Ok(Self { handle, poller, mode: config.poll_mode, closed: false })
    }

    /// Cloneable handle for other threads.
    pub fn handle(&self) -> InboxHandle {
        self.handle.clone()
    }

    /// Polling mode this inbox was started with.
    pub fn poll_mode(&self) -> PollMode {
        self.mode
    }

    /// Runs one poll tick on the calling thread: for each ready lane, one
    /// non-blocking receive, dispatching inline on success. Returns the number
    /// of messages delivered.
    ///
    /// Meant for [`PollMode::Manual`]; in threaded mode it competes with the
    /// pollers but stays correct.
    pub fn tick(&self) -> usize {
        if !self.handle.is_running() {
            return 0;
        }
        let mut delivered = 0;
        for lane in Lane::ALL {
            if let PollOutcome::Delivered(message) = poll::poll_lane(&self.handle.shared, lane, Wait::NonBlocking) {
                poll::dispatch(&self.handle, lane, &message);
                delivered += 1;
            }
        }
        delivered
    }

    /// Stops polling, waits for in-flight handlers, then destroys the channel.
    pub fn quit(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let shared = &self.handle.shared;
        shared.running.store(false, Ordering::Release);
        shared.lanes.wake_all();
        if let Some(poller) = self.poller.take() {
            poller.join();
        }
        match shared.channel.remove() {
            Ok(()) => {
                info!("nexus-inbox: {}: channel {} removed", shared.name, shared.channel.id());
                Ok(())
            }
            Err(ChannelError::Removed) => {
                info!("nexus-inbox: {}: channel {} was already removed", shared.name, shared.channel.id());
                Ok(())
            }
            Err(err) => {
                error!("nexus-inbox: {}: removing channel {} failed: {err}", shared.name, shared.channel.id());
                Err(InboxError::ChannelUnavailable(err))
            }
        }
    }
}

impl Deref for Inbox {
    type Target = InboxHandle;

    fn deref(&self) -> &InboxHandle {
        &self.handle
    }
}

impl Drop for Inbox {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
