//! CONTEXT: nexus-inbox end-to-end test harness library
//! INTENT: Multi-mailbox scenarios over the in-process host transport
//! DEPS: nexus-inbox
//! TESTS: command/reply roundtrip, urgent vs. slow command, FIFO after unlock, config files
// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;
use nexus_inbox::{
    HandlerResult, HostTransport, Inbox, InboxConfig, InboxHandle, InboxHandler, Lane, Message, Outbox, PollMode,
};
use tempfile::TempDir;

/// Upper bound for any single expected delivery.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared namespace directory plus one host transport, as a deployment would have.
pub struct Harness {
    dir: TempDir,
    transport: Arc<HostTransport>,
    config: InboxConfig,
}

impl Harness {
    /// Threaded-mode harness in a fresh namespace directory.
    pub fn new() -> Self {
        Self::with_mode(PollMode::Threaded)
    }

    /// Harness whose inboxes use `mode`.
    pub fn with_mode(mode: PollMode) -> Self {
        let dir = tempfile::tempdir().expect("namespace dir");
        let config = InboxConfig::default().with_namespace_root(dir.path()).with_poll_mode(mode);
        let transport = Arc::new(HostTransport::from_config(&config));
        Self { dir, transport, config }
    }

    /// Replaces the transport with one bounded to `capacity` records per channel.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self.transport = Arc::new(HostTransport::from_config(&self.config));
        self
    }

    /// Namespace root directory.
    pub fn root(&self) -> &std::path::Path {
        self.dir.path()
    }

    /// Configuration handed to every inbox.
    pub fn config(&self) -> &InboxConfig {
        &self.config
    }

    /// Shared host transport.
    pub fn transport(&self) -> &Arc<HostTransport> {
        &self.transport
    }

    /// Starts mailbox `name` with `handler`.
    pub fn inbox(&self, name: &str, handler: impl InboxHandler) -> Inbox {
        Inbox::init(name, &self.config, self.transport.clone(), handler).expect("inbox init")
    }

    /// Send-only endpoint on the same namespace.
    pub fn outbox(&self) -> Outbox {
        Outbox::from_config(&self.config, self.transport.clone())
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Forwards every delivered message to a channel; optionally unlocks the lane.
pub struct Forward {
    tx: Sender<(Lane, Message)>,
    unlock: bool,
}

impl Forward {
    /// Forwarder that releases each lane right after forwarding.
    pub fn releasing() -> (Self, Receiver<(Lane, Message)>) {
        let (tx, rx) = unbounded();
        (Self { tx, unlock: true }, rx)
    }

    /// Forwarder that leaves lanes locked; the test unlocks them.
    pub fn holding() -> (Self, Receiver<(Lane, Message)>) {
        let (tx, rx) = unbounded();
        (Self { tx, unlock: false }, rx)
    }

    fn forward(&self, inbox: &InboxHandle, lane: Lane, message: &Message) -> HandlerResult {
        debug!("inbox-e2e: {} got {lane} id={}", inbox.name(), message.correlation_id());
        let _ = self.tx.send((lane, message.clone()));
        if self.unlock {
            inbox.unlock(lane);
        }
        Ok(())
    }
}

impl InboxHandler for Forward {
    fn on_command(&self, inbox: &InboxHandle, command: &Message) -> HandlerResult {
        self.forward(inbox, Lane::Command, command)
    }

    fn on_reply(&self, inbox: &InboxHandle, reply: &Message) -> HandlerResult {
        self.forward(inbox, Lane::Reply, reply)
    }

    fn on_urgent(&self, inbox: &InboxHandle, urgent: &Message) -> HandlerResult {
        self.forward(inbox, Lane::Urgent, urgent)
    }
}

/// Answers every command with `(reply_type, reply_payload)` and unlocks.
pub struct Responder {
    reply_type: i32,
    reply_payload: Vec<u8>,
}

impl Responder {
    /// Responder replying with `reply_type` and `payload`.
    pub fn new(reply_type: i32, payload: &[u8]) -> Self {
        Self { reply_type, reply_payload: payload.to_vec() }
    }
}

impl InboxHandler for Responder {
    fn on_command(&self, inbox: &InboxHandle, command: &Message) -> HandlerResult {
        let sent = inbox.reply_with_data(command, self.reply_type, &self.reply_payload);
        inbox.unlock(Lane::Command);
        sent.map_err(|err| nexus_inbox::HandlerError::new(-1, err.to_string()))
    }

    fn on_reply(&self, inbox: &InboxHandle, _reply: &Message) -> HandlerResult {
        inbox.unlock(Lane::Reply);
        Ok(())
    }

    fn on_urgent(&self, inbox: &InboxHandle, _urgent: &Message) -> HandlerResult {
        inbox.unlock(Lane::Urgent);
        Ok(())
    }
}

/// Command handler that blocks until released; urgent messages are forwarded.
pub struct SlowCommand {
    started: Sender<i32>,
    release: Receiver<()>,
    urgent: Sender<Message>,
}

/// Test-side controls of a [`SlowCommand`].
pub struct SlowControls {
    /// Correlation ids of commands whose handler has started.
    pub started: Receiver<i32>,
    /// Send one unit per command to let its handler finish.
    pub release: Sender<()>,
    /// Urgent messages delivered.
    pub urgent: Receiver<Message>,
}

impl SlowCommand {
    /// Handler plus its controls.
    pub fn with_controls() -> (Self, SlowControls) {
        let (started_tx, started_rx) = unbounded();
        let (release_tx, release_rx) = unbounded();
        let (urgent_tx, urgent_rx) = unbounded();
        (
            Self { started: started_tx, release: release_rx, urgent: urgent_tx },
            SlowControls { started: started_rx, release: release_tx, urgent: urgent_rx },
        )
    }
}

impl InboxHandler for SlowCommand {
    fn on_command(&self, inbox: &InboxHandle, command: &Message) -> HandlerResult {
        let _ = self.started.send(command.correlation_id());
        let _ = self.release.recv_timeout(DELIVERY_TIMEOUT);
        inbox.unlock(Lane::Command);
        Ok(())
    }

    fn on_reply(&self, inbox: &InboxHandle, _reply: &Message) -> HandlerResult {
        inbox.unlock(Lane::Reply);
        Ok(())
    }

    fn on_urgent(&self, inbox: &InboxHandle, urgent: &Message) -> HandlerResult {
        let _ = self.urgent.send(urgent.clone());
        inbox.unlock(Lane::Urgent);
        Ok(())
    }
}
