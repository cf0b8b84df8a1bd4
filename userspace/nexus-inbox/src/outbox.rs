// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Composer/sender: builds outbound messages and routes them to the recipient channel.
//!
//! Sends are single non-blocking enqueues. A full or removed recipient channel
//! is reported once as [`InboxError::SendFailure`]; retry policy belongs to the caller.

use std::sync::Arc;

use log::debug;

use crate::channel::{Transport, Wait};
use crate::config::InboxConfig;
use crate::error::{InboxError, Result};
use crate::message::{MailboxName, Message};
use crate::resolver::AddressResolver;
use crate::wire;

/// Send-only endpoint; every [`crate::Inbox`] carries one, and processes that
/// never receive can use one on its own.
#[derive(Clone)]
pub struct Outbox {
    resolver: AddressResolver,
}

impl Outbox {
    /// Creates an outbox routing through `resolver`.
    pub fn new(resolver: AddressResolver) -> Self {
        Self { resolver }
    }

    /// Creates an outbox for the namespace in `config`.
    pub fn from_config(config: &InboxConfig, transport: Arc<dyn Transport>) -> Self {
        Self::new(AddressResolver::from_config(config, transport))
    }

    /// Resolver used to locate recipients.
    pub fn resolver(&self) -> &AddressResolver {
        &self.resolver
    }

    /// Resolves the recipient, opens (or creates) its channel and enqueues `message`.
    pub fn send(&self, message: &Message) -> Result<()> {
        let id = self.resolver.resolve(message.recipient())?;
        let channel = self.resolver.open_or_create(id)?;
        let record = wire::encode(message);
        channel.send(message.lane(), &record, Wait::NonBlocking).map_err(|source| InboxError::SendFailure {
            recipient: message.recipient().to_string(),
            source,
        })?;
        debug!(
            "nexus-inbox: {} -> {} ({id}): {} type={} id={}",
            message.sender(),
            message.recipient(),
            message.lane(),
            message.message_type(),
            message.correlation_id()
        );
        Ok(())
    }

    /// Builds a Command-lane message from `sender` and sends it.
    pub fn create_command(
        &self,
        sender: &MailboxName,
        recipient: &str,
        message_type: i32,
        correlation_id: i32,
        payload: &[u8],
    ) -> Result<()> {
        self.send(&Message::command(sender, recipient, message_type, correlation_id, payload)?)
    }

    /// Builds an Urgent-lane message from `sender` and sends it.
    pub fn create_urgent(
        &self,
        sender: &MailboxName,
        recipient: &str,
        message_type: i32,
        correlation_id: i32,
        payload: &[u8],
    ) -> Result<()> {
        self.send(&Message::urgent(sender, recipient, message_type, correlation_id, payload)?)
    }

    /// Replies to `original` with an empty payload.
    pub fn reply(&self, original: &Message, message_type: i32) -> Result<()> {
        self.send(&Message::reply_to(original, message_type))
    }

    /// Replies to `original` carrying `payload`.
    pub fn reply_with_data(&self, original: &Message, message_type: i32, payload: &[u8]) -> Result<()> {
        self.send(&Message::reply_with_data(original, message_type, payload)?)
    }
}
