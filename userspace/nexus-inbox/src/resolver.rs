// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Mailbox name -> channel identifier -> channel handle
//!
//! The identifier is a pure FNV-1a hash over the normalised namespace root, the
//! mailbox name and the shared project token, so every process configured with
//! the same namespace derives the same id without touching kernel state.
//! Resolution still refuses a namespace root that does not exist (unless
//! `verify_root` is off) so misconfigured processes fail at init instead of
//! talking into a private namespace.

use core::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::channel::{Channel, Transport};
use crate::config::InboxConfig;
use crate::error::{InboxError, Result};
use crate::message::MailboxName;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Identifier of the kernel channel a mailbox name resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(i32);

impl ChannelId {
    /// Wraps a raw identifier.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw identifier (System V key).
    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0 as u32)
    }
}

/// Shared namespace every cooperating process must agree on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Namespace {
    root: PathBuf,
    token: u32,
    verify_root: bool,
}

impl Namespace {
    /// Namespace rooted at `root` with the given project token; the root must exist.
    pub fn new(root: impl Into<PathBuf>, token: u32) -> Self {
        Self { root: root.into(), token, verify_root: true }
    }

    /// Skips the root existence check at resolve time.
    pub fn unchecked(mut self) -> Self {
        self.verify_root = false;
        self
    }

    /// Namespace root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shared project token.
    pub fn token(&self) -> u32 {
        self.token
    }
}

/// Resolves mailbox names to channels on one transport.
#[derive(Clone)]
pub struct AddressResolver {
    namespace: Namespace,
    transport: Arc<dyn Transport>,
}

impl AddressResolver {
    /// Creates a resolver for `namespace` backed by `transport`.
    pub fn new(namespace: Namespace, transport: Arc<dyn Transport>) -> Self {
        Self { namespace, transport }
    }

    /// Creates a resolver from the namespace section of `config`.
    pub fn from_config(config: &InboxConfig, transport: Arc<dyn Transport>) -> Self {
        Self::new(config.namespace(), transport)
    }

    /// Namespace this resolver derives identifiers in.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Derives the channel identifier for `name`.
    pub fn resolve(&self, name: &MailboxName) -> Result<ChannelId> {
        if self.namespace.verify_root && !self.namespace.root.is_dir() {
            return Err(InboxError::AddressResolution { root: self.namespace.root.clone() });
        }
        Ok(derive_id(&self.namespace.root, name.as_bytes(), self.namespace.token))
    }

    /// Opens the channel `id`, creating it when absent.
    pub fn open_or_create(&self, id: ChannelId) -> Result<Arc<dyn Channel>> {
        self.transport.open_or_create(id).map_err(InboxError::ChannelUnavailable)
    }
}

fn derive_id(root: &Path, name: &[u8], token: u32) -> ChannelId {
    let mut hash = FNV_OFFSET;
    let mut feed = |bytes: &[u8]| {
        for byte in bytes {
            hash ^= u32::from(*byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    };
    // Component-wise so "/srv/ipc", "/srv/ipc/" and "/srv//ipc" agree.
    for component in root.components() {
        match component {
            Component::RootDir => feed(b"/"),
            Component::CurDir => {}
            other => {
                feed(other.as_os_str().to_string_lossy().as_bytes());
                feed(b"/");
            }
        }
    }
    feed(&[0]);
    feed(name);
    feed(&[0]);
    feed(&token.to_le_bytes());
    // Zero is IPC_PRIVATE for System V; never hand it out.
    match hash as i32 {
        0 => ChannelId(1),
        raw => ChannelId(raw),
    }
}
