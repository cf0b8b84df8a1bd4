// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Inbox configuration, loadable from TOML.
//!
//! ```toml
//! namespace_root = "/run/rover/ipc"
//! project_token = 1337
//! tick_ms = 1
//! channel_capacity = 64
//! poll_mode = "threaded"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{InboxError, Result};
use crate::host::DEFAULT_CAPACITY;
use crate::resolver::Namespace;

/// How received messages reach the handlers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollMode {
    /// One poller and one dispatch worker thread per lane.
    #[default]
    Threaded,
    /// No threads; the host drives [`crate::Inbox::tick`] from its own loop.
    Manual,
}

/// Settings shared by every inbox of a deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InboxConfig {
    /// Shared namespace root; must exist when `verify_root` is set.
    pub namespace_root: PathBuf,
    /// Project token mixed into every channel id.
    pub project_token: u32,
    /// Refuse to resolve names while the root directory is missing.
    pub verify_root: bool,
    /// Poll tick, also the blocking receive timeout, in milliseconds.
    pub tick_ms: u64,
    /// Maximum records queued per channel (host transport).
    pub channel_capacity: usize,
    /// Threaded or host-driven polling.
    pub poll_mode: PollMode,
}

impl InboxConfig {
    /// Project token used when none is configured.
    pub const DEFAULT_PROJECT_TOKEN: u32 = 1337;

    /// Longest accepted tick; also bounds how long `quit()` waits for a poller.
    pub const MAX_TICK_MS: u64 = 60_000;

    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|err| InboxError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Serialises the configuration back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|err| InboxError::Config(err.to_string()))
    }

    /// Rejects values the poll loop or transports cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            return Err(InboxError::Config("tick_ms must be at least 1".to_string()));
        }
        if self.tick_ms > Self::MAX_TICK_MS {
            return Err(InboxError::Config(format!("tick_ms must be at most {}", Self::MAX_TICK_MS)));
        }
        if self.channel_capacity == 0 {
            return Err(InboxError::Config("channel_capacity must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Poll tick as a [`Duration`].
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Namespace derived from the root, token and verification flag.
    pub fn namespace(&self) -> Namespace {
        let namespace = Namespace::new(self.namespace_root.clone(), self.project_token);
        if self.verify_root {
            namespace
        } else {
            namespace.unchecked()
        }
    }

    /// Returns a copy rooted at `root`.
    pub fn with_namespace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.namespace_root = root.into();
        self
    }

    /// Returns a copy using `mode`.
    pub fn with_poll_mode(mut self, mode: PollMode) -> Self {
        self.poll_mode = mode;
        self
    }

    /// Returns a copy ticking every `tick` (rounded down to milliseconds, minimum 1,
    /// saturating at `u64::MAX`).
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick_ms = u64::try_from(tick.as_millis()).unwrap_or(u64::MAX).max(1);
        self
    }
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            namespace_root: std::env::temp_dir(),
            project_token: Self::DEFAULT_PROJECT_TOKEN,
            verify_root: true,
            tick_ms: 1,
            channel_capacity: DEFAULT_CAPACITY,
            poll_mode: PollMode::Threaded,
        }
    }
}
