//! Line protocol spoken by the update session host.
//!
//! Commands arrive as one plain word per line. Everything written back is a
//! single JSON object per line: snapshots as they change, and a reply for
//! each command.

use crate::update::state::UpdateSnapshot;
use serde::Serialize;

/// Commands accepted on the host's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// User-triggered check.
    Check,
    /// Background-style check with no "latest version" or error notification.
    CheckSilent,
    Download,
    Install,
    /// Write the current snapshot.
    Status,
    /// Shut the session down and exit.
    Quit,
}

impl HostCommand {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::CheckSilent => "check-silent",
            Self::Download => "download",
            Self::Install => "install",
            Self::Status => "status",
            Self::Quit => "quit",
        }
    }

    /// Parse a command word. Case and surrounding whitespace are ignored.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "check" => Some(Self::Check),
            "check-silent" | "silent" => Some(Self::CheckSilent),
            "download" => Some(Self::Download),
            "install" => Some(Self::Install),
            "status" => Some(Self::Status),
            "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// One JSON line written by the host.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    /// The session changed.
    Snapshot { snapshot: UpdateSnapshot },
    /// Outcome of enqueueing a command.
    Reply {
        command: String,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl HostMessage {
    pub fn snapshot(snapshot: UpdateSnapshot) -> Self {
        Self::Snapshot { snapshot }
    }

    pub fn ok(command: HostCommand) -> Self {
        Self::Reply {
            command: command.as_str().to_owned(),
            ok: true,
            error: None,
        }
    }

    pub fn error(command: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Reply {
            command: command.into(),
            ok: false,
            error: Some(error.into()),
        }
    }
}
