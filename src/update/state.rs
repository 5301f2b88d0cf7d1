//! Session state types shared between the controller and its readers.
//!
//! Everything here is a plain value: the controller owns the live copy and
//! publishes clones as [`UpdateSnapshot`]s.

use crate::error::SessionError;
use crate::progress::DownloadProgress;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Lifecycle state of one update session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing in progress and nothing to offer.
    #[default]
    Idle,
    /// A user-visible check is running.
    Checking,
    /// A newer version exists and can be downloaded.
    UpdateAvailable,
    /// The update is being downloaded.
    Downloading,
    /// The update is downloaded and ready to install.
    Downloaded,
    /// The last operation failed; see [`UpdateSnapshot::last_error`].
    Error,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::UpdateAvailable => "update_available",
            Self::Downloading => "downloading",
            Self::Downloaded => "downloaded",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// How a single check was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckMode {
    /// Requested by the user: shows the busy state and reports every outcome.
    Manual,
    /// Background check: only an available update is surfaced.
    Silent,
}

/// Result of a completed check. Replaced, never mutated, by the next check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub current_version: String,
    pub latest_version: String,
    pub update_available: bool,
}

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The running version is the latest.
    LatestVersion,
    /// A newer version was found.
    UpdateAvailable,
    /// The download finished.
    ReadyToInstall,
    /// An operation failed.
    Error,
}

/// A short-lived message for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Monotonic id; a newer notification always has a larger id.
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
    #[serde(skip)]
    pub created_at: Instant,
}

impl Notification {
    pub(crate) fn latest_version(id: u64, created_at: Instant) -> Self {
        Self {
            id,
            kind: NotificationKind::LatestVersion,
            message: "You're running the latest version!".to_owned(),
            created_at,
        }
    }

    pub(crate) fn update_available(id: u64, version: &str, created_at: Instant) -> Self {
        Self {
            id,
            kind: NotificationKind::UpdateAvailable,
            message: format!("A new version is available: {version}"),
            created_at,
        }
    }

    pub(crate) fn ready_to_install(id: u64, created_at: Instant) -> Self {
        Self {
            id,
            kind: NotificationKind::ReadyToInstall,
            message: "Update downloaded and ready to install!".to_owned(),
            created_at,
        }
    }

    pub(crate) fn error(id: u64, message: &str, created_at: Instant) -> Self {
        Self {
            id,
            kind: NotificationKind::Error,
            message: format!("Error: {message}"),
            created_at,
        }
    }
}

/// Read-only view of the session handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateSnapshot {
    pub state: SessionState,
    pub version_info: Option<VersionInfo>,
    pub download_progress: Option<DownloadProgress>,
    pub notification: Option<Notification>,
    pub last_error: Option<SessionError>,
    /// A downloaded artifact is waiting to be installed.
    ///
    /// Survives a failed install so the user can retry.
    pub artifact_ready: bool,
}

impl UpdateSnapshot {
    /// A user-visible operation is running.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            SessionState::Checking | SessionState::Downloading
        )
    }

    /// Whether a "check for updates" action should be enabled.
    pub fn can_check(&self) -> bool {
        !self.is_busy()
    }

    /// Whether a "download" action should be offered.
    pub fn can_download(&self) -> bool {
        self.state == SessionState::UpdateAvailable
    }

    /// Whether a "restart and install" action should be offered.
    pub fn can_install(&self) -> bool {
        self.state == SessionState::Downloaded
            || (self.state == SessionState::Error && self.artifact_ready)
    }
}
