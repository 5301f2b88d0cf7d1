//! Error types for the update session.

/// Top-level error type for the update session crate.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// Failure reported by the update provider (opaque message).
    #[error("provider error: {0}")]
    Provider(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send/receive error (controller gone or shut down).
    #[error("channel error: {0}")]
    Channel(String),
}

impl UpdateError {
    /// The human-readable message without the category prefix.
    ///
    /// Provider messages are surfaced to the user verbatim, so the
    /// `"provider error: "` prefix is stripped for that variant.
    pub fn message(&self) -> String {
        match self {
            Self::Provider(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, UpdateError>;

/// Failure recorded by the session state machine.
///
/// Carried inside snapshots, so it is cheap to clone and compare. The
/// message is whatever the provider said; it is never parsed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum SessionError {
    /// An update check failed.
    #[error("update check failed: {0}")]
    CheckFailed(String),

    /// Downloading the update failed.
    #[error("update download failed: {0}")]
    DownloadFailed(String),

    /// Handing the update to the installer failed.
    #[error("update install failed: {0}")]
    InstallFailed(String),

    /// The provider reported an error on its event stream.
    #[error("update error: {0}")]
    Provider(String),
}

impl SessionError {
    /// The provider message, as shown to the user.
    pub fn message(&self) -> &str {
        match self {
            Self::CheckFailed(msg)
            | Self::DownloadFailed(msg)
            | Self::InstallFailed(msg)
            | Self::Provider(msg) => msg,
        }
    }
}
