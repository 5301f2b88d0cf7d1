//! The update provider seam.
//!
//! A provider does the real work: fetching release manifests, downloading
//! artifacts and launching the installer. The session controller only
//! drives it and reconciles what it reports.

use crate::error::Result;
use crate::progress::DownloadProgress;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Release identification carried by provider events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub version: String,
}

impl ReleaseInfo {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

/// Reply to a check request.
///
/// A reply with `error` set is a failed check even though the call returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResponse {
    pub update_available: bool,
    pub current_version: String,
    pub latest_version: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl CheckResponse {
    /// A successful reply.
    pub fn new(current: impl Into<String>, latest: impl Into<String>, available: bool) -> Self {
        Self {
            update_available: available,
            current_version: current.into(),
            latest_version: latest.into(),
            error: None,
        }
    }
}

/// Acknowledgement of a download request.
///
/// `success` only means the download was accepted and ran; completion is
/// signalled separately by [`ProviderEvent::UpdateDownloaded`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl DownloadResponse {
    pub fn accepted() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Lifecycle notifications pushed by the provider.
///
/// Delivery order relative to command replies is not guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProviderEvent {
    UpdateAvailable(ReleaseInfo),
    UpdateNotAvailable(ReleaseInfo),
    DownloadProgress(DownloadProgress),
    UpdateDownloaded(ReleaseInfo),
    UpdateError { message: String },
}

/// Source of update checks, downloads and installs.
///
/// Errors returned from these methods carry an opaque, human-readable
/// message (usually [`UpdateError::Provider`](crate::UpdateError::Provider)).
#[async_trait]
pub trait UpdateProvider: Send + Sync + 'static {
    /// Ask the release source whether a newer version exists.
    async fn check_for_updates(&self) -> Result<CheckResponse>;

    /// Start downloading the newest version.
    async fn download_update(&self) -> Result<DownloadResponse>;

    /// Quit and run the installer. On success this normally never returns.
    async fn install_update(&self) -> Result<()>;

    /// Subscribe to lifecycle events.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}
