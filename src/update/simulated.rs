//! In-process update provider that fakes a release feed.
//!
//! Used by the `update-session-host` binary and handy for wiring up a
//! presentation layer without a real release server.

use crate::error::{Result, UpdateError};
use crate::progress::DownloadProgress;
use crate::update::provider::{
    CheckResponse, DownloadResponse, ProviderEvent, ReleaseInfo, UpdateProvider,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 64;

/// What the simulated feed reports and how it misbehaves.
#[derive(Debug, Clone)]
pub struct SimulatedRelease {
    pub current_version: String,
    pub latest_version: String,
    /// Artifact size reported by progress ticks.
    pub total_bytes: u64,
    /// Number of progress events per download.
    pub progress_ticks: u32,
    /// Delay before each reply and between progress ticks.
    pub latency: Duration,
    pub check_error: Option<String>,
    pub download_error: Option<String>,
    pub install_error: Option<String>,
}

impl Default for SimulatedRelease {
    fn default() -> Self {
        Self {
            current_version: "1.0.4".to_owned(),
            latest_version: "1.0.5".to_owned(),
            total_bytes: 48 * 1024 * 1024,
            progress_ticks: 4,
            latency: Duration::from_millis(250),
            check_error: None,
            download_error: None,
            install_error: None,
        }
    }
}

pub struct SimulatedProvider {
    release: SimulatedRelease,
    events: broadcast::Sender<ProviderEvent>,
}

impl SimulatedProvider {
    #[must_use]
    pub fn new(release: SimulatedRelease) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { release, events }
    }

    fn emit(&self, event: ProviderEvent) {
        // No subscribers is fine; nobody is listening yet.
        let _ = self.events.send(event);
    }

    fn update_available(&self) -> bool {
        self.release.latest_version != self.release.current_version
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new(SimulatedRelease::default())
    }
}

#[async_trait]
impl UpdateProvider for SimulatedProvider {
    async fn check_for_updates(&self) -> Result<CheckResponse> {
        tokio::time::sleep(self.release.latency).await;
        if let Some(error) = &self.release.check_error {
            return Err(UpdateError::Provider(error.clone()));
        }

        let latest = ReleaseInfo::new(&self.release.latest_version);
        let available = self.update_available();
        debug!(latest = %latest.version, available, "simulated check");
        if available {
            self.emit(ProviderEvent::UpdateAvailable(latest));
        } else {
            self.emit(ProviderEvent::UpdateNotAvailable(latest));
        }
        Ok(CheckResponse::new(
            &self.release.current_version,
            &self.release.latest_version,
            available,
        ))
    }

    async fn download_update(&self) -> Result<DownloadResponse> {
        let total = self.release.total_bytes;
        let ticks = u64::from(self.release.progress_ticks.max(1));
        let chunk = total / ticks;
        let rate = if self.release.latency.is_zero() {
            chunk as f64
        } else {
            chunk as f64 / self.release.latency.as_secs_f64()
        };

        for tick in 1..=ticks {
            tokio::time::sleep(self.release.latency).await;
            if let Some(error) = &self.release.download_error {
                if tick * 2 > ticks {
                    return Ok(DownloadResponse::failed(error.clone()));
                }
            }
            let transferred = if tick == ticks { total } else { chunk * tick };
            self.emit(ProviderEvent::DownloadProgress(DownloadProgress::from_bytes(
                transferred,
                total,
                rate,
            )));
        }

        self.emit(ProviderEvent::UpdateDownloaded(ReleaseInfo::new(
            &self.release.latest_version,
        )));
        Ok(DownloadResponse::accepted())
    }

    async fn install_update(&self) -> Result<()> {
        tokio::time::sleep(self.release.latency).await;
        if let Some(error) = &self.release.install_error {
            return Err(UpdateError::Provider(error.clone()));
        }
        info!(
            version = %self.release.latest_version,
            "simulated installer launched; a real provider would restart here"
        );
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
