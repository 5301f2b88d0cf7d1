//! The update session state machine.
//!
//! [`Session`] is synchronous and owns no timers or tasks. The controller
//! feeds it commands, provider replies, provider events and the current time,
//! and runs whatever provider call it asks for. Every input, timer-driven or
//! not, goes through the same guards here.

use crate::error::{Result, SessionError, UpdateError};
use crate::progress::DownloadProgress;
use crate::update::notification::NotificationSlot;
use crate::update::provider::{CheckResponse, DownloadResponse, ProviderEvent};
use crate::update::state::{
    CheckMode, Notification, NotificationKind, SessionState, UpdateSnapshot, VersionInfo,
};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const CHECK_FAILED_FALLBACK: &str = "Failed to check for updates";
const DOWNLOAD_FAILED_FALLBACK: &str = "Failed to download update";
const INSTALL_FAILED_FALLBACK: &str = "Failed to install update";

/// A provider call the session wants started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Effect {
    Check,
    Download,
    Install,
}

pub(crate) struct Session {
    state: SessionState,
    version_info: Option<VersionInfo>,
    download_progress: Option<DownloadProgress>,
    last_error: Option<SessionError>,
    notifications: NotificationSlot,
    /// Mode of the provider check currently outstanding.
    check_in_flight: Option<CheckMode>,
    download_in_flight: bool,
    install_in_flight: bool,
    /// Version already announced during the current check cycle.
    announced_version: Option<String>,
    /// Version of the artifact the provider reported as downloaded.
    downloaded_version: Option<String>,
    artifact_ready: bool,
}

impl Session {
    pub(crate) fn new(notification_ttl: Duration) -> Self {
        Self {
            state: SessionState::Idle,
            version_info: None,
            download_progress: None,
            last_error: None,
            notifications: NotificationSlot::new(notification_ttl),
            check_in_flight: None,
            download_in_flight: false,
            install_in_flight: false,
            announced_version: None,
            downloaded_version: None,
            artifact_ready: false,
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn snapshot(&self) -> UpdateSnapshot {
        UpdateSnapshot {
            state: self.state,
            version_info: self.version_info.clone(),
            download_progress: self.download_progress.clone(),
            notification: self.notifications.current().cloned(),
            last_error: self.last_error.clone(),
            artifact_ready: self.artifact_ready,
        }
    }

    pub(crate) fn notification_deadline(&self) -> Option<Instant> {
        self.notifications.deadline()
    }

    pub(crate) fn expire_notification(&mut self, now: Instant) -> bool {
        self.notifications.expire(now).is_some()
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Request a check. Returns the provider call to start, if any.
    ///
    /// A check requested while another is outstanding is coalesced into it;
    /// a manual request upgrades an outstanding silent check so the user
    /// still sees the outcome.
    pub(crate) fn begin_check(&mut self, mode: CheckMode) -> Option<Effect> {
        match mode {
            CheckMode::Manual
                if matches!(
                    self.state,
                    SessionState::Checking | SessionState::Downloading
                ) =>
            {
                debug!(state = %self.state, "manual check ignored while busy");
                return None;
            }
            CheckMode::Silent
                if self.download_in_flight
                    || matches!(
                        self.state,
                        SessionState::Downloading | SessionState::Downloaded
                    ) =>
            {
                debug!(state = %self.state, "background check skipped");
                return None;
            }
            _ => {}
        }

        if let Some(in_flight) = self.check_in_flight.as_mut() {
            if mode == CheckMode::Manual {
                debug!("manual check joined outstanding check");
                *in_flight = CheckMode::Manual;
                self.set_state(SessionState::Checking);
            } else {
                debug!(?mode, "check already in flight; coalesced");
            }
            return None;
        }

        info!(?mode, "checking for updates");
        self.check_in_flight = Some(mode);
        self.announced_version = None;
        if mode == CheckMode::Manual {
            self.set_state(SessionState::Checking);
        }
        Some(Effect::Check)
    }

    /// Request a download. Proceeds from any state unless one is outstanding.
    ///
    /// A download stays outstanding after the provider acknowledges it, until
    /// the downloaded event or a failure moves the session out of
    /// `Downloading`.
    pub(crate) fn begin_download(&mut self) -> Option<Effect> {
        if self.download_in_flight || self.state == SessionState::Downloading {
            debug!("download already in flight; ignored");
            return None;
        }
        if self.state != SessionState::UpdateAvailable {
            warn!(state = %self.state, "download requested without an available update");
        }

        info!("downloading update");
        self.download_in_flight = true;
        self.download_progress = None;
        self.set_state(SessionState::Downloading);
        Some(Effect::Download)
    }

    /// Request an install. Only a ready artifact can be installed.
    pub(crate) fn begin_install(&mut self) -> Option<Effect> {
        if self.install_in_flight {
            debug!("install already in flight; ignored");
            return None;
        }
        let retry_after_failure = self.state == SessionState::Error && self.artifact_ready;
        if self.state != SessionState::Downloaded && !retry_after_failure {
            warn!(state = %self.state, "install requested with nothing downloaded; ignored");
            return None;
        }

        info!("installing update");
        self.install_in_flight = true;
        if retry_after_failure {
            self.set_state(SessionState::Downloaded);
        }
        Some(Effect::Install)
    }

    // ------------------------------------------------------------------
    // Provider replies
    // ------------------------------------------------------------------

    pub(crate) fn complete_check(&mut self, reply: Result<CheckResponse>, now: Instant) {
        let Some(mode) = self.check_in_flight.take() else {
            debug!("check reply with no check in flight; ignored");
            return;
        };

        let response = match reply {
            Ok(response) => match response.error.clone() {
                Some(error) => Err(non_empty_or(error, CHECK_FAILED_FALLBACK)),
                None => Ok(response),
            },
            Err(e) => Err(provider_message(&e, CHECK_FAILED_FALLBACK)),
        };

        match response {
            Ok(response) => self.apply_check_success(mode, response, now),
            Err(message) => self.apply_check_failure(mode, message, now),
        }
    }

    fn apply_check_success(&mut self, mode: CheckMode, response: CheckResponse, now: Instant) {
        info!(
            current = %response.current_version,
            latest = %response.latest_version,
            available = response.update_available,
            ?mode,
            "update check finished"
        );

        let latest = response.latest_version.clone();
        self.version_info = Some(VersionInfo {
            current_version: response.current_version,
            latest_version: response.latest_version,
            update_available: response.update_available,
        });

        if response.update_available {
            self.settle_available(&latest);
            self.announce_available(&latest, now);
            return;
        }

        match self.state {
            SessionState::Checking | SessionState::UpdateAvailable => {
                self.set_state(SessionState::Idle);
            }
            SessionState::Error
                if matches!(
                    self.last_error,
                    Some(SessionError::CheckFailed(_) | SessionError::Provider(_))
                ) =>
            {
                self.set_state(SessionState::Idle);
            }
            _ => {}
        }
        if mode == CheckMode::Manual {
            self.notifications.post(now, Notification::latest_version);
        }
    }

    fn apply_check_failure(&mut self, mode: CheckMode, message: String, now: Instant) {
        warn!(?mode, error = %message, "update check failed");

        if self.download_in_flight
            || matches!(
                self.state,
                SessionState::Downloading | SessionState::Downloaded
            )
        {
            // A download overtook this check; its state wins.
            debug!(state = %self.state, "check failure not applied over download state");
        } else {
            self.fail(SessionError::CheckFailed(message.clone()));
        }

        if mode == CheckMode::Manual {
            self.notify_error(&message, now);
        }
    }

    /// Pick the state for "an update exists" without undoing download work.
    fn settle_available(&mut self, latest: &str) {
        if self.state == SessionState::Downloading {
            return;
        }
        if self.artifact_ready && self.downloaded_version.as_deref() == Some(latest) {
            self.set_state(SessionState::Downloaded);
            return;
        }
        self.artifact_ready = false;
        self.downloaded_version = None;
        self.set_state(SessionState::UpdateAvailable);
    }

    pub(crate) fn complete_download(&mut self, reply: Result<DownloadResponse>, now: Instant) {
        if !self.download_in_flight {
            debug!("download reply with no download in flight; ignored");
            return;
        }
        self.download_in_flight = false;

        let message = match reply {
            Ok(response) if response.success => {
                debug!(state = %self.state, "download acknowledged");
                return;
            }
            Ok(response) => non_empty_or(response.error.unwrap_or_default(), DOWNLOAD_FAILED_FALLBACK),
            Err(e) => provider_message(&e, DOWNLOAD_FAILED_FALLBACK),
        };

        if self.state == SessionState::Downloaded {
            warn!(error = %message, "download reported failure after completion; keeping artifact");
            return;
        }

        warn!(error = %message, "update download failed");
        self.fail(SessionError::DownloadFailed(message.clone()));
        self.notify_error(&message, now);
    }

    pub(crate) fn complete_install(&mut self, reply: Result<()>, now: Instant) {
        if !self.install_in_flight {
            debug!("install reply with no install in flight; ignored");
            return;
        }
        self.install_in_flight = false;

        match reply {
            Ok(()) => info!("installer launched; waiting for restart"),
            Err(e) => {
                let message = provider_message(&e, INSTALL_FAILED_FALLBACK);
                warn!(error = %message, "update install failed");
                self.fail(SessionError::InstallFailed(message.clone()));
                self.notify_error(&message, now);
            }
        }
    }

    // ------------------------------------------------------------------
    // Provider events
    // ------------------------------------------------------------------

    pub(crate) fn apply_event(&mut self, event: ProviderEvent, now: Instant) {
        match event {
            ProviderEvent::UpdateAvailable(info) => {
                debug!(version = %info.version, "provider: update available");
                self.announce_available(&info.version, now);
            }
            ProviderEvent::UpdateNotAvailable(info) => {
                debug!(version = %info.version, "provider: update not available");
            }
            ProviderEvent::DownloadProgress(progress) => {
                self.download_progress = Some(progress);
            }
            ProviderEvent::UpdateDownloaded(info) => {
                let already = self.state == SessionState::Downloaded
                    && self.downloaded_version.as_deref() == Some(info.version.as_str());
                if already {
                    debug!(version = %info.version, "duplicate downloaded event ignored");
                    return;
                }
                info!(version = %info.version, "update downloaded");
                self.downloaded_version = Some(info.version);
                self.artifact_ready = true;
                self.set_state(SessionState::Downloaded);
                self.notifications.post(now, Notification::ready_to_install);
            }
            ProviderEvent::UpdateError { message } => {
                warn!(error = %message, "provider reported update error");
                let user_waiting = self.download_in_flight
                    || self.state == SessionState::Downloading
                    || self.check_in_flight == Some(CheckMode::Manual);
                self.fail(SessionError::Provider(message.clone()));
                if user_waiting {
                    self.notify_error(&message, now);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn set_state(&mut self, next: SessionState) {
        if next != SessionState::Error {
            self.last_error = None;
        }
        if self.state != next {
            debug!(from = %self.state, to = %next, "session state changed");
            self.state = next;
        }
    }

    fn fail(&mut self, error: SessionError) {
        self.set_state(SessionState::Error);
        self.last_error = Some(error);
    }

    /// One "update available" notification per check cycle, whichever of the
    /// check reply and the provider event arrives first.
    fn announce_available(&mut self, version: &str, now: Instant) {
        if self.announced_version.as_deref() == Some(version) {
            debug!(%version, "update already announced this cycle");
            return;
        }
        self.announced_version = Some(version.to_owned());
        self.notifications
            .post(now, |id, at| Notification::update_available(id, version, at));
    }

    /// Error notifications are idempotent: the same message already on
    /// screen is not re-posted.
    fn notify_error(&mut self, message: &str, now: Instant) {
        let duplicate = self
            .notifications
            .current()
            .is_some_and(|n| n.kind == NotificationKind::Error && n.message == format!("Error: {message}"));
        if duplicate {
            return;
        }
        self.notifications
            .post(now, |id, at| Notification::error(id, message, at));
    }
}

fn non_empty_or(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_owned()
    } else {
        message
    }
}

fn provider_message(error: &UpdateError, fallback: &str) -> String {
    non_empty_or(error.message(), fallback)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::update::provider::ReleaseInfo;

    const TTL: Duration = Duration::from_secs(5);

    fn session() -> Session {
        Session::new(TTL)
    }

    fn no_update() -> Result<CheckResponse> {
        Ok(CheckResponse::new("1.0.4", "1.0.4", false))
    }

    fn update() -> Result<CheckResponse> {
        Ok(CheckResponse::new("1.0.4", "1.0.5", true))
    }

    fn kind(session: &Session) -> Option<NotificationKind> {
        session.snapshot().notification.map(|n| n.kind)
    }

    /// Drive a session into `Downloaded` for version 1.0.5.
    fn downloaded(now: Instant) -> Session {
        let mut s = session();
        s.begin_check(CheckMode::Manual);
        s.complete_check(update(), now);
        s.begin_download();
        s.complete_download(Ok(DownloadResponse::accepted()), now);
        s.apply_event(ProviderEvent::UpdateDownloaded(ReleaseInfo::new("1.0.5")), now);
        assert_eq!(s.state(), SessionState::Downloaded);
        s
    }

    #[test]
    fn manual_check_enters_checking() {
        let mut s = session();
        assert_eq!(s.begin_check(CheckMode::Manual), Some(Effect::Check));
        assert_eq!(s.state(), SessionState::Checking);
    }

    #[test]
    fn silent_check_keeps_state() {
        let mut s = session();
        assert_eq!(s.begin_check(CheckMode::Silent), Some(Effect::Check));
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[test]
    fn manual_no_update_notifies_latest_version() {
        let now = Instant::now();
        let mut s = session();
        s.begin_check(CheckMode::Manual);
        s.complete_check(no_update(), now);

        let snap = s.snapshot();
        assert_eq!(snap.state, SessionState::Idle);
        assert_eq!(kind(&s), Some(NotificationKind::LatestVersion));
        assert_eq!(snap.version_info.as_ref().unwrap().latest_version, "1.0.4");
        assert!(!snap.can_download());
    }

    #[test]
    fn silent_no_update_is_quiet() {
        let now = Instant::now();
        let mut s = session();
        s.begin_check(CheckMode::Silent);
        s.complete_check(no_update(), now);
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.snapshot().notification.is_none());
        assert!(s.snapshot().version_info.is_some());
    }

    #[test]
    fn update_found_notifies_in_both_modes() {
        let now = Instant::now();
        for mode in [CheckMode::Manual, CheckMode::Silent] {
            let mut s = session();
            s.begin_check(mode);
            s.complete_check(update(), now);
            assert_eq!(s.state(), SessionState::UpdateAvailable);
            let n = s.snapshot().notification.unwrap();
            assert_eq!(n.kind, NotificationKind::UpdateAvailable);
            assert!(n.message.contains("1.0.5"));
        }
    }

    #[test]
    fn event_and_reply_announce_once() {
        let now = Instant::now();
        let mut s = session();
        s.begin_check(CheckMode::Manual);
        s.apply_event(ProviderEvent::UpdateAvailable(ReleaseInfo::new("1.0.5")), now);
        let first_id = s.snapshot().notification.unwrap().id;
        s.complete_check(update(), now);
        s.apply_event(ProviderEvent::UpdateAvailable(ReleaseInfo::new("1.0.5")), now);

        assert_eq!(s.snapshot().notification.unwrap().id, first_id);
    }

    #[test]
    fn each_check_cycle_announces_again() {
        let now = Instant::now();
        let mut s = session();
        s.begin_check(CheckMode::Silent);
        s.complete_check(update(), now);
        let first = s.snapshot().notification.unwrap().id;

        s.begin_check(CheckMode::Silent);
        s.complete_check(update(), now);
        let second = s.snapshot().notification.unwrap().id;
        assert!(second > first);
    }

    #[test]
    fn manual_check_rejected_while_checking() {
        let mut s = session();
        assert!(s.begin_check(CheckMode::Manual).is_some());
        assert!(s.begin_check(CheckMode::Manual).is_none());
        assert!(s.begin_check(CheckMode::Silent).is_none());
    }

    #[test]
    fn manual_joins_outstanding_silent_check() {
        let now = Instant::now();
        let mut s = session();
        assert!(s.begin_check(CheckMode::Silent).is_some());
        assert!(s.begin_check(CheckMode::Manual).is_none());
        assert_eq!(s.state(), SessionState::Checking);

        s.complete_check(no_update(), now);
        assert_eq!(kind(&s), Some(NotificationKind::LatestVersion));
    }

    #[test]
    fn manual_failure_notifies_and_records() {
        let now = Instant::now();
        let mut s = session();
        s.begin_check(CheckMode::Manual);
        s.complete_check(Err(UpdateError::Provider("offline".to_owned())), now);

        let snap = s.snapshot();
        assert_eq!(snap.state, SessionState::Error);
        assert_eq!(snap.last_error, Some(SessionError::CheckFailed("offline".to_owned())));
        assert_eq!(snap.notification.as_ref().unwrap().message, "Error: offline");
    }

    #[test]
    fn silent_failure_is_recorded_not_surfaced() {
        let now = Instant::now();
        let mut s = session();
        s.begin_check(CheckMode::Silent);
        s.complete_check(Err(UpdateError::Provider("offline".to_owned())), now);
        assert_eq!(s.state(), SessionState::Error);
        assert!(s.snapshot().notification.is_none());
    }

    #[test]
    fn error_field_in_reply_is_a_failure() {
        let now = Instant::now();
        let mut s = session();
        s.begin_check(CheckMode::Manual);
        let mut reply = CheckResponse::new("1.0.4", "1.0.4", false);
        reply.error = Some("rate limited".to_owned());
        s.complete_check(Ok(reply), now);
        assert_eq!(
            s.snapshot().last_error,
            Some(SessionError::CheckFailed("rate limited".to_owned()))
        );
        assert!(s.snapshot().version_info.is_none());
    }

    #[test]
    fn empty_provider_message_uses_fallback() {
        let now = Instant::now();
        let mut s = session();
        s.begin_check(CheckMode::Manual);
        s.complete_check(Err(UpdateError::Provider(String::new())), now);
        assert_eq!(s.snapshot().last_error.unwrap().message(), CHECK_FAILED_FALLBACK);
    }

    #[test]
    fn manual_check_clears_previous_error() {
        let now = Instant::now();
        let mut s = session();
        s.begin_check(CheckMode::Silent);
        s.complete_check(Err(UpdateError::Provider("offline".to_owned())), now);
        s.begin_check(CheckMode::Manual);
        assert_eq!(s.state(), SessionState::Checking);
        assert!(s.snapshot().last_error.is_none());
    }

    #[test]
    fn progress_replaces_without_state_change() {
        let now = Instant::now();
        let mut s = session();
        s.begin_check(CheckMode::Manual);
        s.complete_check(update(), now);
        s.begin_download();

        for percent in [10.0, 55.0, 100.0] {
            let progress = DownloadProgress {
                percent,
                transferred_bytes: percent as u64,
                total_bytes: 100,
                bytes_per_second: 1.0,
            };
            s.apply_event(ProviderEvent::DownloadProgress(progress.clone()), now);
            assert_eq!(s.state(), SessionState::Downloading);
            assert_eq!(s.snapshot().download_progress, Some(progress));
        }
    }

    #[test]
    fn accepted_download_waits_for_event() {
        let now = Instant::now();
        let mut s = session();
        s.begin_check(CheckMode::Manual);
        s.complete_check(update(), now);
        s.begin_download();
        s.complete_download(Ok(DownloadResponse::accepted()), now);
        assert_eq!(s.state(), SessionState::Downloading);

        s.apply_event(ProviderEvent::UpdateDownloaded(ReleaseInfo::new("1.0.5")), now);
        assert_eq!(s.state(), SessionState::Downloaded);
        assert_eq!(kind(&s), Some(NotificationKind::ReadyToInstall));
        assert!(s.snapshot().can_install());
    }

    #[test]
    fn downloaded_event_before_ack_is_not_undone() {
        let now = Instant::now();
        let mut s = session();
        s.begin_download();
        s.apply_event(ProviderEvent::UpdateDownloaded(ReleaseInfo::new("1.0.5")), now);
        s.complete_download(Ok(DownloadResponse::accepted()), now);
        assert_eq!(s.state(), SessionState::Downloaded);
    }

    #[test]
    fn failed_download_reply_enters_error() {
        let now = Instant::now();
        let mut s = session();
        s.begin_check(CheckMode::Manual);
        s.complete_check(update(), now);
        s.begin_download();
        s.complete_download(Ok(DownloadResponse::failed("network timeout")), now);

        let snap = s.snapshot();
        assert_eq!(snap.state, SessionState::Error);
        assert_eq!(snap.last_error.as_ref().unwrap().message(), "network timeout");
        assert!(!snap.is_busy());
    }

    #[test]
    fn failed_download_without_message_uses_fallback() {
        let now = Instant::now();
        let mut s = session();
        s.begin_download();
        s.complete_download(
            Ok(DownloadResponse {
                success: false,
                error: None,
            }),
            now,
        );
        assert_eq!(
            s.snapshot().last_error,
            Some(SessionError::DownloadFailed(DOWNLOAD_FAILED_FALLBACK.to_owned()))
        );
    }

    #[test]
    fn second_download_request_is_ignored() {
        let mut s = session();
        assert_eq!(s.begin_download(), Some(Effect::Download));
        assert!(s.begin_download().is_none());
    }

    #[test]
    fn acknowledged_download_blocks_another_download() {
        let now = Instant::now();
        let mut s = session();
        s.begin_check(CheckMode::Manual);
        s.complete_check(update(), now);
        assert_eq!(s.begin_download(), Some(Effect::Download));
        s.complete_download(Ok(DownloadResponse::accepted()), now);

        assert_eq!(s.state(), SessionState::Downloading);
        assert!(s.begin_download().is_none());
    }

    #[test]
    fn error_event_after_download_ack_notifies() {
        let now = Instant::now();
        let mut s = session();
        s.begin_check(CheckMode::Manual);
        s.complete_check(update(), now);
        s.begin_download();
        s.complete_download(Ok(DownloadResponse::accepted()), now);
        s.apply_event(
            ProviderEvent::UpdateError {
                message: "disk full".to_owned(),
            },
            now,
        );

        let snap = s.snapshot();
        assert_eq!(snap.state, SessionState::Error);
        let notification = snap.notification.as_ref().unwrap();
        assert_eq!(notification.kind, NotificationKind::Error);
        assert_eq!(notification.message, "Error: disk full");
        assert_eq!(s.begin_download(), Some(Effect::Download));
    }

    #[test]
    fn silent_check_skipped_while_downloading() {
        let mut s = session();
        s.begin_download();
        assert!(s.begin_check(CheckMode::Silent).is_none());
        assert!(s.begin_check(CheckMode::Manual).is_none());
    }

    #[test]
    fn install_outside_downloaded_is_noop() {
        for mode in [CheckMode::Manual, CheckMode::Silent] {
            let mut s = session();
            s.begin_check(mode);
            let before = s.snapshot();
            assert!(s.begin_install().is_none());
            assert_eq!(s.snapshot(), before);
        }
    }

    #[test]
    fn install_failure_keeps_artifact_installable() {
        let now = Instant::now();
        let mut s = downloaded(now);
        assert_eq!(s.begin_install(), Some(Effect::Install));
        s.complete_install(Err(UpdateError::Provider("file locked".to_owned())), now);

        let snap = s.snapshot();
        assert_eq!(snap.state, SessionState::Error);
        assert_eq!(
            snap.last_error,
            Some(SessionError::InstallFailed("file locked".to_owned()))
        );
        assert!(snap.artifact_ready);
        assert!(snap.can_install());

        assert_eq!(s.begin_install(), Some(Effect::Install));
        assert_eq!(s.state(), SessionState::Downloaded);
    }

    #[test]
    fn install_success_has_no_transition() {
        let now = Instant::now();
        let mut s = downloaded(now);
        s.begin_install();
        s.complete_install(Ok(()), now);
        assert_eq!(s.state(), SessionState::Downloaded);
    }

    #[test]
    fn recheck_of_downloaded_version_returns_to_downloaded() {
        let now = Instant::now();
        let mut s = downloaded(now);
        s.begin_check(CheckMode::Manual);
        assert_eq!(s.state(), SessionState::Checking);
        s.complete_check(update(), now);
        assert_eq!(s.state(), SessionState::Downloaded);
    }

    #[test]
    fn newer_release_replaces_stale_artifact() {
        let now = Instant::now();
        let mut s = downloaded(now);
        s.begin_check(CheckMode::Manual);
        s.complete_check(Ok(CheckResponse::new("1.0.4", "1.0.6", true)), now);
        assert_eq!(s.state(), SessionState::UpdateAvailable);
        assert!(!s.snapshot().artifact_ready);
    }

    #[test]
    fn provider_error_event_clears_busy_state() {
        let now = Instant::now();
        let mut s = session();
        s.begin_check(CheckMode::Manual);
        s.apply_event(
            ProviderEvent::UpdateError {
                message: "checksum mismatch".to_owned(),
            },
            now,
        );
        let snap = s.snapshot();
        assert_eq!(snap.state, SessionState::Error);
        assert!(snap.can_check());
        assert_eq!(snap.notification.as_ref().unwrap().message, "Error: checksum mismatch");

        // The outstanding provider call is still tracked.
        assert!(s.begin_check(CheckMode::Manual).is_none());
        assert_eq!(s.state(), SessionState::Checking);
    }

    #[test]
    fn error_event_and_failed_reply_notify_once() {
        let now = Instant::now();
        let mut s = session();
        s.begin_download();
        s.apply_event(
            ProviderEvent::UpdateError {
                message: "network timeout".to_owned(),
            },
            now,
        );
        let id = s.snapshot().notification.unwrap().id;
        s.complete_download(Ok(DownloadResponse::failed("network timeout")), now);
        assert_eq!(s.snapshot().notification.unwrap().id, id);
    }

    #[test]
    fn background_error_event_is_quiet() {
        let now = Instant::now();
        let mut s = session();
        s.apply_event(
            ProviderEvent::UpdateError {
                message: "feed unreachable".to_owned(),
            },
            now,
        );
        assert_eq!(s.state(), SessionState::Error);
        assert!(s.snapshot().notification.is_none());
    }

    #[test]
    fn last_error_only_in_error_state() {
        let now = Instant::now();
        let mut s = session();
        s.begin_check(CheckMode::Manual);
        s.complete_check(Err(UpdateError::Provider("offline".to_owned())), now);
        assert!(s.snapshot().last_error.is_some());
        s.begin_check(CheckMode::Silent);
        s.complete_check(update(), now);
        assert_eq!(s.state(), SessionState::UpdateAvailable);
        assert!(s.snapshot().last_error.is_none());
    }

    #[test]
    fn stale_replies_are_ignored() {
        let now = Instant::now();
        let mut s = session();
        s.complete_check(update(), now);
        s.complete_download(Ok(DownloadResponse::failed("late")), now);
        s.complete_install(Err(UpdateError::Provider("late".to_owned())), now);
        assert_eq!(s.snapshot(), UpdateSnapshot::default());
    }

    #[test]
    fn notification_expires_after_ttl() {
        let now = Instant::now();
        let mut s = session();
        s.begin_check(CheckMode::Manual);
        s.complete_check(no_update(), now);
        assert_eq!(s.notification_deadline(), Some(now + TTL));
        assert!(!s.expire_notification(now + Duration::from_secs(1)));
        assert!(s.expire_notification(now + TTL));
        assert!(s.snapshot().notification.is_none());
    }
}
