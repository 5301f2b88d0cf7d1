//! Update session controller and its handle.
//!
//! The controller is a single tokio task that owns the [`Session`]. Commands
//! from [`UpdateHandle`]s, provider replies, provider events and the
//! scheduling timers are all multiplexed onto that task, so every state
//! change goes through the same guards in one place. Readers only ever see
//! [`UpdateSnapshot`]s published on a `watch` channel.

use crate::config::UpdateConfig;
use crate::error::{Result, UpdateError};
use crate::update::provider::{CheckResponse, DownloadResponse, ProviderEvent, UpdateProvider};
use crate::update::session::{Effect, Session};
use crate::update::state::{CheckMode, UpdateSnapshot};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
enum Command {
    Check(CheckMode),
    Download,
    Install,
}

/// A provider call that finished on its own task.
enum Completion {
    Check(Result<CheckResponse>),
    Download(Result<DownloadResponse>),
    Install(Result<()>),
}

/// Cloneable handle for triggering actions and reading snapshots.
///
/// Triggers only enqueue a command; the outcome is observed through
/// [`UpdateHandle::snapshot`] or [`UpdateHandle::subscribe`].
#[derive(Clone)]
pub struct UpdateHandle {
    command_tx: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<UpdateSnapshot>,
    cancel: CancellationToken,
}

impl UpdateHandle {
    /// Request a check in the given mode.
    pub async fn check_for_updates(&self, mode: CheckMode) -> Result<()> {
        self.send(Command::Check(mode)).await
    }

    /// User-triggered check.
    pub async fn request_check(&self) -> Result<()> {
        self.check_for_updates(CheckMode::Manual).await
    }

    pub async fn request_download(&self) -> Result<()> {
        self.send(Command::Download).await
    }

    pub async fn request_install(&self) -> Result<()> {
        self.send(Command::Install).await
    }

    /// The most recently published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> UpdateSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// A receiver that is notified whenever the snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<UpdateSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Stop the controller and cancel its timers.
    ///
    /// Provider calls already running are left to finish; their results are
    /// discarded.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn send(&self, command: Command) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(UpdateError::Channel("update session is shut down".to_owned()));
        }
        self.command_tx
            .send(command)
            .await
            .map_err(|e| UpdateError::Channel(format!("failed to send update command: {e}")))
    }
}

/// Owner of the update session. Drive it with [`UpdateController::run`].
pub struct UpdateController<P: UpdateProvider> {
    provider: Arc<P>,
    config: UpdateConfig,
    session: Session,
    command_rx: mpsc::Receiver<Command>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    events: broadcast::Receiver<ProviderEvent>,
    snapshot_tx: watch::Sender<UpdateSnapshot>,
    cancel: CancellationToken,
}

/// Create a controller for `provider` and a handle to it.
///
/// The provider's event stream is subscribed here, before the controller
/// runs, so no event emitted after this call is missed.
pub fn update_session<P: UpdateProvider>(
    provider: Arc<P>,
    config: UpdateConfig,
) -> Result<(UpdateHandle, UpdateController<P>)> {
    config.validate()?;

    let (command_tx, command_rx) = mpsc::channel(config.command_capacity.max(1));
    let (completion_tx, completion_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(UpdateSnapshot::default());
    let cancel = CancellationToken::new();
    let events = provider.subscribe();

    let handle = UpdateHandle {
        command_tx,
        snapshot_rx,
        cancel: cancel.clone(),
    };
    let controller = UpdateController {
        provider,
        session: Session::new(config.notification_ttl()),
        config,
        command_rx,
        completion_tx,
        completion_rx,
        events,
        snapshot_tx,
        cancel,
    };
    Ok((handle, controller))
}

impl<P: UpdateProvider> UpdateController<P> {
    /// Run the controller on a new tokio task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until shut down or every handle is dropped.
    pub async fn run(mut self) {
        let start = Instant::now();
        let warm_up = time::sleep_until(start + self.config.startup_delay());
        tokio::pin!(warm_up);
        let mut warm_up_pending = self.config.auto_check;
        let mut periodic = self.config.auto_check.then(|| {
            let period = self.config.check_interval();
            let mut interval =
                time::interval_at(start + self.config.startup_delay() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let mut events_open = true;

        info!(
            auto_check = self.config.auto_check,
            startup_delay_secs = self.config.startup_delay_secs,
            check_interval_secs = self.config.check_interval_secs,
            "update session started"
        );

        loop {
            let expiry = self.session.notification_deadline();
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    info!("update session shutting down");
                    break;
                }

                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        info!("all update handles dropped; stopping session");
                        break;
                    }
                },

                Some(completion) = self.completion_rx.recv() => {
                    self.handle_completion(completion);
                }

                event = self.events.recv(), if events_open => match event {
                    Ok(event) => self.session.apply_event(event, Instant::now()),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(lagged = n, "provider events lagged; some were dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("provider event stream closed");
                        events_open = false;
                    }
                },

                () = &mut warm_up, if warm_up_pending => {
                    warm_up_pending = false;
                    debug!("warm-up check due");
                    let effect = self.session.begin_check(CheckMode::Silent);
                    self.start(effect);
                }

                _ = tick_or_pending(&mut periodic) => {
                    debug!("periodic check due");
                    let effect = self.session.begin_check(CheckMode::Silent);
                    self.start(effect);
                }

                () = time::sleep_until(expiry.unwrap_or_else(Instant::now)), if expiry.is_some() => {
                    self.session.expire_notification(Instant::now());
                }
            }

            self.publish();
        }
    }

    fn handle_command(&mut self, command: Command) {
        debug!(?command, state = %self.session.state(), "update command");
        let effect = match command {
            Command::Check(mode) => self.session.begin_check(mode),
            Command::Download => self.session.begin_download(),
            Command::Install => self.session.begin_install(),
        };
        self.start(effect);
    }

    fn handle_completion(&mut self, completion: Completion) {
        let now = Instant::now();
        match completion {
            Completion::Check(reply) => self.session.complete_check(reply, now),
            Completion::Download(reply) => self.session.complete_download(reply, now),
            Completion::Install(reply) => self.session.complete_install(reply, now),
        }
    }

    /// Run a provider call on its own task and feed the reply back.
    fn start(&self, effect: Option<Effect>) {
        let Some(effect) = effect else {
            return;
        };
        let provider = Arc::clone(&self.provider);
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let completion = match effect {
                Effect::Check => Completion::Check(provider.check_for_updates().await),
                Effect::Download => Completion::Download(provider.download_update().await),
                Effect::Install => Completion::Install(provider.install_update().await),
            };
            if completion_tx.send(completion).is_err() {
                debug!(?effect, "update session gone; provider reply dropped");
            }
        });
    }

    fn publish(&self) {
        let next = self.session.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

async fn tick_or_pending(interval: &mut Option<Interval>) -> Instant {
    match interval {
        Some(interval) => interval.tick().await,
        None => std::future::pending().await,
    }
}
