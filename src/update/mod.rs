//! Update lifecycle: checking for, downloading and installing new versions.
//!
//! [`update_session`] builds an [`UpdateController`] around an
//! [`UpdateProvider`] together with an [`UpdateHandle`] for triggering
//! actions and reading [`UpdateSnapshot`]s.

pub mod controller;
mod notification;
pub mod provider;
mod session;
pub mod simulated;
pub mod state;

pub use controller::{UpdateController, UpdateHandle, update_session};
pub use provider::{CheckResponse, DownloadResponse, ProviderEvent, ReleaseInfo, UpdateProvider};
pub use simulated::{SimulatedProvider, SimulatedRelease};
pub use state::{
    CheckMode, Notification, NotificationKind, SessionState, UpdateSnapshot, VersionInfo,
};
