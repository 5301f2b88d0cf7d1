//! Update session: the application self-update lifecycle.
//!
//! Decides when to check a release source for a newer version, tracks the
//! move from checking through downloading to ready-to-install, and derives
//! short-lived user notifications and progress for a presentation layer.
//!
//! # Architecture
//!
//! - **Provider**: an [`UpdateProvider`] does the real fetching, downloading
//!   and installing, and reports lifecycle events on a broadcast channel
//! - **Controller**: an [`UpdateController`] task owns the session state,
//!   schedules background checks and reconciles provider replies and events
//! - **Handle**: an [`UpdateHandle`] triggers actions and reads
//!   [`UpdateSnapshot`]s
//! - **Host**: a line-oriented stdin/stdout bridge for driving a session from
//!   another process

pub mod config;
pub mod error;
pub mod host;
pub mod progress;
pub mod update;

pub use config::UpdateConfig;
pub use error::{Result, SessionError, UpdateError};
pub use progress::{DownloadProgress, format_bytes};
pub use update::{
    CheckMode, SessionState, UpdateController, UpdateHandle, UpdateProvider, UpdateSnapshot,
    update_session,
};
