//! Single-slot notification display with auto-dismiss.
//!
//! Only one notification is visible at a time. Posting a new one replaces the
//! old one and moves the expiry deadline, so a stale deadline can never clear
//! a newer message.

use crate::update::state::Notification;
use std::time::Duration;
use tokio::time::Instant;

pub(crate) struct NotificationSlot {
    ttl: Duration,
    next_id: u64,
    current: Option<Notification>,
    deadline: Option<Instant>,
}

impl NotificationSlot {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: 1,
            current: None,
            deadline: None,
        }
    }

    /// Show a new notification, superseding whatever is visible.
    pub(crate) fn post(
        &mut self,
        now: Instant,
        build: impl FnOnce(u64, Instant) -> Notification,
    ) -> &Notification {
        let id = self.next_id;
        self.next_id += 1;
        if let Some(previous) = &self.current {
            tracing::debug!(superseded = previous.id, by = id, "notification superseded");
        }
        self.deadline = Some(now + self.ttl);
        self.current.insert(build(id, now))
    }

    pub(crate) fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    /// When the visible notification should disappear.
    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drop the visible notification if its deadline has passed.
    ///
    /// Returns the expired notification.
    pub(crate) fn expire(&mut self, now: Instant) -> Option<Notification> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                let expired = self.current.take();
                if let Some(n) = &expired {
                    tracing::debug!(id = n.id, "notification expired");
                }
                expired
            }
            _ => None,
        }
    }
}
