//! UI-agnostic notification capability used by the presentation adapters.

use std::sync::Mutex;

use serde::Serialize;
use tracing::debug;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, kind: NotificationKind);
}

/// Keeps notifications so they can be handed back to the client.
#[derive(Default)]
pub struct CollectingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
    pub fn take(&self) -> Vec<Notification> {
        let mut guard = self
            .notifications
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *guard)
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, message: &str, kind: NotificationKind) {
        debug!(kind = ?kind, "{}", message);
        self.notifications
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Notification {
                message: message.to_string(),
                kind,
            });
    }
}
