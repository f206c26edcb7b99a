//! User-facing notifications

use std::sync::Mutex;

use async_trait::async_trait;
use colored::Colorize;
use tracing::{info, warn};

/// Notification kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// A transient message shown after a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == NotificationKind::Success
    }
}

/// Sink for notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification);
}

/// Writes notifications to the log
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => info!(notification = %notification.message),
            NotificationKind::Error => warn!(notification = %notification.message),
        }
    }
}

/// Prints notifications to the terminal
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => println!("{} {}", "✓".green(), notification.message),
            NotificationKind::Error => eprintln!("{} {}", "✗".red(), notification.message.red()),
        }
    }
}

/// Keeps every notification in memory
#[derive(Default)]
pub struct RecordingNotifier {
    recorded: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<Notification> {
        self.recorded
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn last(&self) -> Option<Notification> {
        self.recorded().pop()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) {
        self.recorded
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification);
    }
}
