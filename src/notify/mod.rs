//! User notifications.
//!
//! The workflow reports each milestone through a [`Notifier`]. Delivery is
//! best effort: [`deliver`] records every notification in the run log and a
//! delivery failure never affects the outcome of a run.
//!
//! - [`CommandNotifier`] - desktop notifications through `terminal-notifier`
//!   or `osascript`
//! - [`LogNotifier`] - log only, used when no notification tool is available

mod command;

pub use command::CommandNotifier;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::core::{UpdaterError, VersionIdentifier};

/// A title and message pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Delivers notifications to the user.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Log `notification` and hand it to `notifier`, ignoring delivery failures.
pub async fn deliver(notifier: &dyn Notifier, notification: Notification) {
    info!("Notification: {}", notification.message);
    if let Err(e) = notifier.send(&notification).await {
        warn!("Notification could not be delivered: {:#}", e);
    }
}

/// Writes notifications to the log and nowhere else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, _notification: &Notification) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Builds the notification texts for one application.
#[derive(Debug, Clone)]
pub struct Messages {
    title: String,
    app_name: String,
}

impl Messages {
    pub fn new(title: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            app_name: app_name.into(),
        }
    }

    fn note(&self, message: String) -> Notification {
        Notification::new(self.title.clone(), message)
    }

    pub fn not_installed(&self, latest: &VersionIdentifier) -> Notification {
        self.note(format!(
            "{} is not installed. Version {} is available for download.",
            self.app_name, latest
        ))
    }

    pub fn up_to_date(&self, version: &VersionIdentifier) -> Notification {
        self.note(format!("{} {} is up to date.", self.app_name, version))
    }

    pub fn update_starting(&self, from: &str, to: &VersionIdentifier) -> Notification {
        self.note(format!("Updating {} from {} to {}.", self.app_name, from, to))
    }

    pub fn app_running(&self) -> Notification {
        self.note(format!(
            "{} is running. Please quit it so the update can be installed.",
            self.app_name
        ))
    }

    pub fn update_complete(&self, version: &VersionIdentifier) -> Notification {
        self.note(format!("{} was updated to {}.", self.app_name, version))
    }

    pub fn failed(&self, error: &UpdaterError) -> Notification {
        self.note(format!("{} update failed. {}", self.app_name, error.user_message()))
    }
}
