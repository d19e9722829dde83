use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::{debug, info};

/// One delivery attempt's payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}

/// Delivery is external; implementations get exactly one attempt per notification.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Hands notifications to the log pipeline, where the mail relay picks them up.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        if notification.recipients.is_empty() {
            return Err(anyhow!("notification {:?} has no recipients", notification.subject));
        }
        info!(
            event = "generating-email",
            subject = %notification.subject,
            recipients = %notification.recipients.join(","),
            "notification dispatched"
        );
        debug!(body = %notification.body, "notification body");
        Ok(())
    }
}

/// Keeps every notification in memory. Used by tests and rehearsal runs.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delivery fails.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(vec![]),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        if self.fail {
            return Err(anyhow!("delivery refused for {:?}", notification.subject));
        }
        self.sent
            .lock()
            .map_err(|_| anyhow!("recording notifier lock poisoned"))?
            .push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note() -> Notification {
        Notification {
            subject: "s".into(),
            body: "b".into(),
            recipients: vec!["ghas@example.gov".into()],
        }
    }

    #[tokio::test]
    async fn recording_notifier_keeps_order() {
        let n = RecordingNotifier::new();
        n.deliver(&note()).await.unwrap();
        n.deliver(&note()).await.unwrap();
        assert_eq!(n.sent().len(), 2);
        assert!(RecordingNotifier::failing().deliver(&note()).await.is_err());
    }

    #[tokio::test]
    async fn log_notifier_requires_recipients() {
        let mut empty = note();
        empty.recipients.clear();
        assert!(LogNotifier.deliver(&empty).await.is_err());
        assert!(LogNotifier.deliver(&note()).await.is_ok());
    }
}
