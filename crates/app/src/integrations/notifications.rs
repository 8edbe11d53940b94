//! Fire-and-forget side effects.
//!
//! Notifications and activity entries are queued onto a channel drained by a
//! background worker. Nothing here can fail the operation that queued it.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    domain::activity::{ActivityLog, models::NewActivityEntry},
    retry::RetryPolicy,
};

/// An email to a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
#[error("mail delivery failed: {0}")]
pub struct MailerError(pub String);

#[automock]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), MailerError>;
}

/// Mailer that only logs what it would have sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, notification: Notification) -> Result<(), MailerError> {
        info!(
            to = %notification.to_email,
            subject = %notification.subject,
            "notification queued for delivery"
        );

        Ok(())
    }
}

/// Work item for the side-effect worker.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    Notify(Notification),
    Activity(NewActivityEntry),
}

/// Cloneable handle for queueing side effects.
#[derive(Debug, Clone)]
pub struct SideEffects {
    sender: Option<UnboundedSender<SideEffect>>,
}

impl SideEffects {
    /// A handle and the receiving end of its queue.
    #[must_use]
    pub fn channel() -> (Self, UnboundedReceiver<SideEffect>) {
        let (sender, receiver) = mpsc::unbounded_channel();

        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// A handle whose effects are dropped.
    #[must_use]
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Start the worker. It exits once every handle has been dropped.
    #[must_use]
    pub fn spawn(
        mailer: Arc<dyn Mailer>,
        activity: Arc<dyn ActivityLog>,
        retry: RetryPolicy,
    ) -> (Self, JoinHandle<()>) {
        let (handle, receiver) = Self::channel();

        let worker = tokio::spawn(drain(receiver, mailer, activity, retry));

        (handle, worker)
    }

    /// Queue `effect`. Never fails.
    pub fn dispatch(&self, effect: SideEffect) {
        let Some(sender) = &self.sender else {
            debug!(?effect, "side effects disabled, dropping");
            return;
        };

        if let Err(error) = sender.send(effect) {
            warn!(effect = ?error.0, "side-effect worker has stopped, dropping");
        }
    }
}

async fn drain(
    mut receiver: UnboundedReceiver<SideEffect>,
    mailer: Arc<dyn Mailer>,
    activity: Arc<dyn ActivityLog>,
    retry: RetryPolicy,
) {
    while let Some(effect) = receiver.recv().await {
        match effect {
            SideEffect::Notify(notification) => {
                let to = notification.to_email.clone();

                let result = retry
                    .run(|_| mailer.send(notification.clone()), |_| true)
                    .await;

                if let Err(error) = result {
                    warn!(%to, %error, "notification dropped");
                }
            }
            SideEffect::Activity(entry) => {
                let action = entry.action.as_str();

                let result = retry
                    .run(|_| activity.record(entry.clone()), |_| true)
                    .await;

                if let Err(error) = result {
                    warn!(action, %error, "activity entry dropped");
                }
            }
        }
    }

    debug!("side-effect queue closed");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use testresult::TestResult;

    use crate::{
        database::StoreError,
        domain::activity::{MockActivityLog, models::ActivityAction},
    };

    use super::*;

    fn notification() -> Notification {
        Notification {
            to_email: "ada@campus.edu".to_string(),
            to_name: "Ada".to_string(),
            subject: "Your certificate".to_string(),
            body: "Hello".to_string(),
        }
    }

    fn entry() -> NewActivityEntry {
        NewActivityEntry {
            actor: None,
            action: ActivityAction::CertificateIssued,
            subject: "CERT-1".to_string(),
            details: json!({}),
        }
    }

    fn quick() -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(2)
            .with_initial_delay(Duration::from_millis(1))
            .with_jitter(0.0)
    }

    #[tokio::test]
    async fn worker_delivers_and_survives_failures() -> TestResult {
        let mut mailer = MockMailer::new();
        let mut activity = MockActivityLog::new();

        mailer
            .expect_send()
            .times(2)
            .returning(|_| Err(MailerError("smtp down".to_string())));

        activity.expect_record().times(1).returning(|_| Ok(()));

        let (effects, worker) = SideEffects::spawn(Arc::new(mailer), Arc::new(activity), quick());

        effects.dispatch(SideEffect::Notify(notification()));
        effects.dispatch(SideEffect::Activity(entry()));

        drop(effects);
        worker.await?;

        Ok(())
    }

    #[tokio::test]
    async fn failing_activity_log_is_retried_then_dropped() -> TestResult {
        let mailer = MockMailer::new();
        let mut activity = MockActivityLog::new();

        activity
            .expect_record()
            .times(2)
            .returning(|_| Err(StoreError::NotFound));

        let (effects, worker) = SideEffects::spawn(Arc::new(mailer), Arc::new(activity), quick());

        effects.dispatch(SideEffect::Activity(entry()));

        drop(effects);
        worker.await?;

        Ok(())
    }

    #[tokio::test]
    async fn channel_exposes_queued_effects() {
        let (effects, mut receiver) = SideEffects::channel();

        effects.dispatch(SideEffect::Notify(notification()));

        assert_eq!(
            receiver.recv().await,
            Some(SideEffect::Notify(notification()))
        );
    }

    #[test]
    fn disabled_handle_swallows_effects() {
        SideEffects::disabled().dispatch(SideEffect::Activity(entry()));
    }
}
