//! Post-submission notifications.
//!
//! Delivery is fire-and-forget from the submitter's point of view: every
//! channel runs on a spawned task under a timeout, and each attempt is written
//! to the notification log whether it succeeds or not. Nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use roomquote_core::config::AppConfig;
use roomquote_core::domain::quote::Quote;
use roomquote_db::repositories::{
    NotificationLogRepository, NotificationOutcome, NotificationRecord,
};

pub mod email;
pub mod webhook;

pub use email::EmailNotifier;
pub use webhook::WebhookNotifier;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("email delivery failed: {0}")]
    Email(String),
    #[error("webhook request failed: {0}")]
    Webhook(String),
    #[error("webhook returned HTTP {0}")]
    HttpStatus(u16),
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
    #[error("notification channel misconfigured: {0}")]
    Configuration(String),
}

#[async_trait]
pub trait QuoteNotifier: Send + Sync {
    fn channel(&self) -> &'static str;
    async fn send_quote_notification(&self, quote: &Quote) -> Result<(), NotificationError>;
}

/// Completion of one dispatch. Dropping it detaches the delivery task.
pub struct DeliveryHandle {
    task: Option<JoinHandle<Vec<NotificationRecord>>>,
}

impl DeliveryHandle {
    pub fn none() -> Self {
        Self { task: None }
    }

    /// Waits for every channel to finish and returns what was recorded.
    pub async fn wait(self) -> Vec<NotificationRecord> {
        match self.task {
            Some(task) => match task.await {
                Ok(records) => records,
                Err(error) => {
                    warn!(
                        event_name = "notification.task_failed",
                        error = %error,
                        "notification task did not complete"
                    );
                    Vec::new()
                }
            },
            None => Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    notifiers: Vec<Arc<dyn QuoteNotifier>>,
    log: Arc<dyn NotificationLogRepository>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        notifiers: Vec<Arc<dyn QuoteNotifier>>,
        log: Arc<dyn NotificationLogRepository>,
        timeout: Duration,
    ) -> Self {
        Self { notifiers, log, timeout }
    }

    /// Builds the e-mail and webhook channels that the configuration enables.
    pub fn from_config(
        config: &AppConfig,
        log: Arc<dyn NotificationLogRepository>,
    ) -> Result<Self, NotificationError> {
        let timeout = Duration::from_secs(config.notifications.timeout_secs);
        let mut notifiers: Vec<Arc<dyn QuoteNotifier>> = Vec::new();

        if config.email.enabled {
            notifiers.push(Arc::new(EmailNotifier::from_config(
                &config.email,
                &config.branding,
                &config.pricing,
            )?));
        }
        if let Some(url) = &config.webhook.url {
            notifiers.push(Arc::new(WebhookNotifier::new(
                url.clone(),
                config.webhook.secret.clone(),
                timeout,
            )?));
        }

        Ok(Self::new(notifiers, log, timeout))
    }

    pub fn channels(&self) -> Vec<&'static str> {
        self.notifiers.iter().map(|notifier| notifier.channel()).collect()
    }

    pub fn dispatch(&self, quote: Quote) -> DeliveryHandle {
        if self.notifiers.is_empty() {
            return DeliveryHandle::none();
        }

        let notifiers = self.notifiers.clone();
        let log = Arc::clone(&self.log);
        let timeout = self.timeout;

        let task = tokio::spawn(async move {
            let mut records = Vec::with_capacity(notifiers.len());
            for notifier in notifiers {
                let record = deliver(notifier.as_ref(), &quote, timeout).await;
                if let Err(error) = log.record(record.clone()).await {
                    warn!(
                        event_name = "notification.record_failed",
                        quote_number = %quote.quote_number,
                        channel = notifier.channel(),
                        error = %error,
                        "could not record notification outcome"
                    );
                }
                records.push(record);
            }
            records
        });

        DeliveryHandle { task: Some(task) }
    }
}

async fn deliver(notifier: &dyn QuoteNotifier, quote: &Quote, timeout: Duration) -> NotificationRecord {
    let channel = notifier.channel();
    let result = match tokio::time::timeout(timeout, notifier.send_quote_notification(quote)).await
    {
        Ok(result) => result,
        Err(_) => Err(NotificationError::Timeout(timeout)),
    };

    match result {
        Ok(()) => {
            info!(
                event_name = "notification.delivered",
                quote_number = %quote.quote_number,
                channel,
                "quote notification delivered"
            );
            NotificationRecord::new(quote, channel, NotificationOutcome::Delivered, None)
        }
        Err(error) => {
            warn!(
                event_name = "notification.failed",
                quote_number = %quote.quote_number,
                channel,
                error = %error,
                "quote notification failed"
            );
            NotificationRecord::new(
                quote,
                channel,
                NotificationOutcome::Failed,
                Some(error.to_string()),
            )
        }
    }
}
