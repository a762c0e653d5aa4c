//! Post-submit notification.
//!
//! [`EventNotifier`] publishes `onboarding.submitted` on the bus, then emails
//! the configured recipients and calls the configured webhook. Failures are
//! collected into one [`CoreError::Notification`]; the Submit Guard only
//! logs it.

use std::sync::Arc;

use async_trait::async_trait;
use bistro_core::error::CoreError;
use bistro_core::record::OnboardingRecord;
use bistro_core::submit::SubmissionNotifier;

use crate::bus::{names, EventBus, OnboardingEvent};
use crate::delivery::email::{EmailConfig, EmailDelivery};
use crate::delivery::webhook::WebhookDelivery;

/// Where submission notifications go.
#[derive(Debug, Clone, Default)]
pub struct NotificationConfig {
    /// SMTP settings; email is skipped when absent.
    pub email: Option<EmailConfig>,
    /// Addresses notified of every submission.
    pub recipients: Vec<String>,
    /// Webhook called for every submission.
    pub webhook_url: Option<String>,
}

impl NotificationConfig {
    /// Load from the environment.
    ///
    /// | Variable                   | Default |
    /// |----------------------------|---------|
    /// | `SUBMISSION_NOTIFY_EMAILS` | none (comma-separated list) |
    /// | `SUBMISSION_WEBHOOK_URL`   | none    |
    ///
    /// SMTP settings come from [`EmailConfig::from_env`].
    pub fn from_env() -> Self {
        let recipients = std::env::var("SUBMISSION_NOTIFY_EMAILS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            email: EmailConfig::from_env(),
            recipients,
            webhook_url: std::env::var("SUBMISSION_WEBHOOK_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        }
    }
}

pub struct EventNotifier {
    bus: Arc<EventBus>,
    email: Option<EmailDelivery>,
    recipients: Vec<String>,
    webhook: Option<(WebhookDelivery, String)>,
}

impl EventNotifier {
    /// Build the notifier. Fails when the SMTP transport or HTTP client
    /// cannot be constructed.
    pub fn new(bus: Arc<EventBus>, config: NotificationConfig) -> Result<Self, CoreError> {
        let email = config
            .email
            .map(EmailDelivery::new)
            .transpose()
            .map_err(|e| CoreError::Internal(format!("Email delivery setup failed: {e}")))?;

        let webhook = match config.webhook_url {
            Some(url) => {
                let delivery = WebhookDelivery::new()
                    .map_err(|e| CoreError::Internal(format!("Webhook setup failed: {e}")))?;
                Some((delivery, url))
            }
            None => None,
        };

        if email.is_none() && !config.recipients.is_empty() {
            tracing::warn!("SUBMISSION_NOTIFY_EMAILS is set but SMTP is not configured");
        }

        Ok(Self {
            bus,
            email,
            recipients: config.recipients,
            webhook,
        })
    }

    /// Publish-only notifier.
    pub fn bus_only(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            email: None,
            recipients: Vec::new(),
            webhook: None,
        }
    }

    /// Replace the webhook channel.
    pub fn with_webhook(mut self, delivery: WebhookDelivery, url: impl Into<String>) -> Self {
        self.webhook = Some((delivery, url.into()));
        self
    }
}

#[async_trait]
impl SubmissionNotifier for EventNotifier {
    async fn submission_received(&self, record: &OnboardingRecord) -> Result<(), CoreError> {
        let event = OnboardingEvent::for_record(names::ONBOARDING_SUBMITTED, record)
            .with_actor(record.owner_id)
            .with_payload(serde_json::json!({ "submitted_at": record.submitted_at }));
        self.bus.publish(event.clone());

        let mut failures = Vec::new();

        if let Some(email) = &self.email {
            for to in &self.recipients {
                if let Err(e) = email.send_submission(to, record).await {
                    failures.push(format!("email to {to}: {e}"));
                }
            }
        }

        if let Some((webhook, url)) = &self.webhook {
            if let Err(e) = webhook.deliver(url, &event).await {
                failures.push(format!("webhook: {e}"));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Notification(failures.join("; ")))
        }
    }
}
