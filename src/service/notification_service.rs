use std::sync::Arc;

use validator::Validate;

use crate::{
    domain::*,
    error::{AppError, Result},
    notify::{DispatchJob, DispatchReport, EmailMessage, Notifier, RecipientList},
    repository::NotificationRecipientRepository,
};

/// Admin-managed notification list plus the delivery test.
pub struct NotificationService {
    recipients: Arc<dyn NotificationRecipientRepository>,
    notifier: Option<Arc<Notifier>>,
}

impl NotificationService {
    pub fn new(
        recipients: Arc<dyn NotificationRecipientRepository>,
        notifier: Option<Arc<Notifier>>,
    ) -> Self {
        Self { recipients, notifier }
    }

    pub async fn list(&self) -> Result<Vec<NotificationRecipient>> {
        self.recipients.list().await
    }

    pub async fn active_emails(&self) -> Result<Vec<String>> {
        self.recipients.active_emails().await
    }

    pub async fn create(&self, mut request: CreateNotificationRecipient) -> Result<NotificationRecipient> {
        request.email = request.email.trim().to_string();
        request.validate()?;
        self.recipients.create(request).await
    }

    pub async fn update(&self, id: i64, mut request: UpdateNotificationRecipient) -> Result<NotificationRecipient> {
        request.email = request.email.map(|e| e.trim().to_string());
        request.validate()?;
        self.recipients.update(id, request).await?.ok_or_else(not_found)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.recipients.delete(id).await? {
            return Err(not_found());
        }
        Ok(())
    }

    pub async fn toggle(&self, id: i64) -> Result<NotificationRecipient> {
        self.recipients.toggle_active(id).await?.ok_or_else(not_found)
    }

    /// Sends one message to the requesting admin and waits for the result.
    pub async fn send_test_email(&self, actor: &User) -> Result<DispatchReport> {
        let notifier = self.notifier.as_ref()
            .ok_or_else(|| AppError::BadRequest("Email delivery is not configured".to_string()))?;

        let report = notifier.dispatch(DispatchJob {
            recipients: RecipientList { matched: 1, emails: vec![actor.email.clone()] },
            message: EmailMessage {
                subject: "Apprentice portal test email".to_string(),
                html_body: "<h2>Test email</h2><p>Email delivery from the apprentice portal is working.</p>"
                    .to_string(),
            },
        }).await;

        tracing::info!(admin_id = %actor.id, sent = report.sent, "Test email dispatched");
        Ok(report)
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Email notification not found".to_string())
}
