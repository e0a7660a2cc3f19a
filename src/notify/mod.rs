use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::{
    domain::{EmailStatus, NewEmailLog, StudentRecord},
    error::Result,
    repository::EmailLogRepository,
};

pub mod sendgrid;

/// Outbound email provider. One call is one attempt; there are no retries.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    fn name(&self) -> &str;
    async fn send_batch(&self, recipients: &[String], subject: &str, html_body: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub html_body: String,
}

/// Recipients resolved to plain addresses before handing off to the
/// background task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientList {
    /// Students the audience rule matched, with or without an address.
    pub matched: usize,
    pub emails: Vec<String>,
}

/// Everything a dispatch needs, owned. Nothing request-scoped goes in here.
#[derive(Debug, Clone)]
pub struct DispatchJob {
    pub recipients: RecipientList,
    pub message: EmailMessage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub matched: usize,
    pub valid_emails: usize,
    pub sent: usize,
    pub failed: usize,
    pub batches_succeeded: usize,
    pub batches_failed: usize,
}

/// Picks one address per matched student (account email, then profile
/// contact email), drops duplicates case-insensitively and optionally
/// appends admin addresses that are not already present.
pub fn resolve_emails<'a>(
    students: impl IntoIterator<Item = &'a StudentRecord>,
    admin_emails: &[String],
    include_admins: bool,
) -> RecipientList {
    let mut seen = HashSet::new();
    let mut list = RecipientList::default();

    for student in students {
        list.matched += 1;
        let email = usable(student.email.as_deref()).or_else(|| usable(student.contact_email.as_deref()));
        match email {
            Some(email) => push_unique(&mut list.emails, &mut seen, email),
            None => tracing::debug!(
                student_id = %student.id,
                student = %student.display_name(),
                "No valid email for matched student"
            ),
        }
    }

    if include_admins {
        for email in admin_emails.iter().filter_map(|e| usable(Some(e.as_str()))) {
            push_unique(&mut list.emails, &mut seen, email);
        }
    }

    list
}

fn usable(email: Option<&str>) -> Option<&str> {
    email.map(str::trim).filter(|e| !e.is_empty() && e.contains('@'))
}

fn push_unique(emails: &mut Vec<String>, seen: &mut HashSet<String>, email: &str) {
    if seen.insert(email.to_lowercase()) {
        emails.push(email.to_string());
    }
}

pub struct Notifier {
    transport: Arc<dyn EmailTransport>,
    batch_size: usize,
    log: Option<Arc<dyn EmailLogRepository>>,
}

impl Notifier {
    pub fn new(transport: Arc<dyn EmailTransport>, batch_size: usize) -> Self {
        Self {
            transport,
            batch_size: batch_size.max(1),
            log: None,
        }
    }

    pub fn with_log(mut self, log: Arc<dyn EmailLogRepository>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Runs `job` on a detached task. The returned handle may be dropped;
    /// the dispatch still runs to completion.
    pub fn spawn(self: &Arc<Self>, job: DispatchJob) -> JoinHandle<DispatchReport> {
        let notifier = Arc::clone(self);
        tokio::spawn(async move { notifier.dispatch(job).await })
    }

    /// Sends in fixed-size batches. A failed batch is logged and counted;
    /// later batches are still attempted.
    pub async fn dispatch(&self, job: DispatchJob) -> DispatchReport {
        let DispatchJob { recipients, message } = job;
        let mut report = DispatchReport {
            matched: recipients.matched,
            valid_emails: recipients.emails.len(),
            ..Default::default()
        };

        for (index, batch) in recipients.emails.chunks(self.batch_size).enumerate() {
            let outcome = self
                .transport
                .send_batch(batch, &message.subject, &message.html_body)
                .await;

            let error_message = match outcome {
                Ok(()) => {
                    tracing::info!(
                        transport = self.transport.name(),
                        batch = index + 1,
                        recipients = batch.len(),
                        "Email batch sent"
                    );
                    report.sent += batch.len();
                    report.batches_succeeded += 1;
                    None
                }
                Err(e) => {
                    tracing::error!(
                        transport = self.transport.name(),
                        batch = index + 1,
                        recipients = batch.len(),
                        "Email batch failed: {}",
                        e
                    );
                    report.failed += batch.len();
                    report.batches_failed += 1;
                    Some(e.to_string())
                }
            };

            self.record(batch, &message, error_message).await;
        }

        tracing::info!(
            matched = report.matched,
            valid_emails = report.valid_emails,
            sent = report.sent,
            failed = report.failed,
            batches_succeeded = report.batches_succeeded,
            batches_failed = report.batches_failed,
            "Announcement email dispatch finished"
        );

        report
    }

    async fn record(&self, batch: &[String], message: &EmailMessage, error_message: Option<String>) {
        let Some(log) = &self.log else {
            return;
        };

        let status = if error_message.is_some() { EmailStatus::Failed } else { EmailStatus::Success };
        let entries = batch
            .iter()
            .map(|to| NewEmailLog {
                to_email: to.clone(),
                subject: message.subject.clone(),
                body: message.html_body.clone(),
                status,
                error_message: error_message.clone(),
            })
            .collect();

        if let Err(e) = log.record(entries).await {
            tracing::error!("Failed to record email log: {:?}", e);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::RecordingTransport;
    use uuid::Uuid;

    fn record(email: Option<&str>, contact: Option<&str>) -> StudentRecord {
        StudentRecord {
            id: Uuid::new_v4(),
            email: email.map(str::to_string),
            contact_email: contact.map(str::to_string),
            ..Default::default()
        }
    }

    fn job(emails: Vec<String>) -> DispatchJob {
        DispatchJob {
            recipients: RecipientList { matched: emails.len(), emails },
            message: EmailMessage {
                subject: "New announcement".to_string(),
                html_body: "<p>Hello</p>".to_string(),
            },
        }
    }

    #[test]
    fn test_resolve_prefers_account_email_then_contact() {
        let students = vec![
            record(Some("a@x.com"), Some("a-alt@x.com")),
            record(None, Some("b@x.com")),
            record(Some("  "), None),
        ];
        let list = resolve_emails(&students, &[], false);
        assert_eq!(list.matched, 3);
        assert_eq!(list.emails, vec!["a@x.com".to_string(), "b@x.com".to_string()]);
    }

    #[test]
    fn test_resolve_dedups_admins_against_students() {
        let students = vec![record(Some("a@x.com"), None), record(Some("A@X.com"), None)];
        let admins = vec!["a@x.com".to_string(), "admin@x.com".to_string()];

        let list = resolve_emails(&students, &admins, true);
        assert_eq!(list.emails, vec!["a@x.com".to_string(), "admin@x.com".to_string()]);

        let list = resolve_emails(&students, &admins, false);
        assert_eq!(list.emails, vec!["a@x.com".to_string()]);
    }

    #[tokio::test]
    async fn test_dispatch_batches_by_size() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = Notifier::new(transport.clone(), 2);

        let emails: Vec<String> = (0..5).map(|i| format!("s{}@x.com", i)).collect();
        let report = notifier.dispatch(job(emails)).await;

        let batches = transport.batches.lock().await;
        assert_eq!(batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 1]);
        assert_eq!(report.sent, 5);
        assert_eq!(report.batches_succeeded, 3);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_abort_the_rest() {
        let transport = Arc::new(RecordingTransport {
            fail_batches: vec![0],
            ..Default::default()
        });
        let notifier = Arc::new(Notifier::new(transport.clone(), 100));

        let emails: Vec<String> = (0..150).map(|i| format!("s{}@x.com", i)).collect();
        let report = notifier.spawn(job(emails)).await.unwrap();

        assert_eq!(report.batches_failed, 1);
        assert_eq!(report.batches_succeeded, 1);
        assert_eq!(report.failed, 100);
        assert_eq!(report.sent, 50);
        assert_eq!(report.valid_emails, 150);
        assert_eq!(transport.batches.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_recipient_list_sends_nothing() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = Notifier::new(transport.clone(), 100);

        let report = notifier
            .dispatch(DispatchJob {
                recipients: RecipientList { matched: 2, emails: vec![] },
                message: EmailMessage { subject: "s".into(), html_body: "b".into() },
            })
            .await;

        assert_eq!(report, DispatchReport { matched: 2, ..Default::default() });
        assert!(transport.batches.lock().await.is_empty());
    }
}
