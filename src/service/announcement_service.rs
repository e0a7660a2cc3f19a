use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    domain::*,
    error::{AppError, Result},
    notify::{resolve_emails, DispatchJob, DispatchReport, EmailMessage, Notifier, RecipientList},
    repository::{AnnouncementRepository, NotificationRecipientRepository, StudentDirectory, UserRepository},
    service::matcher,
};

pub struct AnnouncementService {
    repo: Arc<dyn AnnouncementRepository>,
    directory: Arc<dyn StudentDirectory>,
    users: Arc<dyn UserRepository>,
    recipients: Arc<dyn NotificationRecipientRepository>,
    notifier: Option<Arc<Notifier>>,
}

/// Result of a create. `dispatch` is the background email task, if one was
/// started; dropping it detaches the task.
pub struct CreatedAnnouncement {
    pub announcement: Announcement,
    pub dispatch: Option<JoinHandle<DispatchReport>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudiencePreview {
    pub matched: usize,
    pub valid_emails: usize,
}

impl AnnouncementService {
    pub fn new(
        repo: Arc<dyn AnnouncementRepository>,
        directory: Arc<dyn StudentDirectory>,
        users: Arc<dyn UserRepository>,
        recipients: Arc<dyn NotificationRecipientRepository>,
        notifier: Option<Arc<Notifier>>,
    ) -> Self {
        Self { repo, directory, users, recipients, notifier }
    }

    /// Admins get every announcement; students get what their record matches.
    pub async fn list_for(&self, actor: &User) -> Result<Vec<Announcement>> {
        let announcements = self.repo.list().await?;
        if actor.is_admin() {
            return Ok(announcements);
        }

        let student = self.directory.find_student(actor.id).await?;
        Ok(matcher::visible_announcements(student.as_ref(), announcements))
    }

    /// Announcements a student cannot see are reported as not found.
    pub async fn get_for(&self, actor: &User, id: Uuid) -> Result<Announcement> {
        let announcement = self.repo.find_by_id(id).await?.ok_or_else(not_found)?;
        if actor.is_admin() {
            return Ok(announcement);
        }

        let student = self.directory.find_student(actor.id).await?;
        if matcher::is_visible(student.as_ref(), &announcement.audience) {
            Ok(announcement)
        } else {
            Err(not_found())
        }
    }

    pub async fn create(&self, actor: &User, request: CreateAnnouncementRequest) -> Result<CreatedAnnouncement> {
        ensure_admin(actor, "create")?;

        let title = required_text(request.title, "Title")?;
        let content = required_text(request.content, "Content")?;
        let audience = request.audience.normalized();
        audience.validate()?;

        let now = Utc::now();
        let announcement = self.repo.create(Announcement {
            id: Uuid::new_v4(),
            title,
            content,
            priority: request.priority,
            category: request.category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            audience,
            created_by: Some(actor.id),
            created_at: now,
            updated_at: now,
        }).await?;

        tracing::info!(
            announcement_id = %announcement.id,
            audience = announcement.audience.mode.as_str(),
            "Announcement created"
        );

        let dispatch = if request.notify_students {
            self.start_dispatch(&announcement, request.include_admins).await
        } else {
            None
        };

        Ok(CreatedAnnouncement { announcement, dispatch })
    }

    pub async fn update(&self, actor: &User, id: Uuid, request: UpdateAnnouncementRequest) -> Result<Announcement> {
        ensure_admin(actor, "update")?;

        let mut announcement = self.repo.find_by_id(id).await?.ok_or_else(not_found)?;

        if let Some(title) = request.title {
            announcement.title = required_text(title, "Title")?;
        }
        if let Some(content) = request.content {
            announcement.content = required_text(content, "Content")?;
        }
        if let Some(priority) = request.priority {
            announcement.priority = priority;
        }
        if let Some(category) = request.category.filter(|c| !c.trim().is_empty()) {
            announcement.category = category;
        }
        if let Some(audience) = request.audience {
            let audience = audience.normalized();
            audience.validate()?;
            announcement.audience = audience;
        }
        announcement.updated_at = Utc::now();

        self.repo.update(id, announcement).await
    }

    pub async fn delete(&self, actor: &User, id: Uuid) -> Result<()> {
        ensure_admin(actor, "delete")?;

        if !self.repo.delete(id).await? {
            return Err(not_found());
        }
        tracing::info!(announcement_id = %id, "Announcement deleted");
        Ok(())
    }

    pub async fn preview_audience(&self, actor: &User, rule: AudienceRule, include_admins: bool) -> Result<AudiencePreview> {
        ensure_admin(actor, "preview")?;

        let rule = rule.normalized();
        rule.validate()?;
        let recipients = self.resolve_recipients(&rule, include_admins).await?;

        Ok(AudiencePreview {
            matched: recipients.matched,
            valid_emails: recipients.emails.len(),
        })
    }

    /// Snapshot of the directory resolved to addresses. With `include_admins`
    /// the active admin accounts and the active notification list are added.
    pub async fn resolve_recipients(&self, rule: &AudienceRule, include_admins: bool) -> Result<RecipientList> {
        let students = if rule.targets_nobody() {
            Vec::new()
        } else {
            self.directory.list_students(&rule.directory_filter()).await?
        };

        let admin_emails: Vec<String> = if include_admins {
            let mut emails: Vec<String> = self.users.list_by_role(UserRole::Admin).await?
                .into_iter()
                .filter(|u| u.is_active)
                .map(|u| u.email)
                .collect();
            emails.extend(self.recipients.active_emails().await?);
            emails
        } else {
            Vec::new()
        };

        Ok(resolve_emails(
            matcher::matching_students(rule, &students),
            &admin_emails,
            include_admins,
        ))
    }

    async fn start_dispatch(&self, announcement: &Announcement, include_admins: bool) -> Option<JoinHandle<DispatchReport>> {
        let Some(notifier) = &self.notifier else {
            tracing::warn!(announcement_id = %announcement.id, "Email is not configured; skipping announcement dispatch");
            return None;
        };

        // The announcement is already stored; failures from here on are only logged.
        let recipients = match self.resolve_recipients(&announcement.audience, include_admins).await {
            Ok(recipients) => recipients,
            Err(e) => {
                tracing::error!(announcement_id = %announcement.id, "Failed to resolve recipients: {:?}", e);
                return None;
            }
        };

        tracing::info!(
            announcement_id = %announcement.id,
            transport = notifier.transport_name(),
            matched = recipients.matched,
            valid_emails = recipients.emails.len(),
            "Queueing announcement email"
        );

        Some(notifier.spawn(DispatchJob {
            recipients,
            message: announcement_email(announcement),
        }))
    }
}

pub fn announcement_email(announcement: &Announcement) -> EmailMessage {
    let content = escape_html(&announcement.content).replace('\n', "<br>");
    EmailMessage {
        subject: format!("New announcement: {}", announcement.title),
        html_body: format!(
            "<html><body>\
             <h2>{}</h2>\
             <p>{}</p>\
             <br>\
             <p>Log in to the apprentice portal to see all announcements.</p>\
             <p>The C-CAP Team</p>\
             </body></html>",
            escape_html(&announcement.title),
            content,
        ),
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn ensure_admin(actor: &User, action: &str) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("Only admins can {} announcements", action)))
    }
}

fn required_text(value: String, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn not_found() -> AppError {
    AppError::NotFound("Announcement not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_body_is_escaped() {
        let now = Utc::now();
        let announcement = Announcement {
            id: Uuid::new_v4(),
            title: "Knife <skills>".to_string(),
            content: "Bring aprons & towels\nSee you there".to_string(),
            priority: Priority::High,
            category: "general".to_string(),
            audience: AudienceRule::all(),
            created_by: None,
            created_at: now,
            updated_at: now,
        };

        let email = announcement_email(&announcement);
        assert_eq!(email.subject, "New announcement: Knife <skills>");
        assert!(email.html_body.contains("Knife &lt;skills&gt;"));
        assert!(email.html_body.contains("aprons &amp; towels<br>See you there"));
    }

    #[test]
    fn test_escape_html_quotes() {
        assert_eq!(
            escape_html(r#"Chef's "special" <b>"#),
            "Chef&#39;s &quot;special&quot; &lt;b&gt;"
        );
    }

    #[test]
    fn test_required_text_trims() {
        assert_eq!(required_text("  Title ".into(), "Title").unwrap(), "Title");
        assert!(matches!(required_text("   ".into(), "Title"), Err(AppError::BadRequest(_))));
    }
}
