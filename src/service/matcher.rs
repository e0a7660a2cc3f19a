//! Both directions of audience matching, derived from
//! [`AudienceRule::matches`] so they cannot drift apart.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::domain::{Announcement, AudienceMode, AudienceRule, StudentRecord};

/// Announcements a student may see, newest first.
///
/// `student` is `None` when the user has no directory record; such a user
/// only sees announcements addressed to everyone. Admin visibility does not
/// go through here.
pub fn visible_announcements(
    student: Option<&StudentRecord>,
    announcements: impl IntoIterator<Item = Announcement>,
) -> Vec<Announcement> {
    let mut visible: Vec<Announcement> = announcements
        .into_iter()
        .filter(|a| is_visible(student, &a.audience))
        .collect();
    visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    visible
}

pub fn is_visible(student: Option<&StudentRecord>, rule: &AudienceRule) -> bool {
    match student {
        Some(student) => rule.matches(student),
        None => rule.mode == AudienceMode::All,
    }
}

/// Students in `directory` that `rule` targets, in directory order.
pub fn matching_students<'a>(
    rule: &AudienceRule,
    directory: &'a [StudentRecord],
) -> Vec<&'a StudentRecord> {
    directory.iter().filter(|s| rule.matches(s)).collect()
}

pub fn resolve_recipients(rule: &AudienceRule, directory: &[StudentRecord]) -> BTreeSet<Uuid> {
    matching_students(rule, directory)
        .into_iter()
        .map(|s| s.id)
        .collect()
}
