mod common;

use apprentice_portal::{
    domain::{Announcement, AudienceMode, AudienceRule, Priority},
    repository::{AnnouncementRepository, SqliteAnnouncementRepository},
};
use chrono::{Duration, Utc};
use common::test_pool;
use uuid::Uuid;

fn announcement(title: &str, audience: AudienceRule, minutes_ago: i64) -> Announcement {
    let at = Utc::now() - Duration::minutes(minutes_ago);
    Announcement {
        id: Uuid::new_v4(),
        title: title.to_string(),
        content: format!("{} body", title),
        priority: Priority::Medium,
        category: "general".to_string(),
        audience,
        created_by: None,
        created_at: at,
        updated_at: at,
    }
}

#[tokio::test]
async fn test_announcement_crud() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteAnnouncementRepository::new(pool);

    let created = repo.create(announcement("Knife skills", AudienceRule::all(), 0)).await?;
    assert_eq!(created.title, "Knife skills");
    assert_eq!(created.audience.mode, AudienceMode::All);

    let found = repo.find_by_id(created.id).await?;
    assert!(found.is_some());

    let mut changed = created.clone();
    changed.title = "Knife skills II".to_string();
    changed.priority = Priority::High;
    changed.audience = AudienceRule::locations(["Chicago - C-CAP"]);
    let updated = repo.update(created.id, changed).await?;
    assert_eq!(updated.title, "Knife skills II");
    assert_eq!(updated.priority, Priority::High);
    assert_eq!(updated.audience, AudienceRule::locations(["Chicago - C-CAP"]));

    assert!(repo.delete(created.id).await?);
    assert!(repo.find_by_id(created.id).await?.is_none());
    assert!(!repo.delete(created.id).await?);

    Ok(())
}

#[tokio::test]
async fn test_audience_rule_survives_storage() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteAnnouncementRepository::new(pool);

    let rules = [
        AudienceRule::bucket("Apprentice"),
        AudienceRule::location("NY"),
        AudienceRule::program_stages(["Apprentice", "Pre-Apprentice Explorer"]),
        AudienceRule::both(Vec::<String>::new(), ["Miami - C-CAP"]),
    ];

    for rule in rules {
        let stored = repo.create(announcement("Rule", rule.clone(), 0)).await?;
        let loaded = repo.find_by_id(stored.id).await?.unwrap();
        assert_eq!(loaded.audience, rule);
    }

    Ok(())
}

#[tokio::test]
async fn test_list_is_newest_first() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteAnnouncementRepository::new(pool);

    repo.create(announcement("Oldest", AudienceRule::all(), 30)).await?;
    repo.create(announcement("Newest", AudienceRule::all(), 1)).await?;
    repo.create(announcement("Middle", AudienceRule::all(), 10)).await?;

    let titles: Vec<String> = repo.list().await?.into_iter().map(|a| a.title).collect();
    assert_eq!(titles, vec!["Newest", "Middle", "Oldest"]);

    Ok(())
}

#[tokio::test]
async fn test_update_missing_announcement_is_not_found() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let repo = SqliteAnnouncementRepository::new(pool);

    let ghost = announcement("Ghost", AudienceRule::all(), 0);
    let result = repo.update(ghost.id, ghost).await;
    assert!(matches!(result, Err(apprentice_portal::error::AppError::NotFound(_))));

    Ok(())
}
