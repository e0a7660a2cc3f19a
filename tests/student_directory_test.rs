mod common;

use apprentice_portal::{
    domain::{AudienceRule, DirectoryFilter, UpsertStudentProfileRequest, UserRole},
    repository::{SqliteStudentRepository, StudentDirectory},
};
use common::{create_student, create_user, ids, test_pool, StudentSpec};
use uuid::Uuid;

#[tokio::test]
async fn test_unconstrained_filter_lists_every_student() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let directory = SqliteStudentRepository::new(pool.clone());

    let with_profile = create_student(&pool, StudentSpec {
        username: "ana",
        program_stage: Some("Apprentice"),
        location_tag: Some("Chicago - C-CAP"),
        state: Some("IL"),
    }).await?;
    let without_profile = create_user(&pool, "ben", UserRole::Student).await?;
    create_user(&pool, "chef", UserRole::Admin).await?;

    let students = directory.list_students(&DirectoryFilter::students()).await?;
    let mut found: Vec<Uuid> = students.iter().map(|s| s.id).collect();
    found.sort();
    assert_eq!(found, ids(&[&with_profile, &without_profile]));

    let bare = students.iter().find(|s| s.id == without_profile.id).unwrap();
    assert_eq!(bare.email.as_deref(), Some("ben@example.com"));
    assert!(bare.program_stage.is_none());
    assert!(bare.location_tag.is_none());
    assert!(bare.state.is_none());

    Ok(())
}

#[tokio::test]
async fn test_filter_axes_are_or_combined() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let directory = SqliteStudentRepository::new(pool.clone());

    let stage_only = create_student(&pool, StudentSpec {
        username: "stage",
        program_stage: Some("Apprentice"),
        location_tag: Some("Miami - C-CAP"),
        state: None,
    }).await?;
    let location_only = create_student(&pool, StudentSpec {
        username: "location",
        program_stage: Some("Not Active"),
        location_tag: Some("Chicago - C-CAP"),
        state: None,
    }).await?;
    create_student(&pool, StudentSpec {
        username: "neither",
        program_stage: Some("Not Active"),
        location_tag: Some("Miami - C-CAP"),
        state: None,
    }).await?;
    create_user(&pool, "noprofile", UserRole::Student).await?;

    let filter = AudienceRule::both(["Apprentice"], ["Chicago - C-CAP"]).directory_filter();
    let students = directory.list_students(&filter).await?;
    let mut found: Vec<Uuid> = students.iter().map(|s| s.id).collect();
    found.sort();

    assert_eq!(found, ids(&[&stage_only, &location_only]));
    Ok(())
}

#[tokio::test]
async fn test_state_filter_uses_profile_state() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let directory = SqliteStudentRepository::new(pool.clone());

    let new_yorker = create_student(&pool, StudentSpec {
        username: "nyc",
        program_stage: None,
        location_tag: None,
        state: Some("NY"),
    }).await?;
    create_student(&pool, StudentSpec {
        username: "phl",
        program_stage: None,
        location_tag: None,
        state: Some("PA"),
    }).await?;

    let students = directory
        .list_students(&AudienceRule::location("NY").directory_filter())
        .await?;

    assert_eq!(students.len(), 1);
    assert_eq!(students[0].id, new_yorker.id);
    Ok(())
}

#[tokio::test]
async fn test_upsert_profile_keeps_assigned_stage() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let directory = SqliteStudentRepository::new(pool.clone());

    let student = create_student(&pool, StudentSpec {
        username: "dana",
        program_stage: Some("Apprentice"),
        location_tag: None,
        state: Some("AZ"),
    }).await?;

    let profile = directory.upsert_profile(student.id, UpsertStudentProfileRequest {
        first_name: "Dana".to_string(),
        last_name: "Reyes".to_string(),
        city: Some("Phoenix".to_string()),
        state: Some("AZ".to_string()),
        ..Default::default()
    }).await?;

    assert_eq!(profile.first_name, "Dana");
    assert_eq!(profile.city.as_deref(), Some("Phoenix"));
    assert_eq!(profile.program_stage.as_deref(), Some("Apprentice"));

    let found = directory.find_profile(student.id).await?.unwrap();
    assert_eq!(found.id, profile.id);
    Ok(())
}

#[tokio::test]
async fn test_set_program_stage_requires_profile() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let directory = SqliteStudentRepository::new(pool.clone());

    let without_profile = create_user(&pool, "erin", UserRole::Student).await?;
    assert!(!directory.set_program_stage(without_profile.id, "Apprentice").await?);
    assert!(!directory.set_program_stage(Uuid::new_v4(), "Apprentice").await?);

    Ok(())
}

#[tokio::test]
async fn test_find_student_ignores_admins() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let directory = SqliteStudentRepository::new(pool.clone());

    let admin = create_user(&pool, "chef", UserRole::Admin).await?;
    let student = create_user(&pool, "fran", UserRole::Student).await?;

    assert!(directory.find_student(admin.id).await?.is_none());
    let record = directory.find_student(student.id).await?.unwrap();
    assert_eq!(record.id, student.id);
    Ok(())
}

#[tokio::test]
async fn test_profile_tags_are_trimmed_on_write() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let directory = SqliteStudentRepository::new(pool.clone());
    let student = create_user(&pool, "gil", UserRole::Student).await?;

    let profile = directory.upsert_profile(student.id, UpsertStudentProfileRequest {
        first_name: "Gil".to_string(),
        last_name: "Ortiz".to_string(),
        state: Some(" IL".to_string()),
        location_tag: Some("Chicago - C-CAP ".to_string()),
        ..Default::default()
    }).await?;
    assert_eq!(profile.state.as_deref(), Some("IL"));
    assert_eq!(profile.location_tag.as_deref(), Some("Chicago - C-CAP"));

    assert!(directory.set_program_stage(student.id, "  Apprentice ").await?);

    let record = directory.find_student(student.id).await?.unwrap();
    assert_eq!(record.program_stage.as_deref(), Some("Apprentice"));

    for rule in [
        AudienceRule::locations(["Chicago - C-CAP "]),
        AudienceRule::location(" IL"),
        AudienceRule::program_stages([" Apprentice"]),
    ] {
        let rule = rule.normalized();
        assert!(rule.matches(&record));

        let found = directory.list_students(&rule.directory_filter()).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, student.id);
    }

    Ok(())
}

#[tokio::test]
async fn test_blank_profile_tags_are_stored_as_null() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let directory = SqliteStudentRepository::new(pool.clone());
    let student = create_user(&pool, "hal", UserRole::Student).await?;

    let profile = directory.upsert_profile(student.id, UpsertStudentProfileRequest {
        first_name: "Hal".to_string(),
        last_name: "Park".to_string(),
        state: Some("   ".to_string()),
        location_tag: Some(String::new()),
        ..Default::default()
    }).await?;

    assert!(profile.state.is_none());
    assert!(profile.location_tag.is_none());
    Ok(())
}
