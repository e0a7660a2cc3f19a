mod common;

use apprentice_portal::{
    domain::{CreateStudentRequest, DirectoryFilter, UpsertStudentProfileRequest, UserRole},
    error::AppError,
    repository::StudentDirectory,
};
use common::{create_student, create_user, service_context, test_pool, StudentSpec};

fn spec(username: &str) -> StudentSpec<'_> {
    StudentSpec { username, program_stage: None, location_tag: None, state: None }
}

#[tokio::test]
async fn test_search_matches_names_and_email() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let ctx = service_context(&pool, None);
    let ana = create_student(&pool, spec("ana")).await?;
    let marco = create_student(&pool, spec("marco")).await?;
    create_user(&pool, "anabel", UserRole::Admin).await?;
    let service = &ctx.student_service;

    let found = service.search("ANA").await?;
    assert_eq!(found.iter().map(|s| s.id).collect::<Vec<_>>(), vec![ana.id]);

    let by_email = service.search("marco@example").await?;
    assert_eq!(by_email.len(), 1);
    assert_eq!(by_email[0].id, marco.id);

    // Every profile carries this last name.
    assert_eq!(service.search("student").await?.len(), 2);
    assert!(service.search("a").await?.is_empty());
    assert!(service.search("   ").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let ctx = service_context(&pool, None);
    create_student(&pool, spec("ana")).await?;
    create_student(&pool, spec("marco")).await?;

    assert!(ctx.student_service.search("%%").await?.is_empty());
    assert!(ctx.student_service.search("__").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_admin_creates_student_with_profile_and_stage() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let ctx = service_context(&pool, None);

    let record = ctx.student_service.create_student(CreateStudentRequest {
        email: " Lena@Example.com ".to_string(),
        username: "lena".to_string(),
        password: "password123".to_string(),
        profile: UpsertStudentProfileRequest {
            first_name: "Lena".to_string(),
            last_name: "Park".to_string(),
            state: Some(" IL".to_string()),
            location_tag: Some("Chicago - C-CAP ".to_string()),
            ..Default::default()
        },
        program_stage: Some(" Externship ".to_string()),
    }).await?;

    assert_eq!(record.email.as_deref(), Some("lena@example.com"));
    assert_eq!(record.program_stage.as_deref(), Some("Externship"));
    assert_eq!(record.location_tag.as_deref(), Some("Chicago - C-CAP"));
    assert_eq!(record.state.as_deref(), Some("IL"));

    let user = ctx.user_repo.find_by_id(record.id).await?.unwrap();
    assert_eq!(user.role, UserRole::Student);
    Ok(())
}

#[tokio::test]
async fn test_create_student_rejects_invalid_profile() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let ctx = service_context(&pool, None);

    let result = ctx.student_service.create_student(CreateStudentRequest {
        email: "lena@example.com".to_string(),
        username: "lena".to_string(),
        password: "password123".to_string(),
        profile: UpsertStudentProfileRequest {
            first_name: String::new(),
            last_name: "Park".to_string(),
            ..Default::default()
        },
        program_stage: None,
    }).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(ctx.user_repo.find_by_email("lena@example.com").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_delete_student_removes_profile_and_sessions() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let ctx = service_context(&pool, None);
    let ana = create_student(&pool, spec("ana")).await?;
    let marco = create_student(&pool, spec("marco")).await?;
    let (_, token) = ctx.auth_service.create_session(ana.id).await?;

    ctx.student_service.delete_student(ana.id).await?;

    assert!(ctx.auth_service.validate_session(&token).await?.is_none());
    assert!(ctx.student_directory.find_profile(ana.id).await?.is_none());
    assert!(ctx.user_repo.find_by_id(ana.id).await?.is_none());

    let remaining = ctx.student_directory.list_students(&DirectoryFilter::students()).await?;
    assert_eq!(remaining.iter().map(|s| s.id).collect::<Vec<_>>(), vec![marco.id]);

    let again = ctx.student_service.delete_student(ana.id).await;
    assert!(matches!(again, Err(AppError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn test_delete_student_leaves_admins_alone() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let ctx = service_context(&pool, None);
    let admin = create_user(&pool, "chef", UserRole::Admin).await?;

    let result = ctx.student_service.delete_student(admin.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(ctx.user_repo.find_by_id(admin.id).await?.is_some());
    Ok(())
}
