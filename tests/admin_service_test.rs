mod common;

use apprentice_portal::{
    auth::AuthService,
    domain::{CreateAdminRequest, UserRole},
    error::AppError,
    repository::UserRepository,
};
use common::{create_user, service_context, test_pool};
use uuid::Uuid;

fn request(email: &str) -> CreateAdminRequest {
    CreateAdminRequest { email: email.to_string() }
}

#[tokio::test]
async fn test_created_admin_can_log_in_with_temporary_password() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let ctx = service_context(&pool, None);

    let created = ctx.admin_service.create_admin(request("Sous.Chef@Example.org")).await?;
    assert_eq!(created.email, "sous.chef@example.org");
    assert_eq!(created.username, "sous.chef");
    assert_eq!(created.temporary_password.len(), 12);

    let hash = ctx.user_repo.password_hash("sous.chef@example.org").await?.unwrap();
    assert!(AuthService::verify_password(&created.temporary_password, &hash).await?);

    let user = ctx.user_repo.find_by_id(created.id).await?.unwrap();
    assert_eq!(user.role, UserRole::Admin);

    let admins = ctx.admin_service.list_admins().await?;
    assert_eq!(admins.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_admin_username_gets_counter_when_taken() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let ctx = service_context(&pool, None);
    create_user(&pool, "chef", UserRole::Student).await?;
    create_user(&pool, "chef1", UserRole::Student).await?;

    let created = ctx.admin_service.create_admin(request("chef@kitchen.org")).await?;
    assert_eq!(created.username, "chef2");
    Ok(())
}

#[tokio::test]
async fn test_duplicate_admin_email_conflicts() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let ctx = service_context(&pool, None);
    create_user(&pool, "chef", UserRole::Student).await?;

    let result = ctx.admin_service.create_admin(request("chef@example.com")).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let invalid = ctx.admin_service.create_admin(request("no-at-sign")).await;
    assert!(matches!(invalid, Err(AppError::Validation(_))));
    Ok(())
}

#[tokio::test]
async fn test_reset_password_replaces_hash() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let ctx = service_context(&pool, None);
    let admin = create_user(&pool, "chef", UserRole::Admin).await?;

    let reset = ctx.admin_service.reset_password(admin.id).await?;
    assert_eq!(reset.id, admin.id);

    let hash = ctx.user_repo.password_hash("chef@example.com").await?.unwrap();
    assert!(AuthService::verify_password(&reset.temporary_password, &hash).await?);
    assert!(!AuthService::verify_password("password123", &hash).await?);
    Ok(())
}

#[tokio::test]
async fn test_reset_password_only_for_admins() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let ctx = service_context(&pool, None);
    let student = create_user(&pool, "ana", UserRole::Student).await?;

    let result = ctx.admin_service.reset_password(student.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    let result = ctx.admin_service.reset_password(Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    Ok(())
}
