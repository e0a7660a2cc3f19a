use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{generate_temporary_password, TEMPORARY_PASSWORD_LEN},
    domain::*,
    error::{AppError, Result},
    repository::UserRepository,
};

pub struct AdminService {
    users: Arc<dyn UserRepository>,
}

impl AdminService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn list_admins(&self) -> Result<Vec<User>> {
        self.users.list_by_role(UserRole::Admin).await
    }

    /// Creates an admin with a generated password. The username is the
    /// local part of the email, suffixed with a counter when taken.
    pub async fn create_admin(&self, mut request: CreateAdminRequest) -> Result<AdminWithPassword> {
        request.email = request.email.trim().to_lowercase();
        request.validate()?;
        let email = request.email;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let base = email.split('@').next().unwrap_or_default().to_string();
        let mut username = base.clone();
        let mut counter = 1;
        while self.users.username_exists(&username).await? {
            username = format!("{}{}", base, counter);
            counter += 1;
        }

        let temporary_password = generate_temporary_password(TEMPORARY_PASSWORD_LEN);
        let admin = self.users.create(CreateUserRequest {
            email,
            username,
            password: temporary_password.clone(),
            role: UserRole::Admin,
        }).await?;

        tracing::info!(admin_id = %admin.id, "Admin created");
        Ok(with_password(admin, temporary_password))
    }

    pub async fn reset_password(&self, id: Uuid) -> Result<AdminWithPassword> {
        let admin = self.users
            .find_by_id(id)
            .await?
            .filter(User::is_admin)
            .ok_or_else(|| AppError::NotFound("Admin not found".to_string()))?;

        let temporary_password = generate_temporary_password(TEMPORARY_PASSWORD_LEN);
        self.users.set_password(admin.id, &temporary_password).await?;

        tracing::info!(admin_id = %admin.id, "Admin password reset");
        Ok(with_password(admin, temporary_password))
    }
}

fn with_password(admin: User, temporary_password: String) -> AdminWithPassword {
    AdminWithPassword {
        id: admin.id,
        email: admin.email,
        username: admin.username,
        created_at: admin.created_at,
        temporary_password,
    }
}
