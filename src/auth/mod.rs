use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use argon2::password_hash::{SaltString, rand_core::OsRng};
use chrono::{Duration, Utc};
use cookie::{Cookie, SameSite};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, Result};

pub mod session;

use session::{Session, SessionStore};

pub const SESSION_COOKIE: &str = "session";

pub struct AuthService {
    session_store: SessionStore,
    session_duration_hours: i64,
    secure_cookies: bool,
}

impl AuthService {
    pub fn new(pool: SqlitePool, session_duration_hours: i64, secure_cookies: bool) -> Self {
        Self {
            session_store: SessionStore::new(pool),
            session_duration_hours,
            secure_cookies,
        }
    }

    pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

        let argon2 = Argon2::default();

        Ok(argon2.verify_password(password.as_bytes(), &parsed_hash).is_ok())
    }

    pub async fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    pub async fn create_session(&self, user_id: Uuid) -> Result<(Session, String)> {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::hours(self.session_duration_hours);

        let session = self.session_store
            .create(user_id, &token, expires_at)
            .await?;

        Ok((session, token))
    }

    pub async fn validate_session(&self, token: &str) -> Result<Option<Session>> {
        self.session_store.find_by_token(token).await
    }

    pub async fn invalidate_session(&self, token: &str) -> Result<()> {
        self.session_store.delete_by_token(token).await
    }

    pub async fn cleanup_expired_sessions(&self) -> Result<u64> {
        self.session_store.cleanup_expired().await
    }

    pub fn create_session_cookie(&self, token: &str) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token.to_string()))
            .path("/")
            .same_site(SameSite::Lax)
            .http_only(true)
            .secure(self.secure_cookies)
            .max_age(cookie::time::Duration::hours(self.session_duration_hours))
            .build()
    }

    pub fn create_logout_cookie() -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .same_site(SameSite::Lax)
            .http_only(true)
            .max_age(cookie::time::Duration::seconds(0))
            .build()
    }
}

fn generate_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub const TEMPORARY_PASSWORD_LEN: usize = 12;

const PASSWORD_CLASSES: [&[u8]; 4] = [
    b"abcdefghijklmnopqrstuvwxyz",
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZ",
    b"0123456789",
    b"!@#$%^&*",
];

/// Random password with at least one lowercase, uppercase, digit and symbol.
pub fn generate_temporary_password(length: usize) -> String {
    use rand::{seq::SliceRandom, Rng};

    let mut rng = rand::thread_rng();
    let all: Vec<u8> = PASSWORD_CLASSES.concat();

    let mut password: Vec<u8> = PASSWORD_CLASSES
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();
    while password.len() < length {
        password.push(all[rng.gen_range(0..all.len())]);
    }
    password.shuffle(&mut rng);

    password.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_password_mixes_classes() {
        for _ in 0..20 {
            let password = generate_temporary_password(TEMPORARY_PASSWORD_LEN);
            assert_eq!(password.len(), TEMPORARY_PASSWORD_LEN);
            assert!(password.chars().any(|c| c.is_ascii_lowercase()));
            assert!(password.chars().any(|c| c.is_ascii_uppercase()));
            assert!(password.chars().any(|c| c.is_ascii_digit()));
            assert!(password.chars().any(|c| "!@#$%^&*".contains(c)));
        }
        assert_eq!(generate_temporary_password(2).len(), 4);
    }

    #[test]
    fn test_token_generation() {
        let token = generate_token();
        assert_eq!(token.len(), 64); // 32 bytes = 64 hex chars
        assert_ne!(token, generate_token());
    }

    #[tokio::test]
    async fn test_password_round_trip() {
        let hash = AuthService::hash_password("kitchen-brigade").await.unwrap();
        assert!(AuthService::verify_password("kitchen-brigade", &hash).await.unwrap());
        assert!(!AuthService::verify_password("wrong", &hash).await.unwrap());
    }
}
