//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use rust_decimal::Decimal;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{CreateUser, UpdateUser, User, UserClaims, UserQuery},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate by email and password, returning a JWT and the user.
    ///
    /// Unknown email and wrong password produce the same message.
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication(
                "Invalid email or password".to_string(),
            ));
        }

        let token = self.create_token_for_user(&user)?;
        Ok((token, user))
    }

    /// Create JWT token for a user
    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Verify a password against the stored argon2 hash
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password with argon2
    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    pub async fn get(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn list(&self, query: &UserQuery) -> AppResult<Vec<User>> {
        self.repository.users.list(query).await
    }

    /// Create a user; identification and email must both be unique
    pub async fn create(&self, request: &CreateUser) -> AppResult<User> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if self
            .repository
            .users
            .identification_exists(&request.identification, None)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "Identification {} is already registered",
                request.identification
            )));
        }

        if self.repository.users.email_exists(&request.email, None).await? {
            return Err(AppError::Conflict(format!(
                "Email {} is already registered",
                request.email
            )));
        }

        let hash = self.hash_password(&request.password)?;
        self.repository.users.create(request, &hash).await
    }

    pub async fn update(&self, id: i32, request: &UpdateUser) -> AppResult<User> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        // Ensure the user exists before uniqueness checks
        self.repository.users.get_by_id(id).await?;

        if let Some(ref identification) = request.identification {
            if self
                .repository
                .users
                .identification_exists(identification, Some(id))
                .await?
            {
                return Err(AppError::Conflict(format!(
                    "Identification {} is already registered",
                    identification
                )));
            }
        }

        if let Some(ref email) = request.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict(format!(
                    "Email {} is already registered",
                    email
                )));
            }
        }

        let hash = match request.password {
            Some(ref password) => Some(self.hash_password(password)?),
            None => None,
        };

        self.repository.users.update(id, request, hash).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.users.delete(id).await
    }

    /// Zero out a user's accumulated fine
    pub async fn clear_debt(&self, id: i32) -> AppResult<User> {
        let user = self.repository.users.set_fine(id, Decimal::ZERO).await?;

        tracing::info!(user_id = id, "Debt cleared");

        Ok(user)
    }
}
