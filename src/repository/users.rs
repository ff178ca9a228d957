//! Users repository for database operations

use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, UpdateUser, User, UserQuery, UserRole, UserStatus},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by email (authentication lookup)
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND id != $2)",
            )
            .bind(email)
            .bind(id)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Check if identification already exists
    pub async fn identification_exists(
        &self,
        identification: &str,
        exclude_id: Option<i32>,
    ) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM users WHERE identification = $1 AND id != $2)",
            )
            .bind(identification)
            .bind(id)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE identification = $1)")
                .bind(identification)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// List users with optional filters
    pub async fn list(&self, query: &UserQuery) -> AppResult<Vec<User>> {
        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref name) = query.name {
            params.push(format!("%{}%", name.to_lowercase()));
            conditions.push(format!(
                "(LOWER(first_name) LIKE ${} OR LOWER(last_name) LIKE ${})",
                params.len(),
                params.len()
            ));
        }

        if let Some(status) = query.status {
            params.push(status.as_str().to_string());
            conditions.push(format!("status = ${}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let select_query = format!(
            "SELECT * FROM users {} ORDER BY last_name, first_name",
            where_clause
        );

        let mut builder = sqlx::query_as::<_, User>(&select_query);
        for param in &params {
            builder = builder.bind(param);
        }
        let users = builder.fetch_all(&self.pool).await?;

        Ok(users)
    }

    /// Create a new user; `password` is the argon2 hash
    pub async fn create(&self, user: &CreateUser, password: &str) -> AppResult<User> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO users (
                first_name, last_name, identification, password, email, phone,
                active_loans, accumulated_fine, registered_at, status, role
            ) VALUES ($1, $2, $3, $4, $5, $6, 0, 0, NOW(), $7, $8)
            RETURNING id
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.identification)
        .bind(password)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.status.unwrap_or(UserStatus::Active))
        .bind(user.role.unwrap_or(UserRole::Reader))
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Update an existing user; `password` (if present) is already hashed
    pub async fn update(
        &self,
        id: i32,
        user: &UpdateUser,
        password: Option<String>,
    ) -> AppResult<User> {
        // Build dynamic update query
        let mut sets = Vec::new();
        let mut param_idx = 1;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, param_idx));
                    param_idx += 1;
                }
            };
        }

        add_field!(user.first_name, "first_name");
        add_field!(user.last_name, "last_name");
        add_field!(user.identification, "identification");
        add_field!(user.email, "email");
        add_field!(user.phone, "phone");
        add_field!(user.status, "status");
        add_field!(user.role, "role");

        if password.is_some() {
            sets.push(format!("password = ${}", param_idx));
        }

        if sets.is_empty() {
            return self.get_by_id(id).await;
        }

        let query = format!("UPDATE users SET {} WHERE id = {}", sets.join(", "), id);

        let mut builder = sqlx::query(&query);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(user.first_name);
        bind_field!(user.last_name);
        bind_field!(user.identification);
        bind_field!(user.email);
        bind_field!(user.phone);

        if let Some(status) = user.status {
            builder = builder.bind(status);
        }
        if let Some(role) = user.role {
            builder = builder.bind(role);
        }
        if let Some(ref hash) = password {
            builder = builder.bind(hash);
        }

        builder.execute(&self.pool).await?;

        self.get_by_id(id).await
    }

    /// Delete a user
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        Ok(())
    }

    /// Apply loan-lifecycle counter deltas: active loan count and fine accrual
    pub async fn update_counters(
        &self,
        id: i32,
        delta_loans: i32,
        delta_fine: Decimal,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET active_loans = active_loans + $1,
                accumulated_fine = accumulated_fine + $2
            WHERE id = $3
            "#,
        )
        .bind(delta_loans)
        .bind(delta_fine)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Set the accumulated fine to a fixed value (debt clearing)
    pub async fn set_fine(&self, id: i32, value: Decimal) -> AppResult<User> {
        let result = sqlx::query("UPDATE users SET accumulated_fine = $1 WHERE id = $2")
            .bind(value)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        self.get_by_id(id).await
    }
}
