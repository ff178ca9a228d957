//! Loans repository for database operations

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{Loan, LoanQuery, LoanStatus, ReturnCondition},
        material::MaterialType,
    },
};

/// Row values for a new loan, snapshots included
pub struct NewLoan<'a> {
    pub loan_key: &'a str,
    pub user_id: i32,
    pub user_name: &'a str,
    pub material_id: i32,
    pub material_title: &'a str,
    pub material_author: &'a str,
    pub material_edition: Option<&'a str>,
    pub material_type: MaterialType,
    pub loan_date: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
}

/// Fill in the read-time `is_late` view on a fetched row
fn derive_lateness(mut loan: Loan) -> Loan {
    loan.is_late = loan.is_late_at(Utc::now());
    loan
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a new loan; a `loan_key` collision surfaces as a database error
    pub async fn insert(&self, loan: &NewLoan<'_>) -> AppResult<Loan> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO loans (
                loan_key, user_id, user_name, material_id, material_title,
                material_author, material_edition, material_type, loan_date,
                expected_return_date, status, late_days, fine,
                created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0, 0,
                NOW(), NOW()
            ) RETURNING id
            "#,
        )
        .bind(loan.loan_key)
        .bind(loan.user_id)
        .bind(loan.user_name)
        .bind(loan.material_id)
        .bind(loan.material_title)
        .bind(loan.material_author)
        .bind(loan.material_edition)
        .bind(loan.material_type)
        .bind(loan.loan_date)
        .bind(loan.expected_return_date)
        .bind(LoanStatus::Active)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(derive_lateness)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Get loan by its human-readable key
    pub async fn get_by_key(&self, key: &str) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE loan_key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .map(derive_lateness)
            .ok_or_else(|| AppError::NotFound(format!("Loan with key {} not found", key)))
    }

    /// List loans with optional filters.
    ///
    /// The `late` status filter matches the derived view: rows stored as
    /// `late` plus `active` rows past their expected return date.
    pub async fn list(&self, query: &LoanQuery) -> AppResult<Vec<Loan>> {
        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        match query.status {
            Some(LoanStatus::Late) => {
                conditions.push(
                    "(status = 'late' OR (status = 'active' AND expected_return_date < NOW()))"
                        .to_string(),
                );
            }
            Some(status) => {
                params.push(status.as_str().to_string());
                conditions.push(format!("status = ${}", params.len()));
            }
            None => {}
        }

        if let Some(user_id) = query.user_id {
            conditions.push(format!("user_id = {}", user_id));
        }

        if let Some(material_id) = query.material_id {
            conditions.push(format!("material_id = {}", material_id));
        }

        if let Some(ref loan_key) = query.loan_key {
            params.push(loan_key.clone());
            conditions.push(format!("loan_key = ${}", params.len()));
        }

        if let Some(ref user_name) = query.user_name {
            params.push(format!("%{}%", user_name));
            conditions.push(format!("user_name ILIKE ${}", params.len()));
        }

        // Inclusive bounds on the expected return date
        if let Some(from) = query.from {
            params.push(from.to_rfc3339());
            conditions.push(format!(
                "expected_return_date >= ${}::timestamptz",
                params.len()
            ));
        }

        if let Some(to) = query.to {
            params.push(to.to_rfc3339());
            conditions.push(format!(
                "expected_return_date <= ${}::timestamptz",
                params.len()
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let select_query = format!(
            "SELECT * FROM loans {} ORDER BY loan_date DESC",
            where_clause
        );

        let mut builder = sqlx::query_as::<_, Loan>(&select_query);
        for param in &params {
            builder = builder.bind(param);
        }
        let loans = builder.fetch_all(&self.pool).await?;

        Ok(loans.into_iter().map(derive_lateness).collect())
    }

    /// Loans past their expected return date and not yet back
    pub async fn list_overdue(&self) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE status IN ('active', 'late') AND expected_return_date < NOW()
            ORDER BY expected_return_date
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(loans.into_iter().map(derive_lateness).collect())
    }

    /// All loans for a user, most recent first
    pub async fn list_by_user(&self, user_id: i32) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE user_id = $1 ORDER BY loan_date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans.into_iter().map(derive_lateness).collect())
    }

    /// Write back the outcome of a return: dates, fine, notes, condition
    #[allow(clippy::too_many_arguments)]
    pub async fn finalize_return(
        &self,
        id: i32,
        actual_return_date: DateTime<Utc>,
        late_days: i32,
        fine: Decimal,
        notes: Option<&str>,
        condition: Option<ReturnCondition>,
    ) -> AppResult<Loan> {
        sqlx::query(
            r#"
            UPDATE loans
            SET actual_return_date = $1,
                status = $2,
                late_days = $3,
                fine = $4,
                notes = COALESCE($5, notes),
                return_condition = $6,
                updated_at = NOW()
            WHERE id = $7
            "#,
        )
        .bind(actual_return_date)
        .bind(LoanStatus::Returned)
        .bind(late_days)
        .bind(fine)
        .bind(notes)
        .bind(condition)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id).await
    }
}
