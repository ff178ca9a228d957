//! Loan lifecycle service: admission rules, returns, fines.

use chrono::Utc;

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{
        loan::{
            parse_expected_return_date, CreateLoan, Loan, LoanQuery, LoanStatus, ReturnLoan,
            UserLoanSummary,
        },
        material::MaterialStatus,
    },
    repository::{loans::NewLoan, Repository},
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    config: LoansConfig,
}

impl LoansService {
    pub fn new(repository: Repository, config: LoansConfig) -> Self {
        Self { repository, config }
    }

    /// Create a new loan.
    ///
    /// Admission checks run in a fixed order and the first failure wins:
    /// user exists, user under the loan limit, material exists, material
    /// loanable, copies available, expected return date valid and in the
    /// future. The three writes that follow (loan insert, user counter,
    /// material availability) are separate statements with no transaction;
    /// a failure mid-sequence leaves counters inconsistent.
    pub async fn create_loan(&self, request: &CreateLoan) -> AppResult<Loan> {
        // 1-2. User exists and is under the limit
        let user = self.repository.users.get_by_id(request.user_id).await?;
        if user.active_loans >= self.config.max_active_loans {
            return Err(AppError::LimitExceeded(format!(
                "User already has the maximum of {} active loans",
                self.config.max_active_loans
            )));
        }

        // 3-5. Material exists, is loanable, has copies on the shelf
        let material = self.repository.materials.get_by_id(request.material_id).await?;
        if !material.is_loanable() {
            return Err(AppError::NotLoanable(
                "Magazines cannot be loaned".to_string(),
            ));
        }
        if material.available_copies <= 0 {
            return Err(AppError::NoCopiesAvailable(format!(
                "No copies of \"{}\" available",
                material.title
            )));
        }

        // 6. Expected return date parses and lies in the future
        let expected_return_date = parse_expected_return_date(&request.expected_return_date)?;
        let now = Utc::now();
        if expected_return_date <= now {
            return Err(AppError::InvalidDate(
                "Expected return date must be in the future".to_string(),
            ));
        }

        let loan_key = Loan::generate_key();
        let user_name = user.full_name();
        let new_loan = NewLoan {
            loan_key: &loan_key,
            user_id: user.id,
            user_name: &user_name,
            material_id: material.id,
            material_title: &material.title,
            material_author: &material.author,
            material_edition: material.edition.as_deref(),
            material_type: material.material_type,
            loan_date: now,
            expected_return_date,
        };
        let loan = self.repository.loans.insert(&new_loan).await?;

        self.repository
            .users
            .update_counters(user.id, 1, rust_decimal::Decimal::ZERO)
            .await?;

        let remaining = material.available_copies - 1;
        self.repository
            .materials
            .update_availability(material.id, -1, MaterialStatus::from_available_copies(remaining))
            .await?;

        tracing::info!(
            loan_key = %loan.loan_key,
            user_id = user.id,
            material_id = material.id,
            "Loan created"
        );

        Ok(loan)
    }

    /// Register the return of a loan.
    ///
    /// Only active or late loans can come back. Lateness is priced with the
    /// calendar-day ceiling: any partial day past the expected return date
    /// counts as a full day at the configured rate.
    pub async fn return_loan(&self, loan_id: i32, request: &ReturnLoan) -> AppResult<Loan> {
        let loan = self.repository.loans.get_by_id(loan_id).await?;

        if !matches!(loan.status, LoanStatus::Active | LoanStatus::Late) {
            return Err(AppError::InvalidState(format!(
                "Loan {} is {}, not active or late",
                loan.loan_key, loan.status
            )));
        }

        let actual_return_date = Utc::now();
        let (late_days, fine) = Loan::fine_for(
            loan.expected_return_date,
            actual_return_date,
            self.config.fine_per_day,
        );

        let updated = self
            .repository
            .loans
            .finalize_return(
                loan.id,
                actual_return_date,
                late_days,
                fine,
                request.notes.as_deref(),
                request.condition,
            )
            .await?;

        self.repository
            .users
            .update_counters(loan.user_id, -1, fine)
            .await?;

        self.repository
            .materials
            .update_availability(loan.material_id, 1, MaterialStatus::Available)
            .await?;

        tracing::info!(
            loan_key = %updated.loan_key,
            late_days,
            fine = %fine,
            "Loan returned"
        );

        Ok(updated)
    }

    /// List loans with the filter set from the query string
    pub async fn list(&self, query: &LoanQuery) -> AppResult<Vec<Loan>> {
        self.repository.loans.list(query).await
    }

    /// Loans past their due date and not yet returned
    pub async fn list_overdue(&self) -> AppResult<Vec<Loan>> {
        self.repository.loans.list_overdue().await
    }

    pub async fn get(&self, id: i32) -> AppResult<Loan> {
        self.repository.loans.get_by_id(id).await
    }

    pub async fn get_by_key(&self, key: &str) -> AppResult<Loan> {
        self.repository.loans.get_by_key(key).await
    }

    /// Per-user view: loans out, return history, outstanding fine
    pub async fn user_summary(&self, user_id: i32) -> AppResult<UserLoanSummary> {
        let user = self.repository.users.get_by_id(user_id).await?;
        let loans = self.repository.loans.list_by_user(user_id).await?;

        let (active, rest): (Vec<Loan>, Vec<Loan>) = loans
            .into_iter()
            .partition(|l| matches!(l.status, LoanStatus::Active | LoanStatus::Late));
        let history = rest
            .into_iter()
            .filter(|l| l.status == LoanStatus::Returned)
            .collect();

        Ok(UserLoanSummary {
            active,
            history,
            outstanding_fine: user.accumulated_fine,
        })
    }
}
