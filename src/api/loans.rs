//! Loan lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::loan::{CreateLoan, Loan, LoanQuery, ReturnLoan, UserLoanSummary},
    AppState,
};

/// List loans with optional filters
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(LoanQuery),
    responses(
        (status = 200, description = "List of loans", body = Vec<Loan>)
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<Vec<Loan>>> {
    let loans = state.services.loans.list(&query).await?;
    Ok(Json(loans))
}

/// Loans past their expected return date and not yet returned
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "loans",
    responses(
        (status = 200, description = "Overdue loans", body = Vec<Loan>)
    )
)]
pub async fn list_overdue(State(state): State<AppState>) -> AppResult<Json<Vec<Loan>>> {
    let loans = state.services.loans.list_overdue().await?;
    Ok(Json(loans))
}

/// Get a loan by its human-readable key
#[utoipa::path(
    get,
    path = "/loans/key/{key}",
    tag = "loans",
    params(
        ("key" = String, Path, description = "Loan key, e.g. P250307-0042")
    ),
    responses(
        (status = 200, description = "Loan", body = Loan),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan_by_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.loans.get_by_key(&key).await?;
    Ok(Json(loan))
}

/// Get a loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan", body = Loan),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.loans.get(id).await?;
    Ok(Json(loan))
}

/// Create a new loan
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 400, description = "Invalid expected return date"),
        (status = 404, description = "User or material not found"),
        (status = 422, description = "Loan limit reached, material not loanable, or no copies available")
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let loan = state.services.loans.create_loan(&request).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Register the return of a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = ReturnLoan,
    responses(
        (status = 200, description = "Loan returned", body = Loan),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Loan is not active or late")
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<ReturnLoan>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.loans.return_loan(id, &request).await?;
    Ok(Json(loan))
}

/// Per-user loan summary: active loans, history, outstanding fine
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User loan summary", body = UserLoanSummary),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_loans(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<UserLoanSummary>> {
    let summary = state.services.loans.user_summary(user_id).await?;
    Ok(Json(summary))
}
