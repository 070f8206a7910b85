//! Breeding loan requests from customers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;
use warren_core::validation::validate_loan_request;
use warren_core::{BreedingLoan, LoanRequest};
use warren_db::LoanFilter;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/loans", post(request_loan).get(list_loans))
        .route("/loans/{id}/cancel", post(cancel_loan))
}

#[derive(Debug, Deserialize)]
struct LoansQuery {
    user_id: i64,
}

/// Identifies the requester on a cancellation.
#[derive(Debug, Deserialize)]
struct CancelBody {
    user_id: i64,
}

/// `POST /api/loans`
///
/// ## Returns
/// * `201` the loan in `requested` status with the rabbit's fee copied in
/// * `409` the rabbit is not a breeder or is not available
async fn request_loan(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoanRequest>,
) -> ApiResult<(StatusCode, Json<BreedingLoan>)> {
    validate_loan_request(&req)?;

    let loan = state.db().loans().request(&req).await?;
    info!(loan_id = loan.id, rabbit_id = loan.rabbit_id, "Loan requested");

    Ok((StatusCode::CREATED, Json(loan)))
}

/// `GET /api/loans?user_id=7`. The user is required; the full list is
/// admin-only.
async fn list_loans(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LoansQuery>,
) -> ApiResult<Json<Vec<BreedingLoan>>> {
    let filter = LoanFilter {
        user_id: Some(query.user_id),
        ..Default::default()
    };
    Ok(Json(state.db().loans().list(&filter).await?))
}

async fn cancel_loan(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<CancelBody>,
) -> ApiResult<Json<BreedingLoan>> {
    let loan = state.db().loans().cancel_by_user(id, body.user_id).await?;
    Ok(Json(loan))
}
