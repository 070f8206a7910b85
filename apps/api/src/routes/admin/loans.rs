//! Breeding loan management.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use warren_core::{BreedingLoan, LoanAction};
use warren_db::LoanFilter;

use crate::error::ApiResult;
use crate::extract::{ApiPath, ApiQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/loans", get(list_loans))
        .route("/loans/{id}/{action}", post(apply_action))
}

async fn list_loans(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<LoanFilter>,
) -> ApiResult<Json<Vec<BreedingLoan>>> {
    Ok(Json(state.db().loans().list(&filter).await?))
}

/// `POST /api/admin/loans/{id}/{approve|start|return|cancel}`
///
/// Starting a loan puts the rabbit `on_loan`; returning makes it available
/// again.
async fn apply_action(
    State(state): State<AppState>,
    ApiPath((id, action)): ApiPath<(i64, String)>,
) -> ApiResult<Json<BreedingLoan>> {
    let action: LoanAction = action.parse()?;
    Ok(Json(state.db().loans().transition(id, action).await?))
}
