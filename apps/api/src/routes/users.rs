//! Customer records.
//!
//! There is no login here: the storefront registers a customer once and
//! keeps the returned id, which it passes on orders and loan requests.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;
use warren_core::validation::validate_new_user;
use warren_core::{NewUser, Order, User};
use warren_db::OrderFilter;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/orders", get(user_orders))
}

/// `POST /api/users`
///
/// ## Returns
/// * `201` with the stored user
/// * `409` if the email is already registered
async fn create_user(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    validate_new_user(&input)?;

    let user = state.db().users().create(&input).await?;
    info!(user_id = user.id, "Customer registered");

    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<User>> {
    state
        .db()
        .users()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User", id))
}

/// Order history, newest first.
async fn user_orders(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Vec<Order>>> {
    if state.db().users().get_by_id(id).await?.is_none() {
        return Err(ApiError::not_found("User", id));
    }

    let filter = OrderFilter {
        user_id: Some(id),
        ..Default::default()
    };
    Ok(Json(state.db().orders().list(&filter).await?))
}
