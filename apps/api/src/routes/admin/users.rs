//! User management.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;
use warren_core::{User, UserRole};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", delete(delete_user))
        .route("/users/{id}/role", put(set_role))
}

#[derive(Debug, Deserialize)]
struct RoleBody {
    role: UserRole,
}

async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.db().users().list().await?))
}

async fn set_role(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<RoleBody>,
) -> ApiResult<Json<User>> {
    let user = state.db().users().update_role(id, body.role).await?;
    info!(user_id = id, role = ?body.role, "User role changed");
    Ok(Json(user))
}

/// Users who still own orders or loans cannot be deleted (`409`).
async fn delete_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.db().users().delete(id).await?;
    info!(user_id = id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
