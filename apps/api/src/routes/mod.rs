//! # HTTP Routes
//!
//! ```text
//! /health, /health/ready          health.rs
//! /api
//! ├── /rabbits, /products         catalog.rs
//! ├── /users                      users.rs
//! ├── /orders                     orders.rs
//! ├── /loans                      loans.rs
//! └── /admin/...                  admin/  (token guarded)
//! ```

pub mod admin;
pub mod catalog;
pub mod health;
pub mod loans;
pub mod orders;
pub mod users;

use axum::extract::Multipart;
use axum::Router;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::uploads::Upload;

/// Everything mounted under `/api`.
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(catalog::routes())
        .merge(users::routes())
        .merge(orders::routes())
        .merge(loans::routes())
        .nest("/admin", admin::routes(state))
}

/// Reads the file in field `name`, skipping any other fields.
pub(crate) async fn single_file(mut multipart: Multipart, name: &str) -> ApiResult<Upload> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(name) {
            return Upload::from_field(field).await;
        }
        debug!(field = ?field.name(), "Ignoring unknown multipart field");
    }

    Err(ApiError::validation(format!("{} is required", name)))
}
