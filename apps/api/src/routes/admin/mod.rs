//! # Admin Routes
//!
//! Everything under `/api/admin`, guarded by
//! [`require_admin_token`](crate::middleware::require_admin_token).
//!
//! ```text
//! /api/admin
//! ├── rabbits, products   inventory.rs
//! ├── orders              orders.rs
//! ├── users               users.rs
//! ├── loans               loans.rs
//! └── stats               dashboard figures
//! ```

mod inventory;
mod loans;
mod orders;
mod users;

use axum::extract::State;
use axum::routing::get;
use axum::{middleware, Json, Router};
use warren_db::DashboardStats;

use crate::error::ApiResult;
use crate::middleware::require_admin_token;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(inventory::routes())
        .merge(orders::routes())
        .merge(users::routes())
        .merge(loans::routes())
        .route("/stats", get(stats))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

async fn stats(State(state): State<AppState>) -> ApiResult<Json<DashboardStats>> {
    let threshold = state.config().shop.low_stock_threshold;
    Ok(Json(state.db().stats().dashboard(threshold).await?))
}
