//! Order management.

use axum::extract::State;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;
use warren_core::{Order, OrderDetail, OrderStatus};
use warren_db::OrderFilter;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/status", put(change_status))
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: OrderStatus,
}

/// `GET /api/admin/orders?status=pending&user_id=3`, newest first.
async fn list_orders(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<OrderFilter>,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.db().orders().list(&filter).await?))
}

async fn get_order(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<OrderDetail>> {
    state
        .db()
        .orders()
        .get_detail(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Order", id))
}

/// Moves an order along its lifecycle.
///
/// ## Returns
/// * `200` the updated order; cancelling restocks products and releases
///   reserved rabbits
/// * `409` the move is not allowed from the current status, or a bank
///   transfer is confirmed without a slip
async fn change_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<StatusBody>,
) -> ApiResult<Json<OrderDetail>> {
    let detail = state.db().orders().change_status(id, body.status).await?;
    info!(order_id = id, status = %body.status, "Order status changed by admin");
    Ok(Json(detail))
}
