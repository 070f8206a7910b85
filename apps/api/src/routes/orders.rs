//! # Checkout and Order Lookup
//!
//! ```text
//! POST /api/orders
//!   application/json        → OrderRequest
//!   multipart/form-data     → order: OrderRequest as JSON text
//!                             slip:  image file (bank transfer only)
//!        │
//!        ▼
//!   validate → store slip → place (one transaction) → 201 OrderDetail
//!                              │
//!                              └─ refused: stored slip is deleted again
//! ```

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{debug, info};
use warren_core::validation::validate_order_request;
use warren_core::{Order, OrderDetail, OrderRequest, PaymentMethod};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::routes::single_file;
use crate::state::AppState;
use crate::uploads::{Upload, UploadKind};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(place_order))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/slip", post(upload_slip))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

/// `POST /api/orders`
///
/// ## Returns
/// * `201` with the placed order and its frozen lines
/// * `400` invalid details, empty cart, or a slip on a cash order
/// * `409` an item sold out or became unavailable in the meantime
async fn place_order(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<(StatusCode, Json<OrderDetail>)> {
    let (order, slip) = if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state).await?;
        read_order_form(multipart).await?
    } else {
        let ApiJson(order) = ApiJson::<OrderRequest>::from_request(request, &state).await?;
        (order, None)
    };

    validate_order_request(&order)?;
    if slip.is_some() && order.customer.payment_method != PaymentMethod::BankTransfer {
        return Err(ApiError::validation(
            "A payment slip is only accepted for bank transfer orders",
        ));
    }

    let slip_path = match &slip {
        Some(upload) => Some(state.uploads().save(UploadKind::Slip, upload).await?),
        None => None,
    };

    let placed = state
        .db()
        .orders()
        .place(&order, state.config().delivery_fee(), slip_path.as_deref())
        .await;

    match placed {
        Ok(detail) => {
            info!(
                order_number = %detail.order.order_number,
                total = detail.order.total_cents,
                "Order placed via API"
            );
            Ok((StatusCode::CREATED, Json(detail)))
        }
        Err(e) => {
            if let Some(path) = &slip_path {
                state.uploads().remove(path).await;
            }
            Err(e.into())
        }
    }
}

/// Reads the `order` JSON field and the optional `slip` file.
async fn read_order_form(mut multipart: Multipart) -> ApiResult<(OrderRequest, Option<Upload>)> {
    let mut order = None;
    let mut slip = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("order") => {
                let text = field.text().await?;
                let parsed = serde_json::from_str::<OrderRequest>(&text)
                    .map_err(|e| ApiError::validation(format!("Invalid order field: {}", e)))?;
                order = Some(parsed);
            }
            Some("slip") => slip = Some(Upload::from_field(field).await?),
            other => debug!(field = ?other, "Ignoring unknown multipart field"),
        }
    }

    let order = order.ok_or_else(|| ApiError::validation("order is required"))?;
    Ok((order, slip))
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

/// `POST /api/orders/{id}/slip` (multipart field `slip`)
///
/// Replaces any earlier slip while the order is still pending.
async fn upload_slip(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    multipart: Result<Multipart, axum::extract::multipart::MultipartRejection>,
) -> ApiResult<Json<Order>> {
    let upload = single_file(multipart?, "slip").await?;
    let path = state.uploads().save(UploadKind::Slip, &upload).await?;

    match state.db().orders().attach_slip(id, &path).await {
        Ok((order, previous)) => {
            if let Some(old) = previous {
                state.uploads().remove(&old).await;
            }
            info!(order_id = id, "Payment slip attached");
            Ok(Json(order))
        }
        Err(e) => {
            state.uploads().remove(&path).await;
            Err(e.into())
        }
    }
}
