//! Rabbit listings and products: create, edit, remove, images.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;
use warren_core::validation::{validate_product_input, validate_rabbit_input};
use warren_core::{Product, ProductInput, Rabbit, RabbitInput, RabbitStatus};
use warren_db::{ProductFilter, RabbitFilter};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::routes::single_file;
use crate::state::AppState;
use crate::uploads::UploadKind;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rabbits", get(list_rabbits).post(create_rabbit))
        .route(
            "/rabbits/{id}",
            get(get_rabbit).put(update_rabbit).delete(delete_rabbit),
        )
        .route("/rabbits/{id}/status", put(set_rabbit_status))
        .route("/rabbits/{id}/image", post(upload_rabbit_image))
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(deactivate_product),
        )
        .route("/products/{id}/stock", post(adjust_stock))
        .route("/products/{id}/image", post(upload_product_image))
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: RabbitStatus,
}

#[derive(Debug, Deserialize)]
struct StockBody {
    delta: i64,
}

// =============================================================================
// Rabbits
// =============================================================================

async fn list_rabbits(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<RabbitFilter>,
) -> ApiResult<Json<Vec<Rabbit>>> {
    Ok(Json(state.db().rabbits().list(&filter).await?))
}

async fn create_rabbit(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RabbitInput>,
) -> ApiResult<(StatusCode, Json<Rabbit>)> {
    validate_rabbit_input(&input)?;
    let rabbit = state.db().rabbits().insert(&input).await?;
    info!(rabbit_id = rabbit.id, name = %rabbit.name, "Rabbit listed");
    Ok((StatusCode::CREATED, Json(rabbit)))
}

async fn get_rabbit(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Rabbit>> {
    state
        .db()
        .rabbits()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Rabbit", id))
}

async fn update_rabbit(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<RabbitInput>,
) -> ApiResult<Json<Rabbit>> {
    validate_rabbit_input(&input)?;
    Ok(Json(state.db().rabbits().update(id, &input).await?))
}

/// Removes the listing and its image. Rabbits with loan history are kept
/// (`409`).
async fn delete_rabbit(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let rabbit = state
        .db()
        .rabbits()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Rabbit", id))?;

    state.db().rabbits().delete(id).await?;
    if let Some(image) = &rabbit.image_path {
        state.uploads().remove(image).await;
    }

    info!(rabbit_id = id, "Rabbit deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn set_rabbit_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<StatusBody>,
) -> ApiResult<Json<Rabbit>> {
    Ok(Json(state.db().rabbits().set_status(id, body.status).await?))
}

async fn upload_rabbit_image(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Rabbit>> {
    let upload = single_file(multipart?, "image").await?;
    let path = state.uploads().save(UploadKind::Rabbit, &upload).await?;

    match state.db().rabbits().set_image(id, &path).await {
        Ok((rabbit, previous)) => {
            if let Some(old) = previous {
                state.uploads().remove(&old).await;
            }
            Ok(Json(rabbit))
        }
        Err(e) => {
            state.uploads().remove(&path).await;
            Err(e.into())
        }
    }
}

// =============================================================================
// Products
// =============================================================================

/// Lists every product, inactive ones included.
async fn list_products(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> ApiResult<Json<Vec<Product>>> {
    let filter = ProductFilter {
        include_inactive: true,
        ..filter
    };
    Ok(Json(state.db().products().list(&filter).await?))
}

async fn create_product(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    validate_product_input(&input)?;
    let product = state.db().products().insert(&input).await?;
    info!(product_id = product.id, name = %product.name, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Product>> {
    state
        .db()
        .products()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product", id))
}

async fn update_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<Json<Product>> {
    validate_product_input(&input)?;
    Ok(Json(state.db().products().update(id, &input).await?))
}

/// Soft delete: order history keeps pointing at the product.
async fn deactivate_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.db().products().deactivate(id).await?;
    info!(product_id = id, "Product deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/admin/products/{id}/stock` with `{"delta": -3}`
async fn adjust_stock(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<StockBody>,
) -> ApiResult<Json<Product>> {
    if body.delta == 0 {
        return Err(ApiError::validation("delta must not be zero"));
    }
    Ok(Json(state.db().products().adjust_stock(id, body.delta).await?))
}

async fn upload_product_image(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Product>> {
    let upload = single_file(multipart?, "image").await?;
    let path = state.uploads().save(UploadKind::Product, &upload).await?;

    match state.db().products().set_image(id, &path).await {
        Ok((product, previous)) => {
            if let Some(old) = previous {
                state.uploads().remove(&old).await;
            }
            Ok(Json(product))
        }
        Err(e) => {
            state.uploads().remove(&path).await;
            Err(e.into())
        }
    }
}
