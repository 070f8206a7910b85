//! Public catalog: rabbits and active products.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use warren_core::validation::validate_search_query;
use warren_core::{Product, Rabbit};
use warren_db::{ProductFilter, RabbitFilter};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rabbits", get(list_rabbits))
        .route("/rabbits/{id}", get(get_rabbit))
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
}

/// `GET /api/rabbits?status=available&breed=Mini%20Rex&gender=female&breeders_only=true`
async fn list_rabbits(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<RabbitFilter>,
) -> ApiResult<Json<Vec<Rabbit>>> {
    let breed = filter
        .breed
        .as_deref()
        .map(validate_search_query)
        .transpose()?;
    let filter = RabbitFilter { breed, ..filter };

    Ok(Json(state.db().rabbits().list(&filter).await?))
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

/// `GET /api/products?category=food&q=hay`. Inactive products never appear.
async fn list_products(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> ApiResult<Json<Vec<Product>>> {
    let q = filter.q.as_deref().map(validate_search_query).transpose()?;
    let filter = ProductFilter {
        q,
        include_inactive: false,
        ..filter
    };

    Ok(Json(state.db().products().list(&filter).await?))
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
        .filter(|p| p.is_active)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product", id))
}
