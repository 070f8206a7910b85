//! # warren-api: Storefront HTTP API
//!
//! JSON API over the Warren database for the storefront SPA and the admin
//! panel, plus static serving of uploaded images.
//!
//! ## Module Organization
//! ```text
//! warren_api/
//! ├── config.rs      ← ServerConfig (defaults → TOML → WARREN_* env)
//! ├── error.rs       ← ApiError {code, message} → HTTP status
//! ├── extract.rs     ← Json/Query/Path with ApiError rejections
//! ├── middleware.rs  ← x-admin-token guard
//! ├── state.rs       ← AppState (config, Database, UploadStore)
//! ├── uploads.rs     ← image/slip storage under uploads_dir
//! └── routes/        ← handlers, one module per resource
//! ```
//!
//! ## Layers
//! ```text
//! request ─► TraceLayer ─► CORS (if configured) ─► body limit ─► router
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod uploads;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::AppState;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Room for multipart boundaries and the `order` JSON field on top of the
/// largest accepted file.
const MULTIPART_OVERHEAD: usize = 256 * 1024;

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    let config = state.config();
    let body_limit = config.storage.max_upload_bytes + MULTIPART_OVERHEAD;
    let uploads = ServeDir::new(&config.storage.uploads_dir);
    let cors = cors_layer(&config.server.cors_origins);

    let router = Router::new()
        .merge(routes::health::routes())
        .nest("/api", routes::api_routes(state.clone()))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(body_limit));

    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Skipping unusable CORS origin");
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([
                header::CONTENT_TYPE,
                HeaderName::from_static(middleware::ADMIN_TOKEN_HEADER),
            ]),
    )
}
