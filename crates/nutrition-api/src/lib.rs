//! # Nutrition API
//!
//! HTTP façade over the sync orchestrator.
//!
//! ## Routes
//!
//! | Method | Path                                | Handler          |
//! |--------|-------------------------------------|------------------|
//! | GET    | `/`                                 | welcome          |
//! | GET    | `/health`                           | reachability     |
//! | POST   | `/api/v1/food-nutritions`           | create           |
//! | GET    | `/api/v1/food-nutritions`           | list             |
//! | GET    | `/api/v1/food-nutritions/search`    | filtered search  |
//! | GET    | `/api/v1/food-nutritions/:id`       | get              |
//! | PUT    | `/api/v1/food-nutritions/:id`       | partial update   |
//! | DELETE | `/api/v1/food-nutritions/:id`       | delete           |

pub mod error;
pub mod routes;

pub use error::{ApiError, ErrorBody};

use axum::routing::get;
use axum::Router;
use nutrition_sync::SyncOrchestrator;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Prefix for the record resource
pub const API_PREFIX: &str = "/api/v1/food-nutritions";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SyncOrchestrator>,
}

/// Build the application router
pub fn router(orchestrator: Arc<SyncOrchestrator>) -> Router {
    let collection = get(routes::list_records).post(routes::create_record);
    let item = get(routes::get_record)
        .put(routes::update_record)
        .delete(routes::delete_record);

    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route(API_PREFIX, collection.clone())
        .route(&format!("{}/", API_PREFIX), collection)
        .route(&format!("{}/search", API_PREFIX), get(routes::search_records))
        .route(&format!("{}/:id", API_PREFIX), item)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { orchestrator })
}
