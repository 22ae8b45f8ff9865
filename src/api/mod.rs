// HTTP API - axum router over the aggregation engine

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{HealthResponse, ListParams, MonthParams};

use axum::{routing::get, Router};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::aggregation::AggregationEngine;
use crate::dataset::Dataset;
use crate::import::SeedSource;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: AggregationEngine,
    pub seed: SeedSource,
    pub seed_timeout: Duration,
}

impl AppState {
    pub fn new(dataset: Dataset, seed: SeedSource, seed_timeout: Duration) -> Self {
        Self {
            engine: AggregationEngine::new(dataset),
            seed,
            seed_timeout,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        self.engine.dataset()
    }
}

/// `/api` routes, unnested
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/transactions", get(handlers::list_transactions))
        .route("/transactions/init", get(handlers::initialize_database))
        .route("/transactions/statistics", get(handlers::get_statistics))
        .route("/transactions/barchart", get(handlers::get_bar_chart))
        .route("/transactions/piechart", get(handlers::get_pie_chart))
        .route("/transactions/combined", get(handlers::get_combined))
        .with_state(state)
}

/// Full application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
