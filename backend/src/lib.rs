//! Inventory Ledger - Backend
//!
//! Multi-company inventory ledger: per-site item quantities moved by
//! deliveries and processes, with every change recorded in an append-only
//! inventory log.

use std::sync::Arc;

use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod ledger;
pub mod middleware;
pub mod repository;
pub mod routes;
pub mod services;

pub use config::Config;

use crate::external::SiteDirectory;
use crate::ledger::{OperationContext, SharedLedger};
use crate::middleware::AuthUser;
use crate::repository::LedgerRepository;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ledger: SharedLedger,
    pub sites: Arc<dyn SiteDirectory>,
    pub repository: Arc<dyn LedgerRepository>,
    pub db: Option<sqlx::PgPool>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Operation context for an authenticated request body
    pub fn context<T: Serialize>(
        &self,
        user: &AuthUser,
        request_id: Option<Uuid>,
        timestamp: Option<DateTime<Utc>>,
        body: &T,
    ) -> OperationContext {
        OperationContext::for_request(user.actor(), request_id, timestamp, body)
            .with_schema_version(&self.config.ledger.schema_version)
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Inventory Ledger API v1.0"
}
