pub mod auth;
pub mod errors;
pub mod models;
pub mod routes;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;
use crate::dispatch::RebuildDispatcher;

pub const API_TOKEN_ENV: &str = "VULNMAP_API_TOKEN";

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub dispatcher: RebuildDispatcher,
    /// Bearer token required on mutating routes. `None` leaves them open.
    pub api_token: Option<String>,
}

impl AppState {
    /// State with the API token taken from `VULNMAP_API_TOKEN`.
    pub fn new(db: Database, dispatcher: RebuildDispatcher) -> Self {
        let api_token = std::env::var(API_TOKEN_ENV).ok().filter(|t| !t.is_empty());
        Self { db, dispatcher, api_token }
    }
}

pub fn build_router(state: AppState) -> Router {
    let guarded = Router::new()
        .route("/api/rebuild", post(routes::rebuild::rebuild))
        .route("/api/organizations/{id}/refresh", post(routes::rebuild::refresh_organization))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::api_auth_middleware));

    Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route("/api/urls/{id}/reports", get(routes::reports::list_url_reports))
        .route("/api/urls/{id}/report", get(routes::reports::get_url_report))
        .route("/api/organizations/{id}/reports", get(routes::reports::list_organization_reports))
        .route("/api/organizations/{id}/report", get(routes::reports::get_organization_report))
        .merge(guarded)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
