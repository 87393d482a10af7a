//! HTTP interface - axum router, shared state and request handlers.
//!
//! Handlers stay thin: they extract the caller and the request body, call
//! into [`crate::core`] and wrap the result in the JSON envelope from
//! [`response`]. Errors are converted to responses in [`error`].

pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;

use crate::{config::AppConfig, core::map::MapRenderer};
use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Connection pool
    pub db: Arc<DatabaseConnection>,
    /// Parsed config.toml
    pub config: Arc<AppConfig>,
    /// Renderer behind `/map`
    pub map_renderer: Arc<dyn MapRenderer>,
}

impl AppState {
    /// Bundles the pieces handlers need.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<AppConfig>,
        map_renderer: Arc<dyn MapRenderer>,
    ) -> Self {
        Self {
            db,
            config,
            map_renderer,
        }
    }

    /// The shared connection.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/users", post(handlers::create_user))
        .route(
            "/profile",
            get(handlers::profile).post(handlers::update_profile),
        )
        .route("/streak", get(handlers::streak))
        .route(
            "/activities",
            get(handlers::list_activities).post(handlers::log_activity),
        )
        .route("/activities/:id", post(handlers::update_activity))
        .route("/activities/:id/delete", post(handlers::delete_activity))
        .route(
            "/communities",
            get(handlers::list_communities).post(handlers::create_community),
        )
        .route("/communities/:id/join", post(handlers::join_community))
        .route("/communities/:id/leave", post(handlers::leave_community))
        .route(
            "/communities/:id/challenges",
            get(handlers::list_challenges).post(handlers::create_challenge),
        )
        .route("/challenges/:id/join", post(handlers::join_challenge))
        .route("/challenges/:id/progress", post(handlers::record_progress))
        .route("/map", get(handlers::user_map))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
