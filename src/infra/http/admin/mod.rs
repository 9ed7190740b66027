mod cache;
mod health;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::application::content::ContentService;

use super::middleware::{log_responses, set_request_context};

/// Operational hooks served on the administrative listener only.
#[derive(Clone)]
pub struct AdminState {
    pub content: Arc<ContentService>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/_cache/clear", post(cache::clear_cache))
        .route("/_health/store", get(health::store_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}
