use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use bulletin_api_types::StatusResponse;
use futures::FutureExt;
use tracing::error;

use crate::{
    application::{
        content::ContentService,
        error::{ErrorReport, HttpError},
        probes::ProbeService,
    },
    domain::content::ContentKey,
    infra::assets,
};

use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub content: Arc<ContentService>,
    pub probes: ProbeService,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(assets::serve_index))
        .route("/static/{*path}", get(assets::serve_static))
        .route("/api/events", get(events))
        .route("/api/news", get(news))
        .route("/api/faq", get(faq))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/health", get(health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn events(State(state): State<HttpState>) -> Response {
    content_response(&state, ContentKey::Events).await
}

async fn news(State(state): State<HttpState>) -> Response {
    content_response(&state, ContentKey::News).await
}

async fn faq(State(state): State<HttpState>) -> Response {
    content_response(&state, ContentKey::Faq).await
}

/// Load failures are already folded into the document; only a defect in the
/// service (a panic) turns into a 500.
async fn content_response(state: &HttpState, key: ContentKey) -> Response {
    match AssertUnwindSafe(state.content.get(key)).catch_unwind().await {
        Ok(document) => (StatusCode::OK, Json(document.as_ref())).into_response(),
        Err(payload) => {
            let detail = panic_message(payload.as_ref());
            error!(
                target = "bulletin::http::content",
                key = %key,
                detail = %detail,
                "Content handler panicked"
            );
            HttpError::internal(
                "infra::http::public::content_response",
                format!("content lookup for `{key}` panicked: {detail}"),
            )
            .into_response()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

async fn healthz(State(state): State<HttpState>) -> Response {
    (StatusCode::OK, Json(state.probes.liveness())).into_response()
}

async fn readyz(State(state): State<HttpState>) -> Response {
    let readiness = state.probes.readiness().await;
    if readiness.status.is_ready() {
        return (StatusCode::OK, Json(readiness)).into_response();
    }

    let detail = format!("readiness checks failed: {:?}", readiness.checks);
    let mut response = (StatusCode::SERVICE_UNAVAILABLE, Json(readiness)).into_response();
    ErrorReport::from_message(
        "infra::http::public::readyz",
        StatusCode::SERVICE_UNAVAILABLE,
        detail,
    )
    .attach(&mut response);
    response
}

async fn health() -> Response {
    let body = StatusResponse {
        status: "healthy".to_string(),
    };
    (StatusCode::OK, Json(body)).into_response()
}
