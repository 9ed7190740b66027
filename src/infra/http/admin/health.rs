use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::application::error::ErrorReport;

use super::AdminState;

pub(super) async fn store_health(State(state): State<AdminState>) -> Response {
    if state.content.is_backing_store_available().await {
        return StatusCode::NO_CONTENT.into_response();
    }

    let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
    ErrorReport::from_message(
        "infra::http::admin::store_health",
        StatusCode::SERVICE_UNAVAILABLE,
        format!(
            "{} backing store is unavailable",
            state.content.store_kind().as_str()
        ),
    )
    .attach(&mut response);
    response
}
