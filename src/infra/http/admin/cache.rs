use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::AdminState;

pub(super) async fn clear_cache(State(state): State<AdminState>) -> Response {
    state.content.clear_cache();
    StatusCode::NO_CONTENT.into_response()
}
