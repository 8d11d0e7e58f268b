use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
};

use crate::app::AppState;
use crate::error::InternalDetail;

/// Re-render 500 responses with their underlying cause attached as `detail`
/// when `security.expose_internal_errors` is enabled. A no-op otherwise.
pub async fn expose_internal_errors(State(state): State<AppState>, response: Response) -> Response {
    if !state.config.security.expose_internal_errors {
        return response;
    }

    match response.extensions().get::<InternalDetail>().cloned() {
        Some(InternalDetail { mut body, detail }) => {
            body["detail"] = detail.into();
            (response.status(), Json(body)).into_response()
        }
        None => response,
    }
}
