use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};
use tracing_error::ExtractSpanTrace;

use crate::error::ApiError;
use crate::models::status::Status;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.span_trace() {
            Some(span_trace) => error!("{self}\n{span_trace}"),
            None => warn!("{self}"),
        }

        let code = self.status_code();
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Status::failure(code, self.reason(), self.to_string());
        (status, Json(body)).into_response()
    }
}
