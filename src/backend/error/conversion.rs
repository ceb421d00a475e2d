/**
 * Error Conversion
 *
 * Turns backend errors into HTTP responses.
 *
 * # Response Format
 *
 * Error responses are returned as JSON with the following structure:
 * ```json
 * {
 *   "error": "Error message",
 *   "status": 400
 * }
 * ```
 */

use axum::{
    response::{IntoResponse, Response},
    Json,
};

use crate::backend::error::types::BackendError;

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!("[HTTP] {} {}", status.as_u16(), message);
        }

        let body = Json(serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        }));
        (status, body).into_response()
    }
}
