use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use promguard_core::error::{ClientCode, GateError};

/// HTTP status for a client-facing error code.
pub fn status_for(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::BadData => StatusCode::BAD_REQUEST,
        ClientCode::Forbidden => StatusCode::FORBIDDEN,
        ClientCode::NotFound => StatusCode::NOT_FOUND,
        ClientCode::Unavailable => StatusCode::BAD_GATEWAY,
        ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `GateError` rendered in the query engine's error envelope.
#[derive(Debug)]
pub struct ApiError(pub GateError);

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.client_code();
        let body = json!({
            "status": "error",
            "errorType": code.as_str(),
            "error": self.0.to_string(),
        });
        (status_for(code), Json(body)).into_response()
    }
}
