use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use geoenv_core::GeoEnvError;
use serde_json::json;
use tracing::error;

/// Error body returned by every route: `{status, error, field?}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    field: Option<&'static str>,
}

impl ApiError {
    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
            field: None,
        }
    }
}

impl From<GeoEnvError> for ApiError {
    fn from(err: GeoEnvError) -> Self {
        if err.is_invalid_input() {
            return Self {
                status: StatusCode::BAD_REQUEST,
                message: err.to_string(),
                field: err.field(),
            };
        }

        error!("Request failed: {err}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
            field: None,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(format!("invalid query string: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "status": "error",
            "error": self.message,
        });
        if let Some(field) = self.field {
            body["field"] = json!(field);
        }

        (self.status, Json(body)).into_response()
    }
}
