// Response envelope shared by every gateway route:
// `{ success, data? , error? | message? }`

use crate::error::{Error, ErrorClass};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Failure detail for conflicts, auth and internal errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure detail for client (400) errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }
}

impl ApiResponse<()> {
    fn failure(err: &Error) -> Self {
        let text = Some(err.public_message());
        let (error, message) = match err.class() {
            ErrorClass::Client => (None, text),
            _ => (text, None),
        };

        Self {
            success: false,
            data: None,
            error,
            message,
        }
    }
}

/// `200 OK` with the data wrapped in a success envelope
pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::OK, Json(ApiResponse::ok(data)))
}

/// `201 Created` with the data wrapped in a success envelope
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::ok(data)))
}

/// Gateway-side error; renders as a failure envelope.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl<E: Into<Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let class = self.0.class();
        match class {
            ErrorClass::Internal => error!(error = %self.0, "request failed"),
            _ => warn!(error = %self.0, "request rejected"),
        }

        let status = StatusCode::from_u16(class.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(ApiResponse::failure(&self.0))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::ok(vec![1, 2])).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": [1, 2]}));
    }

    #[test]
    fn test_deleted_nothing_serializes_null_data() {
        let json = serde_json::to_value(ApiResponse::ok(None::<u8>)).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": null}));
    }

    #[test]
    fn test_client_errors_use_message() {
        let json = serde_json::to_value(ApiResponse::failure(&Error::MissingParameter("year"))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "message": "year parameter is required"})
        );
    }

    #[test]
    fn test_internal_errors_are_generic() {
        let err = Error::Database(rusqlite::Error::InvalidQuery);
        let json = serde_json::to_value(ApiResponse::failure(&err)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "internal storage error"})
        );
    }

    #[test]
    fn test_error_status_codes() {
        let response = ApiError(Error::DuplicateYear(2024)).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = ApiError(Error::unauthorized("no token")).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = ApiError(Error::MissingParameter("id")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
