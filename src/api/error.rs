use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::models::ErrorBody;
use crate::errors::{ServiceError, ValidationError};

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        error: message.into(),
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, self.to_string())
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}
