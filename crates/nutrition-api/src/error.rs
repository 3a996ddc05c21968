//! HTTP error mapping

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nutrition_core::NutritionError;
use serde::Serialize;
use tracing::error;

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// API error with its status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }
}

impl From<NutritionError> for ApiError {
    fn from(e: NutritionError) -> Self {
        match &e {
            NutritionError::Validation { message } => Self::unprocessable(message.clone()),
            NutritionError::Conflict { .. } => Self::new(StatusCode::BAD_REQUEST, e.to_string()),
            NutritionError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, e.to_string()),
            _ => {
                error!(error = %e, "Request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::unprocessable(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::unprocessable(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::unprocessable(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(NutritionError::conflict("T1")).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(NutritionError::not_found(1)).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(NutritionError::validation("food_cd is required")).status,
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let internal = ApiError::from(NutritionError::store("disk I/O error"));
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!internal.detail.contains("disk"));
    }
}
