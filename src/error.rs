use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::identity::IdentityError;
use crate::listing::ListingError;
use crate::session::UnknownSessionKind;
use crate::store::StoreError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "resource not found")
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => AppError::not_found(),
            other => {
                error!(error = %other, "record store request failed");
                AppError::unavailable("record store unavailable")
            }
        }
    }
}

impl From<ListingError> for AppError {
    fn from(value: ListingError) -> Self {
        match value {
            ListingError::InvalidPage(_)
            | ListingError::InvalidLimit(_)
            | ListingError::OffsetOverflow => AppError::bad_request(value.to_string()),
            ListingError::Unavailable(source) => {
                error!(error = %source, "session listing failed");
                AppError::unavailable("listing unavailable")
            }
        }
    }
}

impl From<UnknownSessionKind> for AppError {
    fn from(value: UnknownSessionKind) -> Self {
        AppError::bad_request(value.to_string())
    }
}

impl From<IdentityError> for AppError {
    fn from(value: IdentityError) -> Self {
        match value {
            IdentityError::NotConfigured => {
                AppError::unavailable("identity provider not configured")
            }
            IdentityError::Status { status: 404, .. } => AppError::not_found(),
            IdentityError::Status {
                status: 400 | 409,
                message,
            } => AppError::bad_request(message),
            other => {
                error!(error = %other, "identity provider request failed");
                AppError::new(StatusCode::BAD_GATEWAY, "identity provider error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_hide_details() {
        let err = AppError::from(StoreError::Pool("connection refused".to_string()));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.message(), "record store unavailable");
    }

    #[test]
    fn missing_records_are_not_found() {
        let err = AppError::from(StoreError::NotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn listing_errors_split_input_from_outage() {
        assert_eq!(
            AppError::from(ListingError::InvalidLimit(0)).status(),
            StatusCode::BAD_REQUEST
        );
        let outage = AppError::from(ListingError::Unavailable(StoreError::Task(
            "cancelled".to_string(),
        )));
        assert_eq!(outage.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(outage.message(), "listing unavailable");
    }

    #[test]
    fn identity_conflicts_are_bad_requests() {
        let err = AppError::from(IdentityError::Status {
            status: 409,
            message: "The user already exists.".to_string(),
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "The user already exists.");
    }
}
