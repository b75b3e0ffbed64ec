use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("External dependency error: {0}")]
    External(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<tandem_core::Error> for AppError {
    fn from(error: tandem_core::Error) -> Self {
        match error {
            tandem_core::Error::NotFound(message) => Self::NotFound(message),
            tandem_core::Error::Conflict(message) => Self::Conflict(message),
            tandem_core::Error::InvalidInput(message) => Self::BadRequest(message),
            tandem_core::Error::Remote(remote) => Self::External(remote.to_string()),
            tandem_core::Error::LibSql(_) | tandem_core::Error::Serialization(_) => {
                Self::Internal(error.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::External(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn core_errors_map_to_expected_statuses() {
        let cases = [
            (
                AppError::from(tandem_core::Error::NotFound("Company 9".to_string())),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::from(tandem_core::Error::Conflict("email taken".to_string())),
                StatusCode::CONFLICT,
            ),
            (
                AppError::from(tandem_core::Error::InvalidInput("blank name".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(tandem_core::Error::Remote(
                    tandem_core::shopify::RemoteError::GraphQl("throttled".to_string()),
                )),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
