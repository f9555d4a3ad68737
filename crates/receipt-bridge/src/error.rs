use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{DomainError, PrintError, PrintOutcome};
use tracing::error;

/// Errors surfaced by HTTP handlers and middleware
#[derive(Debug)]
pub enum ApiError {
    Print(PrintError),
    InvalidRequest(String),
    Unauthorized,
    RateLimited,
}

impl From<PrintError> for ApiError {
    fn from(err: PrintError) -> Self {
        Self::Print(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

/// Status for a printer failure, judged by its final cause
pub fn print_status(err: &PrintError) -> StatusCode {
    match err {
        PrintError::NoDeviceFound => StatusCode::SERVICE_UNAVAILABLE,
        PrintError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        PrintError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        PrintError::RetriesExhausted { source, .. } => print_status(source),
        PrintError::OpenFailed(_) | PrintError::EmissionFailed(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Print(err) => {
                let status = print_status(&err);
                error!(status = status.as_u16(), error = %err, "Print request failed");
                (status, err.to_string())
            }
            Self::InvalidRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Missing or invalid API key".to_string(),
            ),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, try again later".to_string(),
            ),
        };

        (status, Json(PrintOutcome::failure(message))).into_response()
    }
}
