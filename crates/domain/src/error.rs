use std::time::Duration;

use thiserror::Error;

/// Domain-level errors raised while validating inbound requests
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid order: {0}")]
    InvalidOrder(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;

/// Failures of the printer pipeline.
///
/// `Clone` because a single initialization outcome is handed to every caller
/// that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrintError {
    #[error("No printer device found")]
    NoDeviceFound,

    #[error("Failed to open printer: {0}")]
    OpenFailed(String),

    #[error("Failed to send commands to printer: {0}")]
    EmissionFailed(String),

    #[error("Print operation timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Printer configuration error: {0}")]
    Configuration(String),

    #[error("{label} failed after {retries} retries: {source}")]
    RetriesExhausted {
        label: String,
        retries: u32,
        source: Box<PrintError>,
    },
}

/// Substrings that mark an error message as worth retrying
const TRANSIENT_INDICATORS: &[&str] = &[
    "timeout",
    "timed out",
    "busy",
    "eagain",
    "ebusy",
    "failed to open",
    "connection",
    "i/o",
    "io error",
    "temporarily unavailable",
    "broken pipe",
];

/// Check a free-form error message against the known transient indicators.
pub fn message_is_transient(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_INDICATORS
        .iter()
        .any(|indicator| lower.contains(indicator))
}

impl PrintError {
    /// Whether retrying the failed operation could plausibly succeed.
    ///
    /// Hardware absence and configuration problems are named permanent cases
    /// and never fall through to message matching.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NoDeviceFound => false,
            Self::Configuration(_) => false,
            Self::RetriesExhausted { .. } => false,
            Self::OpenFailed(_) => true,
            Self::Timeout(_) => true,
            Self::EmissionFailed(detail) => message_is_transient(detail),
        }
    }

    /// Helper for wrapping I/O failures raised while writing to a device
    pub fn emission(context: impl std::fmt::Display, err: std::io::Error) -> Self {
        Self::EmissionFailed(format!("{context}: I/O error: {err}"))
    }
}
