//! Error types shared by the engine crates.
//!
//! Cell-level parsing never produces these; only structural failures do
//! (empty input, unresolved required columns, unknown dataset handles).

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while transforming or querying a dataset.
#[derive(Debug, Error)]
pub enum EngineError {
    // === Input Errors ===
    /// CSV text was empty or whitespace only.
    #[error("CSV text is empty")]
    EmptyInput,

    /// CSV contained a header row but no data rows.
    #[error("CSV contains no data rows")]
    NoDataRows,

    /// One or more required logical columns could not be resolved.
    #[error("required columns not found: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    /// The tokenizer failed on the raw text.
    #[error("failed to parse CSV: {message}")]
    Csv { message: String },

    // === Registry Errors ===
    /// Dataset handle is unknown or was already released.
    #[error("unknown or released dataset handle: {handle}")]
    UnknownHandle { handle: String },

    // === Wiring Errors ===
    /// A component required by the request is not wired into the worker.
    #[error("{component} is not available in this worker")]
    NotWired { component: &'static str },

    // === Protocol Errors ===
    /// The request message could not be decoded.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

/// Coarse classification of an [`EngineError`], used as the error `name`
/// on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InputError,
    HandleError,
    ReferenceError,
    ProtocolError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InputError => "InputError",
            Self::HandleError => "HandleError",
            Self::ReferenceError => "ReferenceError",
            Self::ProtocolError => "ProtocolError",
        }
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyInput | Self::NoDataRows | Self::MissingColumns { .. } | Self::Csv { .. } => {
                ErrorKind::InputError
            }
            Self::UnknownHandle { .. } => ErrorKind::HandleError,
            Self::NotWired { .. } => ErrorKind::ReferenceError,
            Self::InvalidRequest { .. } => ErrorKind::ProtocolError,
        }
    }

    pub fn unknown_handle(handle: impl Into<String>) -> Self {
        Self::UnknownHandle {
            handle: handle.into(),
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_message_names_fields() {
        let err = EngineError::MissingColumns {
            missing: vec!["arrival".to_string(), "discharge".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "required columns not found: arrival, discharge"
        );
        assert_eq!(err.kind(), ErrorKind::InputError);
    }

    #[test]
    fn handle_and_wiring_errors_are_classified() {
        assert_eq!(
            EngineError::unknown_handle("ds-1").kind().as_str(),
            "HandleError"
        );
        let err = EngineError::NotWired {
            component: "dataset registry",
        };
        assert_eq!(err.kind(), ErrorKind::ReferenceError);
        assert_eq!(err.to_string(), "dataset registry is not available in this worker");
    }
}
