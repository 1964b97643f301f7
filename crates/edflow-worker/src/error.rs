//! Worker-level errors.

use edflow_model::EngineError;
use thiserror::Error;

use crate::protocol::ErrorPayload;

/// Name reported for errors without a structured kind.
pub const GENERIC_ERROR_NAME: &str = "Error";

/// Errors raised while answering a request.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A result could not be encoded as JSON.
    #[error("failed to encode response payload")]
    Encode(#[source] serde_json::Error),
}

impl WorkerError {
    /// Error `name` on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Engine(err) => err.kind().as_str(),
            Self::Encode(_) => GENERIC_ERROR_NAME,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload::from_error(self, self.name())
    }
}

impl From<serde_json::Error> for WorkerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_keep_their_kind() {
        let err = WorkerError::from(EngineError::unknown_handle("ds-x"));
        assert_eq!(err.name(), "HandleError");
        let payload = err.to_payload();
        assert_eq!(payload.message, "unknown or released dataset handle: ds-x");
        assert!(payload.stack.is_none());
    }

    #[test]
    fn encode_errors_are_generic_with_a_stack() {
        let json_err = serde_json::from_str::<u8>("x").unwrap_err();
        let payload = WorkerError::from(json_err).to_payload();
        assert_eq!(payload.name, GENERIC_ERROR_NAME);
        assert!(payload.stack.unwrap().starts_with("caused by: "));
    }
}
