use bistro_core::error::{CoreError, FieldErrors};
use bistro_core::types::RecordId;
use serde::Deserialize;

/// Errors from the REST client layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("API error ({status} {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        body: ApiErrorBody,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// The server's `{ error, code, ... }` error envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub fields: Option<FieldErrors>,
    #[serde(default)]
    pub requested: Option<String>,
    #[serde(default)]
    pub furthest: Option<String>,
}

impl ClientError {
    /// Translate into the domain error the wizard understands.
    ///
    /// `id` is the record the failed call was about. Transport failures and
    /// server errors become [`CoreError::Persistence`].
    pub fn into_core(self, id: RecordId) -> CoreError {
        let (status, body) = match self {
            ClientError::Request(e) => return CoreError::Persistence(e.to_string()),
            ClientError::Config(msg) => return CoreError::Internal(msg),
            ClientError::Api { status, body, .. } => (status, body),
        };

        match body.code.as_str() {
            "NOT_FOUND" => CoreError::record_not_found(id),
            "ALREADY_SUBMITTED" => CoreError::AlreadySubmitted { id },
            "STEP_NOT_REACHED" => CoreError::StepNotReached {
                requested: body.requested.unwrap_or_default(),
                furthest: body.furthest.unwrap_or_default(),
            },
            "FIELD_VALIDATION_ERROR" => CoreError::FieldValidation(body.fields.unwrap_or_default()),
            "VALIDATION_ERROR" | "BAD_REQUEST" => CoreError::Validation(body.error),
            "INVALID_TRANSITION" | "CONFLICT" => CoreError::Conflict(body.error),
            "UNAUTHORIZED" => CoreError::Unauthorized(body.error),
            "FORBIDDEN" => CoreError::Forbidden(body.error),
            _ => CoreError::Persistence(format!("HTTP {status}: {}", body.error)),
        }
    }
}
