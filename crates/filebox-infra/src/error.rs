//! Serializable error report
//!
//! [`ErrorResponse`] is the JSON shape the `filebox` binary prints when a
//! command fails.

use filebox_core::{AppError, ErrorMetadata};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<&'static str>,
    pub recoverable: bool,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        Self {
            error: err.client_message(),
            code: err.error_code(),
            suggested_action: err.suggested_action(),
            recoverable: err.is_recoverable(),
        }
    }
}
