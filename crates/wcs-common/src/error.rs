//! Error types for WCS gateway operations.

use thiserror::Error;

use crate::xml::escape;

/// Result type alias using WcsError.
pub type WcsResult<T> = Result<T, WcsError>;

/// Primary error type for WCS operations.
///
/// Every kind carries enough context to produce an OWS exception report:
/// a locator (the offending parameter or element) and a human message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WcsError {
    #[error("Missing required parameter '{locator}': {message}")]
    MissingParameter { locator: String, message: String },

    #[error("Invalid parameter value for '{locator}': {message}")]
    InvalidParameterValue { locator: String, message: String },

    #[error("Operation not supported ({locator}): {message}")]
    OperationNotSupported { locator: String, message: String },

    #[error("No such coverage: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WcsError {
    pub fn missing(locator: impl Into<String>, message: impl Into<String>) -> Self {
        WcsError::MissingParameter {
            locator: locator.into(),
            message: message.into(),
        }
    }

    pub fn invalid(locator: impl Into<String>, message: impl Into<String>) -> Self {
        WcsError::InvalidParameterValue {
            locator: locator.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(locator: impl Into<String>, message: impl Into<String>) -> Self {
        WcsError::OperationNotSupported {
            locator: locator.into(),
            message: message.into(),
        }
    }

    /// Get the OWS exception code for this error.
    pub fn exception_code(&self) -> &'static str {
        match self {
            WcsError::MissingParameter { .. } => "MissingParameterValue",
            WcsError::InvalidParameterValue { .. } => "InvalidParameterValue",
            WcsError::OperationNotSupported { .. } => "OperationNotSupported",
            WcsError::NotFound(_) => "NoSuchCoverage",
            WcsError::Internal(_) => "NoApplicableCode",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            WcsError::MissingParameter { .. } | WcsError::InvalidParameterValue { .. } => 400,
            WcsError::NotFound(_) => 404,
            WcsError::OperationNotSupported { .. } => 501,
            WcsError::Internal(_) => 500,
        }
    }

    /// The parameter or element the error refers to, if any.
    pub fn locator(&self) -> Option<&str> {
        match self {
            WcsError::MissingParameter { locator, .. }
            | WcsError::InvalidParameterValue { locator, .. }
            | WcsError::OperationNotSupported { locator, .. } => Some(locator),
            // Both carry a free-form message, not a parameter name.
            WcsError::NotFound(_) | WcsError::Internal(_) => None,
        }
    }

    /// Render an OWS 2.0 exception report document.
    pub fn to_exception_report(&self) -> String {
        let locator = self
            .locator()
            .map(|l| format!(r#" locator="{}""#, escape(l)))
            .unwrap_or_default();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ows:ExceptionReport xmlns:ows="http://www.opengis.net/ows/2.0" version="2.0.0">
  <ows:Exception exceptionCode="{}"{}>
    <ows:ExceptionText>{}</ows:ExceptionText>
  </ows:Exception>
</ows:ExceptionReport>"#,
            self.exception_code(),
            locator,
            escape(&self.to_string())
        )
    }
}

impl From<std::io::Error> for WcsError {
    fn from(err: std::io::Error) -> Self {
        WcsError::Internal(format!("I/O error: {}", err))
    }
}
