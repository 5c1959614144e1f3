//! Azure client errors

use thiserror::Error;

/// ARM error codes that mean the addressed resource does not exist
const NOT_FOUND_CODES: &[&str] = &[
    "ResourceNotFound",
    "ResourceGroupNotFound",
    "ParentResourceNotFound",
    "NotFound",
    "Request_ResourceNotFound",
];

/// Errors that can occur when interacting with Azure Resource Manager or Microsoft Graph
#[derive(Debug, Error)]
pub enum AzureError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Azure returned an error response
    #[error("Azure API error ({status}) {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Token acquisition failed or the caller is not authorized
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g. missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A long-running operation finished unsuccessfully
    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl AzureError {
    /// Classify an error response from its HTTP status and ARM error code
    pub fn from_response(status: u16, code: &str, message: &str) -> Self {
        if status == 404 || NOT_FOUND_CODES.contains(&code) {
            return AzureError::NotFound(format!("{code}: {message}"));
        }
        if status == 401 || status == 403 {
            return AzureError::Authentication(format!("{status} {code}: {message}"));
        }
        AzureError::Api {
            status,
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether the addressed resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, AzureError::NotFound(_))
    }

    /// ARM error code, if this is an API error
    pub fn code(&self) -> Option<&str> {
        match self {
            AzureError::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Whether the request may succeed if repeated: throttling, timeouts and server errors
    pub fn is_transient(&self) -> bool {
        match self {
            AzureError::Api { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Whether Azure rejected the request because a principal is not yet replicated
    pub fn is_principal_not_found(&self) -> bool {
        self.code() == Some("PrincipalNotFound")
    }
}

/// Ignore not-found errors, returning `Ok(())` instead
pub fn ignore_not_found(result: Result<(), AzureError>) -> Result<(), AzureError> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}
