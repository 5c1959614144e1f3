//! Long-running operation tracking
//!
//! ARM answers slow mutations with `201`/`202` and a polling URL in either the
//! `Azure-AsyncOperation` or the `Location` header. The URL is wrapped in a
//! [`PollerToken`] that serializes to an opaque string, so callers can persist
//! it (for example in a resource status) and resume polling after a restart.

use crate::error::AzureError;
use serde::{Deserialize, Serialize};

/// Which header the polling URL came from; the two are polled differently
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PollKind {
    /// Status document with a `status` field
    AsyncOperation,
    /// 202 while running, 2xx when done
    Location,
}

/// Resumable handle to an in-flight operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollerToken {
    pub kind: PollKind,
    pub url: String,
}

impl PollerToken {
    /// Build a token from response headers, preferring `Azure-AsyncOperation`
    pub fn from_headers(async_operation: Option<&str>, location: Option<&str>) -> Option<Self> {
        if let Some(url) = async_operation {
            return Some(Self {
                kind: PollKind::AsyncOperation,
                url: url.to_string(),
            });
        }
        location.map(|url| Self {
            kind: PollKind::Location,
            url: url.to_string(),
        })
    }

    /// Serialize to the opaque string stored by callers
    pub fn to_token_string(&self) -> Result<String, AzureError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a string produced by [`PollerToken::to_token_string`]
    pub fn from_token_string(token: &str) -> Result<Self, AzureError> {
        serde_json::from_str(token)
            .map_err(|e| AzureError::InvalidRequest(format!("invalid operation token: {e}")))
    }
}

/// State of a polled operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    InProgress,
    Succeeded,
    Failed(String),
}

/// Body of an `Azure-AsyncOperation` status document
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AsyncOperationBody {
    pub status: String,
    #[serde(default)]
    pub error: Option<crate::models::ErrorDetail>,
}

impl AsyncOperationBody {
    pub(crate) fn into_status(self) -> OperationStatus {
        match self.status.as_str() {
            "Succeeded" => OperationStatus::Succeeded,
            "Failed" | "Canceled" | "Cancelled" => {
                let detail = self
                    .error
                    .map(|e| format!("{}: {}", e.code, e.message))
                    .unwrap_or_else(|| self.status.clone());
                OperationStatus::Failed(detail)
            }
            _ => OperationStatus::InProgress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_prefers_async_operation() {
        let token = PollerToken::from_headers(Some("https://a"), Some("https://l")).unwrap();
        assert_eq!(token.kind, PollKind::AsyncOperation);
        assert_eq!(token.url, "https://a");

        let token = PollerToken::from_headers(None, Some("https://l")).unwrap();
        assert_eq!(token.kind, PollKind::Location);
        assert!(PollerToken::from_headers(None, None).is_none());
    }

    #[test]
    fn test_token_string_roundtrip() {
        let token = PollerToken {
            kind: PollKind::Location,
            url: "https://management.azure.com/op/1".to_string(),
        };
        let s = token.to_token_string().unwrap();
        assert_eq!(PollerToken::from_token_string(&s).unwrap(), token);
        assert!(PollerToken::from_token_string("not json").is_err());
    }

    #[test]
    fn test_async_operation_status() {
        let body: AsyncOperationBody =
            serde_json::from_value(serde_json::json!({"status": "InProgress"})).unwrap();
        assert_eq!(body.into_status(), OperationStatus::InProgress);

        let body: AsyncOperationBody = serde_json::from_value(serde_json::json!({
            "status": "Failed",
            "error": {"code": "QuotaExceeded", "message": "no cores"}
        }))
        .unwrap();
        assert_eq!(
            body.into_status(),
            OperationStatus::Failed("QuotaExceeded: no cores".to_string())
        );
    }
}
