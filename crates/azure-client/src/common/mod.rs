//! Common utilities for the Azure REST client
//!
//! [`RestClient`] wraps a `reqwest::Client` with bearer-token authentication,
//! ARM error parsing and long-running-operation header capture. One instance
//! talks to ARM and another to Microsoft Graph; both speak the same error
//! envelope.

use crate::error::AzureError;
use crate::lro::{AsyncOperationBody, OperationStatus, PollKind, PollerToken};
use crate::metrics::record_request;
use crate::models::ErrorResponse;
use azure_core::credentials::TokenCredential;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Response of a mutating call that may continue asynchronously
#[derive(Debug)]
pub struct Accepted<T> {
    /// Body, if the service returned one
    pub body: Option<T>,
    /// Polling handle, if the operation is still running
    pub poller: Option<PollerToken>,
}

/// HTTP client wrapper with token authentication
pub struct RestClient {
    client: Client,
    base_url: String,
    scope: String,
    credential: Arc<dyn TokenCredential>,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Create a client for `base_url`, requesting tokens for `<base_url>/.default`
    pub fn new(client: Client, base_url: &str, credential: Arc<dyn TokenCredential>) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            client,
            scope: format!("{base_url}/.default"),
            base_url,
            credential,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    async fn bearer(&self) -> Result<String, AzureError> {
        let token = self
            .credential
            .get_token(&[self.scope.as_str()], None)
            .await
            .map_err(|e| AzureError::Authentication(format!("failed to acquire token: {e}")))?;
        Ok(format!("Bearer {}", token.token.secret()))
    }

    /// Send a request and turn error statuses into [`AzureError`]
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        headers: &[(&str, &str)],
    ) -> Result<Response, AzureError> {
        let url = self.build_url(path);
        debug!("{} {}", method, url);
        record_request(method.as_str());

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Authorization", self.bearer().await?)
            .header("Accept", "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(parse_error(status, &text, &method, path))
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AzureError> {
        let response = self.send(Method::GET, path, None, &[]).await?;
        decode(response).await
    }

    /// Make a PUT request and decode the body
    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AzureError> {
        let body = serde_json::to_value(body)?;
        let response = self.send(Method::PUT, path, Some(&body), &[]).await?;
        decode(response).await
    }

    /// Make a PUT request that may be accepted asynchronously
    pub async fn begin_put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        headers: &[(&str, &str)],
    ) -> Result<Accepted<T>, AzureError> {
        let body = serde_json::to_value(body)?;
        let response = self.send(Method::PUT, path, Some(&body), headers).await?;
        accepted(response).await
    }

    /// Make a PATCH request that may be accepted asynchronously
    pub async fn begin_patch<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Accepted<T>, AzureError> {
        let body = serde_json::to_value(body)?;
        let response = self.send(Method::PATCH, path, Some(&body), &[]).await?;
        accepted(response).await
    }

    /// Make a PATCH request and decode the body
    pub async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AzureError> {
        let body = serde_json::to_value(body)?;
        let response = self.send(Method::PATCH, path, Some(&body), &[]).await?;
        decode(response).await
    }

    /// Make a POST request
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, AzureError> {
        let body = body.map(serde_json::to_value).transpose()?;
        let response = self.send(Method::POST, path, body.as_ref(), &[]).await?;
        decode(response).await
    }

    /// Make a DELETE request; returns a poller when the deletion continues asynchronously
    pub async fn delete(&self, path: &str) -> Result<Option<PollerToken>, AzureError> {
        let response = self.send(Method::DELETE, path, None, &[]).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(poller_from(&response))
    }

    /// Check the state of a long-running operation
    pub async fn poll(&self, token: &PollerToken) -> Result<OperationStatus, AzureError> {
        match token.kind {
            PollKind::AsyncOperation => {
                let body: AsyncOperationBody = self.get(&token.url).await?;
                Ok(body.into_status())
            }
            PollKind::Location => {
                match self.send(Method::GET, &token.url, None, &[]).await {
                    Ok(response) if response.status() == StatusCode::ACCEPTED => {
                        Ok(OperationStatus::InProgress)
                    }
                    Ok(_) => Ok(OperationStatus::Succeeded),
                    // The Location of a delete 404s once the resource is gone
                    Err(e) if e.is_not_found() => Ok(OperationStatus::Succeeded),
                    // Keep the token and poll again later
                    Err(e) if e.is_transient() => Err(e),
                    Err(AzureError::Api { code, message, .. }) => {
                        Ok(OperationStatus::Failed(format!("{code}: {message}")))
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }
}

fn parse_error(status: StatusCode, text: &str, method: &Method, path: &str) -> AzureError {
    let detail = serde_json::from_str::<ErrorResponse>(text)
        .ok()
        .and_then(|r| r.error);
    match detail {
        Some(detail) => AzureError::from_response(status.as_u16(), &detail.code, &detail.message),
        None => AzureError::from_response(
            status.as_u16(),
            "",
            &format!("{method} {path} failed: {status} - {text}"),
        ),
    }
}

fn poller_from(response: &Response) -> Option<PollerToken> {
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
    };
    PollerToken::from_headers(header("azure-asyncoperation"), header("location"))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, AzureError> {
    let text = response.text().await?;
    let body = if text.trim().is_empty() { "null" } else { text.as_str() };
    serde_json::from_str(body).map_err(|e| {
        AzureError::InvalidRequest(format!(
            "error decoding response body: {} - Response (first 500 chars): {}",
            e,
            text.chars().take(500).collect::<String>()
        ))
    })
}

async fn accepted<T: DeserializeOwned>(response: Response) -> Result<Accepted<T>, AzureError> {
    let poller = poller_from(&response);
    let text = response.text().await?;
    let body = if text.trim().is_empty() {
        None
    } else {
        Some(serde_json::from_str(&text)?)
    };
    Ok(Accepted { body, poller })
}

/// Append `api-version` to an ARM path
pub fn with_api_version(path: &str, api_version: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}api-version={api_version}")
}

#[cfg(test)]
mod common_test;
