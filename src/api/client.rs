// src/api/client.rs
//! HTTP client wrapper for the Atlassian REST APIs.
//!
//! Handles authentication, retries and response capture. Parsing lives in
//! `parser`, endpoint knowledge in `confluence` and `jira`.

use super::parser;
use crate::constants::HTTP_TIMEOUT_SECS;
use crate::error::AppError;
use crate::error_recovery::{retry_with_backoff, RetryPolicy};
use crate::types::{ApiToken, SiteUrl};
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// A reqwest client bound to one Atlassian site and one set of credentials.
#[derive(Clone)]
pub struct AtlassianHttpClient {
    client: Client,
    base: SiteUrl,
    email: String,
    token: ApiToken,
    retry: RetryPolicy,
}

impl AtlassianHttpClient {
    /// Creates a client that authenticates with basic auth (account email
    /// plus API token).
    pub fn new(base: SiteUrl, email: impl Into<String>, token: ApiToken) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers())
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base,
            email: email.into(),
            token,
            retry: RetryPolicy::default(),
        })
    }

    /// Replaces the retry policy used for every request.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base(&self) -> &SiteUrl {
        &self.base
    }

    fn create_headers() -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers
    }

    /// GET `endpoint` with query parameters and decode the JSON body.
    pub async fn get_json<T>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T, AppError>
    where
        T: DeserializeOwned,
    {
        let url = self.base.endpoint(endpoint);
        log::debug!("GET {}", url);
        let result = self.execute(|client| client.get(&url).query(query)).await?;
        parser::parse_api_response(result)
    }

    /// POST a JSON body and decode the JSON response.
    pub async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.base.endpoint(endpoint);
        log::debug!("POST {}", url);
        let result = self.execute(|client| client.post(&url).json(body)).await?;
        parser::parse_api_response(result)
    }

    /// PUT a JSON body and decode the JSON response.
    pub async fn put_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.base.endpoint(endpoint);
        log::debug!("PUT {}", url);
        let result = self.execute(|client| client.put(&url).json(body)).await?;
        parser::parse_api_response(result)
    }

    /// POST a JSON body to an endpoint that answers `204 No Content`.
    pub async fn post_no_content<B>(&self, endpoint: &str, body: &B) -> Result<(), AppError>
    where
        B: Serialize + Sync,
    {
        let url = self.base.endpoint(endpoint);
        log::debug!("POST {}", url);
        let result = self.execute(|client| client.post(&url).json(body)).await?;
        parser::ensure_success(result).map(|_| ())
    }

    /// PUT a JSON body to an endpoint that answers `204 No Content`.
    pub async fn put_no_content<B>(&self, endpoint: &str, body: &B) -> Result<(), AppError>
    where
        B: Serialize + Sync,
    {
        let url = self.base.endpoint(endpoint);
        log::debug!("PUT {}", url);
        let result = self.execute(|client| client.put(&url).json(body)).await?;
        parser::ensure_success(result).map(|_| ())
    }

    /// Sends the request built by `build`, retrying transient failures.
    ///
    /// Non-success statuses come back as `RemoteService` errors so the retry
    /// loop can tell rate limits and 5xx apart from permanent failures.
    async fn execute<F>(&self, build: F) -> Result<ApiResponse<String>, AppError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        retry_with_backoff(
            || {
                let request = build(&self.client).basic_auth(&self.email, Some(self.token.as_str()));
                async move {
                    let response = request.send().await?;
                    let result = extract_response_text(response).await?;
                    parser::ensure_success(result)
                }
            },
            &self.retry,
        )
        .await
    }
}

impl std::fmt::Debug for AtlassianHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlassianHttpClient")
            .field("base", &self.base.as_str())
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Result of an HTTP operation with response metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: reqwest::StatusCode,
    pub url: String,
}

/// Extracts the response body as text with status and URL metadata.
pub async fn extract_response_text(response: Response) -> Result<ApiResponse<String>, AppError> {
    let status = response.status();
    let url = response.url().to_string();
    let text = response.text().await?;

    Ok(ApiResponse {
        data: text,
        status,
        url,
    })
}
