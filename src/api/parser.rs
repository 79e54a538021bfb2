// src/api/parser.rs
//! Response parsing for the Atlassian REST APIs.
//!
//! Successful bodies decode through serde; error bodies are classified into
//! `AtlassianErrorCode` with the most useful message the body offers.

use super::client::ApiResponse;
use crate::constants::ERROR_BODY_PREVIEW_LENGTH;
use crate::error::{AppError, AtlassianErrorCode};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Decodes a response body, or turns a non-success status into an error.
pub fn parse_api_response<T>(result: ApiResponse<String>) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned,
{
    let result = ensure_success(result)?;
    serde_json::from_str(&result.data).map_err(|e| {
        log::error!("Failed to parse response from {}: {}", result.url, e);
        AppError::MalformedResponse(format!(
            "{} from {}: {}",
            e,
            result.url,
            preview(&result.data)
        ))
    })
}

/// Passes successful responses through; maps failures to `RemoteService`.
pub fn ensure_success(result: ApiResponse<String>) -> Result<ApiResponse<String>, AppError> {
    if result.status.is_success() {
        return Ok(result);
    }

    let message = error_message(&result.data).unwrap_or_else(|| {
        if result.data.trim().is_empty() {
            format!("HTTP {}", result.status)
        } else {
            format!("HTTP {}: {}", result.status, preview(&result.data))
        }
    });

    Err(AppError::RemoteService {
        code: AtlassianErrorCode::from_http_status(result.status.as_u16()),
        message,
        status: result.status,
        url: result.url,
    })
}

/// Error body shapes used by Confluence (`message`) and Jira
/// (`errorMessages` plus per-field `errors`).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: BTreeMap<String, String>,
}

fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;

    let mut parts: Vec<String> = Vec::new();
    if let Some(message) = parsed.message.filter(|m| !m.trim().is_empty()) {
        parts.push(message);
    }
    parts.extend(parsed.error_messages);
    parts.extend(
        parsed
            .errors
            .into_iter()
            .map(|(field, message)| format!("{field}: {message}")),
    );

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

/// Truncates a body for log and error output without splitting a character.
fn preview(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_PREVIEW_LENGTH) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
