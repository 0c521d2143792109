//! HTTP plumbing shared by the provider adapters.

use crate::agent::{AgentError, ProviderKind};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

/// Default per-request timeout for hosted providers.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Error bodies longer than this are cut before they reach the conversation.
const MAX_ERROR_BODY: usize = 500;

/// Builds a client with the given request timeout.
pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|err| {
            warn!(
                target: "agent_duet::http",
                error = %err,
                "Falling back to a default HTTP client"
            );
            Client::new()
        })
}

/// Maps a transport failure, stripping the URL so query-string keys never leak.
pub(crate) fn request_error(provider: ProviderKind, err: reqwest::Error) -> AgentError {
    let is_timeout = err.is_timeout();
    AgentError::Request {
        provider,
        message: err.without_url().to_string(),
        is_timeout,
    }
}

/// Reads the body and decodes it as `T`, mapping non-2xx statuses to
/// [`AgentError::Http`].
pub(crate) async fn parse_response<T: DeserializeOwned>(
    provider: ProviderKind,
    response: Response,
) -> Result<T, AgentError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| request_error(provider, err))?;

    if !status.is_success() {
        return Err(map_http_error(provider, status, &body));
    }

    serde_json::from_str(&body).map_err(|source| AgentError::Parse { provider, source })
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    /// `{"error": "model not found"}`
    Plain(String),
    /// OpenAI, Anthropic, Grok, Gemini: `{"error": {"message": ..., "status": ...}}`
    Structured {
        message: Option<String>,
        status: Option<String>,
    },
}

pub(crate) fn map_http_error(provider: ProviderKind, status: StatusCode, body: &str) -> AgentError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: ErrorDetail::Plain(message),
        }) => message,
        Ok(ErrorEnvelope {
            error: ErrorDetail::Structured { message, status },
        }) => {
            let message = message.unwrap_or_else(|| truncate_body(body));
            match status {
                Some(status) if !status.is_empty() => format!("{status}: {message}"),
                _ => message,
            }
        }
        Err(_) => truncate_body(body),
    };

    AgentError::Http {
        provider,
        status: status.as_u16(),
        message,
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, total {} bytes)", &body[..end], body.len())
}
