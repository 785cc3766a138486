//! HTTP and OpenAI client construction.

use crate::error::{PodgenError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for outbound API requests (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Build a reqwest client with the given request timeout.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("podgen/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(PodgenError::Http)
}

/// Build a reqwest client with the default timeout.
pub fn default_http_client() -> Result<reqwest::Client> {
    http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with the default timeout.
///
/// The API key is read from `OPENAI_API_KEY` by `async-openai` when the first
/// request is made.
pub fn create_client() -> Result<Client<OpenAIConfig>> {
    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(default_http_client()?))
}

/// Read a required API key from the environment.
pub fn require_api_key(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(PodgenError::MissingApiKey(var.to_string())),
    }
}
