//! HTTP side of the record engine.
//!
//! [`HttpRemote`] talks to the hosted record API and implements
//! [`engine::RemoteStore`]; [`HttpProbe`] drives an
//! [`engine::ConnectivitySignal`] from a health endpoint.

use std::time::Duration;

use reqwest::{Url, header};
use thiserror::Error;

mod client;
mod probe;

pub use client::HttpRemote;
pub use probe::HttpProbe;

/// Errors raised while setting up HTTP collaborators.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base_url: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid api token: {0}")]
    InvalidToken(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Parse `base_url`, making sure relative joins keep its path.
fn parse_base_url(base_url: &str) -> Result<Url, ClientError> {
    let mut normalized = base_url.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized).map_err(|err| ClientError::InvalidBaseUrl(err.to_string()))
}

fn build_http(api_token: Option<&str>, timeout: Duration) -> Result<reqwest::Client, ClientError> {
    let mut headers = header::HeaderMap::new();
    if let Some(token) = api_token.filter(|t| !t.is_empty()) {
        let mut auth = header::HeaderValue::try_from(format!("Bearer {token}"))
            .map_err(|err| ClientError::InvalidToken(err.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
    }

    Ok(reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()?)
}
