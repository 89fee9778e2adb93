// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared HTTP plumbing for the gateway clients.
//!
//! Requests are sent once; the create-or-get retry policy lives in the
//! traffic reconciler. Non-success responses are returned to the caller with
//! their body so each client can classify its own error format.

use anyhow::{Context, Result};
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};

use crate::errors::GatewayError;

/// Basic-auth credentials for a gateway.
#[derive(Clone)]
pub struct BasicAuth {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Status and body of a completed HTTP exchange.
#[derive(Debug)]
pub(crate) struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Build the API base URL from a server address
///
/// Converts "dns.example.com:443" to `<https://dns.example.com:443>` and
/// strips trailing slashes from URLs that already carry a scheme.
pub(crate) fn build_api_url(server: &str) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        server.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", server.trim_end_matches('/'))
    }
}

/// Build the shared HTTP client for a gateway.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn build_client(timeout: Duration, accept_invalid_certs: bool) -> Result<HttpClient> {
    HttpClient::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .context("Failed to build HTTP client")
}

/// Execute one HTTP request against a gateway.
///
/// Connection failures and unreadable bodies become [`GatewayError::Transport`].
/// Any HTTP status, success or not, is returned to the caller.
pub(crate) async fn send_request<T: Serialize + std::fmt::Debug>(
    client: &HttpClient,
    auth: &BasicAuth,
    method: Method,
    url: &str,
    body: Option<&T>,
    operation: &str,
) -> Result<HttpResponse, GatewayError> {
    debug!(
        method = %method,
        url = %url,
        body = ?body,
        operation = operation,
        "HTTP gateway request"
    );

    let mut request = client
        .request(method.clone(), url)
        .basic_auth(&auth.user, Some(&auth.password));
    if let Some(body_data) = body {
        request = request.json(body_data);
    }

    let response = request.send().await.map_err(|e| {
        error!(method = %method, url = %url, error = %e, "Failed to send HTTP request");
        GatewayError::transport(operation, format!("Failed to send HTTP request to {url}: {e}"))
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        GatewayError::transport(operation, format!("Failed to read response body: {e}"))
    })?;

    if status.is_success() {
        debug!(
            method = %method,
            url = %url,
            status = %status,
            response_len = body.len(),
            "HTTP gateway request successful"
        );
    } else {
        debug!(
            method = %method,
            url = %url,
            status = %status,
            error = %body,
            "HTTP gateway request returned an error status"
        );
    }

    Ok(HttpResponse { status, body })
}

/// Decode a JSON response body.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    response: &HttpResponse,
    operation: &str,
) -> Result<T, GatewayError> {
    serde_json::from_str(&response.body).map_err(|e| {
        GatewayError::transport(operation, format!("Failed to parse API response: {e}"))
    })
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod http_tests;
