// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP client for the MTD v2 traffic-distribution API.
//!
//! Endpoints:
//! - `POST /api/v2/groups/{group}/mtd-bases` - create a base
//! - `GET /api/v2/mtd-bases/{hostname}` - read a base
//! - `POST /api/v2/mtd-bases/{base}/mtd-hosts` - create a host
//! - `PUT|GET|DELETE /api/v2/mtd-bases/{base}/mtd-hosts/{host}` - update, read, delete a host
//! - `GET /api/v2/data-centers` - data centers and their clouds
//!
//! Error bodies carry `{"errors": [{"error_code": ...}]}`. Known codes are
//! mapped to [`GatewayError::AlreadyExists`] and [`GatewayError::NotFound`].

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use super::http::{build_api_url, decode, send_request, BasicAuth, HttpResponse};
use super::{DcCloud, HostResult, HostSpec, MtdBase, TrafficGateway};
use crate::constants::{
    MTD_BASE_EXISTS_ERROR, MTD_BASE_NOT_FOUND_ERROR, MTD_ERROR_SEPARATOR, MTD_HOST_EXISTS_ERROR,
    MTD_HOST_NOT_FOUND_ERROR, MTD_UNKNOWN_ERROR,
};
use crate::errors::GatewayError;

#[derive(Debug, Serialize)]
struct CreateBaseRequest<'a> {
    mtd_base: BaseRequest<'a>,
}

#[derive(Debug, Serialize)]
struct BaseRequest<'a> {
    mtd_base_name: &'a str,
    #[serde(rename = "type")]
    base_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct BaseResponse {
    mtd_base: Option<MtdBase>,
}

#[derive(Debug, Serialize)]
struct HostRequest<'a> {
    mtd_host: &'a HostSpec,
}

#[derive(Debug, Deserialize)]
struct DataCentersResponse {
    #[serde(default)]
    data_centers: Vec<DataCenter>,
}

#[derive(Debug, Deserialize)]
struct DataCenter {
    #[serde(default)]
    clouds: Vec<DcCloud>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<ResponseError>,
}

#[derive(Debug, Deserialize)]
struct ResponseError {
    error_code: String,
}

/// Error codes from an MTD error body, empty when the body has none.
fn error_codes(body: &str) -> Vec<String> {
    serde_json::from_str::<ErrorResponse>(body)
        .unwrap_or_default()
        .errors
        .into_iter()
        .map(|e| e.error_code)
        .collect()
}

/// Classify a non-success MTD response.
fn classify(operation: &str, resource: &str, name: &str, response: &HttpResponse) -> GatewayError {
    let codes = error_codes(&response.body);
    let has = |code: &str| codes.iter().any(|c| c == code);

    if has(MTD_BASE_EXISTS_ERROR) || has(MTD_HOST_EXISTS_ERROR) {
        return GatewayError::already_exists(resource, name);
    }
    if has(MTD_HOST_NOT_FOUND_ERROR)
        || has(MTD_BASE_NOT_FOUND_ERROR)
        || (codes.is_empty() && response.status == StatusCode::NOT_FOUND)
    {
        return GatewayError::not_found(resource, name);
    }
    if codes.is_empty()
        && (response.status.is_server_error() || response.status == StatusCode::TOO_MANY_REQUESTS)
    {
        return GatewayError::transport(
            operation,
            format!("HTTP {}: {}", response.status, response.body),
        );
    }
    if codes.is_empty() {
        return GatewayError::rejected(operation, MTD_UNKNOWN_ERROR);
    }
    GatewayError::rejected(operation, codes.join(MTD_ERROR_SEPARATOR))
}

/// [`TrafficGateway`] backed by the MTD v2 HTTP API.
#[derive(Debug, Clone)]
pub struct TorbitClient {
    client: HttpClient,
    base_url: String,
    auth: BasicAuth,
    group_id: u64,
}

impl TorbitClient {
    /// Create a client for the MTD API at `url`, creating bases under `group_id`.
    pub fn new(client: HttpClient, url: &str, auth: BasicAuth, group_id: u64) -> Self {
        Self {
            client,
            base_url: build_api_url(url),
            auth,
            group_id,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<String, GatewayError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| GatewayError::transport("buildUrl", format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| GatewayError::transport("buildUrl", "URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.to_string())
    }

    async fn host_call(
        &self,
        method: Method,
        base_id: u64,
        host_name: Option<&str>,
        spec: Option<&HostSpec>,
        operation: &str,
    ) -> Result<HttpResponse, GatewayError> {
        let base = base_id.to_string();
        let mut segments = vec!["api", "v2", "mtd-bases", base.as_str(), "mtd-hosts"];
        if let Some(host) = host_name {
            segments.push(host);
        }
        let url = self.endpoint(&segments)?;
        let body = spec.map(|mtd_host| HostRequest { mtd_host });
        send_request(&self.client, &self.auth, method, &url, body.as_ref(), operation).await
    }
}

#[async_trait]
impl TrafficGateway for TorbitClient {
    async fn create_base(&self, hostname: &str, base_type: &str) -> Result<MtdBase, GatewayError> {
        let operation = "createMtdBase";
        let group = self.group_id.to_string();
        let url = self.endpoint(&["api", "v2", "groups", group.as_str(), "mtd-bases"])?;
        let body = CreateBaseRequest {
            mtd_base: BaseRequest {
                mtd_base_name: hostname,
                base_type,
            },
        };
        let response =
            send_request(&self.client, &self.auth, Method::POST, &url, Some(&body), operation)
                .await?;
        if !response.status.is_success() {
            return Err(classify(operation, "MtdBase", hostname, &response));
        }
        info!(hostname = hostname, "MtdBase created");
        decode::<BaseResponse>(&response, operation)?
            .mtd_base
            .ok_or_else(|| GatewayError::rejected(operation, MTD_UNKNOWN_ERROR))
    }

    async fn get_base(&self, hostname: &str) -> Result<MtdBase, GatewayError> {
        let operation = "getMtdBase";
        let url = self.endpoint(&["api", "v2", "mtd-bases", hostname])?;
        let response =
            send_request::<()>(&self.client, &self.auth, Method::GET, &url, None, operation)
                .await?;
        if !response.status.is_success() {
            return Err(classify(operation, "MtdBase", hostname, &response));
        }
        decode::<BaseResponse>(&response, operation)?
            .mtd_base
            .ok_or_else(|| GatewayError::not_found("MtdBase", hostname))
    }

    async fn create_host(&self, base_id: u64, spec: &HostSpec) -> Result<HostResult, GatewayError> {
        let operation = "createMtdHost";
        let response = self
            .host_call(Method::POST, base_id, None, Some(spec), operation)
            .await?;
        if !response.status.is_success() {
            return Err(classify(operation, "MtdHost", &spec.mtd_host_name, &response));
        }
        decode(&response, operation)
    }

    async fn update_host(
        &self,
        base_id: u64,
        host_name: &str,
        spec: &HostSpec,
    ) -> Result<HostResult, GatewayError> {
        let operation = "updateMtdHost";
        let response = self
            .host_call(Method::PUT, base_id, Some(host_name), Some(spec), operation)
            .await?;
        if !response.status.is_success() {
            return Err(classify(operation, "MtdHost", host_name, &response));
        }
        decode(&response, operation)
    }

    async fn get_host(&self, base_id: u64, host_name: &str) -> Result<HostResult, GatewayError> {
        let operation = "getMtdHost";
        let response = self
            .host_call(Method::GET, base_id, Some(host_name), None, operation)
            .await?;
        if !response.status.is_success() {
            return Err(classify(operation, "MtdHost", host_name, &response));
        }
        decode(&response, operation)
    }

    async fn delete_host(&self, base_id: u64, host_name: &str) -> Result<(), GatewayError> {
        let operation = "deleteMtdHost";
        let response = self
            .host_call(Method::DELETE, base_id, Some(host_name), None, operation)
            .await?;
        if !response.status.is_success() {
            return Err(classify(operation, "MtdHost", host_name, &response));
        }
        Ok(())
    }

    async fn get_topology(&self) -> Result<Vec<DcCloud>, GatewayError> {
        let operation = "getDataCenters";
        let url = self.endpoint(&["api", "v2", "data-centers"])?;
        let response =
            send_request::<()>(&self.client, &self.auth, Method::GET, &url, None, operation)
                .await?;
        if !response.status.is_success() {
            return Err(classify(operation, "DataCenters", "all", &response));
        }
        let clouds: Vec<DcCloud> = decode::<DataCentersResponse>(&response, operation)?
            .data_centers
            .into_iter()
            .flat_map(|dc| dc.clouds)
            .collect();
        debug!(count = clouds.len(), "Loaded data center topology");
        Ok(clouds)
    }
}

#[cfg(test)]
#[path = "torbit_tests.rs"]
mod torbit_tests;
