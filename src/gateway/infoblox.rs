// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP client for the Infoblox WAPI.
//!
//! Records are addressed by object type (`record:cname`, `record:a`) with a
//! `name` filter. Deletion looks up the records' `_ref`s and deletes each one,
//! since WAPI deletes by reference only.
//!
//! WAPI reports failures as text such as `AdmConDataError: None
//! (IBDataConflictError: IB.Data.Conflict:The record 'x' already exists.)`.
//! Conflict and not-found markers are mapped to typed [`GatewayError`] variants.

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use super::http::{build_api_url, decode, send_request, BasicAuth, HttpResponse};
use super::{ARecord, CnameRecord, DnsGateway};
use crate::constants::{
    DNS_RECORD_EXISTS_TEXT, DNS_RECORD_NOT_FOUND_TEXT, INFOBLOX_CONFLICT_ERROR,
    INFOBLOX_NOT_FOUND_ERROR,
};
use crate::errors::GatewayError;

const CNAME_OBJECT: &str = "record:cname";
const A_OBJECT: &str = "record:a";
const CNAME_FIELDS: &str = "name,canonical";
const A_FIELDS: &str = "name,ipv4addr";

#[derive(Debug, Serialize)]
struct NewCname<'a> {
    name: &'a str,
    canonical: &'a str,
}

#[derive(Debug, Serialize)]
struct NewA<'a> {
    name: &'a str,
    ipv4addr: &'a str,
}

#[derive(Debug, Deserialize)]
struct WapiRef {
    #[serde(rename = "_ref")]
    reference: String,
}

/// Classify a non-success WAPI response by its error text.
fn classify(operation: &str, resource: &str, name: &str, response: &HttpResponse) -> GatewayError {
    let text = response.body.as_str();
    let lower = text.to_lowercase();

    if text.contains(INFOBLOX_CONFLICT_ERROR) || lower.contains(DNS_RECORD_EXISTS_TEXT) {
        return GatewayError::already_exists(resource, name);
    }
    if text.contains(INFOBLOX_NOT_FOUND_ERROR)
        || lower.contains(DNS_RECORD_NOT_FOUND_TEXT)
        || response.status == StatusCode::NOT_FOUND
    {
        return GatewayError::not_found(resource, name);
    }
    if response.status == StatusCode::CONFLICT {
        return GatewayError::Conflict {
            resource: resource.to_string(),
            name: name.to_string(),
            reason: text.to_string(),
        };
    }
    if response.status.is_server_error() || response.status == StatusCode::TOO_MANY_REQUESTS {
        return GatewayError::transport(operation, format!("HTTP {}: {text}", response.status));
    }
    GatewayError::rejected(operation, format!("HTTP {}: {text}", response.status))
}

/// [`DnsGateway`] backed by the Infoblox WAPI.
#[derive(Debug, Clone)]
pub struct InfobloxClient {
    client: HttpClient,
    wapi_base: String,
    auth: BasicAuth,
}

impl InfobloxClient {
    /// Create a client for the grid master at `host`, using WAPI `wapi_version`.
    pub fn new(client: HttpClient, host: &str, wapi_version: &str, auth: BasicAuth) -> Self {
        Self {
            client,
            wapi_base: format!("{}/wapi/{wapi_version}", build_api_url(host)),
            auth,
        }
    }

    fn object_url(
        &self,
        object: &str,
        name: Option<&str>,
        fields: &str,
    ) -> Result<String, GatewayError> {
        let mut url = Url::parse(&format!("{}/{object}", self.wapi_base))
            .map_err(|e| GatewayError::transport("buildUrl", format!("{}: {e}", self.wapi_base)))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(name) = name {
                query.append_pair("name", name);
            }
            query.append_pair("_return_fields", fields);
        }
        Ok(url.to_string())
    }

    async fn lookup<T: serde::de::DeserializeOwned>(
        &self,
        object: &str,
        name: &str,
        fields: &str,
        operation: &str,
    ) -> Result<Vec<T>, GatewayError> {
        let url = self.object_url(object, Some(name), fields)?;
        let response =
            send_request::<()>(&self.client, &self.auth, Method::GET, &url, None, operation)
                .await?;
        if response.status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status.is_success() {
            return Err(classify(operation, object, name, &response));
        }
        decode(&response, operation)
    }

    async fn create<B: Serialize + std::fmt::Debug, T: serde::de::DeserializeOwned>(
        &self,
        object: &str,
        name: &str,
        fields: &str,
        body: &B,
        operation: &str,
    ) -> Result<T, GatewayError> {
        let url = self.object_url(object, None, fields)?;
        let response =
            send_request(&self.client, &self.auth, Method::POST, &url, Some(body), operation)
                .await?;
        if !response.status.is_success() {
            return Err(classify(operation, object, name, &response));
        }
        decode(&response, operation)
    }

    async fn delete_all(&self, object: &str, name: &str, operation: &str) -> Result<(), GatewayError> {
        let refs: Vec<WapiRef> = self.lookup(object, name, "name", operation).await?;
        if refs.is_empty() {
            return Err(GatewayError::not_found(object, name));
        }
        for WapiRef { reference } in refs {
            let url = format!("{}/{reference}", self.wapi_base);
            let response =
                send_request::<()>(&self.client, &self.auth, Method::DELETE, &url, None, operation)
                    .await?;
            if !response.status.is_success() {
                return Err(classify(operation, object, name, &response));
            }
            debug!(reference = %reference, "Deleted WAPI object");
        }
        Ok(())
    }
}

#[async_trait]
impl DnsGateway for InfobloxClient {
    async fn get_cname(&self, name: &str) -> Result<Vec<CnameRecord>, GatewayError> {
        self.lookup(CNAME_OBJECT, name, CNAME_FIELDS, "getCNAME").await
    }

    async fn create_cname(&self, name: &str, canonical: &str) -> Result<CnameRecord, GatewayError> {
        let record: CnameRecord = self
            .create(
                CNAME_OBJECT,
                name,
                CNAME_FIELDS,
                &NewCname { name, canonical },
                "createCNAME",
            )
            .await?;
        info!(alias = name, canonical = canonical, "CNAME created");
        Ok(record)
    }

    async fn delete_cname(&self, name: &str) -> Result<(), GatewayError> {
        self.delete_all(CNAME_OBJECT, name, "deleteCNAME").await
    }

    async fn get_a(&self, name: &str) -> Result<Vec<ARecord>, GatewayError> {
        self.lookup(A_OBJECT, name, A_FIELDS, "getA").await
    }

    async fn create_a(&self, name: &str, ipv4addr: &str) -> Result<ARecord, GatewayError> {
        let record: ARecord = self
            .create(A_OBJECT, name, A_FIELDS, &NewA { name, ipv4addr }, "createA")
            .await?;
        info!(name = name, ipv4addr = ipv4addr, "A record created");
        Ok(record)
    }

    async fn delete_a(&self, name: &str) -> Result<(), GatewayError> {
        self.delete_all(A_OBJECT, name, "deleteA").await
    }
}

#[cfg(test)]
#[path = "infoblox_tests.rs"]
mod infoblox_tests;
