//! Consul client service
//!
//! Talks to the Consul HTTP API v1 for catalog, health and KV data.
//! Supports ACL tokens, an explicit datacenter and a custom CA bundle.

use std::error::Error as StdError;
use std::fs;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Certificate, Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, error, info, warn};

use crate::config::ConsulConfig;
use crate::models::{CatalogNode, HealthCheck, ServiceInstance};
use crate::services::backend::{CatalogClient, HealthClient, KvClient};
use crate::utils::error::{AppError, AppResult};

/// Header carrying the ACL token
const TOKEN_HEADER: &str = "X-Consul-Token";

/// Consul HTTP API client
#[derive(Clone)]
pub struct ConsulClient {
    client: Client,
    base_url: String,
    datacenter: Option<String>,
    token: Option<String>,
}

/// Body of `/v1/catalog/node/<name>`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CatalogNodeEnvelope {
    node: Option<CatalogNode>,
}

/// One entry of `/v1/kv/<key>`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KvPair {
    /// Base64 encoded; `null` for keys holding no data
    value: Option<String>,
}

impl ConsulClient {
    /// Create a new Consul client with optional TLS configuration
    pub fn new(config: &ConsulConfig) -> anyhow::Result<Self> {
        info!("Initializing Consul client for {}", config.url);

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .use_rustls_tls();

        if let Some(ref ca_path) = config.ssl_ca {
            let ca_cert = fs::read(ca_path)
                .with_context(|| format!("Failed to read Consul CA certificate: {:?}", ca_path))?;

            // The CA file may hold a whole chain
            let certs = Certificate::from_pem_bundle(&ca_cert)
                .context("Failed to parse Consul CA certificate(s) as PEM")?;

            info!("Consul TLS: parsed {} certificate(s) from CA bundle", certs.len());

            builder = builder.tls_certs_only(certs);
        }

        if !config.ssl_verify {
            warn!("Consul TLS certificate verification is DISABLED - this is insecure!");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            datacenter: config.datacenter.clone().filter(|dc| !dc.is_empty()),
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an API URL, appending the configured datacenter when `scoped`
    fn url(&self, path: &str, params: &[(&str, &str)], scoped: bool) -> String {
        let mut query: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect();
        if scoped {
            if let Some(ref dc) = self.datacenter {
                query.push(format!("dc={}", urlencoding::encode(dc)));
            }
        }

        if query.is_empty() {
            format!("{}/v1/{}", self.base_url, path)
        } else {
            format!("{}/v1/{}?{}", self.base_url, path, query.join("&"))
        }
    }

    fn request(&self, url: &str) -> RequestBuilder {
        let builder = self.client.get(url);
        match self.token {
            Some(ref token) => builder.header(TOKEN_HEADER, token),
            None => builder,
        }
    }

    /// Internal GET request handler.
    ///
    /// Returns `Ok(None)` on 404 so callers can map absence to their own meaning.
    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> AppResult<Option<T>> {
        debug!("Consul: Sending GET request to {}", url);
        let response = self.request(url).send().await.map_err(|e| {
            error!("Consul ERROR: HTTP request failed to {}: {}", url, e);
            if e.is_connect() {
                error!("Consul ERROR: Connection failed. Check the Consul address and that the agent is running");
            }
            if e.is_timeout() {
                error!("Consul ERROR: Request timed out. Consider increasing consul.timeout_secs");
            }
            if let Some(source) = e.source() {
                error!("Consul ERROR: Underlying cause: {}", source);
            }
            AppError::from(e)
        })?;

        self.handle_response(url, response).await
    }

    /// Handle HTTP response and parse JSON
    async fn handle_response<T: DeserializeOwned>(
        &self,
        url: &str,
        response: reqwest::Response,
    ) -> AppResult<Option<T>> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::BackendUnavailable(format!(
                "{} returned {}: {}",
                url,
                status,
                body.trim()
            )));
        }

        let body = response.text().await.map_err(|e| {
            AppError::BackendUnavailable(format!("failed to read response body: {}", e))
        })?;

        serde_json::from_str::<T>(&body).map(Some).map_err(|e| {
            // Truncate body for logging if too long
            let truncated = if body.len() > 500 {
                format!("{}... (truncated)", body.chars().take(500).collect::<String>())
            } else {
                body.clone()
            };
            AppError::DecodeFailure(format!("{} returned unexpected JSON ({}): {}", url, e, truncated))
        })
    }

    /// GET where a 404 is itself an error
    async fn fetch_required<T: DeserializeOwned>(&self, url: &str) -> AppResult<T> {
        self.fetch(url)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} returned 404", url)))
    }
}

#[async_trait]
impl CatalogClient for ConsulClient {
    async fn datacenters(&self) -> AppResult<Vec<String>> {
        let url = self.url("catalog/datacenters", &[], false);
        self.fetch_required(&url).await
    }

    async fn nodes(&self, filter: &str) -> AppResult<Vec<CatalogNode>> {
        let filter_param = [("filter", filter)];
        let params: &[(&str, &str)] = if filter.is_empty() {
            &[]
        } else {
            &filter_param
        };
        let url = self.url("catalog/nodes", params, true);
        self.fetch_required(&url).await
    }

    async fn node(&self, name: &str) -> AppResult<Option<CatalogNode>> {
        let path = format!("catalog/node/{}", urlencoding::encode(name));
        let url = self.url(&path, &[], true);
        // Consul answers an unknown node with `null` rather than a 404
        let envelope: Option<Option<CatalogNodeEnvelope>> = self.fetch(&url).await?;
        Ok(envelope.flatten().and_then(|e| e.node))
    }

    async fn service_instances(&self, service: &str) -> AppResult<Vec<ServiceInstance>> {
        let path = format!("catalog/service/{}", urlencoding::encode(service));
        let url = self.url(&path, &[], true);
        Ok(self.fetch(&url).await?.unwrap_or_default())
    }
}

#[async_trait]
impl HealthClient for ConsulClient {
    async fn node_checks(&self, node: &str) -> AppResult<Vec<HealthCheck>> {
        let path = format!("health/node/{}", urlencoding::encode(node));
        let url = self.url(&path, &[], true);
        Ok(self.fetch(&url).await?.unwrap_or_default())
    }
}

#[async_trait]
impl KvClient for ConsulClient {
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        // Keys are hierarchical; keep the slashes, encode each segment
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        let path = format!("kv/{}", encoded.join("/"));
        let url = self.url(&path, &[], true);

        let Some(pairs) = self.fetch::<Vec<KvPair>>(&url).await? else {
            return Ok(None);
        };
        let Some(pair) = pairs.into_iter().next() else {
            return Ok(None);
        };

        match pair.value {
            None => Ok(Some(Vec::new())),
            Some(encoded) => base64::engine::general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map(Some)
                .map_err(|e| {
                    AppError::DecodeFailure(format!("KV value at '{}' is not valid base64: {}", key, e))
                }),
        }
    }
}
