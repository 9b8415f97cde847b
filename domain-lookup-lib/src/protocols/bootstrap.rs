//! IANA RDAP bootstrap registry.
//!
//! Maps a TLD to the RDAP base URLs that serve it, using the bootstrap
//! document published by IANA or a copy supplied by the caller.

use crate::error::DomainLookupError;
use crate::utils::race_deadline;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Where IANA publishes the DNS bootstrap document.
pub const DEFAULT_BOOTSTRAP_URL: &str = "https://data.iana.org/rdap/dns.json";

/// Parsed bootstrap document.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BootstrapData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub services: Vec<BootstrapService>,
}

/// One `[tlds, base_urls]` entry: these TLDs are served by any of these URLs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BootstrapService {
    pub tlds: Vec<String>,
    pub base_urls: Vec<String>,
}

impl BootstrapData {
    /// Validate and convert a raw bootstrap document.
    ///
    /// The caller asked to skip the network by supplying this document, so a
    /// malformed shape is reported instead of silently matching nothing.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, DomainLookupError> {
        let object = value
            .as_object()
            .ok_or_else(|| DomainLookupError::config("Bootstrap document must be a JSON object"))?;

        let services = object
            .get("services")
            .and_then(|s| s.as_array())
            .ok_or_else(|| {
                DomainLookupError::config(
                    "Invalid bootstrap document: missing or invalid 'services' array",
                )
            })?;

        let mut parsed = Vec::with_capacity(services.len());
        for (idx, service) in services.iter().enumerate() {
            let pair = service.as_array().filter(|p| p.len() >= 2).ok_or_else(|| {
                DomainLookupError::config(format!(
                    "Invalid bootstrap document: services[{}] is not a [tlds, urls] pair",
                    idx
                ))
            })?;

            let tlds = string_list(&pair[0]).ok_or_else(|| {
                DomainLookupError::config(format!(
                    "Invalid bootstrap document: services[{}][0] must be an array of strings",
                    idx
                ))
            })?;
            let base_urls = string_list(&pair[1]).ok_or_else(|| {
                DomainLookupError::config(format!(
                    "Invalid bootstrap document: services[{}][1] must be an array of strings",
                    idx
                ))
            })?;

            parsed.push(BootstrapService { tlds, base_urls });
        }

        let text_field = |key: &str| {
            object
                .get(key)
                .and_then(|v| v.as_str())
                .map(String::from)
        };

        Ok(Self {
            version: text_field("version"),
            publication: text_field("publication"),
            description: text_field("description"),
            services: parsed,
        })
    }

    /// Base URLs serving `tld`, normalized to end with `/` and deduplicated
    /// in document order.
    pub fn base_urls_for(&self, tld: &str) -> Vec<String> {
        let wanted = tld.trim().trim_start_matches('.').to_lowercase();
        let mut urls: Vec<String> = Vec::new();

        for service in &self.services {
            if !service.tlds.iter().any(|t| t.eq_ignore_ascii_case(&wanted)) {
                continue;
            }
            for url in &service.base_urls {
                let normalized = normalize_base_url(url);
                if !normalized.is_empty() && !urls.contains(&normalized) {
                    urls.push(normalized);
                }
            }
        }

        urls
    }
}

fn string_list(value: &serde_json::Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(String::from))
        .collect()
}

/// Ensure a base URL ends with a single trailing slash.
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    format!("{}/", trimmed.trim_end_matches('/'))
}

/// Where the resolver gets its bootstrap document from.
#[derive(Debug, Clone, Copy)]
pub enum BootstrapSource<'a> {
    /// Caller-supplied document; validated, never fetched
    Preloaded(&'a serde_json::Value),

    /// Fetch from this URL
    Remote(&'a str),
}

/// Resolves TLDs to RDAP base URLs.
#[derive(Clone)]
pub struct BootstrapResolver {
    http_client: reqwest::Client,
}

impl BootstrapResolver {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Load the bootstrap document from `source`.
    ///
    /// Returns `Ok(None)` when a remote document could not be fetched or
    /// parsed; that only means RDAP is unavailable for this lookup.
    pub async fn load(
        &self,
        source: BootstrapSource<'_>,
        timeout: Duration,
        signal: Option<&CancellationToken>,
    ) -> Result<Option<BootstrapData>, DomainLookupError> {
        match source {
            BootstrapSource::Preloaded(value) => BootstrapData::from_value(value).map(Some),
            BootstrapSource::Remote(url) => {
                match race_deadline(
                    "bootstrap fetch",
                    timeout,
                    signal,
                    self.fetch_document(url),
                )
                .await
                {
                    Ok(data) => Ok(Some(data)),
                    Err(e @ DomainLookupError::Cancelled { .. }) => Err(e),
                    Err(e) => {
                        tracing::debug!(url = %url, error = %e, "Bootstrap document unavailable");
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Resolve base URLs for one TLD from `source`.
    pub async fn resolve(
        &self,
        tld: &str,
        source: BootstrapSource<'_>,
        timeout: Duration,
        signal: Option<&CancellationToken>,
    ) -> Result<Vec<String>, DomainLookupError> {
        Ok(self
            .load(source, timeout, signal)
            .await?
            .map(|data| data.base_urls_for(tld))
            .unwrap_or_default())
    }

    async fn fetch_document(&self, url: &str) -> Result<BootstrapData, DomainLookupError> {
        let response = self.http_client.get(url).send().await.map_err(|e| {
            DomainLookupError::bootstrap(format!("Failed to fetch bootstrap registry: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(DomainLookupError::bootstrap(format!(
                "Bootstrap registry returned HTTP {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            DomainLookupError::bootstrap(format!("Failed to parse bootstrap JSON: {}", e))
        })?;

        // A remote document with the wrong shape is an upstream problem, not
        // a caller mistake.
        BootstrapData::from_value(&json)
            .map_err(|e| DomainLookupError::bootstrap(format!("Unusable bootstrap document: {}", e)))
    }
}
