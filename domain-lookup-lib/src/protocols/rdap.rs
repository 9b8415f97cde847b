//! RDAP (Registration Data Access Protocol) document fetcher.
//!
//! Fetches a single domain document from one RDAP base URL and classifies
//! the answer. Normalization happens elsewhere; this module only speaks HTTP.

use crate::error::DomainLookupError;
use crate::utils::{race_deadline, truncate_excerpt};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Media types sent in the `Accept` header of every RDAP request.
pub const RDAP_ACCEPT: &str = "application/rdap+json, application/json;q=0.9";

/// Longest error body excerpt carried in an [`DomainLookupError::RdapError`].
const BODY_EXCERPT_CHARS: usize = 200;

/// Outcome of a successful RDAP exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum RdapFetch {
    /// The server returned a domain document
    Found(serde_json::Value),

    /// The server answered 404; the domain is not registered
    NotFound,
}

/// Build the domain query URL for a base URL.
pub fn domain_url(base_url: &str, ascii_domain: &str) -> String {
    let base = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{}/", base_url)
    };
    format!("{}domain/{}", base, ascii_domain)
}

/// RDAP client.
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections.
#[derive(Clone)]
pub struct RdapClient {
    http_client: reqwest::Client,
}

impl RdapClient {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Fetch the domain document for `ascii_domain` from `base_url`.
    ///
    /// # Errors
    ///
    /// - `RdapError` for any non-2xx status other than 404
    /// - `ParseError` when a 2xx body is not JSON
    /// - `NetworkError`, `Timeout` or `Cancelled` from the exchange itself
    pub async fn fetch_domain(
        &self,
        base_url: &str,
        ascii_domain: &str,
        timeout: Duration,
        signal: Option<&CancellationToken>,
    ) -> Result<RdapFetch, DomainLookupError> {
        let url = domain_url(base_url, ascii_domain);
        tracing::debug!(url = %url, "Fetching RDAP domain document");
        race_deadline("RDAP fetch", timeout, signal, self.get_document(&url)).await
    }

    /// Fetch an arbitrary RDAP URL, as found in a document's `links`.
    ///
    /// A 404 here is an error like any other status; only the domain query
    /// treats it as an answer.
    pub async fn fetch_json(
        &self,
        url: &str,
        timeout: Duration,
        signal: Option<&CancellationToken>,
    ) -> Result<serde_json::Value, DomainLookupError> {
        match race_deadline("RDAP link fetch", timeout, signal, self.get_document(url)).await? {
            RdapFetch::Found(doc) => Ok(doc),
            RdapFetch::NotFound => Err(DomainLookupError::rdap_with_status(
                url,
                "Linked document not found",
                404,
            )),
        }
    }

    async fn get_document(&self, url: &str) -> Result<RdapFetch, DomainLookupError> {
        let response = self
            .http_client
            .get(url)
            .header(ACCEPT, RDAP_ACCEPT)
            .send()
            .await
            .map_err(|e| {
                DomainLookupError::network_with_source(
                    format!("RDAP request to {} failed", url),
                    e.to_string(),
                )
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(RdapFetch::NotFound);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                format!("RDAP server returned {}", status)
            } else {
                format!(
                    "RDAP server returned {}: {}",
                    status,
                    truncate_excerpt(&body, BODY_EXCERPT_CHARS)
                )
            };
            return Err(DomainLookupError::rdap_with_status(
                url,
                message,
                status.as_u16(),
            ));
        }

        let body = response.text().await.map_err(|e| {
            DomainLookupError::network_with_source(
                format!("Failed to read RDAP response from {}", url),
                e.to_string(),
            )
        })?;

        serde_json::from_str::<serde_json::Value>(&body)
            .map(RdapFetch::Found)
            .map_err(|e| DomainLookupError::ParseError {
                message: format!("RDAP response from {} is not JSON: {}", url, e),
                content: Some(truncate_excerpt(&body, BODY_EXCERPT_CHARS)),
            })
    }
}
