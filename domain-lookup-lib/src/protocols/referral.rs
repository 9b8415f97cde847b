//! Following registrar referrals between WHOIS servers.
//!
//! Thin registries answer with a pointer to the registrar's WHOIS server,
//! which in turn may point elsewhere. The walk is iterative and bounded by
//! both a hop budget and a visited set.

use crate::error::DomainLookupError;
use crate::normalize::availability::AvailabilityClassifier;
use crate::protocols::whois::WhoisTransport;
use crate::types::WhoisQueryResult;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

lazy_static! {
    /// Referral lines, in the order they are tried.
    pub static ref REFERRAL_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?im)^[ \t]*registrar whois server[ \t]*:[ \t]*(\S+)").unwrap(),
        Regex::new(r"(?im)^[ \t]*whois server[ \t]*:[ \t]*(\S+)").unwrap(),
        Regex::new(r"(?im)^[ \t]*referralserver[ \t]*:[ \t]*(r?whois://\S+)").unwrap(),
    ];
}

/// Find the server a WHOIS response refers to, as a bare host name.
pub fn extract_referral(text: &str) -> Option<String> {
    REFERRAL_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| normalize_server(m.as_str()))
            .find(|host| !host.is_empty())
    })
}

/// Reduce a server reference to a lower-case host name.
///
/// Strips any scheme, path, trailing slash and port.
pub fn normalize_server(server: &str) -> String {
    let mut host = server.trim().to_lowercase();
    if let Some(idx) = host.find("://") {
        host = host[idx + 3..].to_string();
    }
    if let Some(idx) = host.find('/') {
        host.truncate(idx);
    }
    if let Some(idx) = host.rfind(':') {
        if host[idx + 1..].chars().all(|c| c.is_ascii_digit()) {
            host.truncate(idx);
        }
    }
    host.trim_end_matches('.').to_string()
}

/// Settings for one referral walk.
#[derive(Debug, Clone)]
pub struct ReferralPolicy<'a> {
    pub follow: bool,
    pub max_hops: usize,
    pub timeout: Duration,
    pub signal: Option<&'a CancellationToken>,
}

/// Walks WHOIS referral chains.
#[derive(Clone)]
pub struct ReferralWalker {
    transport: Arc<dyn WhoisTransport>,
    classifier: Arc<dyn AvailabilityClassifier>,
}

impl ReferralWalker {
    pub fn new(
        transport: Arc<dyn WhoisTransport>,
        classifier: Arc<dyn AvailabilityClassifier>,
    ) -> Self {
        Self {
            transport,
            classifier,
        }
    }

    /// Query `start_server` and follow referrals, returning every adopted
    /// response in order.
    ///
    /// Only a failure of the first query is an error. A failing hop ends the
    /// walk with the responses gathered so far, and a hop that calls a
    /// registered domain unregistered is discarded.
    pub async fn query_chain(
        &self,
        domain: &str,
        start_server: &str,
        policy: &ReferralPolicy<'_>,
    ) -> Result<Vec<WhoisQueryResult>, DomainLookupError> {
        let start = normalize_server(start_server);
        let text = self
            .transport
            .query(&start, domain, policy.timeout)
            .await?;

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(start.clone());
        let mut chain = vec![WhoisQueryResult {
            server: start,
            text,
        }];

        if !policy.follow || policy.max_hops == 0 {
            return Ok(chain);
        }

        for _ in 0..policy.max_hops {
            if policy.signal.map_or(false, |s| s.is_cancelled()) {
                return Err(DomainLookupError::cancelled("WHOIS referral walk"));
            }

            let Some(current) = chain.last() else {
                break;
            };
            let Some(next) = extract_referral(&current.text) else {
                break;
            };
            if !visited.insert(next.clone()) {
                tracing::debug!(server = %next, "WHOIS referral loops back; stopping");
                break;
            }

            let text = match self.transport.query(&next, domain, policy.timeout).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!(server = %next, error = %e, "WHOIS referral hop failed");
                    break;
                }
            };

            if self.classifier.looks_registered(&current.text)
                && self.classifier.looks_unregistered(&text)
            {
                tracing::debug!(
                    server = %next,
                    "Referral target contradicts a registered upstream answer; keeping upstream"
                );
                break;
            }

            chain.push(WhoisQueryResult { server: next, text });
        }

        Ok(chain)
    }

    /// Like [`query_chain`](Self::query_chain) but returns only the most
    /// authoritative response.
    pub async fn query_final(
        &self,
        domain: &str,
        start_server: &str,
        policy: &ReferralPolicy<'_>,
    ) -> Result<WhoisQueryResult, DomainLookupError> {
        let mut chain = self.query_chain(domain, start_server, policy).await?;
        chain
            .pop()
            .ok_or_else(|| DomainLookupError::internal("WHOIS referral walk produced no response"))
    }
}
