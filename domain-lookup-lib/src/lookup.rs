//! Main lookup orchestrator.
//!
//! This module provides the `DomainLookup` struct that decides between RDAP
//! and WHOIS for a domain, walks the referral or link chains each protocol
//! needs, and hands back one normalized record.

use crate::error::DomainLookupError;
use crate::normalize::{coalesce_records, normalize_rdap, normalize_whois};
use crate::normalize::{AvailabilityClassifier, PhraseClassifier};
use crate::protocols::bootstrap::{BootstrapResolver, BootstrapSource, DEFAULT_BOOTSTRAP_URL};
use crate::protocols::rdap::{domain_url, RdapClient, RdapFetch};
use crate::protocols::rdap_links::{follow_related_links, LinkWalk};
use crate::protocols::referral::{ReferralPolicy, ReferralWalker};
use crate::protocols::whois::{TcpWhoisTransport, WhoisTransport};
use crate::protocols::whois_servers::{WhoisLocator, WhoisServerTable};
use crate::types::{DomainRecord, LookupOptions, RecordSource, WhoisQueryResult};
use crate::utils::DomainName;
use std::sync::Arc;

const USER_AGENT: &str = concat!("domain-lookup/", env!("CARGO_PKG_VERSION"));

/// What the RDAP phase produced.
enum RdapOutcome {
    /// An RDAP server answered; the lookup is done
    Answered(DomainRecord),

    /// No RDAP server could answer
    Exhausted(RdapAttempts),
}

/// Bookkeeping for failed RDAP attempts, carried into the WHOIS phase.
#[derive(Debug, Default)]
struct RdapAttempts {
    attempted: Vec<String>,
    warnings: Vec<String>,
    last_error: Option<String>,
}

/// Registration data lookup engine.
///
/// The `DomainLookup` handles every step of a lookup:
/// - RDAP bootstrap discovery and document fetching
/// - Following RDAP related links
/// - Locating the registry WHOIS server and walking registrar referrals
/// - Normalizing and merging whatever was found
///
/// It holds only immutable configuration and a pooled HTTP client, so one
/// instance can serve any number of concurrent lookups.
///
/// # Example
///
/// ```rust,no_run
/// use domain_lookup_lib::DomainLookup;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let engine = DomainLookup::new();
///     let record = engine.lookup("example.com").await?;
///     println!("Registered: {} (via {})", record.is_registered, record.source);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct DomainLookup {
    options: LookupOptions,
    http_client: reqwest::Client,
    transport: Arc<dyn WhoisTransport>,
    server_table: Arc<WhoisServerTable>,
    classifier: Arc<dyn AvailabilityClassifier>,
}

impl DomainLookup {
    /// Create a lookup engine with default options.
    ///
    /// Default settings:
    /// - Timeout: 15 seconds per network operation
    /// - RDAP first, WHOIS fallback
    /// - Up to 2 WHOIS referral hops and 2 RDAP link hops
    pub fn new() -> Self {
        Self::with_options(LookupOptions::default())
    }

    /// Create a lookup engine with custom options.
    ///
    /// # Example
    ///
    /// ```rust
    /// use domain_lookup_lib::{DomainLookup, LookupOptions};
    /// use std::time::Duration;
    ///
    /// let options = LookupOptions::default()
    ///     .with_timeout(Duration::from_secs(5))
    ///     .with_whois_hint("io", "whois.nic.io");
    ///
    /// let engine = DomainLookup::with_options(options);
    /// ```
    pub fn with_options(options: LookupOptions) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to a default HTTP client");
                reqwest::Client::new()
            });
        let transport = TcpWhoisTransport::new()
            .with_socket_timeout(options.effective_whois_socket_timeout());

        Self {
            options,
            http_client,
            transport: Arc::new(transport),
            server_table: Arc::new(WhoisServerTable::default()),
            classifier: Arc::new(PhraseClassifier::new()),
        }
    }

    /// Replace the WHOIS transport.
    pub fn with_whois_transport(mut self, transport: Arc<dyn WhoisTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Replace the curated WHOIS server table.
    pub fn with_server_table(mut self, table: Arc<WhoisServerTable>) -> Self {
        self.server_table = table;
        self
    }

    /// Replace the availability classifier used on WHOIS text.
    pub fn with_classifier(mut self, classifier: Arc<dyn AvailabilityClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replace the HTTP client used for bootstrap and RDAP requests.
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// Current options.
    pub fn options(&self) -> &LookupOptions {
        &self.options
    }

    /// Look up registration data for one domain.
    ///
    /// The process:
    /// 1. Validates the domain and the option combination
    /// 2. Tries every RDAP base URL for the suffix, following related links
    /// 3. Falls back to WHOIS: locate the registry server, walk referrals,
    ///    normalize each hop and merge
    ///
    /// An RDAP 404 is an answer, not a failure: the domain is reported as
    /// unregistered without consulting WHOIS.
    ///
    /// # Errors
    ///
    /// - `InvalidDomain` or `ConfigError` for caller mistakes
    /// - `RdapExhausted` when RDAP failed and `rdap_only` is set
    /// - `NoWhoisServer` when no WHOIS server is known for the suffix
    /// - `Cancelled` when the caller's token fires
    /// - the registry WHOIS server's own error when its first query fails
    pub async fn lookup(&self, domain: &str) -> Result<DomainRecord, DomainLookupError> {
        if self.options.rdap_only && self.options.whois_only {
            return Err(DomainLookupError::config(
                "rdap_only and whois_only cannot both be enabled",
            ));
        }

        let name = DomainName::parse(domain)?;
        tracing::debug!(domain = %name, suffix = %name.suffix, "Starting lookup");
        self.check_cancelled("lookup start")?;

        let attempts = if self.options.whois_only {
            RdapAttempts::default()
        } else {
            match self.lookup_rdap(&name).await? {
                RdapOutcome::Answered(record) => {
                    tracing::info!(
                        domain = %name,
                        registered = record.is_registered,
                        "Lookup answered by RDAP"
                    );
                    return Ok(record);
                }
                RdapOutcome::Exhausted(attempts) => attempts,
            }
        };

        if self.options.rdap_only {
            return Err(DomainLookupError::RdapExhausted {
                domain: name.ascii.clone(),
                attempted: attempts.attempted,
                last_error: attempts.last_error,
            });
        }

        let record = self.lookup_whois(&name, attempts).await?;
        tracing::info!(
            domain = %name,
            registered = record.is_registered,
            server = record.whois_server.as_deref().unwrap_or_default(),
            "Lookup answered by WHOIS"
        );
        Ok(record)
    }

    async fn lookup_rdap(&self, name: &DomainName) -> Result<RdapOutcome, DomainLookupError> {
        let options = &self.options;
        let signal = options.signal.as_ref();
        let mut attempts = RdapAttempts::default();

        let source = match (&options.custom_bootstrap_data, &options.custom_bootstrap_url) {
            (Some(doc), _) => BootstrapSource::Preloaded(doc),
            (None, Some(url)) => BootstrapSource::Remote(url.as_str()),
            (None, None) => BootstrapSource::Remote(DEFAULT_BOOTSTRAP_URL),
        };

        let resolver = BootstrapResolver::new(self.http_client.clone());
        let Some(bootstrap) = resolver.load(source, options.timeout, signal).await? else {
            attempts.last_error = Some("RDAP bootstrap registry unavailable".to_string());
            return Ok(RdapOutcome::Exhausted(attempts));
        };

        let mut bases = bootstrap.base_urls_for(&name.suffix);
        if bases.is_empty() && name.has_multi_label_suffix() {
            bases = bootstrap.base_urls_for(name.registry_label());
        }
        if bases.is_empty() {
            tracing::debug!(domain = %name, "No RDAP service registered for suffix");
        }

        let client = RdapClient::new(self.http_client.clone());
        for base in bases {
            self.check_cancelled("RDAP lookup")?;
            attempts.attempted.push(base.clone());

            match client
                .fetch_domain(&base, &name.ascii, options.timeout, signal)
                .await
            {
                Ok(RdapFetch::NotFound) => {
                    let mut record = self.empty_record(name, RecordSource::Rdap);
                    record.is_registered = false;
                    record.rdap_servers = attempts.attempted;
                    for warning in attempts.warnings {
                        record.add_warning(warning);
                    }
                    return Ok(RdapOutcome::Answered(record));
                }
                Ok(RdapFetch::Found(doc)) => {
                    let (doc, fetched) = if options.rdap_follow_links {
                        let origin = domain_url(&base, &name.ascii);
                        let walk = LinkWalk {
                            origin: &origin,
                            rels: &options.rdap_link_rels,
                            max_hops: options.max_rdap_link_hops,
                            timeout: options.timeout,
                            signal,
                        };
                        follow_related_links(&client, doc, name, &walk).await?
                    } else {
                        (doc, Vec::new())
                    };

                    let mut record = normalize_rdap(&doc, name);
                    record.rdap_servers = attempts.attempted;
                    record.rdap_servers.extend(fetched);
                    for warning in attempts.warnings {
                        record.add_warning(warning);
                    }
                    if options.include_raw {
                        record.raw_rdap = Some(doc);
                    }
                    return Ok(RdapOutcome::Answered(record));
                }
                Err(e @ DomainLookupError::Cancelled { .. }) => return Err(e),
                Err(e) => {
                    tracing::debug!(domain = %name, base = %base, error = %e, "RDAP attempt failed");
                    attempts
                        .warnings
                        .push(format!("RDAP lookup via {} failed: {}", base, e));
                    attempts.last_error = Some(e.to_string());
                }
            }
        }

        Ok(RdapOutcome::Exhausted(attempts))
    }

    async fn lookup_whois(
        &self,
        name: &DomainName,
        attempts: RdapAttempts,
    ) -> Result<DomainRecord, DomainLookupError> {
        let options = &self.options;
        self.check_cancelled("WHOIS server discovery")?;

        let locator = WhoisLocator::new(self.transport.clone(), self.server_table.clone());
        let location = locator
            .locate(name, &options.whois_hints, options.timeout)
            .await;
        let Some(server) = location.server else {
            return Err(DomainLookupError::NoWhoisServer {
                tld: name.suffix.clone(),
                registration_url: location.registration_url,
            });
        };

        self.check_cancelled("WHOIS query")?;
        let walker = ReferralWalker::new(self.transport.clone(), self.classifier.clone());
        let policy = ReferralPolicy {
            follow: options.follow_whois_referral,
            max_hops: options.max_whois_referral_hops,
            timeout: options.timeout,
            signal: options.signal.as_ref(),
        };

        let mut chain = walker.query_chain(&name.ascii, &server, &policy).await?;
        if let Some(alternate) = self
            .query_suffix_exception(name, &server, &chain, &walker, &policy)
            .await?
        {
            chain = alternate;
        }

        let records: Vec<DomainRecord> = chain
            .iter()
            .map(|hop| {
                let mut record =
                    normalize_whois(&hop.text, &hop.server, name, self.classifier.as_ref());
                if options.include_raw {
                    record.raw_whois = Some(hop.text.clone());
                }
                record
            })
            .collect();

        let mut record = coalesce_records(records)
            .ok_or_else(|| DomainLookupError::internal("WHOIS chain was empty"))?;
        record.source = RecordSource::Whois;

        let mut rdap_servers = attempts.attempted;
        rdap_servers.append(&mut record.rdap_servers);
        record.rdap_servers = rdap_servers;
        for warning in attempts.warnings {
            record.add_warning(warning);
        }

        Ok(record)
    }

    /// Second-level suffixes run by a private registry (`uk.com` and the
    /// like) are invisible to the TLD registry, which answers "no match".
    /// When that happens, ask the curated server for the full suffix.
    async fn query_suffix_exception(
        &self,
        name: &DomainName,
        registry_server: &str,
        chain: &[WhoisQueryResult],
        walker: &ReferralWalker,
        policy: &ReferralPolicy<'_>,
    ) -> Result<Option<Vec<WhoisQueryResult>>, DomainLookupError> {
        if !name.has_multi_label_suffix() {
            return Ok(None);
        }
        let Some(first) = chain.first() else {
            return Ok(None);
        };
        if !self.classifier.looks_unregistered(&first.text) {
            return Ok(None);
        }
        let Some(exception) = self.server_table.exact(&name.suffix) else {
            return Ok(None);
        };
        if exception.eq_ignore_ascii_case(registry_server) {
            return Ok(None);
        }

        self.check_cancelled("WHOIS suffix exception query")?;
        tracing::debug!(domain = %name, server = %exception, "Retrying with suffix registry");
        match walker.query_chain(&name.ascii, exception, policy).await {
            Ok(alternate) => Ok(Some(alternate)),
            Err(e @ DomainLookupError::Cancelled { .. }) => Err(e),
            Err(e) => {
                tracing::debug!(server = %exception, error = %e, "Suffix registry query failed");
                Ok(None)
            }
        }
    }

    fn empty_record(&self, name: &DomainName, source: RecordSource) -> DomainRecord {
        let mut record = DomainRecord::new(name.ascii.clone(), name.suffix.clone(), source);
        record.is_idn = name.is_idn();
        if record.is_idn {
            record.unicode_name = Some(name.unicode.clone());
            record.punycode_name = Some(name.ascii.clone());
        }
        record
    }

    fn check_cancelled(&self, operation: &str) -> Result<(), DomainLookupError> {
        match &self.options.signal {
            Some(token) if token.is_cancelled() => Err(DomainLookupError::cancelled(operation)),
            _ => Ok(()),
        }
    }
}

impl Default for DomainLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_err;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_conflicting_protocol_options() {
        let engine = DomainLookup::with_options(
            LookupOptions::default()
                .with_rdap_only(true)
                .with_whois_only(true),
        );
        let err = engine.lookup("example.com").await.unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[tokio::test]
    async fn test_invalid_domain_is_rejected_before_network() {
        let engine = DomainLookup::new();
        let err = assert_err!(engine.lookup("not a domain").await);
        assert!(matches!(err, DomainLookupError::InvalidDomain { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let engine = DomainLookup::with_options(LookupOptions::default().with_signal(token));
        let err = engine.lookup("example.com").await.unwrap_err();
        assert!(matches!(err, DomainLookupError::Cancelled { .. }));
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DomainLookup>();
    }
}
