//! Core data types for domain registration lookups.
//!
//! This module defines the unified record produced by every lookup, the
//! pieces it is built from, and the options that steer a lookup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Which protocol produced the data in a [`DomainRecord`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecordSource {
    /// Normalized from an RDAP JSON document
    #[serde(rename = "rdap")]
    Rdap,

    /// Normalized from one or more WHOIS text responses
    #[serde(rename = "whois")]
    Whois,
}

/// Registration data for a domain, normalized from RDAP or WHOIS.
///
/// Every field other than `domain`, `tld` and `source` depends entirely on
/// what the upstream servers chose to expose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainRecord {
    /// The domain that was looked up, in ASCII (punycode) lower-case form
    pub domain: String,

    /// Public suffix of the domain, possibly multi-label (e.g. "co.uk")
    pub tld: String,

    /// Whether the domain is registered according to the adopted response
    pub is_registered: bool,

    /// Whether the domain contains internationalized labels
    pub is_idn: bool,

    /// Unicode form of the domain, when it is an IDN
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unicode_name: Option<String>,

    /// Punycode form of the domain, when it is an IDN
    #[serde(skip_serializing_if = "Option::is_none")]
    pub punycode_name: Option<String>,

    /// Registry operator for the TLD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,

    /// Sponsoring registrar
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<RegistrarInfo>,

    /// Reseller acting on behalf of the registrar
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reseller: Option<String>,

    /// Domain statuses in the order they were received
    pub statuses: Vec<StatusEvent>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_date: Option<String>,

    /// Whether any status prohibits transfers
    pub transfer_lock: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dnssec: Option<DnssecInfo>,

    pub nameservers: Vec<Nameserver>,

    pub contacts: Vec<Contact>,

    /// Whether registrant data looks redacted or proxied
    pub privacy_enabled: bool,

    /// The WHOIS server whose response was adopted last
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_server: Option<String>,

    /// RDAP base URLs tried and related documents fetched, in order
    pub rdap_servers: Vec<String>,

    /// Merged RDAP document (only when raw output was requested)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_rdap: Option<serde_json::Value>,

    /// Last WHOIS response text (only when raw output was requested)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_whois: Option<String>,

    pub source: RecordSource,

    /// Non-fatal anomalies noticed while building the record
    pub warnings: Vec<String>,
}

impl DomainRecord {
    /// Create an empty record for a domain; every optional field unset.
    pub fn new<D: Into<String>, T: Into<String>>(domain: D, tld: T, source: RecordSource) -> Self {
        Self {
            domain: domain.into(),
            tld: tld.into(),
            is_registered: true,
            is_idn: false,
            unicode_name: None,
            punycode_name: None,
            registry: None,
            registrar: None,
            reseller: None,
            statuses: Vec::new(),
            creation_date: None,
            updated_date: None,
            expiration_date: None,
            deletion_date: None,
            transfer_lock: false,
            dnssec: None,
            nameservers: Vec::new(),
            contacts: Vec::new(),
            privacy_enabled: false,
            whois_server: None,
            rdap_servers: Vec::new(),
            raw_rdap: None,
            raw_whois: None,
            source,
            warnings: Vec::new(),
        }
    }

    /// Push a warning unless an identical one is already present.
    pub fn add_warning<W: Into<String>>(&mut self, warning: W) {
        let warning = warning.into();
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }
}

/// Registrar details; presence depends on what the source exposed.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RegistrarInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// IANA registrar ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iana_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl RegistrarInfo {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.iana_id.is_none()
            && self.url.is_none()
            && self.email.is_none()
            && self.phone.is_none()
    }
}

/// Role a contact plays for the domain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContactRole {
    Registrant,
    Admin,
    Tech,
    Billing,
    Abuse,
    Registrar,
    Reseller,
    Unknown,
}

impl ContactRole {
    /// Map an RDAP role keyword to a contact role.
    pub fn from_rdap_role(role: &str) -> Option<Self> {
        match role.trim().to_lowercase().as_str() {
            "registrant" => Some(Self::Registrant),
            "administrative" | "admin" => Some(Self::Admin),
            "technical" | "tech" => Some(Self::Tech),
            "billing" => Some(Self::Billing),
            "abuse" => Some(Self::Abuse),
            "registrar" => Some(Self::Registrar),
            "reseller" => Some(Self::Reseller),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContactRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ContactRole::Registrant => "registrant",
            ContactRole::Admin => "admin",
            ContactRole::Tech => "tech",
            ContactRole::Billing => "billing",
            ContactRole::Abuse => "abuse",
            ContactRole::Registrar => "registrar",
            ContactRole::Reseller => "reseller",
            ContactRole::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// A registration contact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    pub role: ContactRole,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fax: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub street: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_province: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Contact {
    pub fn new(role: ContactRole) -> Self {
        Self {
            role,
            name: None,
            organization: None,
            email: None,
            phone: None,
            fax: None,
            street: Vec::new(),
            city: None,
            state_province: None,
            postal_code: None,
            country: None,
        }
    }

    /// Whether no field beyond the role carries data.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.organization.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.fax.is_none()
            && self.street.is_empty()
            && self.city.is_none()
            && self.state_province.is_none()
            && self.postal_code.is_none()
            && self.country.is_none()
    }
}

/// A delegated nameserver with optional glue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Nameserver {
    /// Lower-cased host name
    pub host: String,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub ipv4: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub ipv6: Vec<String>,
}

impl Nameserver {
    pub fn new<H: AsRef<str>>(host: H) -> Self {
        Self {
            host: host.as_ref().trim().trim_end_matches('.').to_lowercase(),
            ipv4: Vec::new(),
            ipv6: Vec::new(),
        }
    }
}

/// A domain status: normalized EPP token plus the text it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusEvent {
    pub status: String,
    pub raw: String,
}

/// DNSSEC delegation information.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DnssecInfo {
    pub delegation_signed: bool,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub ds_records: Vec<DsRecord>,
}

/// One DS record from an RDAP `secureDNS.dsData` entry.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DsRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_tag: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest_type: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Raw response from one WHOIS server.
#[derive(Debug, Clone, PartialEq)]
pub struct WhoisQueryResult {
    /// The server that was actually queried
    pub server: String,

    /// Response text as received
    pub text: String,
}

/// Options that steer a single lookup.
///
/// Built with the `with_*` methods, mirroring the way the CLI and config
/// files layer their settings on top of the defaults.
#[derive(Debug, Clone)]
pub struct LookupOptions {
    /// Budget applied to every individual network operation
    /// Default: 15 seconds
    pub timeout: Duration,

    /// Socket idle timeout for WHOIS reads; derived from `timeout` when unset
    pub whois_socket_timeout: Option<Duration>,

    /// Use RDAP only; fail instead of falling back to WHOIS
    pub rdap_only: bool,

    /// Skip RDAP entirely
    pub whois_only: bool,

    /// Follow registrar referrals found in WHOIS responses
    /// Default: true
    pub follow_whois_referral: bool,

    /// Maximum number of WHOIS referral hops after the registry query
    /// Default: 2
    pub max_whois_referral_hops: usize,

    /// Follow related links inside RDAP documents
    /// Default: true
    pub rdap_follow_links: bool,

    /// Maximum number of RDAP link hops
    /// Default: 2
    pub max_rdap_link_hops: usize,

    /// Link relations that are followed
    /// Default: related, entity, registrar, alternate
    pub rdap_link_rels: Vec<String>,

    /// Pre-loaded bootstrap document; skips the bootstrap fetch
    pub custom_bootstrap_data: Option<serde_json::Value>,

    /// Alternative URL for the bootstrap document
    pub custom_bootstrap_url: Option<String>,

    /// Per-TLD WHOIS server overrides
    pub whois_hints: HashMap<String, String>,

    /// Keep raw RDAP/WHOIS payloads on the record
    pub include_raw: bool,

    /// Cooperative cancellation for the whole lookup
    pub signal: Option<CancellationToken>,
}

/// Default link relations followed inside RDAP documents.
pub const DEFAULT_RDAP_LINK_RELS: &[&str] = &["related", "entity", "registrar", "alternate"];

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            whois_socket_timeout: None,
            rdap_only: false,
            whois_only: false,
            follow_whois_referral: true,
            max_whois_referral_hops: 2,
            rdap_follow_links: true,
            max_rdap_link_hops: 2,
            rdap_link_rels: DEFAULT_RDAP_LINK_RELS
                .iter()
                .map(|rel| rel.to_string())
                .collect(),
            custom_bootstrap_data: None,
            custom_bootstrap_url: None,
            whois_hints: HashMap::new(),
            include_raw: false,
            signal: None,
        }
    }
}

impl LookupOptions {
    /// Set the per-operation timeout budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the WHOIS socket idle timeout explicitly.
    pub fn with_whois_socket_timeout(mut self, timeout: Duration) -> Self {
        self.whois_socket_timeout = Some(timeout);
        self
    }

    pub fn with_rdap_only(mut self, enabled: bool) -> Self {
        self.rdap_only = enabled;
        self
    }

    pub fn with_whois_only(mut self, enabled: bool) -> Self {
        self.whois_only = enabled;
        self
    }

    pub fn with_whois_referral(mut self, enabled: bool) -> Self {
        self.follow_whois_referral = enabled;
        self
    }

    pub fn with_max_whois_referral_hops(mut self, hops: usize) -> Self {
        self.max_whois_referral_hops = hops;
        self
    }

    pub fn with_rdap_links(mut self, enabled: bool) -> Self {
        self.rdap_follow_links = enabled;
        self
    }

    pub fn with_max_rdap_link_hops(mut self, hops: usize) -> Self {
        self.max_rdap_link_hops = hops;
        self
    }

    pub fn with_rdap_link_rels(mut self, rels: Vec<String>) -> Self {
        self.rdap_link_rels = rels;
        self
    }

    pub fn with_bootstrap_data(mut self, data: serde_json::Value) -> Self {
        self.custom_bootstrap_data = Some(data);
        self
    }

    pub fn with_bootstrap_url<U: Into<String>>(mut self, url: U) -> Self {
        self.custom_bootstrap_url = Some(url.into());
        self
    }

    /// Add a WHOIS server override for a TLD.
    pub fn with_whois_hint<T: AsRef<str>, S: Into<String>>(mut self, tld: T, server: S) -> Self {
        self.whois_hints
            .insert(tld.as_ref().trim_start_matches('.').to_lowercase(), server.into());
        self
    }

    pub fn with_include_raw(mut self, enabled: bool) -> Self {
        self.include_raw = enabled;
        self
    }

    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Socket idle timeout used by the TCP WHOIS transport.
    ///
    /// Three quarters of the overall budget, capped at ten seconds, unless
    /// set explicitly.
    pub fn effective_whois_socket_timeout(&self) -> Duration {
        self.whois_socket_timeout.unwrap_or_else(|| {
            let derived = self.timeout * 3 / 4;
            derived.min(Duration::from_secs(10))
        })
    }
}

/// Outcome of [`crate::lookup_domain`] in the `{ok, record, error}` shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookupResult {
    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<DomainRecord>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LookupResult {
    pub fn success(record: DomainRecord) -> Self {
        Self {
            ok: true,
            record: Some(record),
            error: None,
        }
    }

    pub fn failure<E: Into<String>>(error: E) -> Self {
        Self {
            ok: false,
            record: None,
            error: Some(error.into()),
        }
    }
}

impl std::fmt::Display for RecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordSource::Rdap => write!(f, "RDAP"),
            RecordSource::Whois => write!(f, "WHOIS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = LookupOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(15));
        assert!(options.follow_whois_referral);
        assert_eq!(options.max_whois_referral_hops, 2);
        assert_eq!(options.max_rdap_link_hops, 2);
        assert_eq!(
            options.rdap_link_rels,
            vec!["related", "entity", "registrar", "alternate"]
        );
    }

    #[test]
    fn test_socket_timeout_is_shorter_than_budget() {
        let options = LookupOptions::default().with_timeout(Duration::from_secs(4));
        assert_eq!(options.effective_whois_socket_timeout(), Duration::from_secs(3));

        let long = LookupOptions::default().with_timeout(Duration::from_secs(60));
        assert_eq!(long.effective_whois_socket_timeout(), Duration::from_secs(10));

        let explicit = long.with_whois_socket_timeout(Duration::from_millis(500));
        assert_eq!(
            explicit.effective_whois_socket_timeout(),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_whois_hint_keys_are_normalized() {
        let options = LookupOptions::default().with_whois_hint(".IO", "whois.nic.io");
        assert_eq!(options.whois_hints.get("io"), Some(&"whois.nic.io".to_string()));
    }

    #[test]
    fn test_record_source_serializes_lowercase() {
        let record = DomainRecord::new("example.com", "com", RecordSource::Rdap);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["source"], "rdap");
        assert!(json.get("registrar").is_none());
    }
}
