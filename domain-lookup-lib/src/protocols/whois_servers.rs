//! Discovery of the authoritative WHOIS server for a public suffix.
//!
//! Caller hints win, then a live query to IANA, then a curated table of
//! well-known servers for suffixes IANA does not describe well.

use crate::protocols::whois::WhoisTransport;
use crate::utils::DomainName;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// IANA's WHOIS server, authoritative for the root zone.
pub const IANA_WHOIS_SERVER: &str = "whois.iana.org";

lazy_static! {
    static ref IANA_SERVER_LINE: Regex =
        Regex::new(r"(?im)^[ \t]*(refer|whois server|whois)[ \t]*:[ \t]*(\S+)[ \t]*\r?$").unwrap();
    static ref IANA_REGISTRATION_URL: Regex =
        Regex::new(r"(?im)^[ \t]*remarks[ \t]*:[ \t]*registration information[ \t]*:[ \t]*(\S+)[ \t]*\r?$")
            .unwrap();
}

/// Curated suffix → WHOIS server table.
///
/// Immutable once built; shared between lookups behind an `Arc`.
#[derive(Debug, Clone)]
pub struct WhoisServerTable {
    servers: HashMap<String, String>,
}

impl WhoisServerTable {
    /// An empty table.
    pub fn empty() -> Self {
        Self {
            servers: HashMap::new(),
        }
    }

    /// Build a table from `(suffix, server)` pairs.
    pub fn from_entries<I, S, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: Into<String>,
    {
        let servers = entries
            .into_iter()
            .map(|(suffix, server)| (normalize_suffix(suffix.as_ref()), server.into()))
            .collect();
        Self { servers }
    }

    /// Return a copy of this table with an extra entry.
    pub fn with_entry<S: AsRef<str>, T: Into<String>>(mut self, suffix: S, server: T) -> Self {
        self.servers
            .insert(normalize_suffix(suffix.as_ref()), server.into());
        self
    }

    /// Look up a suffix exactly.
    pub fn exact(&self, suffix: &str) -> Option<&str> {
        self.servers.get(&normalize_suffix(suffix)).map(String::as_str)
    }

    /// Look up the full suffix, then its last label.
    pub fn get(&self, suffix: &str) -> Option<&str> {
        self.exact(suffix).or_else(|| {
            let last = suffix.rsplit('.').next()?;
            if last == suffix {
                None
            } else {
                self.exact(last)
            }
        })
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

impl Default for WhoisServerTable {
    fn default() -> Self {
        Self::from_entries([
            // gTLDs
            ("com", "whois.verisign-grs.com"),
            ("net", "whois.verisign-grs.com"),
            ("org", "whois.publicinterestregistry.org"),
            ("info", "whois.nic.info"),
            ("biz", "whois.nic.biz"),
            ("name", "whois.nic.name"),
            ("mobi", "whois.nic.mobi"),
            ("pro", "whois.nic.pro"),
            ("app", "whois.nic.google"),
            ("dev", "whois.nic.google"),
            ("xyz", "whois.nic.xyz"),
            ("online", "whois.nic.online"),
            ("site", "whois.nic.site"),
            // ccTLDs
            ("io", "whois.nic.io"),
            ("ai", "whois.nic.ai"),
            ("co", "whois.nic.co"),
            ("me", "whois.nic.me"),
            ("tv", "whois.nic.tv"),
            ("cc", "ccwhois.verisign-grs.com"),
            ("us", "whois.nic.us"),
            ("ca", "whois.cira.ca"),
            ("uk", "whois.nic.uk"),
            ("de", "whois.denic.de"),
            ("fr", "whois.nic.fr"),
            ("nl", "whois.domain-registry.nl"),
            ("be", "whois.dns.be"),
            ("eu", "whois.eu"),
            ("it", "whois.nic.it"),
            ("es", "whois.nic.es"),
            ("ch", "whois.nic.ch"),
            ("at", "whois.nic.at"),
            ("se", "whois.iis.se"),
            ("nu", "whois.iis.nu"),
            ("no", "whois.norid.no"),
            ("dk", "whois.punktum.dk"),
            ("fi", "whois.fi"),
            ("pl", "whois.dns.pl"),
            ("ru", "whois.tcinet.ru"),
            ("jp", "whois.jprs.jp"),
            ("cn", "whois.cnnic.cn"),
            ("kr", "whois.kr"),
            ("au", "whois.auda.org.au"),
            ("nz", "whois.irs.net.nz"),
            ("in", "whois.registry.in"),
            ("br", "whois.registro.br"),
            ("mx", "whois.mx"),
            ("za", "whois.registry.net.za"),
            // Private second-level registries
            ("uk.com", "whois.centralnic.com"),
            ("us.com", "whois.centralnic.com"),
            ("eu.com", "whois.centralnic.com"),
            ("gb.net", "whois.centralnic.com"),
            ("uk.net", "whois.centralnic.com"),
            ("jpn.com", "whois.centralnic.com"),
            ("za.com", "whois.centralnic.com"),
            ("de.com", "whois.centralnic.com"),
            ("br.com", "whois.centralnic.com"),
            ("cn.com", "whois.centralnic.com"),
            ("ru.com", "whois.centralnic.com"),
            ("sa.com", "whois.centralnic.com"),
            ("se.net", "whois.centralnic.com"),
            ("hu.net", "whois.centralnic.com"),
            ("in.net", "whois.centralnic.com"),
            ("us.org", "whois.centralnic.com"),
            ("co.com", "whois.centralnic.com"),
        ])
    }
}

fn normalize_suffix(suffix: &str) -> String {
    suffix.trim().trim_matches('.').to_lowercase()
}

/// What IANA says about a TLD.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IanaReferral {
    pub server: Option<String>,
    pub registration_url: Option<String>,
}

/// Parse an IANA WHOIS response for the authoritative server.
///
/// IANA may use `refer:`, `whois:` or `whois server:`; `refer:` is the
/// canonical field and wins whenever it is present.
pub fn parse_iana_response(response: &str) -> IanaReferral {
    let mut refer = None;
    let mut other = None;

    for caps in IANA_SERVER_LINE.captures_iter(response) {
        let field = caps[1].to_lowercase();
        let value = caps[2].trim().to_lowercase();
        if value.is_empty() {
            continue;
        }
        if field == "refer" {
            if refer.is_none() {
                refer = Some(value);
            }
        } else if other.is_none() {
            other = Some(value);
        }
    }

    let registration_url = IANA_REGISTRATION_URL
        .captures(response)
        .map(|caps| caps[1].to_string());

    IanaReferral {
        server: refer.or(other),
        registration_url,
    }
}

/// Where a WHOIS server came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerOrigin {
    Hint,
    Iana,
    Curated,
}

/// Result of locating the registry WHOIS server for a domain.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerLocation {
    pub server: Option<String>,
    pub origin: Option<ServerOrigin>,
    pub registration_url: Option<String>,
}

/// Finds the authoritative WHOIS server for a domain's suffix.
#[derive(Clone)]
pub struct WhoisLocator {
    transport: Arc<dyn WhoisTransport>,
    table: Arc<WhoisServerTable>,
}

impl WhoisLocator {
    pub fn new(transport: Arc<dyn WhoisTransport>, table: Arc<WhoisServerTable>) -> Self {
        Self { transport, table }
    }

    /// Locate the WHOIS server for `domain`.
    ///
    /// Never fails: an unreachable IANA only means the curated table is
    /// consulted next.
    pub async fn locate(
        &self,
        domain: &DomainName,
        hints: &HashMap<String, String>,
        timeout: Duration,
    ) -> ServerLocation {
        let suffix = domain.suffix.as_str();
        let registry_label = domain.registry_label();

        let hint_for = |label: &str| {
            hints
                .iter()
                .find(|(tld, _)| tld.trim().trim_start_matches('.').eq_ignore_ascii_case(label))
                .map(|(_, server)| server)
        };
        let hinted = hint_for(suffix)
            .or_else(|| hint_for(registry_label))
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        if let Some(server) = hinted {
            tracing::debug!(suffix = %suffix, server = %server, "Using WHOIS hint");
            return ServerLocation {
                server: Some(server),
                origin: Some(ServerOrigin::Hint),
                registration_url: None,
            };
        }

        let mut registration_url = None;
        match self
            .transport
            .query(IANA_WHOIS_SERVER, registry_label, timeout)
            .await
        {
            Ok(response) => {
                let referral = parse_iana_response(&response);
                registration_url = referral.registration_url;
                if let Some(server) = referral.server {
                    tracing::debug!(suffix = %suffix, server = %server, "IANA referral");
                    return ServerLocation {
                        server: Some(server),
                        origin: Some(ServerOrigin::Iana),
                        registration_url,
                    };
                }
            }
            Err(e) => {
                tracing::debug!(tld = %registry_label, error = %e, "IANA WHOIS query failed");
            }
        }

        match self.table.get(suffix) {
            Some(server) => ServerLocation {
                server: Some(server.to_string()),
                origin: Some(ServerOrigin::Curated),
                registration_url,
            },
            None => ServerLocation {
                server: None,
                origin: None,
                registration_url,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iana_response() {
        let response = "% IANA WHOIS server\n% for more information on IANA, visit http://www.iana.org\n\nrefer:        whois.verisign-grs.com\n\ndomain:       COM\n";
        assert_eq!(
            parse_iana_response(response).server,
            Some("whois.verisign-grs.com".to_string())
        );

        let no_refer = "% IANA WHOIS server\ndomain: TEST\nstatus: ACTIVE\n";
        assert_eq!(parse_iana_response(no_refer).server, None);

        let empty_refer = "refer:        \ndomain: COM\n";
        assert_eq!(parse_iana_response(empty_refer).server, None);

        let whois_field = "domain:       IO\nwhois:        whois.nic.io\nstatus:       ACTIVE\n";
        assert_eq!(
            parse_iana_response(whois_field).server,
            Some("whois.nic.io".to_string())
        );

        let both_fields = "whois:        whois.old-server.com\nREFER:        whois.correct-server.com\ndomain:       COM\n";
        assert_eq!(
            parse_iana_response(both_fields).server,
            Some("whois.correct-server.com".to_string())
        );
    }

    #[test]
    fn test_parse_iana_registration_url() {
        let response = "domain:       ZZ\nremarks:      Registration information: http://www.nic.zz\n";
        let referral = parse_iana_response(response);
        assert_eq!(referral.server, None);
        assert_eq!(referral.registration_url, Some("http://www.nic.zz".to_string()));
    }

    #[test]
    fn test_table_prefers_full_suffix() {
        let table = WhoisServerTable::default();
        assert_eq!(table.get("uk.com"), Some("whois.centralnic.com"));
        assert_eq!(table.get("co.uk"), Some("whois.nic.uk"));
        assert_eq!(table.get("COM"), Some("whois.verisign-grs.com"));
        assert_eq!(table.get("zz"), None);
        assert_eq!(table.exact("co.uk"), None);
    }

    #[test]
    fn test_table_with_entry() {
        let table = WhoisServerTable::empty().with_entry(".ZZ", "whois.nic.zz");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("zz"), Some("whois.nic.zz"));
    }
}
