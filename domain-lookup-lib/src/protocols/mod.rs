//! Protocol implementations for registration lookups.
//!
//! This module contains the network-facing pieces: RDAP bootstrap discovery,
//! RDAP document fetching and link following, WHOIS transport, WHOIS server
//! discovery and referral walking.

/// IANA RDAP bootstrap registry
pub mod bootstrap;

/// RDAP (Registration Data Access Protocol) document fetcher
pub mod rdap;

/// Related-link following and document merging for RDAP
pub mod rdap_links;

/// WHOIS referral walking
pub mod referral;

/// WHOIS transport over TCP port 43
pub mod whois;

/// Authoritative WHOIS server discovery
pub mod whois_servers;

// Re-export commonly used functions and types
pub use bootstrap::{BootstrapData, BootstrapResolver, BootstrapService, DEFAULT_BOOTSTRAP_URL};
pub use rdap::{RdapClient, RdapFetch};
pub use rdap_links::{extract_related_links, follow_related_links, merge_rdap_documents};
pub use referral::{extract_referral, ReferralPolicy, ReferralWalker, REFERRAL_PATTERNS};
pub use whois::{TcpWhoisTransport, WhoisTransport};
pub use whois_servers::{parse_iana_response, WhoisLocator, WhoisServerTable};
