//! Utility functions for domain processing and network deadlines.
//!
//! This module contains domain name parsing (IDN handling and public-suffix
//! detection) and the helper that races every network operation against the
//! caller's timeout budget and cancellation token.

use crate::error::DomainLookupError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Registry-controlled suffixes that span two labels.
///
/// Covers the second-level ccTLD suffixes and the private CentralNic-style
/// suffixes that a bare last-label split would get wrong.
const MULTI_LABEL_SUFFIXES: &[&str] = &[
    // United Kingdom
    "co.uk", "org.uk", "me.uk", "ltd.uk", "plc.uk", "net.uk", "ac.uk", "gov.uk", "sch.uk",
    // Australia / New Zealand
    "com.au", "net.au", "org.au", "edu.au", "gov.au", "asn.au", "id.au", "co.nz", "net.nz",
    "org.nz", "ac.nz", "govt.nz",
    // Asia
    "co.jp", "ne.jp", "or.jp", "ac.jp", "go.jp", "com.cn", "net.cn", "org.cn", "gov.cn",
    "com.hk", "org.hk", "com.tw", "org.tw", "co.kr", "or.kr", "com.sg", "com.my", "co.id",
    "co.in", "net.in", "org.in", "firm.in", "gen.in", "ind.in", "co.th", "in.th", "com.ph",
    "com.vn", "com.pk",
    // Americas
    "com.br", "net.br", "org.br", "gov.br", "com.mx", "org.mx", "com.ar", "com.co", "com.pe",
    "com.ve", "com.uy",
    // Europe / Middle East / Africa
    "com.tr", "org.tr", "com.ua", "co.il", "org.il", "co.za", "org.za", "com.eg", "com.sa",
    "co.ke", "com.ng", "com.pl", "co.at", "or.at",
    // Private second-level registries
    "uk.com", "us.com", "eu.com", "gb.net", "uk.net", "jpn.com", "za.com", "co.com", "de.com",
    "br.com", "cn.com", "ru.com", "sa.com", "se.net", "hu.net", "in.net", "us.org",
];

/// A validated domain name in both ASCII and Unicode form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainName {
    /// Lower-case ASCII form (punycode for IDN labels)
    pub ascii: String,

    /// Unicode form; identical to `ascii` for non-IDN names
    pub unicode: String,

    /// Public suffix, possibly multi-label
    pub suffix: String,
}

impl DomainName {
    /// Parse and validate user input into a domain name.
    ///
    /// Accepts Unicode or punycode input, ignores surrounding whitespace, a
    /// trailing root dot and letter case.
    pub fn parse(input: &str) -> Result<Self, DomainLookupError> {
        let trimmed = input.trim().trim_end_matches('.');

        if trimmed.is_empty() {
            return Err(DomainLookupError::invalid_domain(
                input,
                "Domain name cannot be empty",
            ));
        }

        if trimmed.contains("://") || trimmed.contains('/') || trimmed.contains(' ') {
            return Err(DomainLookupError::invalid_domain(
                input,
                "Expected a bare domain name, not a URL",
            ));
        }

        let ascii = idna::domain_to_ascii(trimmed).map_err(|e| {
            DomainLookupError::invalid_domain(input, format!("Not a valid IDN: {}", e))
        })?;
        let (unicode, _) = idna::domain_to_unicode(&ascii);

        let labels: Vec<&str> = ascii.split('.').collect();
        if labels.len() < 2 {
            return Err(DomainLookupError::invalid_domain(
                input,
                "Domain must contain at least one dot",
            ));
        }
        if ascii.len() > 253 {
            return Err(DomainLookupError::invalid_domain(
                input,
                "Domain name longer than 253 characters",
            ));
        }
        for label in &labels {
            if label.is_empty() || label.len() > 63 {
                return Err(DomainLookupError::invalid_domain(
                    input,
                    "Every label must be 1 to 63 characters long",
                ));
            }
            if label.starts_with('-') || label.ends_with('-') {
                return Err(DomainLookupError::invalid_domain(
                    input,
                    "Labels cannot start or end with a hyphen",
                ));
            }
            if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                return Err(DomainLookupError::invalid_domain(
                    input,
                    format!("Invalid characters in label '{}'", label),
                ));
            }
        }

        let suffix = public_suffix(&ascii);
        if suffix == ascii {
            return Err(DomainLookupError::invalid_domain(
                input,
                format!("'{}' is a public suffix, not a registrable domain", ascii),
            ));
        }

        Ok(Self {
            ascii,
            unicode,
            suffix,
        })
    }

    /// Whether any label is internationalized.
    pub fn is_idn(&self) -> bool {
        self.ascii.split('.').any(|label| label.starts_with("xn--"))
    }

    /// Whether the public suffix spans more than one label.
    pub fn has_multi_label_suffix(&self) -> bool {
        self.suffix.contains('.')
    }

    /// The registry-level (last) label of the suffix.
    pub fn registry_label(&self) -> &str {
        self.suffix.rsplit('.').next().unwrap_or(&self.suffix)
    }

    /// Whether `name` refers to this domain in either ASCII or Unicode form.
    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim().trim_end_matches('.');
        name.eq_ignore_ascii_case(&self.ascii) || name.to_lowercase() == self.unicode.to_lowercase()
    }
}

impl std::fmt::Display for DomainName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ascii)
    }
}

/// Determine the public suffix of an ASCII domain name.
///
/// Prefers a known multi-label suffix; otherwise returns the last label.
pub fn public_suffix(ascii_domain: &str) -> String {
    let lower = ascii_domain.trim_end_matches('.').to_lowercase();
    let labels: Vec<&str> = lower.split('.').collect();

    if labels.len() >= 2 {
        let candidate = labels[labels.len() - 2..].join(".");
        if MULTI_LABEL_SUFFIXES.contains(&candidate.as_str()) {
            return candidate;
        }
    }

    labels.last().map(|l| l.to_string()).unwrap_or_default()
}

/// Run a network operation against the timeout budget and an optional
/// cancellation token.
///
/// On expiry or cancellation the future is dropped, which closes the socket
/// or aborts the HTTP request it owns.
pub async fn race_deadline<F, T>(
    operation: &str,
    timeout: Duration,
    signal: Option<&CancellationToken>,
    future: F,
) -> Result<T, DomainLookupError>
where
    F: Future<Output = Result<T, DomainLookupError>>,
{
    let timed = tokio::time::timeout(timeout, future);

    let outcome = match signal {
        Some(token) => {
            tokio::select! {
                _ = token.cancelled() => return Err(DomainLookupError::cancelled(operation)),
                outcome = timed => outcome,
            }
        }
        None => timed.await,
    };

    match outcome {
        Ok(result) => result,
        Err(_) => Err(DomainLookupError::timeout(operation, timeout)),
    }
}

/// Truncate text to at most `max_chars` characters, on a char boundary.
pub fn truncate_excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
