//! Normalization of RDAP and WHOIS data into [`DomainRecord`]s.
//!
//! Everything under this module is pure: it takes documents or text that
//! were already fetched and produces records, never touching the network.
//!
//! [`DomainRecord`]: crate::types::DomainRecord

pub mod availability;
pub mod dates;
pub mod merge;
pub mod rdap;
pub mod whois;

use crate::types::{Nameserver, StatusEvent};
use lazy_static::lazy_static;
use regex::Regex;

pub use availability::{AvailabilityClassifier, PhraseClassifier};
pub use merge::coalesce_records;
pub use rdap::normalize_rdap;
pub use whois::normalize_whois;

lazy_static! {
    static ref TRAILING_URL: Regex = Regex::new(r"(?i)\s+\(?https?://\S*\)?\s*$").unwrap();
    static ref TRAILING_PAREN: Regex = Regex::new(r"\s*\([^)]*\)\s*$").unwrap();
}

/// Keywords in registrant names that mean the real data is hidden.
const PRIVACY_KEYWORDS: &[&str] = &[
    "redacted",
    "privacy",
    "withheld",
    "not disclosed",
    "non-public",
    "data protected",
    "gdpr",
    "statutory masking",
    "contact privacy",
    "whoisguard",
    "domains by proxy",
    "identity protect",
];

/// Whole-value sentinels that mean "nothing here".
const PRIVACY_SENTINELS: &[&str] = &["n/a", "na", "none", "-", "not available"];

/// Reduce a raw status to its EPP token.
///
/// Trailing URLs and parentheticals are dropped and multi-word statuses are
/// camel-cased, so `client transfer prohibited` and
/// `clientTransferProhibited https://icann.org/epp#clientTransferProhibited`
/// both become `clientTransferProhibited`.
pub fn normalize_status(raw: &str) -> String {
    let mut text = raw.trim().to_string();
    loop {
        let stripped = TRAILING_URL.replace(&text, "").to_string();
        let stripped = TRAILING_PAREN.replace(&stripped, "").to_string();
        if stripped == text {
            break;
        }
        text = stripped;
    }

    let words: Vec<&str> = text
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|w| !w.is_empty())
        .collect();

    match words.as_slice() {
        [] => String::new(),
        [single] => {
            if single.chars().any(|c| c.is_lowercase()) {
                single.to_string()
            } else {
                single.to_lowercase()
            }
        }
        [first, rest @ ..] => {
            let mut token = first.to_lowercase();
            for word in rest {
                let lower = word.to_lowercase();
                let mut chars = lower.chars();
                if let Some(head) = chars.next() {
                    token.extend(head.to_uppercase());
                    token.push_str(chars.as_str());
                }
            }
            token
        }
    }
}

/// Append a status unless an equal token is already present.
pub fn push_status(statuses: &mut Vec<StatusEvent>, raw: &str) {
    let token = normalize_status(raw);
    if token.is_empty() {
        return;
    }
    if statuses
        .iter()
        .any(|s| s.status.eq_ignore_ascii_case(&token))
    {
        return;
    }
    statuses.push(StatusEvent {
        status: token,
        raw: raw.trim().to_string(),
    });
}

/// Whether any status prohibits transfers.
pub fn is_transfer_locked(statuses: &[StatusEvent]) -> bool {
    statuses.iter().any(|s| {
        let squashed: String = s
            .status
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        squashed.contains("transferprohibited")
    })
}

/// Add a nameserver, unioning glue with an existing entry for the same host.
pub fn merge_nameserver(list: &mut Vec<Nameserver>, nameserver: Nameserver) {
    if nameserver.host.is_empty() {
        return;
    }
    match list.iter_mut().find(|ns| ns.host == nameserver.host) {
        Some(existing) => {
            for ip in nameserver.ipv4 {
                if !existing.ipv4.contains(&ip) {
                    existing.ipv4.push(ip);
                }
            }
            for ip in nameserver.ipv6 {
                if !existing.ipv6.iter().any(|e| e.eq_ignore_ascii_case(&ip)) {
                    existing.ipv6.push(ip);
                }
            }
        }
        None => list.push(nameserver),
    }
}

/// Whether a registrant name or organization hides the real data.
pub fn looks_private(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    if PRIVACY_SENTINELS.contains(&lower.as_str()) {
        return true;
    }
    PRIVACY_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Trimmed value, or `None` when empty.
pub(crate) fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
