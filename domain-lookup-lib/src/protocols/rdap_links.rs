//! Following related links between RDAP documents.
//!
//! Registry documents for thin registries point at the registrar's RDAP
//! service for the full record. This module walks those links for a bounded
//! number of hops and folds every accepted document into the first one.

use crate::error::DomainLookupError;
use crate::protocols::rdap::RdapClient;
use crate::utils::DomainName;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Extract followable links from an RDAP document.
///
/// A link qualifies when its `rel` is in `rels` (case-insensitive), its
/// `href` is http(s), and its `type`, if present, mentions rdap or json.
pub fn extract_related_links(doc: &Value, rels: &[String]) -> Vec<String> {
    let mut links = Vec::new();

    let Some(entries) = doc.get("links").and_then(|l| l.as_array()) else {
        return links;
    };

    for link in entries {
        let rel = link.get("rel").and_then(|r| r.as_str()).unwrap_or_default();
        if !rels.iter().any(|wanted| wanted.eq_ignore_ascii_case(rel)) {
            continue;
        }

        let Some(href) = link.get("href").and_then(|h| h.as_str()) else {
            continue;
        };
        let lower = href.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            continue;
        }

        if let Some(media_type) = link.get("type").and_then(|t| t.as_str()) {
            let media_type = media_type.to_lowercase();
            if !media_type.contains("rdap") && !media_type.contains("json") {
                continue;
            }
        }

        if !links.iter().any(|l: &String| l == href) {
            links.push(href.to_string());
        }
    }

    links
}

/// Whether an RDAP document describes `domain`.
///
/// Documents without any name are rejected: a link that led somewhere
/// unnamed cannot be trusted to describe the same domain.
fn describes_domain(doc: &Value, domain: &DomainName) -> bool {
    ["ldhName", "unicodeName"]
        .iter()
        .filter_map(|key| doc.get(*key).and_then(|v| v.as_str()))
        .any(|name| domain.matches(name))
}

/// Additively merge `extra` into `base`.
pub fn merge_rdap_documents(base: &mut Value, extra: &Value) {
    let Some(extra) = extra.as_object() else {
        return;
    };
    let Some(base) = base.as_object_mut() else {
        return;
    };

    merge_array_by_key(base, extra, "status", |v| {
        v.as_str().map(|s| s.trim().to_lowercase())
    });

    merge_array_by_key(base, extra, "events", |event| {
        let action = event.get("eventAction")?.as_str()?.to_lowercase();
        let date = event
            .get("eventDate")
            .and_then(|d| d.as_str())
            .unwrap_or_default();
        Some(format!("{}|{}", action, date))
    });

    merge_array_by_key(base, extra, "nameservers", |ns| {
        ns.get("ldhName")
            .and_then(|n| n.as_str())
            .or_else(|| ns.get("unicodeName").and_then(|n| n.as_str()))
            .map(|n| n.trim_end_matches('.').to_lowercase())
    });

    merge_array_by_key(base, extra, "entities", |entity| Some(entity_fingerprint(entity)));

    for key in ["secureDNS", "port43"] {
        let missing = base.get(key).map_or(true, Value::is_null);
        if missing {
            if let Some(value) = extra.get(key).filter(|v| !v.is_null()) {
                base.insert(key.to_string(), value.clone());
            }
        }
    }
}

/// Append entries of `extra[key]` whose identity is not already present.
///
/// Entries without an identity are skipped.
fn merge_array_by_key<F>(base: &mut Map<String, Value>, extra: &Map<String, Value>, key: &str, identity: F)
where
    F: Fn(&Value) -> Option<String>,
{
    let Some(incoming) = extra.get(key).and_then(|v| v.as_array()) else {
        return;
    };

    let target = base
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    // A malformed base member is kept as the registry sent it.
    let Some(target) = target.as_array_mut() else {
        return;
    };

    let mut seen: HashSet<String> = target.iter().filter_map(&identity).collect();
    for item in incoming {
        if let Some(id) = identity(item) {
            if seen.insert(id) {
                target.push(item.clone());
            }
        }
    }
}

fn entity_fingerprint(entity: &Value) -> String {
    let handle = entity
        .get("handle")
        .and_then(|h| h.as_str())
        .unwrap_or_default();

    let mut roles: Vec<String> = entity
        .get("roles")
        .and_then(|r| r.as_array())
        .map(|roles| {
            roles
                .iter()
                .filter_map(|r| r.as_str())
                .map(|r| r.to_lowercase())
                .collect()
        })
        .unwrap_or_default();
    roles.sort();

    let vcard = entity
        .get("vcardArray")
        .map(|v| v.to_string())
        .unwrap_or_default();

    format!("{}|{}|{}", handle, roles.join(","), vcard)
}

/// `self` hrefs a document declares for itself.
fn self_links(doc: &Value) -> HashSet<String> {
    doc.get("links")
        .and_then(|l| l.as_array())
        .map(|links| {
            links
                .iter()
                .filter(|link| {
                    link.get("rel")
                        .and_then(|r| r.as_str())
                        .map_or(false, |r| r.eq_ignore_ascii_case("self"))
                })
                .filter_map(|link| link.get("href").and_then(|h| h.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Settings for one link walk.
#[derive(Debug, Clone)]
pub struct LinkWalk<'a> {
    /// URL the starting document was fetched from
    pub origin: &'a str,
    pub rels: &'a [String],
    pub max_hops: usize,
    pub timeout: Duration,
    pub signal: Option<&'a CancellationToken>,
}

/// Follow related links from `doc` and merge every accepted document into it.
///
/// Returns the merged document and the URLs that were fetched successfully,
/// in fetch order. Only cancellation is reported as an error; individual
/// fetch failures just drop that link.
pub async fn follow_related_links(
    client: &RdapClient,
    doc: Value,
    domain: &DomainName,
    walk: &LinkWalk<'_>,
) -> Result<(Value, Vec<String>), DomainLookupError> {
    let mut merged = doc;
    let mut fetched = Vec::new();
    let mut visited: HashSet<String> = self_links(&merged);
    visited.insert(walk.origin.to_string());
    let mut frontier = extract_related_links(&merged, walk.rels);

    for hop in 0..walk.max_hops {
        if frontier.is_empty() {
            break;
        }

        let mut accepted: Vec<Value> = Vec::new();
        for url in frontier.drain(..) {
            if !visited.insert(url.clone()) {
                continue;
            }

            match client.fetch_json(&url, walk.timeout, walk.signal).await {
                Ok(linked) => {
                    if describes_domain(&linked, domain) {
                        tracing::debug!(url = %url, hop = hop + 1, "Merging related RDAP document");
                        merge_rdap_documents(&mut merged, &linked);
                        fetched.push(url);
                        accepted.push(linked);
                    } else {
                        tracing::debug!(url = %url, "Related RDAP document is for a different name");
                    }
                }
                Err(e @ DomainLookupError::Cancelled { .. }) => return Err(e),
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "Skipping related RDAP link");
                }
            }
        }

        if accepted.is_empty() {
            break;
        }

        for linked in &accepted {
            visited.extend(self_links(linked));
        }
        frontier = accepted
            .iter()
            .flat_map(|d| extract_related_links(d, walk.rels))
            .filter(|url| !visited.contains(url))
            .collect();
    }

    Ok((merged, fetched))
}
