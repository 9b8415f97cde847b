//! Coalescing per-hop records into one.
//!
//! A WHOIS referral chain yields one record per adopted response: usually a
//! thin registry record followed by a registrar record with the contacts.
//! Merging is additive; a later hop fills gaps and never erases data.

use super::dates::parse_date;
use super::{is_transfer_locked, merge_nameserver};
use crate::types::{Contact, DomainRecord};
use std::cmp::Ordering;

/// Merge a chain of records, first record as the base.
///
/// Returns `None` for an empty chain; a one-element chain comes back as is.
pub fn coalesce_records(chain: Vec<DomainRecord>) -> Option<DomainRecord> {
    let mut records = chain.into_iter();
    let mut base = records.next()?;
    for next in records {
        merge_into(&mut base, next);
    }
    Some(base)
}

/// Fold `next` into `base`.
pub fn merge_into(base: &mut DomainRecord, next: DomainRecord) {
    base.is_registered |= next.is_registered;
    base.is_idn |= next.is_idn;
    fill(&mut base.unicode_name, next.unicode_name);
    fill(&mut base.punycode_name, next.punycode_name);
    fill(&mut base.registry, next.registry);
    fill(&mut base.reseller, next.reseller);

    if let Some(incoming) = next.registrar {
        match &mut base.registrar {
            Some(current) => {
                fill(&mut current.name, incoming.name);
                fill(&mut current.iana_id, incoming.iana_id);
                fill(&mut current.url, incoming.url);
                fill(&mut current.email, incoming.email);
                fill(&mut current.phone, incoming.phone);
            }
            slot @ None => *slot = Some(incoming),
        }
    }

    for status in next.statuses {
        if !base
            .statuses
            .iter()
            .any(|s| s.status.eq_ignore_ascii_case(&status.status))
        {
            base.statuses.push(status);
        }
    }

    let mut warnings = Vec::new();
    merge_date(
        &mut base.creation_date,
        next.creation_date,
        Ordering::Less,
        "creation",
        &mut warnings,
    );
    merge_date(
        &mut base.updated_date,
        next.updated_date,
        Ordering::Greater,
        "updated",
        &mut warnings,
    );
    merge_date(
        &mut base.expiration_date,
        next.expiration_date,
        Ordering::Greater,
        "expiration",
        &mut warnings,
    );
    fill(&mut base.deletion_date, next.deletion_date);

    for nameserver in next.nameservers {
        merge_nameserver(&mut base.nameservers, nameserver);
    }

    for contact in next.contacts {
        let key = contact_key(&contact);
        if !base.contacts.iter().any(|c| contact_key(c) == key) {
            base.contacts.push(contact);
        }
    }

    fill(&mut base.dnssec, next.dnssec);
    base.transfer_lock =
        base.transfer_lock || next.transfer_lock || is_transfer_locked(&base.statuses);
    base.privacy_enabled |= next.privacy_enabled;

    for server in next.rdap_servers {
        if !base.rdap_servers.contains(&server) {
            base.rdap_servers.push(server);
        }
    }
    fill(&mut base.raw_rdap, next.raw_rdap);

    if next.whois_server.as_deref().map_or(false, |s| !s.trim().is_empty()) {
        base.whois_server = next.whois_server;
    }
    if next.raw_whois.as_deref().map_or(false, |s| !s.trim().is_empty()) {
        base.raw_whois = next.raw_whois;
    }

    for warning in next.warnings.into_iter().chain(warnings) {
        base.add_warning(warning);
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

/// Keep the date that compares as `prefer` against the other; unparseable
/// dates never replace a present one.
fn merge_date(
    slot: &mut Option<String>,
    incoming: Option<String>,
    prefer: Ordering,
    label: &str,
    warnings: &mut Vec<String>,
) {
    let Some(incoming) = incoming else {
        return;
    };
    let Some(current) = slot.as_ref() else {
        *slot = Some(incoming);
        return;
    };

    match (parse_date(current), parse_date(&incoming)) {
        (Some(a), Some(b)) if a != b => {
            warnings.push(format!(
                "Sources disagree on the {} date: {} vs {}",
                label, current, incoming
            ));
            if b.cmp(&a) == prefer {
                *slot = Some(incoming);
            }
        }
        (None, Some(_)) => *slot = Some(incoming),
        _ => {}
    }
}

/// Identity of a contact for deduplication: role plus the first of
/// organization, name or email.
fn contact_key(contact: &Contact) -> (String, String) {
    let identity = contact
        .organization
        .as_deref()
        .or(contact.name.as_deref())
        .or(contact.email.as_deref())
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    (contact.role.to_string(), identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::availability::PhraseClassifier;
    use crate::normalize::whois::normalize_whois;
    use crate::types::{ContactRole, Nameserver, RecordSource, RegistrarInfo, StatusEvent};
    use crate::utils::DomainName;

    fn record() -> DomainRecord {
        DomainRecord::new("example.com", "com", RecordSource::Whois)
    }

    #[test]
    fn test_single_element_chain_is_unchanged() {
        let domain = DomainName::parse("example.com").unwrap();
        let direct = normalize_whois(
            "Domain Name: EXAMPLE.COM\nRegistrar: Example Registrar\nCreation Date: 2000-01-01\n",
            "whois.verisign-grs.com",
            &domain,
            &PhraseClassifier::new(),
        );
        assert_eq!(coalesce_records(vec![direct.clone()]), Some(direct));
        assert_eq!(coalesce_records(Vec::new()), None);
    }

    #[test]
    fn test_registered_is_sticky_and_servers_follow_last_hop() {
        let mut registry = record();
        registry.whois_server = Some("whois.verisign-grs.com".to_string());
        let mut registrar = record();
        registrar.is_registered = false;
        registrar.whois_server = Some("whois.registrar.example".to_string());

        let merged = coalesce_records(vec![registry, registrar]).unwrap();
        assert!(merged.is_registered);
        assert_eq!(merged.whois_server.as_deref(), Some("whois.registrar.example"));
    }

    #[test]
    fn test_nameservers_union_glue() {
        let mut first = record();
        let mut ns = Nameserver::new("ns1.example.com");
        ns.ipv4.push("192.0.2.1".to_string());
        first.nameservers.push(ns);

        let mut second = record();
        let mut ns = Nameserver::new("NS1.EXAMPLE.COM");
        ns.ipv4.push("192.0.2.2".to_string());
        second.nameservers.push(ns);

        let merged = coalesce_records(vec![first, second]).unwrap();
        assert_eq!(merged.nameservers.len(), 1);
        assert_eq!(merged.nameservers[0].ipv4, vec!["192.0.2.1", "192.0.2.2"]);
    }

    #[test]
    fn test_dates_pick_extremes_and_warn() {
        let mut first = record();
        first.creation_date = Some("2000-01-02T00:00:00Z".to_string());
        first.expiration_date = Some("2030-01-01T00:00:00Z".to_string());

        let mut second = record();
        second.creation_date = Some("2000-01-01T00:00:00Z".to_string());
        second.expiration_date = Some("2031-01-01T00:00:00Z".to_string());
        second.updated_date = Some("2024-01-01T00:00:00Z".to_string());

        let merged = coalesce_records(vec![first, second]).unwrap();
        assert_eq!(merged.creation_date.as_deref(), Some("2000-01-01T00:00:00Z"));
        assert_eq!(merged.expiration_date.as_deref(), Some("2031-01-01T00:00:00Z"));
        assert_eq!(merged.updated_date.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(merged.warnings.len(), 2);
    }

    #[test]
    fn test_registrar_fields_fill_and_contacts_dedupe() {
        let mut first = record();
        first.registrar = Some(RegistrarInfo {
            name: Some("Example Registrar".to_string()),
            ..Default::default()
        });
        first.statuses.push(StatusEvent {
            status: "clientTransferProhibited".to_string(),
            raw: "clientTransferProhibited".to_string(),
        });
        let mut admin = Contact::new(ContactRole::Admin);
        admin.email = Some("admin@example.com".to_string());
        first.contacts.push(admin.clone());

        let mut second = record();
        second.registrar = Some(RegistrarInfo {
            name: Some("Other Name".to_string()),
            iana_id: Some("376".to_string()),
            ..Default::default()
        });
        second.statuses.push(StatusEvent {
            status: "CLIENTTRANSFERPROHIBITED".to_string(),
            raw: "x".to_string(),
        });
        let mut admin_again = admin.clone();
        admin_again.email = Some("ADMIN@example.com".to_string());
        second.contacts.push(admin_again);
        second.contacts.push(Contact {
            name: Some("Registrant".to_string()),
            ..Contact::new(ContactRole::Registrant)
        });

        let merged = coalesce_records(vec![first, second]).unwrap();
        let registrar = merged.registrar.unwrap();
        assert_eq!(registrar.name.as_deref(), Some("Example Registrar"));
        assert_eq!(registrar.iana_id.as_deref(), Some("376"));
        assert_eq!(merged.statuses.len(), 1);
        assert!(merged.transfer_lock);
        assert_eq!(merged.contacts.len(), 2);
    }
}
