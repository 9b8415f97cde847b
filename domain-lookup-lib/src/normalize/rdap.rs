//! RDAP JSON to [`DomainRecord`].
//!
//! Works on `serde_json::Value` rather than typed structs: real RDAP servers
//! disagree on optional members and value shapes, and a document that is
//! partially wrong should still yield whatever it gets right.

use super::{is_transfer_locked, looks_private, merge_nameserver, non_empty, push_status};
use crate::normalize::dates::normalize_date;
use crate::types::{
    Contact, ContactRole, DnssecInfo, DomainRecord, DsRecord, Nameserver, RecordSource,
    RegistrarInfo,
};
use crate::utils::DomainName;
use serde_json::Value;

/// Event-action rules, checked in order; the first matching event wins.
const EVENT_RULES: &[(&str, DateField)] = &[
    ("registration", DateField::Created),
    ("last changed", DateField::Updated),
    ("expiration", DateField::Expires),
    ("deletion", DateField::Deleted),
];

#[derive(Debug, Clone, Copy)]
enum DateField {
    Created,
    Updated,
    Expires,
    Deleted,
}

/// Build a record from a (possibly merged) RDAP domain document.
///
/// A document only reaches this point when the server answered with one,
/// so the domain is always reported as registered.
pub fn normalize_rdap(doc: &Value, domain: &DomainName) -> DomainRecord {
    let mut record = DomainRecord::new(domain.ascii.clone(), domain.suffix.clone(), RecordSource::Rdap);
    record.is_registered = true;
    record.is_idn = domain.is_idn();
    if record.is_idn {
        record.unicode_name = Some(
            doc.get("unicodeName")
                .and_then(|v| v.as_str())
                .map(String::from)
                .unwrap_or_else(|| domain.unicode.clone()),
        );
        record.punycode_name = Some(domain.ascii.clone());
    }

    if let Some(statuses) = doc.get("status").and_then(|s| s.as_array()) {
        for status in statuses.iter().filter_map(|s| s.as_str()) {
            push_status(&mut record.statuses, status);
        }
    }
    record.transfer_lock = is_transfer_locked(&record.statuses);

    apply_events(doc, &mut record);

    if let Some(nameservers) = doc.get("nameservers").and_then(|n| n.as_array()) {
        for ns in nameservers {
            if let Some(nameserver) = extract_nameserver(ns) {
                merge_nameserver(&mut record.nameservers, nameserver);
            }
        }
    }

    record.dnssec = extract_dnssec(doc);

    let entities = flatten_entities(doc);
    for entity in &entities {
        let roles = entity_roles(entity);
        let card = VCard::from_entity(entity);

        if roles.contains(&ContactRole::Registrar) && record.registrar.is_none() {
            record.registrar = Some(extract_registrar(entity, &card));
        }
        if roles.iter().any(|r| *r == ContactRole::Reseller) && record.reseller.is_none() {
            record.reseller = card.display_name().or_else(|| entity_handle(entity));
        }
        if has_raw_role(entity, "registry") && record.registry.is_none() {
            record.registry = card.display_name().or_else(|| entity_handle(entity));
        }

        let contact_roles = if roles.is_empty() && !has_raw_role(entity, "registry") {
            vec![ContactRole::Unknown]
        } else {
            roles
        };
        for role in contact_roles {
            let contact = card.to_contact(role);
            if !contact.is_empty() {
                record.contacts.push(contact);
            }
        }
    }

    record.privacy_enabled = record
        .contacts
        .iter()
        .filter(|c| c.role == ContactRole::Registrant)
        .any(|c| {
            c.name.as_deref().map_or(false, looks_private)
                || c.organization.as_deref().map_or(false, looks_private)
        })
        || has_redacted_registrant(doc);

    record
}

fn apply_events(doc: &Value, record: &mut DomainRecord) {
    let Some(events) = doc.get("events").and_then(|e| e.as_array()) else {
        return;
    };

    for event in events {
        let (Some(action), Some(date)) = (
            event.get("eventAction").and_then(|a| a.as_str()),
            event.get("eventDate").and_then(|d| d.as_str()),
        ) else {
            continue;
        };
        let action = action.to_lowercase();

        let Some((_, field)) = EVENT_RULES.iter().find(|(needle, _)| action.contains(*needle)) else {
            continue;
        };
        let slot = match field {
            DateField::Created => &mut record.creation_date,
            DateField::Updated => &mut record.updated_date,
            DateField::Expires => &mut record.expiration_date,
            DateField::Deleted => &mut record.deletion_date,
        };
        if slot.is_none() {
            *slot = Some(normalize_date(date));
        }
    }
}

fn extract_nameserver(ns: &Value) -> Option<Nameserver> {
    let host = ns
        .get("ldhName")
        .and_then(|n| n.as_str())
        .or_else(|| ns.get("unicodeName").and_then(|n| n.as_str()))?;
    let mut nameserver = Nameserver::new(host);
    if nameserver.host.is_empty() {
        return None;
    }

    if let Some(addresses) = ns.get("ipAddresses") {
        let list = |key: &str| -> Vec<String> {
            addresses
                .get(key)
                .and_then(|v| v.as_array())
                .map(|ips| {
                    ips.iter()
                        .filter_map(|ip| ip.as_str())
                        .map(|ip| ip.trim().to_string())
                        .filter(|ip| !ip.is_empty())
                        .collect()
                })
                .unwrap_or_default()
        };
        nameserver.ipv4 = list("v4");
        nameserver.ipv6 = list("v6");
    }

    Some(nameserver)
}

fn extract_dnssec(doc: &Value) -> Option<DnssecInfo> {
    let secure = doc.get("secureDNS")?;
    let delegation_signed = secure
        .get("delegationSigned")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let ds_records = secure
        .get("dsData")
        .and_then(|d| d.as_array())
        .map(|entries| {
            entries
                .iter()
                .map(|ds| DsRecord {
                    key_tag: ds.get("keyTag").and_then(|v| v.as_u64()).map(|v| v as u32),
                    algorithm: ds.get("algorithm").and_then(|v| v.as_u64()).map(|v| v as u8),
                    digest_type: ds.get("digestType").and_then(|v| v.as_u64()).map(|v| v as u8),
                    digest: ds.get("digest").and_then(|v| v.as_str()).map(String::from),
                })
                .collect()
        })
        .unwrap_or_default();

    Some(DnssecInfo {
        delegation_signed,
        ds_records,
    })
}

/// All entities of the document, nested ones included, depth first.
fn flatten_entities(doc: &Value) -> Vec<&Value> {
    let mut out = Vec::new();
    let mut stack: Vec<&Value> = doc
        .get("entities")
        .and_then(|e| e.as_array())
        .map(|e| e.iter().rev().collect())
        .unwrap_or_default();

    while let Some(entity) = stack.pop() {
        out.push(entity);
        if let Some(children) = entity.get("entities").and_then(|e| e.as_array()) {
            stack.extend(children.iter().rev());
        }
    }
    out
}

fn raw_roles(entity: &Value) -> Vec<String> {
    entity
        .get("roles")
        .and_then(|r| r.as_array())
        .map(|roles| {
            roles
                .iter()
                .filter_map(|r| r.as_str())
                .map(|r| r.trim().to_lowercase())
                .collect()
        })
        .unwrap_or_default()
}

fn has_raw_role(entity: &Value, role: &str) -> bool {
    raw_roles(entity).iter().any(|r| r == role)
}

fn entity_roles(entity: &Value) -> Vec<ContactRole> {
    let mut roles = Vec::new();
    for raw in raw_roles(entity) {
        if let Some(role) = ContactRole::from_rdap_role(&raw) {
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
    }
    roles
}

fn entity_handle(entity: &Value) -> Option<String> {
    entity
        .get("handle")
        .and_then(|h| h.as_str())
        .and_then(non_empty)
}

fn extract_registrar(entity: &Value, card: &VCard) -> RegistrarInfo {
    let iana_id = entity
        .get("publicIds")
        .and_then(|p| p.as_array())
        .and_then(|ids| {
            ids.iter().find(|id| {
                id.get("type")
                    .and_then(|t| t.as_str())
                    .map_or(false, |t| t.to_lowercase().contains("iana"))
            })
        })
        .and_then(|id| id.get("identifier"))
        .and_then(|i| match i {
            Value::String(s) => non_empty(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

    RegistrarInfo {
        name: card.display_name().or_else(|| entity_handle(entity)),
        iana_id,
        url: card.url.clone().or_else(|| {
            entity
                .get("links")
                .and_then(|l| l.as_array())
                .and_then(|links| {
                    links.iter().find(|l| {
                        l.get("rel").and_then(|r| r.as_str()) == Some("about")
                    })
                })
                .and_then(|l| l.get("href"))
                .and_then(|h| h.as_str())
                .map(String::from)
        }),
        email: card.email.clone(),
        phone: card.phone.clone(),
    }
}

/// RFC 9537 redaction markers on registrant members.
fn has_redacted_registrant(doc: &Value) -> bool {
    doc.get("redacted")
        .and_then(|r| r.as_array())
        .map_or(false, |entries| {
            entries.iter().any(|entry| {
                entry
                    .get("name")
                    .and_then(|n| n.get("type"))
                    .and_then(|t| t.as_str())
                    .map_or(false, |t| t.to_lowercase().contains("registrant"))
            })
        })
}

/// The subset of a jCard that registration data uses.
#[derive(Debug, Default, Clone, PartialEq)]
struct VCard {
    full_name: Option<String>,
    organization: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    fax: Option<String>,
    url: Option<String>,
    street: Vec<String>,
    city: Option<String>,
    region: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
}

impl VCard {
    fn from_entity(entity: &Value) -> Self {
        let mut card = VCard::default();
        let Some(properties) = entity
            .get("vcardArray")
            .and_then(|v| v.as_array())
            .and_then(|a| a.get(1))
            .and_then(|a| a.as_array())
        else {
            return card;
        };

        for property in properties {
            let Some(tuple) = property.as_array() else {
                continue;
            };
            if tuple.len() < 4 {
                continue;
            }
            let Some(name) = tuple[0].as_str() else {
                continue;
            };
            let params = &tuple[1];
            let value = &tuple[3];

            match name.to_lowercase().as_str() {
                "fn" => set_once(&mut card.full_name, text_value(value)),
                "org" => set_once(&mut card.organization, text_value(value)),
                "email" => set_once(&mut card.email, text_value(value)),
                "url" => set_once(&mut card.url, text_value(value)),
                "tel" => {
                    let number = text_value(value).map(|t| {
                        t.strip_prefix("tel:").map(String::from).unwrap_or(t)
                    });
                    if param_mentions(params, "type", "fax") {
                        set_once(&mut card.fax, number);
                    } else {
                        set_once(&mut card.phone, number);
                    }
                }
                "adr" => card.apply_address(params, value),
                _ => {}
            }
        }

        card
    }

    fn apply_address(&mut self, params: &Value, value: &Value) {
        if let Some(cc) = params.get("cc").and_then(|c| c.as_str()) {
            set_once(&mut self.country, non_empty(cc));
        }

        match value.as_array() {
            Some(parts) if parts.iter().any(|p| text_value(p).is_some()) => {
                // [pobox, ext, street, locality, region, code, country]
                let part = |idx: usize| parts.get(idx).and_then(text_value);
                if self.street.is_empty() {
                    if let Some(street) = parts.get(2) {
                        self.street = lines(street);
                    }
                }
                set_once(&mut self.city, part(3));
                set_once(&mut self.region, part(4));
                set_once(&mut self.postal_code, part(5));
                set_once(&mut self.country, part(6));
            }
            _ => {
                if self.street.is_empty() {
                    if let Some(label) = params.get("label").and_then(|l| l.as_str()) {
                        self.street = label
                            .lines()
                            .filter_map(non_empty)
                            .collect();
                    }
                }
            }
        }
    }

    fn display_name(&self) -> Option<String> {
        self.full_name.clone().or_else(|| self.organization.clone())
    }

    fn to_contact(&self, role: ContactRole) -> Contact {
        let mut contact = Contact::new(role);
        contact.name = self.full_name.clone();
        contact.organization = self.organization.clone();
        contact.email = self.email.clone();
        contact.phone = self.phone.clone();
        contact.fax = self.fax.clone();
        contact.street = self.street.clone();
        contact.city = self.city.clone();
        contact.state_province = self.region.clone();
        contact.postal_code = self.postal_code.clone();
        contact.country = self.country.clone();
        contact
    }
}

fn set_once(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

/// A jCard value as text: plain strings, or the first non-empty member of
/// a structured value.
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Array(items) => items.iter().find_map(text_value),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lines(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s.lines().filter_map(non_empty).collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|i| i.as_str())
            .filter_map(non_empty)
            .collect(),
        _ => Vec::new(),
    }
}

fn param_mentions(params: &Value, key: &str, needle: &str) -> bool {
    match params.get(key) {
        Some(Value::String(s)) => s.to_lowercase().contains(needle),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|i| i.as_str())
            .any(|s| s.to_lowercase().contains(needle)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn example_doc() -> Value {
        json!({
            "objectClassName": "domain",
            "ldhName": "EXAMPLE.COM",
            "status": [
                "client transfer prohibited",
                "clientDeleteProhibited"
            ],
            "events": [
                {"eventAction": "registration", "eventDate": "1995-08-14T04:00:00Z"},
                {"eventAction": "expiration", "eventDate": "2025-08-13T04:00:00Z"},
                {"eventAction": "last changed", "eventDate": "2024-08-14T07:01:34Z"},
                {"eventAction": "last update of RDAP database", "eventDate": "2024-09-01T00:00:00Z"}
            ],
            "nameservers": [
                {"ldhName": "A.IANA-SERVERS.NET", "ipAddresses": {"v4": ["199.43.135.53"], "v6": ["2001:500:8f::53"]}},
                {"ldhName": "a.iana-servers.net.", "ipAddresses": {"v4": ["199.43.135.54"]}},
                {"ldhName": "B.IANA-SERVERS.NET"}
            ],
            "secureDNS": {
                "delegationSigned": true,
                "dsData": [{"keyTag": 370, "algorithm": 13, "digestType": 2, "digest": "BE74"}]
            },
            "entities": [
                {
                    "objectClassName": "entity",
                    "handle": "376",
                    "roles": ["registrar"],
                    "publicIds": [{"type": "IANA Registrar ID", "identifier": "376"}],
                    "vcardArray": ["vcard", [
                        ["version", {}, "text", "4.0"],
                        ["fn", {}, "text", "Example Registrar"]
                    ]],
                    "entities": [{
                        "roles": ["abuse"],
                        "vcardArray": ["vcard", [
                            ["version", {}, "text", "4.0"],
                            ["fn", {}, "text", "Abuse Desk"],
                            ["tel", {"type": "voice"}, "uri", "tel:+1.5555551234"],
                            ["email", {}, "text", "abuse@registrar.example"]
                        ]]
                    }]
                },
                {
                    "roles": ["registrant"],
                    "vcardArray": ["vcard", [
                        ["version", {}, "text", "4.0"],
                        ["fn", {}, "text", "REDACTED FOR PRIVACY"],
                        ["org", {}, "text", "Example Org"],
                        ["adr", {"cc": "US"}, "text", ["", "", ["1 Main St", "Suite 2"], "Springfield", "IL", "62701", ""]],
                        ["tel", {"type": ["fax"]}, "uri", "tel:+1.5555550000"]
                    ]]
                }
            ]
        })
    }

    #[test]
    fn test_normalize_registrar_and_status() {
        let domain = DomainName::parse("example.com").unwrap();
        let record = normalize_rdap(&example_doc(), &domain);

        assert_eq!(record.source, RecordSource::Rdap);
        assert_eq!(record.tld, "com");
        assert!(record.is_registered);
        let registrar = record.registrar.unwrap();
        assert_eq!(registrar.name.as_deref(), Some("Example Registrar"));
        assert_eq!(registrar.iana_id.as_deref(), Some("376"));
        assert!(record.transfer_lock);
        assert_eq!(record.statuses[0].status, "clientTransferProhibited");
        assert_eq!(record.statuses[0].raw, "client transfer prohibited");
    }

    #[test]
    fn test_normalize_events_use_first_matching_rule() {
        let domain = DomainName::parse("example.com").unwrap();
        let record = normalize_rdap(&example_doc(), &domain);
        assert_eq!(record.creation_date.as_deref(), Some("1995-08-14T04:00:00Z"));
        assert_eq!(record.expiration_date.as_deref(), Some("2025-08-13T04:00:00Z"));
        assert_eq!(record.updated_date.as_deref(), Some("2024-08-14T07:01:34Z"));
        assert!(record.deletion_date.is_none());
    }

    #[test]
    fn test_normalize_nameservers_and_dnssec() {
        let domain = DomainName::parse("example.com").unwrap();
        let record = normalize_rdap(&example_doc(), &domain);

        assert_eq!(record.nameservers.len(), 2);
        assert_eq!(record.nameservers[0].host, "a.iana-servers.net");
        assert_eq!(record.nameservers[0].ipv4, vec!["199.43.135.53", "199.43.135.54"]);
        assert_eq!(record.nameservers[0].ipv6, vec!["2001:500:8f::53"]);

        let dnssec = record.dnssec.unwrap();
        assert!(dnssec.delegation_signed);
        assert_eq!(dnssec.ds_records[0].key_tag, Some(370));
    }

    #[test]
    fn test_nameserver_falls_back_to_unicode_name_when_ldh_name_is_null() {
        let domain = DomainName::parse("example.com").unwrap();
        let doc = json!({
            "ldhName": "example.com",
            "nameservers": [{"ldhName": null, "unicodeName": "ns1.example.com"}]
        });

        let record = normalize_rdap(&doc, &domain);
        assert_eq!(record.nameservers.len(), 1);
        assert_eq!(record.nameservers[0].host, "ns1.example.com");
    }

    #[test]
    fn test_normalize_contacts_from_nested_entities() {
        let domain = DomainName::parse("example.com").unwrap();
        let record = normalize_rdap(&example_doc(), &domain);

        let abuse = record
            .contacts
            .iter()
            .find(|c| c.role == ContactRole::Abuse)
            .unwrap();
        assert_eq!(abuse.phone.as_deref(), Some("+1.5555551234"));
        assert_eq!(abuse.email.as_deref(), Some("abuse@registrar.example"));

        let registrant = record
            .contacts
            .iter()
            .find(|c| c.role == ContactRole::Registrant)
            .unwrap();
        assert_eq!(registrant.street, vec!["1 Main St", "Suite 2"]);
        assert_eq!(registrant.city.as_deref(), Some("Springfield"));
        assert_eq!(registrant.country.as_deref(), Some("US"));
        assert_eq!(registrant.fax.as_deref(), Some("+1.5555550000"));
        assert!(registrant.phone.is_none());
        assert!(record.privacy_enabled);
    }

    #[test]
    fn test_registrar_falls_back_to_handle() {
        let doc = json!({
            "ldhName": "example.org",
            "entities": [{"handle": "REG-42", "roles": ["registrar"]}]
        });
        let domain = DomainName::parse("example.org").unwrap();
        let record = normalize_rdap(&doc, &domain);
        assert_eq!(
            record.registrar.and_then(|r| r.name),
            Some("REG-42".to_string())
        );
        assert!(!record.privacy_enabled);
    }

    #[test]
    fn test_label_address_and_unknown_role() {
        let doc = json!({
            "entities": [{
                "roles": ["sponsor"],
                "vcardArray": ["vcard", [
                    ["fn", {}, "text", "Someone"],
                    ["adr", {"label": "1 Main St\nSpringfield"}, "text", ["", "", "", "", "", "", ""]]
                ]]
            }]
        });
        let domain = DomainName::parse("example.net").unwrap();
        let record = normalize_rdap(&doc, &domain);
        assert_eq!(record.contacts.len(), 1);
        assert_eq!(record.contacts[0].role, ContactRole::Unknown);
        assert_eq!(record.contacts[0].street, vec!["1 Main St", "Springfield"]);
    }

    #[test]
    fn test_malformed_members_are_ignored() {
        let doc = json!({
            "status": "active",
            "events": [{"eventAction": 5}],
            "nameservers": [{"ldhName": null}],
            "entities": [{"vcardArray": "broken"}]
        });
        let domain = DomainName::parse("example.com").unwrap();
        let record = normalize_rdap(&doc, &domain);
        assert!(record.statuses.is_empty());
        assert!(record.nameservers.is_empty());
        assert!(record.contacts.is_empty());
    }

    #[test]
    fn test_idn_names() {
        let doc = json!({"ldhName": "xn--bcher-kva.de", "unicodeName": "bücher.de"});
        let domain = DomainName::parse("bücher.de").unwrap();
        let record = normalize_rdap(&doc, &domain);
        assert!(record.is_idn);
        assert_eq!(record.unicode_name.as_deref(), Some("bücher.de"));
        assert_eq!(record.punycode_name.as_deref(), Some("xn--bcher-kva.de"));
    }
}
