//! WHOIS text to [`DomainRecord`].
//!
//! WHOIS has no schema. Responses are tokenized into an ordered multimap of
//! keys to values, and each record field probes a list of synonym keys
//! until one yields a value.

use super::{is_transfer_locked, looks_private, merge_nameserver, non_empty, push_status};
use crate::normalize::availability::AvailabilityClassifier;
use crate::normalize::dates::normalize_date;
use crate::types::{
    Contact, ContactRole, DnssecInfo, DomainRecord, Nameserver, RecordSource, RegistrarInfo,
};
use crate::utils::DomainName;
use lazy_static::lazy_static;
use regex::Regex;
use std::net::{Ipv4Addr, Ipv6Addr};

lazy_static! {
    static ref BRACKET_LINE: Regex = Regex::new(r"^\s*\[([^\]]{1,80})\]\s*(.*)$").unwrap();
    static ref KEY_LINE: Regex = Regex::new(r"^\s*([^:\[\]]{1,80}?)\s*:(.*)$").unwrap();
}

const REGISTRAR_NAME_KEYS: &[&str] = &[
    "registrar",
    "registrar name",
    "sponsoring registrar",
    "registrar organization",
    "registrar organisation",
];
const REGISTRAR_IANA_KEYS: &[&str] = &["registrar iana id", "sponsoring registrar iana id"];
const REGISTRAR_URL_KEYS: &[&str] = &["registrar url", "registrar website", "referral url"];
const REGISTRAR_EMAIL_KEYS: &[&str] = &[
    "registrar email",
    "registrar e-mail",
    "registrar abuse contact email",
];
const REGISTRAR_PHONE_KEYS: &[&str] = &["registrar phone", "registrar abuse contact phone"];
const RESELLER_KEYS: &[&str] = &["reseller", "reseller name"];

const CREATED_KEYS: &[&str] = &[
    "creation date",
    "created date",
    "created on",
    "created",
    "registration date",
    "registration time",
    "registered on",
    "registered date",
    "registered",
    "domain registration date",
    "domain create date",
    "record created",
    "domain record activated",
];
const UPDATED_KEYS: &[&str] = &[
    "updated date",
    "last updated",
    "last updated on",
    "last updated date",
    "last modified",
    "last-update",
    "last update",
    "modified",
    "changed",
    "updated",
    "domain last updated date",
    "record last updated on",
];
const EXPIRES_KEYS: &[&str] = &[
    "registry expiry date",
    "registrar registration expiration date",
    "expiration date",
    "expiry date",
    "expiration time",
    "expires on",
    "expires",
    "expire date",
    "expire",
    "paid-till",
    "renewal date",
    "valid until",
    "domain expiration date",
    "record expires on",
];
const DELETED_KEYS: &[&str] = &["deletion date", "delete date", "scheduled deletion date"];

const STATUS_KEYS: &[&str] = &["domain status", "status", "registration status", "state"];
const NAMESERVER_KEYS: &[&str] = &[
    "name server",
    "name servers",
    "nameserver",
    "nameservers",
    "nserver",
    "ns",
    "dns",
    "host name",
    "domain servers in listed order",
];
const DNSSEC_KEYS: &[&str] = &["dnssec", "dnssec status", "signing key"];

/// Key prefixes introducing each contact role, in probe order.
const CONTACT_PREFIXES: &[(ContactRole, &[&str])] = &[
    (ContactRole::Registrant, &["registrant", "owner", "holder"]),
    (ContactRole::Admin, &["admin", "administrative contact", "administrative"]),
    (ContactRole::Tech, &["tech", "technical contact", "technical"]),
    (ContactRole::Billing, &["billing", "billing contact"]),
];

/// Ordered multimap of WHOIS keys to values.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WhoisFields {
    entries: Vec<(String, String)>,
}

impl WhoisFields {
    /// Tokenize a WHOIS response.
    ///
    /// Recognizes `Key: value` and `[Key] value` lines; an indented line that
    /// is neither continues the previous key. Comment lines starting with
    /// `%`, `#` or `>>>` are skipped.
    pub fn parse(text: &str) -> Self {
        let mut entries: Vec<(String, String)> = Vec::new();
        let mut last_key: Option<String> = None;

        for raw_line in text.lines() {
            let line = raw_line.trim_end_matches('\r');
            let trimmed = line.trim();

            if trimmed.is_empty() {
                last_key = None;
                continue;
            }
            if trimmed.starts_with('%') || trimmed.starts_with('#') || trimmed.starts_with(">>>") {
                continue;
            }

            if let Some((key, value)) = split_key_line(line) {
                if let Some(value) = non_empty(&value) {
                    entries.push((key.clone(), value));
                }
                last_key = Some(key);
                continue;
            }

            let indented = line.starts_with(' ') || line.starts_with('\t');
            match (&last_key, indented) {
                (Some(key), true) => entries.push((key.clone(), trimmed.to_string())),
                _ => last_key = None,
            }
        }

        Self { entries }
    }

    /// Every value recorded for `key`, in order.
    pub fn all(&self, key: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// First value of the first synonym that has one.
    pub fn first(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .find_map(|key| self.all(key).into_iter().find_map(non_empty))
    }

    /// All values of the first synonym that has any.
    pub fn first_list(&self, keys: &[&str]) -> Vec<String> {
        keys.iter()
            .map(|key| self.all(key))
            .find(|values| !values.is_empty())
            .map(|values| values.into_iter().map(String::from).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches('.')
        .trim()
        .to_lowercase()
}

fn split_key_line(line: &str) -> Option<(String, String)> {
    if let Some(caps) = BRACKET_LINE.captures(line) {
        return Some((normalize_key(&caps[1]), caps[2].trim().to_string()));
    }

    let caps = KEY_LINE.captures(line)?;
    let key = caps[1].trim();
    let value = caps[2].trim();

    if value.starts_with("//") {
        return None;
    }
    if !key.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    // A dot inside the key means a host name or address, not a label.
    if key.trim_end_matches('.').contains('.') {
        return None;
    }

    Some((normalize_key(key), value.to_string()))
}

/// Build a record from one WHOIS response.
pub fn normalize_whois(
    text: &str,
    server: &str,
    domain: &DomainName,
    classifier: &dyn AvailabilityClassifier,
) -> DomainRecord {
    let fields = WhoisFields::parse(text);
    let mut record = DomainRecord::new(domain.ascii.clone(), domain.suffix.clone(), RecordSource::Whois);

    record.is_registered = !classifier.looks_unregistered(text);
    record.is_idn = domain.is_idn();
    if record.is_idn {
        record.unicode_name = Some(domain.unicode.clone());
        record.punycode_name = Some(domain.ascii.clone());
    }
    record.whois_server = non_empty(server).map(|s| s.to_lowercase());

    let registrar = RegistrarInfo {
        name: fields.first(REGISTRAR_NAME_KEYS),
        iana_id: fields.first(REGISTRAR_IANA_KEYS),
        url: fields.first(REGISTRAR_URL_KEYS),
        email: fields.first(REGISTRAR_EMAIL_KEYS),
        phone: fields.first(REGISTRAR_PHONE_KEYS),
    };
    if !registrar.is_empty() {
        record.registrar = Some(registrar);
    }
    record.reseller = fields.first(RESELLER_KEYS);

    record.creation_date = fields.first(CREATED_KEYS).map(|d| normalize_date(&d));
    record.updated_date = fields.first(UPDATED_KEYS).map(|d| normalize_date(&d));
    record.expiration_date = fields.first(EXPIRES_KEYS).map(|d| normalize_date(&d));
    record.deletion_date = fields.first(DELETED_KEYS).map(|d| normalize_date(&d));

    for status in fields.first_list(STATUS_KEYS) {
        push_status(&mut record.statuses, &status);
    }
    record.transfer_lock = is_transfer_locked(&record.statuses);

    for value in fields.first_list(NAMESERVER_KEYS) {
        if let Some(nameserver) = parse_nameserver(&value) {
            merge_nameserver(&mut record.nameservers, nameserver);
        }
    }

    record.dnssec = fields.first(DNSSEC_KEYS).map(|value| {
        let lower = value.to_lowercase();
        DnssecInfo {
            delegation_signed: !lower.contains("unsigned")
                && (lower.contains("signed") || lower == "yes" || lower == "true"),
            ds_records: Vec::new(),
        }
    });

    for (role, prefixes) in CONTACT_PREFIXES {
        if let Some(contact) = extract_contact(&fields, *role, prefixes) {
            record.contacts.push(contact);
        }
    }

    let abuse_email = fields.first(&["registrar abuse contact email", "abuse contact email", "abuse email"]);
    let abuse_phone = fields.first(&["registrar abuse contact phone", "abuse contact phone", "abuse phone"]);
    if abuse_email.is_some() || abuse_phone.is_some() {
        let mut abuse = Contact::new(ContactRole::Abuse);
        abuse.email = abuse_email;
        abuse.phone = abuse_phone;
        record.contacts.push(abuse);
    }

    record.privacy_enabled = record
        .contacts
        .iter()
        .filter(|c| c.role == ContactRole::Registrant)
        .any(|c| {
            c.name.as_deref().map_or(false, looks_private)
                || c.organization.as_deref().map_or(false, looks_private)
        });

    record
}

/// Split a nameserver value into host and glue addresses.
fn parse_nameserver(value: &str) -> Option<Nameserver> {
    let mut tokens = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty());

    let host = tokens.next()?;
    if !host.contains('.') || host.parse::<Ipv4Addr>().is_ok() {
        return None;
    }

    let mut nameserver = Nameserver::new(host);
    for token in tokens {
        let token = token.trim_matches(|c: char| c == '(' || c == ')');
        if token.parse::<Ipv4Addr>().is_ok() {
            if !nameserver.ipv4.iter().any(|ip| ip == token) {
                nameserver.ipv4.push(token.to_string());
            }
        } else if token.parse::<Ipv6Addr>().is_ok() {
            let lower = token.to_lowercase();
            if !nameserver.ipv6.contains(&lower) {
                nameserver.ipv6.push(lower);
            }
        }
    }

    Some(nameserver)
}

fn extract_contact(fields: &WhoisFields, role: ContactRole, prefixes: &[&str]) -> Option<Contact> {
    let probe = |suffixes: &[&str]| -> Option<String> {
        prefixes.iter().find_map(|prefix| {
            let keys: Vec<String> = suffixes
                .iter()
                .map(|suffix| {
                    if suffix.is_empty() {
                        prefix.to_string()
                    } else {
                        format!("{} {}", prefix, suffix)
                    }
                })
                .collect();
            let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            fields.first(&refs)
        })
    };

    let mut contact = Contact::new(role);
    contact.name = probe(&["name", "contact name", ""]);
    contact.organization = probe(&["organization", "organisation", "org", "company"]);
    contact.email = probe(&["email", "e-mail", "contact email"]);
    contact.phone = probe(&["phone", "phone number", "telephone"]);
    contact.fax = probe(&["fax", "fax number", "facsimile"]);
    contact.city = probe(&["city"]);
    contact.state_province = probe(&["state/province", "state", "province"]);
    contact.postal_code = probe(&["postal code", "postcode", "zip", "zip code"]);
    contact.country = probe(&["country", "country code"]);

    for prefix in prefixes {
        let mut street = Vec::new();
        for suffix in ["street", "street1", "street2", "street3", "address"] {
            street.extend(
                fields
                    .all(&format!("{} {}", prefix, suffix))
                    .into_iter()
                    .filter_map(non_empty),
            );
        }
        if !street.is_empty() {
            contact.street = street;
            break;
        }
    }

    if contact.is_empty() {
        None
    } else {
        Some(contact)
    }
}
