//! Shared fixtures for the library integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use domain_lookup_lib::{DomainLookupError, WhoisTransport};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// In-memory WHOIS transport answering from a per-server script.
#[derive(Default)]
pub struct ScriptedWhois {
    responses: HashMap<String, String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedWhois {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, server: &str, text: &str) -> Self {
        self.responses.insert(server.to_string(), text.to_string());
        self
    }

    /// Servers queried so far, in order.
    pub fn servers(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(server, _)| server.clone())
            .collect()
    }

    /// `(server, query)` pairs seen so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WhoisTransport for ScriptedWhois {
    async fn query(
        &self,
        server: &str,
        domain: &str,
        _timeout: Duration,
    ) -> Result<String, DomainLookupError> {
        self.calls
            .lock()
            .unwrap()
            .push((server.to_string(), domain.to_string()));
        self.responses
            .get(server)
            .cloned()
            .ok_or_else(|| DomainLookupError::whois(server, "Connection refused"))
    }
}

pub fn iana_referral(tld: &str, server: &str) -> String {
    format!(
        "% IANA WHOIS server\n\nrefer:        {}\n\ndomain:       {}\n\nstatus:       ACTIVE\n",
        server,
        tld.to_uppercase()
    )
}

/// Bootstrap document mapping each TLD to the given base URLs.
pub fn bootstrap_for(tlds: &[&str], base_urls: &[String]) -> Value {
    json!({
        "version": "1.0",
        "publication": "2024-01-01T00:00:00Z",
        "description": "Test bootstrap",
        "services": [[tlds, base_urls]]
    })
}

pub fn vcard(name: &str, email: &str) -> Value {
    json!(["vcard", [
        ["version", {}, "text", "4.0"],
        ["fn", {}, "text", name],
        ["email", {}, "text", email]
    ]])
}

/// RDAP document for example.com, trimmed from a real registry answer.
pub fn example_com_rdap() -> Value {
    json!({
        "objectClassName": "domain",
        "handle": "2336799_DOMAIN_COM-VRSN",
        "ldhName": "EXAMPLE.COM",
        "status": [
            "client delete prohibited",
            "client transfer prohibited",
            "client update prohibited"
        ],
        "events": [
            {"eventAction": "registration", "eventDate": "1995-08-14T04:00:00Z"},
            {"eventAction": "expiration", "eventDate": "2026-08-13T04:00:00Z"},
            {"eventAction": "last changed", "eventDate": "2024-08-14T07:01:34Z"}
        ],
        "entities": [{
            "objectClassName": "entity",
            "handle": "376",
            "roles": ["registrar"],
            "publicIds": [{"type": "IANA Registrar ID", "identifier": "376"}],
            "vcardArray": ["vcard", [
                ["version", {}, "text", "4.0"],
                ["fn", {}, "text", "RESERVED-Internet Assigned Numbers Authority"]
            ]]
        }],
        "nameservers": [
            {"objectClassName": "nameserver", "ldhName": "A.IANA-SERVERS.NET"},
            {"objectClassName": "nameserver", "ldhName": "B.IANA-SERVERS.NET"}
        ],
        "secureDNS": {
            "delegationSigned": true,
            "dsData": [{"keyTag": 370, "algorithm": 13, "digestType": 2, "digest": "BE74359954660069D5C63D200C39F5603827D7DD02B56F120EE9F3A86764247C"}]
        }
    })
}

pub const VERISIGN_EXAMPLE_COM: &str = "   Domain Name: EXAMPLE.COM
   Registry Domain ID: 2336799_DOMAIN_COM-VRSN
   Updated Date: 2024-08-14T07:01:34Z
   Creation Date: 1995-08-14T04:00:00Z
   Registry Expiry Date: 2026-08-13T04:00:00Z
   Registrar: RESERVED-Internet Assigned Numbers Authority
   Registrar IANA ID: 376
   Domain Status: clientTransferProhibited https://icann.org/epp#clientTransferProhibited
   Name Server: A.IANA-SERVERS.NET
   Name Server: B.IANA-SERVERS.NET
   DNSSEC: signedDelegation
";
