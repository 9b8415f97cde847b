//! Text-mode display logic for the domain-lookup CLI.
//!
//! Renders a normalized record as labelled sections and shows a spinner on
//! stderr while a lookup runs. Uses only the `console` crate.

use console::{pad_str, style, Alignment, Term};
use domain_lookup_lib::{DomainRecord, LookupResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner that writes to stderr so stdout stays clean.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    /// Start a new spinner with the given message (e.g. "Looking up example.com...").
    pub fn start(message: String) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = tokio::spawn(async move {
            let term = Term::stderr();
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let _ = term.clear_line();
                let _ = term.write_str(&format!("{} {}", style(frame).cyan(), message));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Stop the spinner and clear the line.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

// ── Result ───────────────────────────────────────────────────────────────────

const LABEL_WIDTH: usize = 14;

/// Print a lookup outcome: the full record, or a one-line failure.
pub fn print_result(domain: &str, result: &LookupResult, debug: bool, elapsed: Duration) {
    match (&result.record, &result.error) {
        (Some(record), _) => print_record(record),
        (None, error) => {
            println!(
                "{}  {}  {}",
                style(domain).bold(),
                style("UNKNOWN").yellow().bold(),
                style(error.as_deref().unwrap_or("lookup failed")).dim(),
            );
        }
    }

    if debug {
        println!();
        println!(
            "{} Finished in {}ms",
            style("└─").dim(),
            elapsed.as_millis()
        );
    }
}

fn print_record(record: &DomainRecord) {
    let verdict = if record.is_registered {
        style("REGISTERED").red().bold()
    } else {
        style("NOT REGISTERED").green().bold()
    };
    println!(
        "{}  {}  {}",
        style(&record.domain).bold(),
        verdict,
        style(format!("via {}", record.source.to_string().to_uppercase())).dim(),
    );
    if let Some(unicode) = &record.unicode_name {
        field("Unicode", unicode);
    }

    if let Some(registrar) = &record.registrar {
        section("Registrar");
        optional("Name", registrar.name.as_deref());
        optional("IANA ID", registrar.iana_id.as_deref());
        optional("URL", registrar.url.as_deref());
        optional("Email", registrar.email.as_deref());
        optional("Phone", registrar.phone.as_deref());
    }
    if record.reseller.is_some() || record.registry.is_some() {
        section("Parties");
        optional("Reseller", record.reseller.as_deref());
        optional("Registry", record.registry.as_deref());
    }

    if record.creation_date.is_some()
        || record.updated_date.is_some()
        || record.expiration_date.is_some()
        || record.deletion_date.is_some()
    {
        section("Dates");
        optional("Created", record.creation_date.as_deref());
        optional("Updated", record.updated_date.as_deref());
        optional("Expires", record.expiration_date.as_deref());
        optional("Deletion", record.deletion_date.as_deref());
    }

    if !record.statuses.is_empty() {
        section("Status");
        for status in &record.statuses {
            println!("  {}", status.status);
        }
        field(
            "Transfer lock",
            if record.transfer_lock { "yes" } else { "no" },
        );
    }

    if !record.nameservers.is_empty() {
        section("Nameservers");
        for ns in &record.nameservers {
            let glue: Vec<&str> = ns
                .ipv4
                .iter()
                .chain(ns.ipv6.iter())
                .map(String::as_str)
                .collect();
            if glue.is_empty() {
                println!("  {}", ns.host);
            } else {
                println!("  {}  {}", ns.host, style(glue.join(", ")).dim());
            }
        }
    }

    if let Some(dnssec) = &record.dnssec {
        section("DNSSEC");
        field(
            "Signed",
            if dnssec.delegation_signed { "yes" } else { "no" },
        );
        for ds in &dnssec.ds_records {
            println!(
                "  {} {} {} {}",
                opt_num(ds.key_tag),
                opt_num(ds.algorithm),
                opt_num(ds.digest_type),
                ds.digest.as_deref().unwrap_or("-"),
            );
        }
    }

    if !record.contacts.is_empty() || record.privacy_enabled {
        section("Contacts");
        for contact in &record.contacts {
            let who: Vec<&str> = [
                contact.name.as_deref(),
                contact.organization.as_deref(),
                contact.email.as_deref(),
                contact.country.as_deref(),
            ]
            .into_iter()
            .flatten()
            .collect();
            field(&contact.role.to_string(), &who.join(", "));
        }
        if record.privacy_enabled {
            field("Privacy", "registrant data is redacted or proxied");
        }
    }

    if record.whois_server.is_some() || !record.rdap_servers.is_empty() {
        section("Sources");
        optional("WHOIS server", record.whois_server.as_deref());
        for server in &record.rdap_servers {
            field("RDAP", server);
        }
    }

    if !record.warnings.is_empty() {
        section("Warnings");
        for warning in &record.warnings {
            println!("  {} {}", style("!").yellow().bold(), warning);
        }
    }

    if let Some(raw) = &record.raw_whois {
        section("Raw WHOIS");
        println!("{}", raw.trim_end());
    }
    if let Some(raw) = &record.raw_rdap {
        section("Raw RDAP");
        println!(
            "{}",
            serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string())
        );
    }
}

fn section(title: &str) {
    println!();
    println!(
        "{} {}",
        style(format!("── {} ", title)).cyan().bold(),
        style("─".repeat(40usize.saturating_sub(title.len()))).cyan().dim(),
    );
}

fn field(label: &str, value: &str) {
    let padded = pad_str(label, LABEL_WIDTH, Alignment::Left, Some(".."));
    println!("  {} {}", style(padded).dim(), value);
}

fn optional(label: &str, value: Option<&str>) {
    if let Some(value) = value {
        field(label, value);
    }
}

fn opt_num<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
