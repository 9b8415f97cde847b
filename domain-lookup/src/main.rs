//! Domain Lookup CLI Application
//!
//! A command-line interface for looking up domain registration data over
//! RDAP with WHOIS fallback. This CLI is a thin layer over domain-lookup-lib.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use console::Term;
use domain_lookup_lib::{lookup_with, DomainLookup, LookupOptions};
use domain_lookup_lib::{load_env_config, parse_timeout_string, ConfigManager, FileConfig};
use std::error::Error;
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for domain-lookup
#[derive(Parser, Debug)]
#[command(name = "domain-lookup")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sai Dutt G.V <gvs46@protonmail.com>")]
#[command(about = "Look up domain registration data over RDAP with WHOIS fallback")]
#[command(
    long_about = "Look up domain registration data over RDAP with automatic WHOIS fallback.\n\nRegistrar, dates, statuses, nameservers, DNSSEC and contacts are normalized into one record regardless of which protocol answered."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domain name to look up (Unicode names are accepted)
    #[arg(value_name = "DOMAIN")]
    pub domain: String,

    /// Output the result as JSON
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Include raw RDAP documents and WHOIS text in the output
    #[arg(long = "raw", help_heading = "Output Format")]
    pub raw: bool,

    /// Per-operation timeout (e.g. 1500ms, 15s, 2m)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Protocol")]
    pub timeout: Option<String>,

    /// Use RDAP only, never fall back to WHOIS
    #[arg(long = "rdap-only", conflicts_with = "whois_only", help_heading = "Protocol")]
    pub rdap_only: bool,

    /// Skip RDAP and go straight to WHOIS
    #[arg(long = "whois-only", help_heading = "Protocol")]
    pub whois_only: bool,

    /// Do not follow registrar WHOIS referrals
    #[arg(long = "no-referral", help_heading = "WHOIS")]
    pub no_referral: bool,

    /// Maximum WHOIS referral hops (0-10)
    #[arg(
        long = "max-whois-hops",
        value_name = "N",
        value_parser = clap::value_parser!(u8).range(0..=10),
        help_heading = "WHOIS"
    )]
    pub max_whois_hops: Option<u8>,

    /// WHOIS server for a TLD, as TLD=HOST (repeatable)
    #[arg(
        long = "whois-server",
        value_name = "TLD=HOST",
        action = clap::ArgAction::Append,
        help_heading = "WHOIS"
    )]
    pub whois_servers: Vec<String>,

    /// Do not follow RDAP related links
    #[arg(long = "no-rdap-links", help_heading = "RDAP")]
    pub no_rdap_links: bool,

    /// Maximum RDAP link hops (0-10)
    #[arg(
        long = "max-rdap-hops",
        value_name = "N",
        value_parser = clap::value_parser!(u8).range(0..=10),
        help_heading = "RDAP"
    )]
    pub max_rdap_hops: Option<u8>,

    /// Link relation to follow (repeatable, replaces the defaults)
    #[arg(
        long = "rdap-rel",
        value_name = "REL",
        action = clap::ArgAction::Append,
        help_heading = "RDAP"
    )]
    pub rdap_rels: Vec<String>,

    /// Fetch the RDAP bootstrap registry from this URL
    #[arg(long = "bootstrap-url", value_name = "URL", conflicts_with = "bootstrap_file", help_heading = "RDAP")]
    pub bootstrap_url: Option<String>,

    /// Read the RDAP bootstrap registry from a local JSON file
    #[arg(long = "bootstrap-file", value_name = "FILE", help_heading = "RDAP")]
    pub bootstrap_file: Option<String>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show debug logging and timing
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args);

    match run_lookup(args).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Install the stderr log subscriber.
///
/// `-d` and `-v` take precedence over `RUST_LOG`; without either, `RUST_LOG`
/// is honoured and defaults to warnings only.
fn init_logging(args: &Args) {
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(args.debug)
        .init();
}

/// Run one lookup and print it. Returns whether the lookup succeeded.
async fn run_lookup(args: Args) -> Result<bool, Box<dyn Error>> {
    let options = build_options(&args)?;
    let engine = DomainLookup::with_options(options);

    let spinner = (!args.json && Term::stderr().is_term())
        .then(|| ui::Spinner::start(format!("Looking up {}...", args.domain)));
    let started = Instant::now();
    let outcome = lookup_with(&engine, &args.domain).await;
    if let Some(spinner) = spinner {
        spinner.stop().await;
    }
    let result = outcome?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        ui::print_result(&args.domain, &result, args.debug, started.elapsed());
    }

    Ok(result.ok)
}

/// Build lookup options from all sources.
///
/// Precedence (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables (DL_*)
/// 3. Config file (--config, DL_CONFIG, or discovered)
/// 4. Built-in defaults
fn build_options(args: &Args) -> Result<LookupOptions, Box<dyn Error>> {
    let config_manager = ConfigManager::new();
    let env_config = load_env_config();

    let explicit_path = args.config.as_ref().or(env_config.config.as_ref());
    let file_config = match explicit_path {
        Some(path) => {
            tracing::debug!(path = %path, "Using explicit config file");
            config_manager
                .load_file(path)
                .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?
        }
        None => config_manager.discover_and_load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Config discovery failed");
            FileConfig::default()
        }),
    };

    let options = file_config.apply_to(LookupOptions::default());
    let options = env_config.apply_to(options);
    apply_cli_args(options, args)
}

fn apply_cli_args(
    mut options: LookupOptions,
    args: &Args,
) -> Result<LookupOptions, Box<dyn Error>> {
    if let Some(timeout) = &args.timeout {
        options.timeout = parse_timeout_string(timeout).ok_or_else(|| {
            format!(
                "Invalid timeout '{}'. Use format like '1500ms', '15s', '2m'",
                timeout
            )
        })?;
    }

    if args.rdap_only {
        options.rdap_only = true;
        options.whois_only = false;
    }
    if args.whois_only {
        options.whois_only = true;
        options.rdap_only = false;
    }
    if args.no_referral {
        options.follow_whois_referral = false;
    }
    if let Some(hops) = args.max_whois_hops {
        options.max_whois_referral_hops = usize::from(hops);
    }
    if args.no_rdap_links {
        options.rdap_follow_links = false;
    }
    if let Some(hops) = args.max_rdap_hops {
        options.max_rdap_link_hops = usize::from(hops);
    }
    if !args.rdap_rels.is_empty() {
        options.rdap_link_rels = args.rdap_rels.clone();
    }

    if let Some(url) = &args.bootstrap_url {
        options.custom_bootstrap_url = Some(url.clone());
    }
    if let Some(path) = &args.bootstrap_file {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read bootstrap file '{}': {}", path, e))?;
        let document: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| format!("Bootstrap file '{}' is not valid JSON: {}", path, e))?;
        options.custom_bootstrap_data = Some(document);
    }

    for entry in &args.whois_servers {
        let (tld, host) = parse_whois_server(entry)?;
        options = options.with_whois_hint(tld, host);
    }

    if args.raw {
        options.include_raw = true;
    }

    Ok(options)
}

/// Parse a `TLD=HOST` pair.
fn parse_whois_server(entry: &str) -> Result<(&str, String), String> {
    match entry.split_once('=') {
        Some((tld, host)) if !tld.trim().is_empty() && !host.trim().is_empty() => {
            Ok((tld.trim(), host.trim().to_string()))
        }
        _ => Err(format!(
            "Invalid --whois-server '{}'. Use TLD=HOST, e.g. io=whois.nic.io",
            entry
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["domain-lookup", "example.com"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_parse_whois_server() {
        assert_eq!(
            parse_whois_server("io=whois.nic.io").unwrap(),
            ("io", "whois.nic.io".to_string())
        );
        assert!(parse_whois_server("io").is_err());
        assert!(parse_whois_server("=whois.nic.io").is_err());
        assert!(parse_whois_server("io= ").is_err());
    }

    #[test]
    fn test_cli_args_override_options() {
        let base = LookupOptions::default().with_whois_only(true);
        let options = apply_cli_args(
            base,
            &args(&[
                "--rdap-only",
                "--timeout",
                "1500ms",
                "--max-whois-hops",
                "4",
                "--rdap-rel",
                "related",
                "--whois-server",
                "IO=whois.nic.io",
                "--raw",
            ]),
        )
        .unwrap();

        assert!(options.rdap_only);
        assert!(!options.whois_only);
        assert_eq!(options.timeout, std::time::Duration::from_millis(1500));
        assert_eq!(options.max_whois_referral_hops, 4);
        assert_eq!(options.rdap_link_rels, vec!["related"]);
        assert_eq!(
            options.whois_hints.get("io").map(String::as_str),
            Some("whois.nic.io")
        );
        assert!(options.include_raw);
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let result = apply_cli_args(LookupOptions::default(), &args(&["--timeout", "soon"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_hop_limits_are_bounded() {
        let result = Args::try_parse_from(["domain-lookup", "example.com", "--max-rdap-hops", "11"]);
        assert!(result.is_err());
    }
}
