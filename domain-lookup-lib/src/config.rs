//! Configuration file and environment variable handling.
//!
//! Options can come from TOML files, `DL_*` environment variables and the
//! command line. This module covers the first two and knows how to fold
//! them into a [`LookupOptions`].

use crate::error::DomainLookupError;
use crate::types::LookupOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for both referral and link hop limits.
pub const MAX_HOP_LIMIT: usize = 10;

/// Main configuration structure loaded from TOML files.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct FileConfig {
    /// Default lookup options
    #[serde(default)]
    pub defaults: Option<DefaultsConfig>,

    /// WHOIS server overrides, keyed by TLD or suffix
    #[serde(default)]
    pub whois_hints: Option<HashMap<String, String>>,
}

/// Default values for lookup options.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Per-operation timeout ("15s", "1500ms", "2m")
    pub timeout: Option<String>,

    pub rdap_only: Option<bool>,

    pub whois_only: Option<bool>,

    /// Follow registrar WHOIS referrals
    pub follow_referral: Option<bool>,

    pub max_whois_hops: Option<usize>,

    /// Follow RDAP related links
    pub rdap_links: Option<bool>,

    pub max_rdap_hops: Option<usize>,

    /// Link relations worth following
    pub rdap_rels: Option<Vec<String>>,

    /// Replacement for the IANA bootstrap registry URL
    pub bootstrap_url: Option<String>,

    /// Keep raw RDAP documents and WHOIS text on the record
    pub include_raw: Option<bool>,
}

impl FileConfig {
    /// Apply file values on top of `options`.
    pub fn apply_to(&self, mut options: LookupOptions) -> LookupOptions {
        if let Some(defaults) = &self.defaults {
            if let Some(timeout) = defaults.timeout.as_deref().and_then(parse_timeout_string) {
                options.timeout = timeout;
            }
            if let Some(v) = defaults.rdap_only {
                options.rdap_only = v;
                if v {
                    options.whois_only = false;
                }
            }
            if let Some(v) = defaults.whois_only {
                options.whois_only = v;
                if v {
                    options.rdap_only = false;
                }
            }
            if let Some(v) = defaults.follow_referral {
                options.follow_whois_referral = v;
            }
            if let Some(v) = defaults.max_whois_hops {
                options.max_whois_referral_hops = v;
            }
            if let Some(v) = defaults.rdap_links {
                options.rdap_follow_links = v;
            }
            if let Some(v) = defaults.max_rdap_hops {
                options.max_rdap_link_hops = v;
            }
            if let Some(rels) = &defaults.rdap_rels {
                options.rdap_link_rels = rels.clone();
            }
            if let Some(url) = &defaults.bootstrap_url {
                options.custom_bootstrap_url = Some(url.clone());
            }
            if let Some(v) = defaults.include_raw {
                options.include_raw = v;
            }
        }

        if let Some(hints) = &self.whois_hints {
            for (tld, server) in hints {
                options = options.with_whois_hint(tld, server.clone());
            }
        }

        options
    }
}

/// Configuration discovery and loading functionality.
#[derive(Debug, Clone, Default)]
pub struct ConfigManager;

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a specific file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The parsed and validated configuration, or an error if the file is
    /// missing, unreadable or invalid.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, DomainLookupError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DomainLookupError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DomainLookupError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            DomainLookupError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// Lowest to highest: `$XDG_CONFIG_HOME/domain-lookup/config.toml`,
    /// `$HOME/.domain-lookup.toml`, then a file in the current directory.
    /// Files that fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, DomainLookupError> {
        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        let mut merged = FileConfig::default();
        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    tracing::debug!(path = %path.display(), "Loaded configuration file");
                    merged = self.merge_configs(merged, config);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping configuration file");
                }
            }
        }

        Ok(merged)
    }

    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./domain-lookup.toml", "./.domain-lookup.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        let path = Path::new(&home).join(".domain-lookup.toml");
        path.exists().then_some(path)
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("domain-lookup").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations; values from `higher` win.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower), Some(higher)) => Some(DefaultsConfig {
                    timeout: higher.timeout.or(lower.timeout),
                    // Selecting one protocol in a higher file drops the
                    // other protocol's selection from lower files.
                    rdap_only: if higher.whois_only == Some(true) {
                        higher.rdap_only
                    } else {
                        higher.rdap_only.or(lower.rdap_only)
                    },
                    whois_only: if higher.rdap_only == Some(true) {
                        higher.whois_only
                    } else {
                        higher.whois_only.or(lower.whois_only)
                    },
                    follow_referral: higher.follow_referral.or(lower.follow_referral),
                    max_whois_hops: higher.max_whois_hops.or(lower.max_whois_hops),
                    rdap_links: higher.rdap_links.or(lower.rdap_links),
                    max_rdap_hops: higher.max_rdap_hops.or(lower.max_rdap_hops),
                    rdap_rels: higher.rdap_rels.or(lower.rdap_rels),
                    bootstrap_url: higher.bootstrap_url.or(lower.bootstrap_url),
                    include_raw: higher.include_raw.or(lower.include_raw),
                }),
                (lower, higher) => higher.or(lower),
            },
            whois_hints: match (lower.whois_hints, higher.whois_hints) {
                (Some(mut lower_hints), Some(higher_hints)) => {
                    lower_hints.extend(higher_hints);
                    Some(lower_hints)
                }
                (lower, higher) => higher.or(lower),
            },
        }
    }

    /// Validate a configuration for common issues.
    pub fn validate_config(&self, config: &FileConfig) -> Result<(), DomainLookupError> {
        if let Some(defaults) = &config.defaults {
            if let Some(timeout_str) = &defaults.timeout {
                if parse_timeout_string(timeout_str).is_none() {
                    return Err(DomainLookupError::config(format!(
                        "Invalid timeout format '{}'. Use format like '1500ms', '15s', '2m'",
                        timeout_str
                    )));
                }
            }

            for (key, hops) in [
                ("max_whois_hops", defaults.max_whois_hops),
                ("max_rdap_hops", defaults.max_rdap_hops),
            ] {
                if hops.map_or(false, |h| h > MAX_HOP_LIMIT) {
                    return Err(DomainLookupError::config(format!(
                        "{} must be between 0 and {}",
                        key, MAX_HOP_LIMIT
                    )));
                }
            }

            if defaults.rdap_only == Some(true) && defaults.whois_only == Some(true) {
                return Err(DomainLookupError::config(
                    "Cannot enable both 'rdap_only' and 'whois_only' in defaults",
                ));
            }
        }

        if let Some(hints) = &config.whois_hints {
            for (tld, server) in hints {
                if tld.trim().is_empty() {
                    return Err(DomainLookupError::config("WHOIS hint keys cannot be empty"));
                }
                if server.trim().is_empty() {
                    return Err(DomainLookupError::config(format!(
                        "WHOIS hint for '{}' has an empty server",
                        tld
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub timeout: Option<Duration>,
    pub rdap_only: Option<bool>,
    pub whois_only: Option<bool>,
    pub follow_referral: Option<bool>,
    pub max_whois_hops: Option<usize>,
    pub rdap_links: Option<bool>,
    pub max_rdap_hops: Option<usize>,
    pub bootstrap_url: Option<String>,
    pub include_raw: Option<bool>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Apply environment values on top of `options`.
    pub fn apply_to(&self, mut options: LookupOptions) -> LookupOptions {
        if let Some(timeout) = self.timeout {
            options.timeout = timeout;
        }
        if let Some(v) = self.rdap_only {
            options.rdap_only = v;
            if v {
                options.whois_only = false;
            }
        }
        if let Some(v) = self.whois_only {
            options.whois_only = v;
            if v {
                options.rdap_only = false;
            }
        }
        if let Some(v) = self.follow_referral {
            options.follow_whois_referral = v;
        }
        if let Some(v) = self.max_whois_hops {
            options.max_whois_referral_hops = v;
        }
        if let Some(v) = self.rdap_links {
            options.rdap_follow_links = v;
        }
        if let Some(v) = self.max_rdap_hops {
            options.max_rdap_link_hops = v;
        }
        if let Some(url) = &self.bootstrap_url {
            options.custom_bootstrap_url = Some(url.clone());
        }
        if let Some(v) = self.include_raw {
            options.include_raw = v;
        }
        options
    }
}

/// Load configuration from `DL_*` environment variables.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Same as [`load_env_config`] with a custom variable source.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = lookup("DL_TIMEOUT") {
        match parse_timeout_string(&val) {
            Some(timeout) => env_config.timeout = Some(timeout),
            None => tracing::warn!(value = %val, "Ignoring invalid DL_TIMEOUT"),
        }
    }

    env_config.rdap_only = env_bool(&lookup, "DL_RDAP_ONLY");
    env_config.whois_only = env_bool(&lookup, "DL_WHOIS_ONLY");
    env_config.follow_referral = env_bool(&lookup, "DL_FOLLOW_REFERRAL");
    env_config.rdap_links = env_bool(&lookup, "DL_RDAP_LINKS");
    env_config.include_raw = env_bool(&lookup, "DL_INCLUDE_RAW");
    env_config.max_whois_hops = env_hops(&lookup, "DL_MAX_WHOIS_HOPS");
    env_config.max_rdap_hops = env_hops(&lookup, "DL_MAX_RDAP_HOPS");

    if env_config.rdap_only == Some(true) && env_config.whois_only == Some(true) {
        tracing::warn!("Ignoring DL_RDAP_ONLY and DL_WHOIS_ONLY: they cannot both be set");
        env_config.rdap_only = None;
        env_config.whois_only = None;
    }

    env_config.bootstrap_url = env_string(&lookup, "DL_BOOTSTRAP_URL");
    env_config.config = env_string(&lookup, "DL_CONFIG");

    env_config
}

fn env_bool<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<bool> {
    let val = lookup(key)?;
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key, value = %val, "Ignoring invalid boolean, use true/false");
            None
        }
    }
}

fn env_hops<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<usize> {
    let val = lookup(key)?;
    match val.trim().parse::<usize>() {
        Ok(hops) if hops <= MAX_HOP_LIMIT => Some(hops),
        _ => {
            tracing::warn!(key, value = %val, max = MAX_HOP_LIMIT, "Ignoring invalid hop limit");
            None
        }
    }
}

fn env_string<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a timeout string like "1500ms", "5s" or "2m".
///
/// A bare number is taken as seconds. Zero is rejected.
pub fn parse_timeout_string(timeout_str: &str) -> Option<Duration> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let duration = if let Some(ms) = timeout_str.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(s) = timeout_str.strip_suffix('s') {
        s.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(m) = timeout_str.strip_suffix('m') {
        m.trim()
            .parse::<u64>()
            .ok()
            .map(|m| Duration::from_secs(m * 60))
    } else {
        timeout_str.parse::<u64>().ok().map(Duration::from_secs)
    }?;

    (!duration.is_zero()).then_some(duration)
}
