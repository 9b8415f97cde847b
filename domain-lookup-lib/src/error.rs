//! Error handling for domain lookup operations.
//!
//! This module defines the error type shared by every stage of a lookup, from
//! bootstrap discovery to WHOIS referral walking. Most variants describe a
//! single failed attempt and are recovered by the orchestrator; only
//! configuration and exhaustion errors ever reach the caller.

use std::fmt;
use std::time::Duration;

/// Main error type for domain lookup operations.
#[derive(Debug, Clone)]
pub enum DomainLookupError {
    /// Invalid domain name format
    InvalidDomain { domain: String, reason: String },

    /// Network-related errors (connection refused, DNS failure, reset, etc.)
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// RDAP server answered with something other than success or 404
    RdapError {
        url: String,
        message: String,
        status_code: Option<u16>,
    },

    /// WHOIS exchange failed
    WhoisError { server: String, message: String },

    /// Bootstrap registry could not be used
    BootstrapError { message: String },

    /// JSON parsing errors for RDAP responses
    ParseError {
        message: String,
        content: Option<String>,
    },

    /// Caller supplied invalid configuration (malformed bootstrap document,
    /// conflicting options, bad config file values)
    ConfigError { message: String },

    /// File I/O errors when reading configuration or bootstrap files
    FileError { path: String, message: String },

    /// An operation exceeded its time budget
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// The caller cancelled the lookup
    Cancelled { operation: String },

    /// No authoritative WHOIS server could be discovered for the TLD
    NoWhoisServer {
        tld: String,
        registration_url: Option<String>,
    },

    /// Every RDAP base URL failed and WHOIS fallback was not allowed
    RdapExhausted {
        domain: String,
        attempted: Vec<String>,
        last_error: Option<String>,
    },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl DomainLookupError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new RDAP error.
    pub fn rdap<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::RdapError {
            url: url.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a new RDAP error with HTTP status code.
    pub fn rdap_with_status<U: Into<String>, M: Into<String>>(
        url: U,
        message: M,
        status_code: u16,
    ) -> Self {
        Self::RdapError {
            url: url.into(),
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create a new WHOIS error.
    pub fn whois<S: Into<String>, M: Into<String>>(server: S, message: M) -> Self {
        Self::WhoisError {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Create a new bootstrap error.
    pub fn bootstrap<M: Into<String>>(message: M) -> Self {
        Self::BootstrapError {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new parse error.
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::ParseError {
            message: message.into(),
            content: None,
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new cancellation error.
    pub fn cancelled<O: Into<String>>(operation: O) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error was caused by the caller rather than by an upstream
    /// server. These are returned immediately instead of being folded into a
    /// failed lookup result.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigError { .. } | Self::InvalidDomain { .. } | Self::FileError { .. }
        )
    }

    /// Whether the orchestrator may move on to the next candidate server,
    /// base URL or hop after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. }
                | Self::Timeout { .. }
                | Self::RdapError { .. }
                | Self::WhoisError { .. }
                | Self::BootstrapError { .. }
                | Self::ParseError { .. }
        )
    }
}

impl fmt::Display for DomainLookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain { domain, reason } => {
                write!(f, "Invalid domain '{}': {}", domain, reason)
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::RdapError {
                url,
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "RDAP error from {} (HTTP {}): {}", url, code, message)
                } else {
                    write!(f, "RDAP error from {}: {}", url, message)
                }
            }
            Self::WhoisError { server, message } => {
                write!(f, "WHOIS error from '{}': {}", server, message)
            }
            Self::BootstrapError { message } => {
                write!(f, "Bootstrap error: {}", message)
            }
            Self::ParseError { message, content: _ } => {
                write!(f, "Parse error: {}", message)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::Cancelled { operation } => {
                write!(f, "Lookup cancelled during: {}", operation)
            }
            Self::NoWhoisServer {
                tld,
                registration_url,
            } => {
                write!(f, "No WHOIS server is known for '.{}'", tld)?;
                if let Some(url) = registration_url {
                    write!(f, "; registration information: {}", url)?;
                }
                write!(
                    f,
                    ". Supply one with a WHOIS hint (e.g. {}=whois.nic.{})",
                    tld, tld
                )
            }
            Self::RdapExhausted {
                domain,
                attempted,
                last_error,
            } => {
                if attempted.is_empty() {
                    write!(
                        f,
                        "No RDAP server is known for '{}' and WHOIS fallback is disabled",
                        domain
                    )?;
                } else {
                    write!(
                        f,
                        "All RDAP servers failed for '{}' (tried: {})",
                        domain,
                        attempted.join(", ")
                    )?;
                }
                if let Some(last) = last_error {
                    write!(f, "; last error: {}", last)?;
                }
                Ok(())
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for DomainLookupError {}

// Implement From conversions for common error types
impl From<reqwest::Error> for DomainLookupError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        if err.is_timeout() {
            Self::timeout(format!("HTTP request to {}", url), Duration::from_secs(0))
        } else if err.is_connect() {
            Self::network_with_source(format!("Connection to {} failed", url), err.to_string())
        } else if err.is_decode() {
            Self::parse(format!("Response from {} could not be decoded: {}", url, err))
        } else {
            Self::network_with_source(format!("HTTP request to {} failed", url), err.to_string())
        }
    }
}

impl From<serde_json::Error> for DomainLookupError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError {
            message: format!("JSON parsing failed: {}", err),
            content: None,
        }
    }
}

impl From<std::io::Error> for DomainLookupError {
    fn from(err: std::io::Error) -> Self {
        Self::network_with_source("I/O error", err.to_string())
    }
}

impl From<regex::Error> for DomainLookupError {
    fn from(err: regex::Error) -> Self {
        Self::Internal {
            message: format!("Regex error: {}", err),
        }
    }
}

impl From<toml::de::Error> for DomainLookupError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigError {
            message: format!("Failed to parse TOML configuration: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_not_recoverable() {
        let err = DomainLookupError::config("services must be an array");
        assert!(err.is_configuration_error());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_transport_errors_are_recoverable() {
        assert!(DomainLookupError::network("connection refused").is_recoverable());
        assert!(DomainLookupError::timeout("WHOIS query", Duration::from_secs(2)).is_recoverable());
        assert!(
            DomainLookupError::rdap_with_status("https://rdap.example/", "boom", 503)
                .is_recoverable()
        );
        assert!(!DomainLookupError::cancelled("RDAP fetch").is_recoverable());
    }

    #[test]
    fn test_no_whois_server_message_is_actionable() {
        let err = DomainLookupError::NoWhoisServer {
            tld: "zz".to_string(),
            registration_url: Some("http://www.nic.zz".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains(".zz"));
        assert!(msg.contains("http://www.nic.zz"));
        assert!(msg.contains("zz=whois.nic.zz"));
    }

    #[test]
    fn test_rdap_exhausted_lists_attempts() {
        let err = DomainLookupError::RdapExhausted {
            domain: "example.com".to_string(),
            attempted: vec!["https://a.example/".to_string(), "https://b.example/".to_string()],
            last_error: Some("HTTP 503".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("https://a.example/, https://b.example/"));
        assert!(msg.contains("HTTP 503"));
    }
}
