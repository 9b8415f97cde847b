//! WHOIS transport over TCP port 43.
//!
//! One WHOIS exchange is a single query line terminated by CRLF; the server
//! writes its answer and closes the connection. The [`WhoisTransport`] trait
//! is the seam used by the referral walker, so tests and embedders can swap
//! the socket for anything that answers a query.

use crate::error::DomainLookupError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Standard WHOIS port.
pub const WHOIS_PORT: u16 = 43;

/// Upper bound for the derived socket idle timeout.
const MAX_SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

/// Responses larger than this are cut off; no registry sends anything close.
const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// A single WHOIS request/response exchange.
#[async_trait]
pub trait WhoisTransport: Send + Sync {
    /// Query `server` for `domain` and return the response text.
    ///
    /// Implementations must give up once `timeout` has elapsed.
    async fn query(
        &self,
        server: &str,
        domain: &str,
        timeout: Duration,
    ) -> Result<String, DomainLookupError>;
}

/// Rewrite the query line for servers whose default output needs a flag.
///
/// JPRS answers in Japanese unless `/e` is appended, and DENIC only returns
/// the full record for `-T dn,ace`.
pub fn build_query(server: &str, domain: &str) -> String {
    match server.trim().to_lowercase().as_str() {
        "whois.jprs.jp" | "whois.nic.ad.jp" => format!("{}/e", domain),
        "whois.denic.de" => format!("-T dn,ace {}", domain),
        _ => domain.to_string(),
    }
}

/// WHOIS over a plain TCP socket.
#[derive(Debug, Clone)]
pub struct TcpWhoisTransport {
    port: u16,
    socket_timeout: Option<Duration>,
}

impl TcpWhoisTransport {
    pub fn new() -> Self {
        Self {
            port: WHOIS_PORT,
            socket_timeout: None,
        }
    }

    /// Connect to a different port; used against local test servers.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Fix the per-read idle timeout instead of deriving it from the budget.
    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = Some(timeout);
        self
    }

    fn idle_timeout(&self, budget: Duration) -> Duration {
        self.socket_timeout
            .unwrap_or_else(|| (budget * 3 / 4).min(MAX_SOCKET_TIMEOUT))
    }

    async fn exchange(
        &self,
        server: &str,
        query: &str,
        idle: Duration,
    ) -> Result<String, DomainLookupError> {
        let mut stream = TcpStream::connect((server, self.port)).await.map_err(|e| {
            DomainLookupError::whois(server, format!("Connection failed: {}", e))
        })?;

        stream
            .write_all(format!("{}\r\n", query).as_bytes())
            .await
            .map_err(|e| DomainLookupError::whois(server, format!("Failed to send query: {}", e)))?;

        let mut response = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let read = tokio::time::timeout(idle, stream.read(&mut buf))
                .await
                .map_err(|_| DomainLookupError::timeout(format!("WHOIS read from {}", server), idle))?
                .map_err(|e| {
                    DomainLookupError::whois(server, format!("Failed to read response: {}", e))
                })?;

            if read == 0 {
                break;
            }
            response.extend_from_slice(&buf[..read]);
            if response.len() >= MAX_RESPONSE_BYTES {
                tracing::warn!(server = %server, "WHOIS response truncated");
                break;
            }
        }

        Ok(String::from_utf8_lossy(&response).into_owned())
    }
}

impl Default for TcpWhoisTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WhoisTransport for TcpWhoisTransport {
    async fn query(
        &self,
        server: &str,
        domain: &str,
        timeout: Duration,
    ) -> Result<String, DomainLookupError> {
        let query = build_query(server, domain);
        let idle = self.idle_timeout(timeout);

        tracing::debug!(server = %server, query = %query, "Sending WHOIS query");

        match tokio::time::timeout(timeout, self.exchange(server, &query, idle)).await {
            Ok(result) => result,
            Err(_) => Err(DomainLookupError::timeout(
                format!("WHOIS query to {}", server),
                timeout,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    #[test]
    fn test_build_query_rewrites() {
        assert_eq!(build_query("whois.jprs.jp", "example.jp"), "example.jp/e");
        assert_eq!(build_query("WHOIS.NIC.AD.JP", "example.co.jp"), "example.co.jp/e");
        assert_eq!(build_query("whois.denic.de", "example.de"), "-T dn,ace example.de");
        assert_eq!(build_query("whois.verisign-grs.com", "example.com"), "example.com");
    }

    #[test]
    fn test_idle_timeout_is_derived_from_budget() {
        let transport = TcpWhoisTransport::new();
        assert_eq!(
            transport.idle_timeout(Duration::from_secs(4)),
            Duration::from_secs(3)
        );
        assert_eq!(
            transport.idle_timeout(Duration::from_secs(30)),
            Duration::from_secs(10)
        );

        let fixed = TcpWhoisTransport::new().with_socket_timeout(Duration::from_millis(250));
        assert_eq!(
            fixed.idle_timeout(Duration::from_secs(30)),
            Duration::from_millis(250)
        );
    }

    #[tokio::test]
    async fn test_query_round_trip_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = socket.into_split();
            let mut line = String::new();
            BufReader::new(reader).read_line(&mut line).await.unwrap();
            writer
                .write_all(format!("Domain Name: EXAMPLE.COM\r\nQuery: {}", line).as_bytes())
                .await
                .unwrap();
            line
        });

        let transport = TcpWhoisTransport::new().with_port(port);
        let text = transport
            .query("127.0.0.1", "example.com", Duration::from_secs(5))
            .await
            .unwrap();

        let received = server.await.unwrap();
        assert_eq!(received, "example.com\r\n");
        assert!(text.starts_with("Domain Name: EXAMPLE.COM"));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let transport = TcpWhoisTransport::new()
            .with_port(port)
            .with_socket_timeout(Duration::from_millis(100));
        let err = transport
            .query("127.0.0.1", "example.com", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainLookupError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_refused_connection_is_whois_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = TcpWhoisTransport::new().with_port(port);
        let err = transport
            .query("127.0.0.1", "example.com", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainLookupError::WhoisError { .. }));
    }
}
