//! # Printer Transport Layer
//!
//! This module provides communication backends for sending data to printers.
//!
//! ## Available Transports
//!
//! - [`tcp`]: Raw TCP on port 9100, the standard for networked label printers
//! - `scripted`: In-memory connector that replays scripted outcomes. Only
//!   built for tests or with the `testing` feature.
//!
//! ## Connection Lifecycle
//!
//! [`PrinterTransport`] opens one connection per attempt and closes it before
//! the attempt's result is acted on, so a retry never overlaps a stale
//! socket. The connection lives in a slot guarded by an async mutex; holding
//! that lock for the whole send is what keeps the printer to one job at a
//! time.

pub mod printer;
#[cfg(any(test, feature = "testing"))]
pub mod scripted;
pub mod tcp;

pub use printer::{PrinterTransport, RawResponse};
#[cfg(any(test, feature = "testing"))]
pub use scripted::{ScriptStep, ScriptedConnector};
pub use tcp::TcpConnector;

use async_trait::async_trait;
use serde::Serialize;
use std::io;
use std::time::Duration;

/// Longest wait between two attempts
pub const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Where and how patiently to talk to a printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportConfig {
    pub host: String,
    pub port: u16,
    /// Applies separately to connect, write, and reply read
    pub timeout: Duration,
    /// Total attempts, including the first
    pub retries: u32,
    /// Wait before the second attempt; doubles each time up to [`MAX_BACKOFF`]
    pub backoff: Duration,
}

impl TransportConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            timeout: Duration::from_secs(5),
            retries: 3,
            backoff: Duration::from_millis(500),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

/// An open byte stream to a printer.
#[async_trait]
pub trait Connection: Send {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Next chunk of reply bytes. Empty means the peer closed.
    async fn read_chunk(&mut self) -> io::Result<Vec<u8>>;

    /// Shut the connection down. Safe to call more than once.
    async fn close(&mut self) -> io::Result<()>;
}

/// Opens connections to a printer.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, host: &str, port: u16) -> io::Result<Box<dyn Connection>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = TransportConfig::new("printer", 9100);
        assert_eq!(config.backoff_for(1), Duration::from_millis(500));
        assert_eq!(config.backoff_for(2), Duration::from_millis(1000));
        assert_eq!(config.backoff_for(3), Duration::from_millis(2000));
        assert_eq!(config.backoff_for(5), MAX_BACKOFF);
        assert_eq!(config.backoff_for(40), MAX_BACKOFF);
    }

    #[test]
    fn test_address() {
        assert_eq!(TransportConfig::new("10.0.0.5", 9100).address(), "10.0.0.5:9100");
    }
}
