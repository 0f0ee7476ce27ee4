//! SMTP config module.
//!
//! This module contains the representation of the SMTP submission
//! server configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_SMTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_HELLO_NAME: &str = "localhost";

/// Represents the SMTP submission server config.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Represents the SMTP server host.
    pub host: String,
    /// Represents the SMTP server port.
    pub port: u16,
    /// Enables TLS. Without StartTLS, TLS wraps the connection from
    /// the first byte.
    pub ssl: Option<bool>,
    /// Upgrades a plaintext connection to TLS with STARTTLS.
    pub starttls: Option<bool>,
    /// Trusts any certificate.
    pub insecure: Option<bool>,
    /// Bounds the time spent connecting to the server, in seconds.
    pub timeout: Option<u64>,
    /// Represents the name sent with the EHLO command.
    pub hello_name: Option<String>,
}

impl SmtpConfig {
    pub fn ssl(&self) -> bool {
        self.ssl.unwrap_or(true)
    }

    pub fn starttls(&self) -> bool {
        self.starttls.unwrap_or_default()
    }

    pub fn insecure(&self) -> bool {
        self.insecure.unwrap_or_default()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SMTP_TIMEOUT)
    }

    pub fn hello_name(&self) -> String {
        self.hello_name
            .as_ref()
            .filter(|name| !name.trim().is_empty())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| DEFAULT_HELLO_NAME.to_owned())
    }
}
