//! Per-run configuration records
//!
//! All three records are assembled once by the caller (normally the
//! CLI) and are read-only for the lifetime of the run.

use std::time::Duration;

/// Connection parameters for the source IMAP mailbox.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Applied to the initial TCP connect only. Established sessions
    /// use the transport's own defaults.
    pub timeout: Duration,
}

impl SourceConfig {
    /// `host:port` as dialed.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Destination parameters for the Exchange Web Services sink.
#[derive(Debug, Clone)]
pub struct EwsConfig {
    /// Server name, or a full service endpoint URL. A bare name is
    /// expanded to `https://{server}/EWS/Exchange.asmx`.
    pub server: String,
    pub username: String,
    pub password: String,
    /// Primary SMTP address of the mailbox the messages land in.
    pub mailbox_address: String,
}

impl EwsConfig {
    /// The resolved service endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> String {
        if self.server.contains("://") {
            self.server.clone()
        } else {
            format!("https://{}/EWS/Exchange.asmx", self.server)
        }
    }
}

/// Destination parameters for the SMTP forwarding sink.
#[derive(Debug, Clone)]
pub struct SmtpRelayConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Every transferred message is addressed to this recipient.
    pub forward_to: String,
    /// Literal inserted after `Subject: ` in the outgoing payload.
    /// `None` forwards the payload untouched.
    pub subject_prefix: Option<String>,
    /// Skip certificate verification on STARTTLS. For relays fronted
    /// by a self-signed certificate.
    pub accept_invalid_certs: bool,
}
