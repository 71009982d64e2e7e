//! SMTP forwarding sink
//!
//! Each delivery opens a fresh transport: connect, EHLO, STARTTLS,
//! authenticate, send, disconnect. SMTP sessions are not reused
//! across messages.
//!
//! Before sending, the Subject header is tagged with a configurable
//! prefix by byte-level substring replacement. This is deliberately
//! not MIME-aware: a payload without a `\r\nSubject: ` byte sequence
//! (missing header, unusual spacing, folded onto the first line) is
//! forwarded unmodified, and every occurrence of the sequence is
//! rewritten, exactly like the substring replace it descends from.

use crate::config::SmtpRelayConfig;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::sink::DeliverySink;
use lettre::address::Envelope as SmtpEnvelope;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::borrow::Cow;
use tracing::debug;

/// Sink that forwards messages to a fixed address via an SMTP relay.
pub struct SmtpSink {
    config: SmtpRelayConfig,
}

impl SmtpSink {
    #[must_use]
    pub const fn new(config: SmtpRelayConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let tls = {
            let mut builder = TlsParameters::builder(self.config.host.clone());
            if self.config.accept_invalid_certs {
                builder = builder.dangerous_accept_invalid_certs(true);
            }
            builder
                .build()
                .map_err(|e| Error::Delivery(format!("SMTP TLS setup failed: {e}")))?
        };

        let credentials = Credentials::new(
            self.config.username.clone(),
            self.config.password.clone(),
        );

        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.host)
                .port(self.config.port)
                .tls(Tls::Required(tls))
                .credentials(credentials)
                .build(),
        )
    }

    fn smtp_envelope(&self) -> Result<SmtpEnvelope> {
        let sender: Address = self
            .config
            .username
            .parse()
            .map_err(|e| Error::Config(format!("Invalid sender address: {e}")))?;
        let recipient: Address = self
            .config
            .forward_to
            .parse()
            .map_err(|e| Error::Config(format!("Invalid forward address: {e}")))?;
        SmtpEnvelope::new(Some(sender), vec![recipient])
            .map_err(|e| Error::Config(format!("Invalid SMTP envelope: {e}")))
    }
}

impl DeliverySink for SmtpSink {
    async fn deliver(&mut self, envelope: &Envelope) -> Result<()> {
        let payload = match &self.config.subject_prefix {
            Some(prefix) => tag_subject(&envelope.raw, prefix),
            None => Cow::Borrowed(envelope.raw.as_slice()),
        };

        let transport = self.transport()?;
        let smtp_envelope = self.smtp_envelope()?;

        transport
            .send_raw(&smtp_envelope, &payload)
            .await
            .map_err(|e| Error::Delivery(format!("SMTP send failed: {e}")))?;

        debug!(
            "Forwarded {} to {}",
            envelope.correlation_id(),
            self.config.forward_to
        );
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "SMTP relay"
    }
}

/// Insert `prefix` after every `\r\nSubject: ` occurrence.
///
/// Returns the payload unchanged (borrowed) when no occurrence
/// exists.
fn tag_subject<'a>(raw: &'a [u8], prefix: &str) -> Cow<'a, [u8]> {
    const NEEDLE: &[u8] = b"\r\nSubject: ";

    let mut positions = Vec::new();
    let mut at = 0;
    while at + NEEDLE.len() <= raw.len() {
        if &raw[at..at + NEEDLE.len()] == NEEDLE {
            positions.push(at);
            at += NEEDLE.len();
        } else {
            at += 1;
        }
    }

    if positions.is_empty() {
        return Cow::Borrowed(raw);
    }

    let insertion = format!("{prefix} ").into_bytes();
    let mut tagged = Vec::with_capacity(raw.len() + positions.len() * insertion.len());
    let mut copied = 0;
    for pos in positions {
        let end = pos + NEEDLE.len();
        tagged.extend_from_slice(&raw[copied..end]);
        tagged.extend_from_slice(&insertion);
        copied = end;
    }
    tagged.extend_from_slice(&raw[copied..]);
    Cow::Owned(tagged)
}
