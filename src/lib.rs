//! IMAP relay library
//!
//! Moves messages from an IMAP-accessible mailbox to a second
//! destination: an Exchange mailbox via EWS, or a fixed recipient via
//! an SMTP relay. Candidates are selected by mailbox flag (unseen or
//! flagged), each message's full RFC 822 payload is handed to the
//! destination, and the source copy is flag-acknowledged only after
//! the destination accepted it.
//!
//! The mail server's own flag state is the only cursor: a run that
//! dies between delivery and acknowledgment re-delivers that message
//! on the next invocation. At-least-once, never zero times.

mod config;
mod connection;
mod envelope;
mod error;
mod ews;
mod flag;
mod folder;
mod relay;
mod selection;
mod sink;
mod smtp;
mod source;

pub use config::{EwsConfig, SmtpRelayConfig, SourceConfig};
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use ews::EwsSink;
pub use flag::{Flag, FlagOp};
pub use folder::Folder;
pub use relay::Relay;
pub use selection::SelectionPolicy;
pub use sink::DeliverySink;
pub use smtp::SmtpSink;
pub use source::SourceMailbox;
