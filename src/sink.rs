//! The destination seam
//!
//! The pipeline is written once against this trait; the EWS and SMTP
//! sinks are its two concrete variants. `deliver` takes `&mut self`
//! because the EWS sink lazily builds and caches its session on first
//! use.

use crate::envelope::Envelope;
use crate::error::Result;

/// Where transferred messages go.
pub trait DeliverySink {
    /// Deliver one message's full payload to the destination.
    ///
    /// Must return `Ok` only once the destination has durably
    /// accepted the message: the pipeline acknowledges the source
    /// copy on the strength of this result.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Delivery`] on any authentication,
    /// network, or store failure. A failure aborts the run.
    fn deliver(&mut self, envelope: &Envelope) -> impl Future<Output = Result<()>> + Send;

    /// Short destination label for log lines, e.g. `"EWS"`.
    fn kind(&self) -> &'static str;
}
