//! The transfer pipeline
//!
//! One orchestration loop, parameterized over the destination sink
//! and the selection policy. Per message the sequence is
//!
//! ```text
//! scanned -> fetched -> delivered -> acknowledged
//! ```
//!
//! and the source flag is mutated if and only if delivery returned
//! success. The pipeline is fail-fast: the first fetch, delivery, or
//! flag failure aborts the remainder of the run. Messages delivered
//! but not yet acknowledged when a run dies are re-selected and
//! re-delivered by the next run -- at-least-once, with no
//! deduplication at the destination.
//!
//! Everything is sequential on one task: acknowledgment of message
//! *h* completes before the next fetch begins, and folder *i+1* is
//! not touched until folder *i* is done.

use crate::config::SourceConfig;
use crate::error::Result;
use crate::folder::Folder;
use crate::selection::SelectionPolicy;
use crate::sink::DeliverySink;
use crate::source::SourceMailbox;
use tracing::{debug, info};

/// A configured transfer run.
pub struct Relay {
    source: SourceConfig,
    folders: Vec<Folder>,
    policy: SelectionPolicy,
    list_folders: bool,
}

impl Relay {
    #[must_use]
    pub const fn new(
        source: SourceConfig,
        folders: Vec<Folder>,
        policy: SelectionPolicy,
    ) -> Self {
        Self {
            source,
            folders,
            policy,
            list_folders: false,
        }
    }

    /// Log the server's folder listing before transferring.
    /// Diagnostics for verbose runs.
    #[must_use]
    pub const fn with_folder_listing(mut self, enabled: bool) -> Self {
        self.list_folders = enabled;
        self
    }

    /// Run the transfer. Returns the number of messages moved through
    /// the full sequence.
    ///
    /// The source session is opened once and torn down best-effort
    /// after the last folder or the first unrecoverable error.
    ///
    /// # Errors
    ///
    /// Any error from the source or the sink; the run stops at the
    /// first one. Messages acknowledged before the failure stay
    /// acknowledged.
    pub async fn run<S: DeliverySink>(&self, sink: &mut S) -> Result<usize> {
        let mut source = SourceMailbox::open(&self.source).await?;
        let outcome = self.transfer_all(&mut source, sink).await;
        source.shutdown().await;
        outcome
    }

    async fn transfer_all<S: DeliverySink>(
        &self,
        source: &mut SourceMailbox,
        sink: &mut S,
    ) -> Result<usize> {
        if self.list_folders {
            for name in source.list_folders().await? {
                debug!("Source folder: {}", name);
            }
        }

        let mut transferred = 0;
        for folder in &self.folders {
            transferred += self.transfer_folder(source, sink, folder).await?;
        }
        info!("Transferred {} message(s) to {}", transferred, sink.kind());
        Ok(transferred)
    }

    async fn transfer_folder<S: DeliverySink>(
        &self,
        source: &mut SourceMailbox,
        sink: &mut S,
        folder: &Folder,
    ) -> Result<usize> {
        source.select(folder).await?;

        debug!(
            "Searching {} for {} messages",
            folder,
            self.policy.describe()
        );
        let uids = source.search(self.policy.search_query()).await?;
        debug!("Iterating {} candidate message(s) in {}", uids.len(), folder);

        let (ack_op, ack_flag) = self.policy.acknowledgment();
        let mut transferred = 0;
        for uid in uids {
            let envelope = source.fetch(uid, self.policy.fetch_peeks()).await?;
            info!(
                "Transferring {} from {} to {}",
                envelope.correlation_id(),
                folder,
                sink.kind()
            );
            sink.deliver(&envelope).await?;

            debug!(
                "Acknowledging {} with {}",
                envelope.correlation_id(),
                ack_op.store_query(ack_flag)
            );
            source.store(uid, ack_op, ack_flag).await?;
            transferred += 1;
        }
        Ok(transferred)
    }
}
