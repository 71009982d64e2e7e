//! Source mailbox session
//!
//! One stateful session to the IMAP server, owned by the pipeline for
//! the whole run. Operations target the folder selected by the latest
//! [`SourceMailbox::select`] call. Message handles are UIDs and are
//! valid only within the current selection.

use crate::config::SourceConfig;
use crate::connection::{self, ImapSession};
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::flag::{Flag, FlagOp};
use crate::folder::Folder;
use futures::StreamExt;
use tracing::{debug, warn};

/// An open, authenticated session to the source mailbox.
pub struct SourceMailbox {
    session: ImapSession,
}

impl SourceMailbox {
    /// Connect and authenticate.
    ///
    /// # Errors
    ///
    /// [`Error::Connection`] on network/timeout failure,
    /// [`Error::Tls`] on a failed upgrade, [`Error::Auth`] on
    /// credential rejection.
    pub async fn open(config: &SourceConfig) -> Result<Self> {
        let session = connection::connect(config).await?;
        Ok(Self { session })
    }

    /// List all folder names on the server. Diagnostics only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the LIST command fails.
    pub async fn list_folders(&mut self) -> Result<Vec<String>> {
        let mut folder_stream = self
            .session
            .list(Some(""), Some("*"))
            .await
            .map_err(|e| Error::Protocol(format!("List folders failed: {e}")))?;

        let mut names = Vec::new();
        while let Some(item) = folder_stream.next().await {
            if let Ok(name) = item {
                names.push(name.name().to_string());
            }
        }
        drop(folder_stream);
        Ok(names)
    }

    /// SELECT a folder. Subsequent search/fetch/store operations
    /// target it until the next select.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Folder`] if the folder does not exist or
    /// cannot be opened.
    pub async fn select(&mut self, folder: &Folder) -> Result<()> {
        self.session
            .select(folder.as_str())
            .await
            .map_err(|e| Error::Folder(format!("Failed to select {folder}: {e}")))?;
        Ok(())
    }

    /// SEARCH the selected folder. Returns matching UIDs in ascending
    /// order (the server reports them as a set).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] on a non-success status; fatal for
    /// the run.
    pub async fn search(&mut self, query: &str) -> Result<Vec<u32>> {
        let uids = self
            .session
            .uid_search(query)
            .await
            .map_err(|e| Error::Protocol(format!("Search {query} failed: {e}")))?;

        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_unstable();
        Ok(uid_list)
    }

    /// FETCH one message's full RFC 822 payload.
    ///
    /// With `peek` the fetch uses `BODY.PEEK[]` and leaves `\Seen`
    /// untouched; without it, `BODY[]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] on server rejection or a missing body.
    pub async fn fetch(&mut self, uid: u32, peek: bool) -> Result<Envelope> {
        let query = if peek { "(BODY.PEEK[])" } else { "(BODY[])" };
        let uid_set = format!("{uid}");

        let mut messages = self
            .session
            .uid_fetch(&uid_set, query)
            .await
            .map_err(|e| Error::Fetch(format!("Fetch of UID {uid} failed: {e}")))?;

        let mut envelope = None;
        while let Some(msg_result) = messages.next().await {
            let msg =
                msg_result.map_err(|e| Error::Fetch(format!("Fetch of UID {uid} failed: {e}")))?;
            if let Some(body) = msg.body() {
                envelope = Some(Envelope::new(body.to_vec()));
            }
        }
        drop(messages);

        envelope.ok_or_else(|| Error::Fetch(format!("No body returned for UID {uid}")))
    }

    /// STORE a flag mutation on one message (the acknowledgment step).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Flag`] if the server rejects the mutation.
    pub async fn store(&mut self, uid: u32, op: FlagOp, flag: Flag) -> Result<()> {
        let uid_set = format!("{uid}");
        let query = op.store_query(flag);

        let mut responses = self
            .session
            .uid_store(&uid_set, &query)
            .await
            .map_err(|e| Error::Flag(format!("Store {query} on UID {uid} failed: {e}")))?;

        while let Some(resp) = responses.next().await {
            resp.map_err(|e| Error::Flag(format!("Store {query} on UID {uid} failed: {e}")))?;
        }
        drop(responses);
        Ok(())
    }

    /// Best-effort session teardown: CLOSE, then LOGOUT. Always safe
    /// to call after a failed run; failures are logged, never
    /// escalated.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.session.close().await {
            debug!("CLOSE failed during teardown: {}", e);
        }
        if let Err(e) = self.session.logout().await {
            warn!("LOGOUT failed during teardown: {}", e);
        }
    }
}
