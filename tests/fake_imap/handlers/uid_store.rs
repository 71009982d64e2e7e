//! UID STORE command handler.
//!
//! Modifies `\Seen` / `\Flagged` on messages identified by UID --
//! the two mutations the relay's acknowledgment step performs:
//!
//! - `+FLAGS (\Seen)` after an EWS-style transfer
//! - `-FLAGS (\Flagged)` after an SMTP-style transfer
//!
//! Responds with `* N FETCH (UID U FLAGS (...))` per modified
//! message, then the tagged OK.

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use imap_codec::imap_types::flag::{Flag, StoreType};
use imap_codec::imap_types::sequence::{SeqOrUid, Sequence, SequenceSet};
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Extract UIDs from a `SequenceSet`, supporting single values and
/// ranges.
fn extract_uids(seq_set: &SequenceSet, max_uid: u32) -> Vec<u32> {
    let mut uids = Vec::new();
    for seq in seq_set.0.as_ref() {
        match seq {
            Sequence::Single(SeqOrUid::Value(v)) => {
                uids.push(v.get());
            }
            Sequence::Range(a, b) => {
                let lo = match a {
                    SeqOrUid::Value(v) => v.get(),
                    SeqOrUid::Asterisk => max_uid,
                };
                let hi = match b {
                    SeqOrUid::Value(v) => v.get(),
                    SeqOrUid::Asterisk => max_uid,
                };
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                for uid in lo..=hi {
                    uids.push(uid);
                }
            }
            Sequence::Single(SeqOrUid::Asterisk) => {}
        }
    }
    uids
}

/// Handle the UID STORE command. Modifies flags on matching emails.
pub async fn handle_uid_store<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    sequence_set: &SequenceSet,
    kind: &StoreType,
    flags: &[Flag<'_>],
    mailbox: &Mutex<Mailbox>,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) {
    let Some(folder_name) = selected_folder else {
        let resp = format!("{tag} BAD No folder selected\r\n");
        let _ = write_line(stream, &resp).await;
        return;
    };

    let wants_seen = flags.iter().any(|f| matches!(f, Flag::Seen));
    let wants_flagged = flags.iter().any(|f| matches!(f, Flag::Flagged));

    // Mutate under lock, no await inside; responses go out after.
    let maybe_results = {
        let mut mb = mailbox.lock().unwrap();
        if let Some(folder) = mb.get_folder_mut(folder_name) {
            let max_uid = folder.emails.iter().map(|e| e.uid).max().unwrap_or(0);
            let uids = extract_uids(sequence_set, max_uid);

            let mut results: Vec<(usize, u32, Vec<String>)> = Vec::new();

            for uid in uids {
                if let Some((idx, email)) = folder
                    .emails
                    .iter_mut()
                    .enumerate()
                    .find(|(_, e)| e.uid == uid)
                {
                    match kind {
                        StoreType::Add => {
                            if wants_seen {
                                email.seen = true;
                            }
                            if wants_flagged {
                                email.flagged = true;
                            }
                        }
                        StoreType::Remove => {
                            if wants_seen {
                                email.seen = false;
                            }
                            if wants_flagged {
                                email.flagged = false;
                            }
                        }
                        StoreType::Replace => {
                            email.seen = wants_seen;
                            email.flagged = wants_flagged;
                        }
                    }

                    let mut current = Vec::new();
                    if email.seen {
                        current.push("\\Seen".to_string());
                    }
                    if email.flagged {
                        current.push("\\Flagged".to_string());
                    }

                    results.push((idx + 1, uid, current));
                }
            }
            Some(results)
        } else {
            None
        }
    };

    let Some(results) = maybe_results else {
        let resp = format!("{tag} BAD Folder not found\r\n");
        let _ = write_line(stream, &resp).await;
        return;
    };

    for (seq, uid, flags_list) in &results {
        let flags_str = flags_list.join(" ");
        let line = format!("* {seq} FETCH (UID {uid} FLAGS ({flags_str}))\r\n");
        if write_line(stream, &line).await.is_err() {
            return;
        }
    }

    let resp = format!("{tag} OK STORE completed\r\n");
    let _ = write_line(stream, &resp).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use std::num::NonZeroU32;
    use tokio::io::BufReader;

    fn uid_set(uid: u32) -> SequenceSet {
        SequenceSet(
            vec![Sequence::Single(SeqOrUid::Value(
                NonZeroU32::new(uid).unwrap(),
            ))]
            .try_into()
            .unwrap(),
        )
    }

    fn make_raw_email() -> Vec<u8> {
        b"From: a@b.com\r\nSubject: Test\r\n\r\nBody".to_vec()
    }

    async fn run_store(
        tag: &str,
        seq: &SequenceSet,
        kind: &StoreType,
        flags: &[Flag<'_>],
        mailbox: &Mutex<Mailbox>,
        selected: Option<&str>,
    ) -> String {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);

        handle_uid_store(tag, seq, kind, flags, mailbox, selected, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn add_seen_flag() {
        let raw = make_raw_email();
        let mb = Mutex::new(MailboxBuilder::new().folder("INBOX").email(1, &raw).build());

        let output = run_store(
            "A1",
            &uid_set(1),
            &StoreType::Add,
            &[Flag::Seen],
            &mb,
            Some("INBOX"),
        )
        .await;

        assert!(output.contains("FLAGS (\\Seen)"));
        assert!(output.contains("A1 OK STORE completed"));
        assert_eq!(
            mb.lock().unwrap().flags_of("INBOX", 1),
            Some((true, false))
        );
    }

    #[tokio::test]
    async fn remove_flagged_flag() {
        let raw = make_raw_email();
        let mb = Mutex::new(
            MailboxBuilder::new()
                .folder("INBOX")
                .flagged_email(1, &raw)
                .build(),
        );

        let output = run_store(
            "A1",
            &uid_set(1),
            &StoreType::Remove,
            &[Flag::Flagged],
            &mb,
            Some("INBOX"),
        )
        .await;

        assert!(output.contains("A1 OK STORE completed"));
        assert_eq!(
            mb.lock().unwrap().flags_of("INBOX", 1),
            Some((false, false))
        );
    }

    #[tokio::test]
    async fn remove_flagged_keeps_seen_state() {
        let raw = make_raw_email();
        let mb = Mutex::new(
            MailboxBuilder::new()
                .folder("INBOX")
                .flagged_email(1, &raw)
                .build(),
        );
        mb.lock()
            .unwrap()
            .get_folder_mut("INBOX")
            .unwrap()
            .emails[0]
            .seen = true;

        let _ = run_store(
            "A1",
            &uid_set(1),
            &StoreType::Remove,
            &[Flag::Flagged],
            &mb,
            Some("INBOX"),
        )
        .await;

        assert_eq!(mb.lock().unwrap().flags_of("INBOX", 1), Some((true, false)));
    }

    #[tokio::test]
    async fn no_folder_selected_returns_bad() {
        let mb = Mutex::new(MailboxBuilder::new().folder("INBOX").build());

        let output = run_store(
            "A1",
            &uid_set(1),
            &StoreType::Add,
            &[Flag::Seen],
            &mb,
            None,
        )
        .await;

        assert!(output.contains("A1 BAD No folder selected"));
    }
}
