//! Selection policy: which messages a run picks up and how it marks
//! them as handled
//!
//! The two halves are inseparable -- a policy that selects by UNSEEN
//! must acknowledge by setting `\Seen`, and a policy that selects by
//! FLAGGED must acknowledge by clearing `\Flagged` -- so they travel
//! as one value. The policy also decides whether fetches must PEEK:
//! a plain `BODY[]` fetch sets `\Seen` as a side effect. Under the
//! seen-based policy that side effect is subsumed by the
//! acknowledgment; under the flag-based policy it would mutate a flag
//! the run does not own, so fetches peek.

use crate::flag::{Flag, FlagOp};

/// Candidate selection + acknowledgment, as one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Select UNSEEN (or ALL), acknowledge with `+FLAGS (\Seen)`.
    MarkSeen {
        /// When false, select ALL instead of UNSEEN.
        only_unseen: bool,
    },
    /// Select FLAGGED (or ALL), acknowledge with `-FLAGS (\Flagged)`.
    ClearFlagged {
        /// When false, select ALL instead of FLAGGED.
        only_flagged: bool,
    },
}

impl SelectionPolicy {
    /// The SEARCH criterion evaluated once per folder at scan time.
    #[must_use]
    pub const fn search_query(self) -> &'static str {
        match self {
            Self::MarkSeen { only_unseen: true } => "UNSEEN",
            Self::ClearFlagged { only_flagged: true } => "FLAGGED",
            _ => "ALL",
        }
    }

    /// Whether fetches must use `BODY.PEEK[]`.
    ///
    /// Required for flag-based selection: the fetch itself must not
    /// set `\Seen` on messages whose read state belongs to the
    /// mailbox owner, not to this run.
    #[must_use]
    pub const fn fetch_peeks(self) -> bool {
        matches!(self, Self::ClearFlagged { .. })
    }

    /// The flag mutation that acknowledges a delivered message.
    #[must_use]
    pub const fn acknowledgment(self) -> (FlagOp, Flag) {
        match self {
            Self::MarkSeen { .. } => (FlagOp::Add, Flag::Seen),
            Self::ClearFlagged { .. } => (FlagOp::Remove, Flag::Flagged),
        }
    }

    /// Human label for the candidate set, for log lines.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::MarkSeen { only_unseen: true } => "unseen",
            Self::ClearFlagged { only_flagged: true } => "flagged",
            _ => "all",
        }
    }
}
