//! IMAP message flags and flag mutations
//!
//! Strongly-typed system flags plus the STORE operation that
//! acknowledgment performs (`+FLAGS` / `-FLAGS`).

use std::fmt;

/// An IMAP system flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Message has been read (`\Seen`).
    Seen,
    /// Message has been answered (`\Answered`).
    Answered,
    /// Message is flagged for attention (`\Flagged`).
    Flagged,
    /// Message is marked for deletion (`\Deleted`).
    Deleted,
    /// Message is a draft (`\Draft`).
    Draft,
}

impl Flag {
    /// The IMAP wire representation, including the leading backslash.
    #[must_use]
    pub const fn as_imap_str(self) -> &'static str {
        match self {
            Self::Seen => "\\Seen",
            Self::Answered => "\\Answered",
            Self::Flagged => "\\Flagged",
            Self::Deleted => "\\Deleted",
            Self::Draft => "\\Draft",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_imap_str())
    }
}

/// A flag mutation applied by STORE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagOp {
    /// `+FLAGS` -- set the flag.
    Add,
    /// `-FLAGS` -- clear the flag.
    Remove,
}

impl FlagOp {
    /// Render the STORE data item for this mutation, e.g.
    /// `+FLAGS (\Seen)`.
    #[must_use]
    pub fn store_query(self, flag: Flag) -> String {
        let sign = match self {
            Self::Add => '+',
            Self::Remove => '-',
        };
        format!("{sign}FLAGS ({})", flag.as_imap_str())
    }
}
