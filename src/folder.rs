//! IMAP folder names
//!
//! A thin vocabulary type for the folders a run iterates, instead of
//! raw strings. INBOX is special-cased (RFC 3501 requires it and makes
//! it case-insensitive); everything else is carried verbatim, including
//! hierarchical names like `INBOX.folder A.sub folder B`.

use std::fmt;

/// A source mailbox folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Folder {
    /// The INBOX folder (RFC 3501 required, case-insensitive).
    Inbox,
    /// Any other folder, named verbatim.
    Custom(String),
}

impl Folder {
    /// Create a folder for a non-INBOX mailbox.
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// The IMAP folder name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Inbox => "INBOX",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Folder {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("inbox") {
            Self::Inbox
        } else {
            Self::Custom(s.to_string())
        }
    }
}

impl From<String> for Folder {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}
