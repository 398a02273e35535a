//! Mailbox folders and the set of folders a search scans

use std::fmt;

/// An IMAP mailbox folder.
///
/// Well-known folders map to their usual IMAP names. Anything else,
/// including provider-specific spellings such as `Sentbox` or
/// `DraftBox`, is a [`Folder::Custom`].
///
/// # Examples
///
/// ```
/// use mailkit::Folder;
///
/// assert_eq!(Folder::Inbox.as_str(), "INBOX");
/// assert_eq!(Folder::from("Spam"), Folder::Spam);
/// assert_eq!(Folder::from("Sentbox"), Folder::custom("Sentbox"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Folder {
    /// The INBOX folder (matched case-insensitively).
    Inbox,
    Sent,
    Drafts,
    Trash,
    Spam,
    Junk,
    Archive,
    Custom(String),
}

impl Folder {
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Inbox => "INBOX",
            Self::Sent => "Sent",
            Self::Drafts => "Drafts",
            Self::Trash => "Trash",
            Self::Spam => "Spam",
            Self::Junk => "Junk",
            Self::Archive => "Archive",
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
            return Self::Inbox;
        }
        match s {
            "Sent" => Self::Sent,
            "Drafts" => Self::Drafts,
            "Trash" => Self::Trash,
            "Spam" => Self::Spam,
            "Junk" => Self::Junk,
            "Archive" => Self::Archive,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for Folder {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

/// Which folders a search walks through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderScope {
    /// These folders, in this order. Folders the server does not have
    /// are skipped.
    Only(Vec<Folder>),
    /// Every folder the server lists, in LIST order.
    All,
}

impl Default for FolderScope {
    fn default() -> Self {
        Self::Only(vec![Folder::Inbox])
    }
}
