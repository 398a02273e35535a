//! Search result types

use crate::folder::Folder;
use chrono::{DateTime, Utc};
use email_extract::Email;
use serde::Serialize;

/// Where a message's full content can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentRef {
    pub folder: String,
    pub uid: u32,
}

/// Read-only projection of a matched message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    pub content: ContentRef,
    pub subject: String,
    pub sender: String,
    pub date: DateTime<Utc>,
    /// Best-effort text body, only present when the scan was asked to
    /// include bodies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl MessageRecord {
    pub(crate) fn from_email(folder: &Folder, uid: u32, email: &Email) -> Self {
        Self {
            content: ContentRef {
                folder: folder.as_str().to_string(),
                uid,
            },
            subject: email.subject.original.to_string(),
            sender: email.from.address.to_string(),
            date: email.date.with_timezone(&Utc),
            body: None,
        }
    }

    #[must_use]
    pub(crate) fn with_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }
}

/// Ordered matches of one search.
///
/// Order is folder scope order, then ascending UID within a folder,
/// which is the provider's arrival order. Nothing stronger is
/// guaranteed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    pub messages: Vec<MessageRecord>,
    /// The scan limit that was in force.
    pub limit: usize,
    /// At least one more message matched every filter than `limit`
    /// allowed.
    pub truncated: bool,
}

impl SearchResults {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MessageRecord> {
        self.messages.iter()
    }
}

impl IntoIterator for SearchResults {
    type Item = MessageRecord;
    type IntoIter = std::vec::IntoIter<MessageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl<'a> IntoIterator for &'a SearchResults {
    type Item = &'a MessageRecord;
    type IntoIter = std::slice::Iter<'a, MessageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
