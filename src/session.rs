//! Open mailbox session and the search pipeline

use crate::criteria::SearchCriteria;
use crate::error::{Error, Result};
use crate::folder::{Folder, FolderScope};
use crate::provider::KeywordSearch;
use crate::record::{MessageRecord, SearchResults};
use crate::transport::MailConnection;
use email_extract::Email;
use tracing::{debug, info, warn};

/// Default cap on the number of records one search returns.
pub const DEFAULT_SCAN_LIMIT: usize = 50;

/// Which folders a search walks and how much it returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanScope {
    pub folders: FolderScope,
    /// Maximum number of records returned. A further match beyond it
    /// is reported through [`SearchResults::truncated`].
    pub limit: usize,
    /// Fetch full messages and fill [`MessageRecord::body`].
    pub include_body: bool,
}

impl Default for ScanScope {
    fn default() -> Self {
        Self {
            folders: FolderScope::default(),
            limit: DEFAULT_SCAN_LIMIT,
            include_body: false,
        }
    }
}

/// An authenticated mailbox session.
///
/// Obtained from [`MailKit::connect`](crate::MailKit::connect). Must
/// be released with [`Session::close`]; prefer
/// [`MailKit::with_session`](crate::MailKit::with_session), which does
/// so on every exit path.
pub struct Session<C: MailConnection> {
    username: String,
    keyword: KeywordSearch,
    scope: ScanScope,
    connection: Option<C>,
}

impl<C: MailConnection> Session<C> {
    pub(crate) const fn new(
        username: String,
        keyword: KeywordSearch,
        scope: ScanScope,
        connection: C,
    ) -> Self {
        Self {
            username,
            keyword,
            scope,
            connection: Some(connection),
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub const fn scope(&self) -> &ScanScope {
        &self.scope
    }

    /// Replace the scan scope used by later searches.
    pub fn set_scope(&mut self, scope: ScanScope) {
        self.scope = scope;
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Find messages matching every supplied criterion.
    ///
    /// Results come in folder scope order, ascending UID within each
    /// folder. An empty result is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the session is closed, and
    /// [`Error::Search`] if the server fails mid-scan.
    pub async fn search(&mut self, criteria: &SearchCriteria) -> Result<SearchResults> {
        let keyword = self.keyword;
        let scope = self.scope.clone();
        let conn = self.connection_mut()?;

        let query = criteria.to_query(keyword);
        let post_filter = criteria.needs_post_filter(keyword);
        let full_fetch = post_filter || scope.include_body;
        debug!("Search query '{}' (client-side keyword: {})", query, post_filter);

        let folders = match &scope.folders {
            FolderScope::Only(folders) => folders.clone(),
            FolderScope::All => conn.list_folders().await.map_err(scan_error)?,
        };

        let mut messages = Vec::new();
        let mut truncated = false;

        'folders: for folder in &folders {
            if !conn.examine(folder).await.map_err(scan_error)? {
                debug!("Skipping missing folder {}", folder);
                continue;
            }

            let uids = conn.search(&query).await.map_err(scan_error)?;
            debug!("{} candidate(s) in {}", uids.len(), folder);

            for uid in uids {
                let fetched = if full_fetch {
                    conn.fetch_message(uid).await
                } else {
                    conn.fetch_header(uid).await
                };
                let email = match fetched {
                    Ok(Some(email)) => email,
                    Ok(None) => {
                        warn!("UID {} in {} vanished before fetch", uid, folder);
                        continue;
                    }
                    Err(Error::Parse(e)) => {
                        warn!("Skipping UID {} in {}: {}", uid, folder, e);
                        continue;
                    }
                    Err(e) => return Err(scan_error(e)),
                };

                let record = MessageRecord::from_email(folder, uid, &email);
                if !criteria.matches_received(&record.date) {
                    continue;
                }
                let body = full_fetch.then(|| email.body.best_text().to_string());
                if post_filter
                    && !criteria.matches_keyword(&record.subject, body.as_deref().unwrap_or(""))
                {
                    continue;
                }

                // One more match than the limit allows.
                if messages.len() >= scope.limit {
                    truncated = true;
                    break 'folders;
                }
                messages.push(match body {
                    Some(body) if scope.include_body => record.with_body(body),
                    _ => record,
                });
            }
        }

        info!(
            "Search for {} matched {} message(s){}",
            self.username,
            messages.len(),
            if truncated { " (limit reached)" } else { "" }
        );
        Ok(SearchResults {
            messages,
            limit: scope.limit,
            truncated,
        })
    }

    /// Fetch and parse the full message behind a record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the session is closed,
    /// [`Error::Search`] if the folder or message is gone or the fetch
    /// fails, and [`Error::Parse`] if the message cannot be parsed.
    pub async fn content(&mut self, record: &MessageRecord) -> Result<Email> {
        let conn = self.connection_mut()?;
        let folder = Folder::from(record.content.folder.as_str());
        let uid = record.content.uid;

        if !conn.examine(&folder).await.map_err(scan_error)? {
            return Err(Error::Search(format!("Folder {folder} no longer exists")));
        }
        match conn.fetch_message(uid).await {
            Ok(Some(email)) => Ok(email),
            Ok(None) => Err(Error::Search(format!("UID {uid} not found in {folder}"))),
            Err(e @ Error::Parse(_)) => Err(e),
            Err(e) => Err(scan_error(e)),
        }
    }

    /// Log out and release the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the session was already closed
    /// or the logout fails. The connection is released either way.
    pub async fn close(&mut self) -> Result<()> {
        let mut conn = self
            .connection
            .take()
            .ok_or_else(|| Error::Transport("Session already closed".into()))?;
        debug!("Closing session for {}", self.username);
        conn.logout().await
    }

    fn connection_mut(&mut self) -> Result<&mut C> {
        self.connection
            .as_mut()
            .ok_or_else(|| Error::Transport("Session is closed".into()))
    }
}

impl<C: MailConnection> Drop for Session<C> {
    fn drop(&mut self) {
        if self.connection.is_some() {
            warn!("Session for {} dropped without close", self.username);
        }
    }
}

fn scan_error(e: Error) -> Error {
    match e {
        Error::Search(_) => e,
        other => Error::Search(other.to_string()),
    }
}
