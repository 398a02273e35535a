//! Capability boundary between mailkit and the IMAP client
//!
//! [`MailTransport`] turns an established byte stream into a logged-in
//! [`MailConnection`]. The production implementation lives in
//! `connection.rs`; tests plug in in-memory fakes.

#![allow(async_fn_in_trait)]

use crate::credentials::Credentials;
use crate::error::Result;
use crate::folder::Folder;
use crate::provider::ServerEndpoint;
use crate::query::Query;
use email_extract::Email;

/// Opens an authenticated mailbox connection over a stream `S`.
pub trait MailTransport<S> {
    type Connection: MailConnection;

    /// Perform the IMAP handshake and LOGIN.
    ///
    /// Implementations report a rejected LOGIN as
    /// [`Error::Authentication`](crate::Error::Authentication) and any
    /// other failure as [`Error::Transport`](crate::Error::Transport).
    async fn open(
        &self,
        stream: S,
        endpoint: &ServerEndpoint,
        credentials: &Credentials,
    ) -> Result<Self::Connection>;
}

/// An open, authenticated mailbox connection.
///
/// All operations are read-only: message fetches never set `\Seen`.
pub trait MailConnection {
    /// Every openable folder on the server, in LIST order. `\Noselect`
    /// containers are left out.
    async fn list_folders(&mut self) -> Result<Vec<Folder>>;

    /// Open a folder read-only (EXAMINE). `Ok(false)` when the server
    /// has no such folder or refuses to open it.
    async fn examine(&mut self, folder: &Folder) -> Result<bool>;

    /// UIDs matching the query in the open folder, ascending.
    async fn search(&mut self, query: &Query) -> Result<Vec<u32>>;

    /// Headers only. `Ok(None)` when the UID no longer exists.
    async fn fetch_header(&mut self, uid: u32) -> Result<Option<Email>>;

    /// The full message. `Ok(None)` when the UID no longer exists.
    async fn fetch_message(&mut self, uid: u32) -> Result<Option<Email>>;

    async fn logout(&mut self) -> Result<()>;
}
