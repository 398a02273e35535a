//! IMAP credential checking and mailbox search
//!
//! Logs in to a mailbox whose server is picked from the account's
//! domain, optionally through an HTTP CONNECT or SOCKS5 proxy, and
//! searches it read-only by subject, sender, keyword and date.
//!
//! Messages are returned as [`MessageRecord`]s; full content is parsed
//! into [`Email`] structs from the [`email_extract`] crate.
//!
//! ```no_run
//! use mailkit::{Credentials, MailKit, MailKitConfig, SearchCriteria};
//!
//! # async fn run() -> mailkit::Result<()> {
//! let config = MailKitConfig::new(Credentials::new("alice@gmail.com", "app-password"));
//! let kit = MailKit::new(config);
//! kit.check().await?;
//!
//! let criteria = SearchCriteria::new().sender("billing@example.com").keyword("invoice");
//! for record in &kit.search(&criteria).await? {
//!     println!("{} {}", record.date, record.subject);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod connection;
mod credentials;
mod criteria;
mod error;
mod folder;
mod provider;
mod proxy;
mod query;
mod record;
mod session;
mod transport;

pub use client::MailKit;
pub use config::{DEFAULT_TIMEOUT, MailKitConfig};
pub use connection::{ImapConnection, ImapTransport};
pub use credentials::Credentials;
pub use criteria::SearchCriteria;
pub use email_extract::Email;
pub use error::{Error, Result};
pub use folder::{Folder, FolderScope};
pub use provider::{KeywordSearch, PROVIDERS, Provider, Security, ServerEndpoint};
pub use proxy::{NetworkTunnel, ProxyConfig, ProxyEndpoint, ProxyKind, ProxyTunnel};
pub use query::{Query, SearchTerm};
pub use record::{ContentRef, MessageRecord, SearchResults};
pub use session::{DEFAULT_SCAN_LIMIT, ScanScope, Session};
pub use transport::{MailConnection, MailTransport};
