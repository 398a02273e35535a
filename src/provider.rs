//! Known mail providers and their IMAP quirks
//!
//! Provider differences are kept in one table instead of being
//! scattered through the search code. Each entry says where the IMAP
//! server lives and whether the server can be trusted with a keyword
//! search over message bodies.

use crate::error::{Error, Result};
use std::fmt;

/// How the connection to the IMAP server is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    /// TLS from the first byte (port 993).
    Tls,
    /// Plain connection upgraded with the STARTTLS command.
    StartTls,
}

/// Where keyword matching happens for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordSearch {
    /// `OR SUBJECT <kw> BODY <kw>` is sent to the server.
    ServerSide,
    /// The server only narrows by the other criteria; bodies are
    /// fetched and matched locally.
    ClientSide,
}

/// A concrete IMAP server to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: u16,
    pub security: Security,
    pub keyword: KeywordSearch,
}

impl ServerEndpoint {
    /// An implicit-TLS endpoint on port 993 with server-side keyword
    /// search.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 993,
            security: Security::Tls,
            keyword: KeywordSearch::ServerSide,
        }
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub const fn with_security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    #[must_use]
    pub const fn with_keyword(mut self, keyword: KeywordSearch) -> Self {
        self.keyword = keyword;
        self
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// An entry of the provider table.
#[derive(Debug)]
pub struct Provider {
    pub name: &'static str,
    pub domains: &'static [&'static str],
    pub host: &'static str,
    pub keyword: KeywordSearch,
}

impl Provider {
    /// The endpoint for this provider: implicit TLS on port 993.
    #[must_use]
    pub fn endpoint(&self) -> ServerEndpoint {
        ServerEndpoint::new(self.host).with_keyword(self.keyword)
    }

    /// Find the provider serving `domain` (case-insensitive).
    #[must_use]
    pub fn for_domain(domain: &str) -> Option<&'static Self> {
        PROVIDERS.iter().find(|provider| {
            provider
                .domains
                .iter()
                .any(|known| known.eq_ignore_ascii_case(domain))
        })
    }

    /// Resolve the endpoint for an email address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownProvider`] if the address has no domain
    /// or the domain is not in the table.
    pub fn resolve(address: &str) -> Result<ServerEndpoint> {
        let domain = address
            .rsplit_once('@')
            .map(|(_, domain)| domain.trim())
            .filter(|domain| !domain.is_empty())
            .ok_or_else(|| Error::UnknownProvider(format!("no domain in '{address}'")))?;

        Self::for_domain(domain)
            .map(Self::endpoint)
            .ok_or_else(|| Error::UnknownProvider(domain.to_ascii_lowercase()))
    }
}

/// Supported providers. Mail.ru and Rambler go through client-side
/// keyword matching.
pub static PROVIDERS: &[Provider] = &[
    Provider {
        name: "Gmail",
        domains: &["gmail.com"],
        host: "imap.gmail.com",
        keyword: KeywordSearch::ServerSide,
    },
    Provider {
        name: "Yahoo",
        domains: &["yahoo.com"],
        host: "imap.mail.yahoo.com",
        keyword: KeywordSearch::ServerSide,
    },
    Provider {
        name: "Mail.com",
        domains: &["mail.com"],
        host: "imap.mail.com",
        keyword: KeywordSearch::ServerSide,
    },
    Provider {
        name: "GMX",
        domains: &["gmx.com"],
        host: "imap.gmx.com",
        keyword: KeywordSearch::ServerSide,
    },
    Provider {
        name: "Mail.ru",
        domains: &["mail.ru"],
        host: "imap.mail.ru",
        keyword: KeywordSearch::ClientSide,
    },
    Provider {
        name: "Rambler",
        domains: &["rambler.ru", "autorambler.ru"],
        host: "imap.rambler.ru",
        keyword: KeywordSearch::ClientSide,
    },
    Provider {
        name: "Outlook",
        domains: &["outlook.com", "hotmail.com"],
        host: "outlook.office365.com",
        keyword: KeywordSearch::ServerSide,
    },
    Provider {
        name: "AOL",
        domains: &["aol.com"],
        host: "imap.aol.com",
        keyword: KeywordSearch::ServerSide,
    },
];
