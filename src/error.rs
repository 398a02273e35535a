//! Error types for mailkit
//!
//! Every variant is safe to print: none of them ever carries the
//! account or proxy password.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Username or password missing. Raised before any network call.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Proxy settings are incomplete or inconsistent. Raised before any
    /// network call.
    #[error("Invalid proxy configuration: {0}")]
    InvalidProxy(String),

    /// The tunnel through the configured proxy could not be set up.
    #[error("Proxy connection error: {0}")]
    ProxyConnection(String),

    /// The IMAP server rejected the login.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Network, DNS, TLS or timeout failure, or use of a closed session.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The address domain has no entry in the provider table.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// The scan failed after the session was opened.
    #[error("Search error: {0}")]
    Search(String),

    #[error("Email parsing error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Short, human-readable category of the failure.
    ///
    /// Used by the CLI `--check` rendering, where network problems and
    /// rejected credentials both mean "invalid" but are still reported
    /// apart.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidCredentials(_) => "missing credentials",
            Self::InvalidProxy(_) => "bad proxy settings",
            Self::ProxyConnection(_) => "proxy unreachable",
            Self::Authentication(_) => "login rejected",
            Self::Transport(_) => "server unreachable",
            Self::UnknownProvider(_) => "unsupported provider",
            Self::Search(_) => "search failed",
            Self::Parse(_) => "unreadable message",
            Self::Config(_) => "bad configuration",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
