//! Mailbox connection configuration

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::provider::{KeywordSearch, Provider, Security, ServerEndpoint};
use crate::proxy::{ProxyConfig, ProxyKind};
use crate::session::ScanScope;
use std::env;
use std::time::Duration;

/// Default bound on tunnel setup and on the IMAP handshake.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything needed to open a mailbox session.
#[derive(Debug, Clone)]
pub struct MailKitConfig {
    pub credentials: Credentials,
    pub proxy: ProxyConfig,
    /// Explicit server, bypassing the provider table.
    pub server: Option<ServerEndpoint>,
    pub scope: ScanScope,
    pub timeout: Duration,
    /// Skip TLS certificate verification.
    pub accept_invalid_certs: bool,
}

impl MailKitConfig {
    /// Direct connection to the provider of `credentials`, default
    /// scope and timeout.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            proxy: ProxyConfig::None,
            server: None,
            scope: ScanScope::default(),
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: false,
        }
    }

    #[must_use]
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = proxy;
        self
    }

    #[must_use]
    pub fn with_server(mut self, server: ServerEndpoint) -> Self {
        self.server = Some(server);
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: ScanScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// The server to connect to: the explicit one if set, otherwise the
    /// provider entry for the username's domain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownProvider`] if no server is set and the
    /// domain is not in the provider table.
    pub fn endpoint(&self) -> Result<ServerEndpoint> {
        match &self.server {
            Some(server) => Ok(server.clone()),
            None => Provider::resolve(self.credentials.username()),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `MAILKIT_EMAIL`
    /// - `MAILKIT_PASSWORD`
    ///
    /// Optional:
    /// - `MAILKIT_PROXY_TYPE` (`HTTP` or `SOCKS5`, default `HTTP`),
    ///   `MAILKIT_PROXY_ADDR`, `MAILKIT_PROXY_PORT`,
    ///   `MAILKIT_PROXY_USERNAME`, `MAILKIT_PROXY_PASSWORD`
    /// - `MAILKIT_IMAP_HOST`, `MAILKIT_IMAP_PORT` (default `993`),
    ///   `MAILKIT_IMAP_STARTTLS`, `MAILKIT_IMAP_CLIENT_KEYWORD`
    /// - `MAILKIT_TIMEOUT` (seconds, default `10`)
    /// - `MAILKIT_ACCEPT_INVALID_CERTS`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for missing or malformed variables and
    /// [`Error::InvalidProxy`] for inconsistent proxy settings.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|name| env::var(name).ok())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| get(name).filter(|v| !v.is_empty());

        let username =
            var("MAILKIT_EMAIL").ok_or_else(|| Error::Config("MAILKIT_EMAIL not set".into()))?;
        let password = var("MAILKIT_PASSWORD")
            .ok_or_else(|| Error::Config("MAILKIT_PASSWORD not set".into()))?;

        let proxy = ProxyConfig::from_parts(
            var("MAILKIT_PROXY_TYPE")
                .map(|kind| kind.parse::<ProxyKind>())
                .transpose()?,
            var("MAILKIT_PROXY_ADDR"),
            var("MAILKIT_PROXY_PORT")
                .map(|port| parse_port("MAILKIT_PROXY_PORT", &port))
                .transpose()?,
            var("MAILKIT_PROXY_USERNAME"),
            var("MAILKIT_PROXY_PASSWORD"),
        )?;

        let server = match var("MAILKIT_IMAP_HOST") {
            Some(host) => {
                let mut server = ServerEndpoint::new(host);
                if let Some(port) = var("MAILKIT_IMAP_PORT") {
                    server = server.with_port(parse_port("MAILKIT_IMAP_PORT", &port)?);
                }
                if parse_flag("MAILKIT_IMAP_STARTTLS", var("MAILKIT_IMAP_STARTTLS"))? {
                    server = server.with_security(Security::StartTls);
                }
                if parse_flag(
                    "MAILKIT_IMAP_CLIENT_KEYWORD",
                    var("MAILKIT_IMAP_CLIENT_KEYWORD"),
                )? {
                    server = server.with_keyword(KeywordSearch::ClientSide);
                }
                Some(server)
            }
            None => None,
        };

        let timeout = match var("MAILKIT_TIMEOUT") {
            Some(secs) => Duration::from_secs(
                secs.parse::<u64>()
                    .ok()
                    .filter(|s| *s > 0)
                    .ok_or_else(|| Error::Config(format!("Invalid MAILKIT_TIMEOUT: {secs}")))?,
            ),
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            credentials: Credentials::new(username, password),
            proxy,
            server,
            scope: ScanScope::default(),
            timeout,
            accept_invalid_certs: parse_flag(
                "MAILKIT_ACCEPT_INVALID_CERTS",
                var("MAILKIT_ACCEPT_INVALID_CERTS"),
            )?,
        })
    }
}

fn parse_port(name: &str, value: &str) -> Result<u16> {
    value
        .parse::<u16>()
        .ok()
        .filter(|port| *port > 0)
        .ok_or_else(|| Error::Config(format!("Invalid {name}: {value}")))
}

fn parse_flag(name: &str, value: Option<String>) -> Result<bool> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("0" | "false" | "no") => Ok(false),
        Some("1" | "true" | "yes") => Ok(true),
        Some(other) => Err(Error::Config(format!("Invalid {name}: {other}"))),
    }
}
