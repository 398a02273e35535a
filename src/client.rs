//! Connection bootstrap and the high-level mailbox API

use crate::config::MailKitConfig;
use crate::connection::ImapTransport;
use crate::criteria::SearchCriteria;
use crate::error::{Error, Result};
use crate::proxy::{NetworkTunnel, ProxyTunnel};
use crate::record::SearchResults;
use crate::session::Session;
use crate::transport::MailTransport;
use std::ops::AsyncFnOnce;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Mailbox client: validates configuration, establishes the tunnel,
/// logs in, and hands out [`Session`]s.
///
/// Every call to [`MailKit::connect`] opens exactly one connection and
/// never retries.
pub struct MailKit<T = NetworkTunnel, M = ImapTransport> {
    config: MailKitConfig,
    tunnel: T,
    transport: M,
}

impl MailKit {
    /// Client using real TCP/proxy tunnels and the IMAP transport.
    #[must_use]
    pub fn new(config: MailKitConfig) -> Self {
        let transport = ImapTransport::new().accept_invalid_certs(config.accept_invalid_certs);
        Self::with_parts(config, NetworkTunnel, transport)
    }
}

impl<T, M> MailKit<T, M>
where
    T: ProxyTunnel,
    M: MailTransport<T::Stream>,
{
    /// Client with injected tunnel and transport capabilities.
    #[must_use]
    pub const fn with_parts(config: MailKitConfig, tunnel: T, transport: M) -> Self {
        Self {
            config,
            tunnel,
            transport,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &MailKitConfig {
        &self.config
    }

    /// Open an authenticated session.
    ///
    /// Credentials, proxy settings and the provider are all checked
    /// before any network activity.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidCredentials`], [`Error::InvalidProxy`],
    ///   [`Error::UnknownProvider`]: rejected locally.
    /// - [`Error::ProxyConnection`]: the proxy tunnel failed.
    /// - [`Error::Transport`]: the server could not be reached or the
    ///   handshake timed out.
    /// - [`Error::Authentication`]: the server rejected the login.
    pub async fn connect(&self) -> Result<Session<M::Connection>> {
        let config = &self.config;
        config.credentials.validate()?;
        config.proxy.validate()?;
        let endpoint = config.endpoint()?;

        match config.proxy.kind() {
            Some(kind) => debug!("Connecting to {} through {} proxy", endpoint, kind),
            None => debug!("Connecting to {}", endpoint),
        }

        let stream = timeout(config.timeout, self.tunnel.establish(&config.proxy, &endpoint))
            .await
            .map_err(|_| {
                let msg = format!("Timed out reaching {endpoint}");
                if config.proxy.is_proxied() {
                    Error::ProxyConnection(msg)
                } else {
                    Error::Transport(msg)
                }
            })??;

        let connection = timeout(
            config.timeout,
            self.transport.open(stream, &endpoint, &config.credentials),
        )
        .await
        .map_err(|_| Error::Transport(format!("Timed out logging in to {endpoint}")))??;

        info!("Successful login on {}", config.credentials.username());
        Ok(Session::new(
            config.credentials.username().to_string(),
            endpoint.keyword,
            config.scope.clone(),
            connection,
        ))
    }

    /// Run `f` on a fresh session and close the session afterwards,
    /// whether `f` succeeded or not.
    ///
    /// # Errors
    ///
    /// Returns the bootstrap error, the error of `f`, or, if `f`
    /// succeeded, the error of closing the session.
    pub async fn with_session<R, F>(&self, f: F) -> Result<R>
    where
        F: AsyncFnOnce(&mut Session<M::Connection>) -> Result<R>,
    {
        let mut session = self.connect().await?;
        let outcome = f(&mut session).await;
        let closed = session.close().await;

        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    warn!("Failed to logout: {}", close_err);
                }
                Err(e)
            }
        }
    }

    /// Verify that the account can log in.
    ///
    /// # Errors
    ///
    /// Returns the classified bootstrap error when the login fails.
    pub async fn check(&self) -> Result<()> {
        self.with_session(async |_| Ok(())).await
    }

    /// One-shot search on a fresh session with the configured scope.
    ///
    /// # Errors
    ///
    /// Returns any bootstrap error, or [`Error::Search`] if the scan
    /// fails.
    pub async fn search(&self, criteria: &SearchCriteria) -> Result<SearchResults> {
        self.with_session(async |session| session.search(criteria).await)
            .await
    }
}
