//! Proxy configuration and tunnel establishment
//!
//! A [`ProxyTunnel`] produces the byte stream the IMAP handshake runs
//! over. [`NetworkTunnel`] connects directly, through an HTTP proxy
//! (CONNECT), or through a SOCKS5 proxy. Hostnames are resolved by the
//! proxy, not locally.

#![allow(async_fn_in_trait)]

use crate::error::{Error, Result};
use crate::provider::ServerEndpoint;
use std::fmt;
use std::str::FromStr;
use tokio::net::TcpStream;
use tokio_socks::tcp::Socks5Stream;
use tracing::debug;

/// Proxy protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    Http,
    Socks5,
}

impl FromStr for ProxyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("http") {
            Ok(Self::Http)
        } else if s.eq_ignore_ascii_case("socks5") {
            Ok(Self::Socks5)
        } else {
            Err(Error::InvalidProxy(format!(
                "unsupported proxy type '{s}', expected HTTP or SOCKS5"
            )))
        }
    }
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Http => "HTTP",
            Self::Socks5 => "SOCKS5",
        })
    }
}

/// Address of a proxy server plus optional proxy credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub address: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyEndpoint {
    #[must_use]
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            username: None,
            password: None,
        }
    }

    #[must_use]
    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    fn auth(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(Error::InvalidProxy("proxy address is empty".into()));
        }
        if self.port == 0 {
            return Err(Error::InvalidProxy("proxy port must be 1-65535".into()));
        }
        match (&self.username, &self.password) {
            (Some(_), None) => Err(Error::InvalidProxy(
                "proxy username given without a password".into(),
            )),
            (None, Some(_)) => Err(Error::InvalidProxy(
                "proxy password given without a username".into(),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyEndpoint")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// How to reach the IMAP server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProxyConfig {
    #[default]
    None,
    Http(ProxyEndpoint),
    Socks5(ProxyEndpoint),
}

impl ProxyConfig {
    /// Assemble a proxy configuration from loosely supplied parts, as
    /// they arrive from the command line or the environment.
    ///
    /// Nothing supplied means no proxy. Address and port without a
    /// type default to HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProxy`] if a type or proxy credentials
    /// are given without both address and port, or if the resulting
    /// endpoint fails validation.
    pub fn from_parts(
        kind: Option<ProxyKind>,
        address: Option<String>,
        port: Option<u16>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        let (address, port) = match (address, port) {
            (Some(address), Some(port)) => (address, port),
            (None, None) if kind.is_none() && username.is_none() && password.is_none() => {
                return Ok(Self::None);
            }
            _ => {
                return Err(Error::InvalidProxy(
                    "proxy address and port are both required".into(),
                ));
            }
        };

        let endpoint = ProxyEndpoint {
            address,
            port,
            username,
            password,
        };
        let config = match kind.unwrap_or(ProxyKind::Http) {
            ProxyKind::Http => Self::Http(endpoint),
            ProxyKind::Socks5 => Self::Socks5(endpoint),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the proxy invariants without touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProxy`] for an empty address, port 0,
    /// or half-supplied proxy credentials.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::None => Ok(()),
            Self::Http(endpoint) | Self::Socks5(endpoint) => endpoint.validate(),
        }
    }

    #[must_use]
    pub const fn is_proxied(&self) -> bool {
        !matches!(self, Self::None)
    }

    #[must_use]
    pub const fn kind(&self) -> Option<ProxyKind> {
        match self {
            Self::None => None,
            Self::Http(_) => Some(ProxyKind::Http),
            Self::Socks5(_) => Some(ProxyKind::Socks5),
        }
    }
}

/// Establishes the stream to the IMAP server.
pub trait ProxyTunnel {
    type Stream;

    /// Open a stream to `target`, routed according to `proxy`.
    ///
    /// Implementations report failures of a proxied route as
    /// [`Error::ProxyConnection`] and failures of a direct route as
    /// [`Error::Transport`].
    async fn establish(&self, proxy: &ProxyConfig, target: &ServerEndpoint)
    -> Result<Self::Stream>;
}

/// TCP tunnel: direct, HTTP CONNECT, or SOCKS5.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkTunnel;

impl ProxyTunnel for NetworkTunnel {
    type Stream = TcpStream;

    async fn establish(&self, proxy: &ProxyConfig, target: &ServerEndpoint) -> Result<TcpStream> {
        match proxy {
            ProxyConfig::None => {
                debug!("Connecting directly to {}", target);
                TcpStream::connect((target.host.as_str(), target.port))
                    .await
                    .map_err(|e| Error::Transport(format!("Cannot reach {target}: {e}")))
            }
            ProxyConfig::Http(endpoint) => http_connect(endpoint, target).await,
            ProxyConfig::Socks5(endpoint) => socks5_connect(endpoint, target).await,
        }
    }
}

async fn http_connect(endpoint: &ProxyEndpoint, target: &ServerEndpoint) -> Result<TcpStream> {
    debug!("Tunnelling to {} via HTTP proxy {}", target, endpoint);

    let mut stream = TcpStream::connect((endpoint.address.as_str(), endpoint.port))
        .await
        .map_err(|e| Error::ProxyConnection(format!("Cannot reach HTTP proxy {endpoint}: {e}")))?;

    let negotiated = match endpoint.auth() {
        Some((user, pass)) => {
            async_http_proxy::http_connect_tokio_with_basic_auth(
                &mut stream,
                &target.host,
                target.port,
                user,
                pass,
            )
            .await
        }
        None => async_http_proxy::http_connect_tokio(&mut stream, &target.host, target.port).await,
    };

    negotiated.map_err(|e| {
        Error::ProxyConnection(format!("HTTP proxy {endpoint} refused CONNECT to {target}: {e}"))
    })?;
    Ok(stream)
}

async fn socks5_connect(endpoint: &ProxyEndpoint, target: &ServerEndpoint) -> Result<TcpStream> {
    debug!("Tunnelling to {} via SOCKS5 proxy {}", target, endpoint);

    let proxy_addr = (endpoint.address.as_str(), endpoint.port);
    let target_addr = (target.host.as_str(), target.port);

    let stream = match endpoint.auth() {
        Some((user, pass)) => {
            Socks5Stream::connect_with_password(proxy_addr, target_addr, user, pass).await
        }
        None => Socks5Stream::connect(proxy_addr, target_addr).await,
    }
    .map_err(|e| {
        Error::ProxyConnection(format!("SOCKS5 proxy {endpoint} failed to reach {target}: {e}"))
    })?;

    Ok(stream.into_inner())
}
