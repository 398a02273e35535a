//! IMAP transport over TLS
//!
//! Provides [`ImapTransport`], which runs the TLS handshake (implicit
//! or via STARTTLS) and LOGIN over a tunnelled TCP stream, and
//! [`ImapConnection`], the read-only operations the search pipeline
//! needs.

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::folder::Folder;
use crate::provider::{Security, ServerEndpoint};
use crate::query::Query;
use crate::transport::{MailConnection, MailTransport};
use async_imap::Session;
use async_imap::error::Error as ImapError;
use async_imap::types::NameAttribute;
use email_extract::{Email, parse_email};
use futures::{StreamExt, TryStreamExt};
use rustls::pki_types::ServerName;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info};

/// A TLS-wrapped IMAP session.
pub type ImapSession = Session<Compat<tokio_rustls::client::TlsStream<TcpStream>>>;

/// Production [`MailTransport`] built on `async-imap` and rustls.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImapTransport {
    accept_invalid_certs: bool,
}

impl ImapTransport {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            accept_invalid_certs: false,
        }
    }

    /// Skip certificate verification, for servers with self-signed
    /// certificates.
    #[must_use]
    pub const fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    fn tls_connector(self) -> Result<TlsConnector> {
        let builder = rustls::ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Transport(format!("TLS setup failed: {e}")))?;

        let config = if self.accept_invalid_certs {
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(DangerousVerifier))
                .with_no_client_auth()
        } else {
            let roots = rustls::RootCertStore {
                roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
            };
            builder
                .with_root_certificates(roots)
                .with_no_client_auth()
        };
        Ok(TlsConnector::from(Arc::new(config)))
    }
}

impl MailTransport<TcpStream> for ImapTransport {
    type Connection = ImapConnection;

    async fn open(
        &self,
        stream: TcpStream,
        endpoint: &ServerEndpoint,
        credentials: &Credentials,
    ) -> Result<ImapConnection> {
        let stream = match endpoint.security {
            Security::Tls => stream,
            Security::StartTls => starttls(stream).await?,
        };

        let connector = self.tls_connector()?;
        let server_name = ServerName::try_from(endpoint.host.clone())
            .map_err(|e| Error::Transport(format!("Invalid server name: {e}")))?;
        let tls_stream = connector
            .connect(server_name, stream)
            .await
            .map_err(|e| Error::Transport(format!("TLS handshake with {endpoint} failed: {e}")))?;

        let client = async_imap::Client::new(tls_stream.compat());
        let session = client
            .login(credentials.username(), credentials.password())
            .await
            .map_err(|(e, _)| login_error(e))?;

        info!("Logged in to {} as {}", endpoint, credentials.username());
        Ok(ImapConnection { session })
    }
}

async fn starttls(stream: TcpStream) -> Result<TcpStream> {
    let mut client = async_imap::Client::new(stream.compat());
    client
        .run_command_and_check_ok("STARTTLS", None)
        .await
        .map_err(|e| Error::Transport(format!("STARTTLS failed: {e}")))?;
    Ok(client.into_inner().into_inner())
}

/// A tagged NO/BAD to LOGIN is the server rejecting the credentials;
/// anything else means the conversation itself broke down.
fn login_error(e: ImapError) -> Error {
    match e {
        ImapError::No(msg) | ImapError::Bad(msg) => {
            Error::Authentication(format!("Login rejected: {msg}"))
        }
        other => Error::Transport(format!("Login failed: {other}")),
    }
}

/// A logged-in IMAP session.
pub struct ImapConnection {
    session: ImapSession,
}

impl ImapConnection {
    async fn fetch_section(
        &mut self,
        uid: u32,
        items: &str,
        headers_only: bool,
    ) -> Result<Option<Email>> {
        let messages: Vec<_> = self
            .session
            .uid_fetch(uid.to_string(), items)
            .await
            .map_err(|e| Error::Transport(format!("Fetch of UID {uid} failed: {e}")))?
            .try_collect()
            .await
            .map_err(|e| Error::Transport(format!("Fetch of UID {uid} failed: {e}")))?;

        let raw = messages.iter().find_map(|msg| {
            if headers_only {
                msg.header()
            } else {
                msg.body()
            }
        });
        raw.map(|bytes| parse_email(uid, bytes).map_err(|e| Error::Parse(e.to_string())))
            .transpose()
    }
}

impl MailConnection for ImapConnection {
    async fn list_folders(&mut self) -> Result<Vec<Folder>> {
        let mut folder_stream = self
            .session
            .list(Some(""), Some("*"))
            .await
            .map_err(|e| Error::Transport(format!("List folders failed: {e}")))?;

        let mut folders = Vec::new();
        while let Some(item) = folder_stream.next().await {
            let name = item.map_err(|e| Error::Transport(format!("List folders failed: {e}")))?;
            if name
                .attributes()
                .iter()
                .any(|attr| matches!(attr, NameAttribute::NoSelect))
            {
                debug!("Skipping container folder {}", name.name());
                continue;
            }
            folders.push(Folder::from(name.name()));
        }
        Ok(folders)
    }

    async fn examine(&mut self, folder: &Folder) -> Result<bool> {
        match self.session.examine(folder.as_str()).await {
            Ok(_) => Ok(true),
            Err(ImapError::No(msg)) => {
                debug!("Folder {} not selectable: {}", folder, msg);
                Ok(false)
            }
            Err(e) => Err(Error::Transport(format!("Failed to open {folder}: {e}"))),
        }
    }

    async fn search(&mut self, query: &Query) -> Result<Vec<u32>> {
        let uids = self
            .session
            .uid_search(query.to_string())
            .await
            .map_err(|e| Error::Transport(format!("Search failed: {e}")))?;

        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_unstable();
        Ok(uid_list)
    }

    async fn fetch_header(&mut self, uid: u32) -> Result<Option<Email>> {
        self.fetch_section(uid, "(UID BODY.PEEK[HEADER])", true).await
    }

    async fn fetch_message(&mut self, uid: u32) -> Result<Option<Email>> {
        self.fetch_section(uid, "(UID BODY.PEEK[])", false).await
    }

    async fn logout(&mut self) -> Result<()> {
        self.session
            .logout()
            .await
            .map_err(|e| Error::Transport(format!("Logout failed: {e}")))
    }
}

/// Certificate verifier that accepts all certificates.
#[derive(Debug)]
struct DangerousVerifier;

impl rustls::client::danger::ServerCertVerifier for DangerousVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
