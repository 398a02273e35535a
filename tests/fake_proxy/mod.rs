//! Fake HTTP CONNECT and SOCKS5 proxies for integration testing
//!
//! Both proxies run on localhost with an OS-assigned port, count the
//! tunnels they open, and splice bytes between client and target with
//! `tokio::io::copy_bidirectional` once the handshake is done.
//!
//! ## HTTP CONNECT (RFC 9110 Section 9.3.6)
//!
//! ```text
//!   Client:  CONNECT 127.0.0.1:4143 HTTP/1.1\r\n
//!            Host: 127.0.0.1:4143\r\n
//!            \r\n
//!   Proxy:   HTTP/1.1 200 Connection established\r\n\r\n
//!   ... raw bytes in both directions ...
//! ```
//!
//! With [`HttpBehavior::Basic`] the request must carry
//! `Proxy-Authorization: Basic base64(user:pass)`; otherwise the answer
//! is `407`.
//!
//! ## SOCKS5 (RFC 1928)
//!
//! ```text
//!   Client:  05 01 00                       greeting, one method: none
//!   Proxy:   05 00                          method accepted
//!   Client:  05 01 00 01 7f 00 00 01 10 2f  CONNECT 127.0.0.1:4143
//!   Proxy:   05 00 00 01 00 00 00 00 00 00  succeeded
//! ```
//!
//! With credentials configured the proxy insists on method 02 and runs
//! the RFC 1929 sub-negotiation before the request:
//!
//! ```text
//!   Client:  01 ULEN UNAME PLEN PASSWD
//!   Proxy:   01 00                          (01 01 and close on mismatch)
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// How the HTTP proxy answers CONNECT.
#[derive(Debug, Clone, Copy)]
pub enum HttpBehavior {
    /// `200 Connection established`, then tunnel.
    Tunnel,
    /// `407 Proxy Authentication Required` for every request.
    RequireAuth,
    /// Tunnel only for these Basic credentials, `407` otherwise.
    Basic(&'static str, &'static str),
}

/// Username and password a proxy demands.
type Login = Option<(&'static str, &'static str)>;

/// A running fake proxy.
pub struct FakeProxy {
    port: u16,
    tunnels: Arc<AtomicUsize>,
    _handle: tokio::task::JoinHandle<()>,
}

impl FakeProxy {
    /// Start an HTTP CONNECT proxy.
    pub async fn http(behavior: HttpBehavior) -> Self {
        Self::spawn(move |client, tunnels| handle_http(client, behavior, tunnels)).await
    }

    /// Start a SOCKS5 proxy without authentication.
    pub async fn socks5() -> Self {
        Self::spawn(|client, tunnels| handle_socks5(client, None, tunnels)).await
    }

    /// Start a SOCKS5 proxy that requires username/password auth.
    pub async fn socks5_with_auth(username: &'static str, password: &'static str) -> Self {
        Self::spawn(move |client, tunnels| {
            handle_socks5(client, Some((username, password)), tunnels)
        })
        .await
    }

    async fn spawn<F, Fut>(handler: F) -> Self
    where
        F: Fn(TcpStream, Arc<AtomicUsize>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind to ephemeral port");
        let port = listener.local_addr().unwrap().port();
        let tunnels = Arc::new(AtomicUsize::new(0));

        let counter = tunnels.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _addr)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(handler(stream, counter.clone()));
            }
        });

        Self {
            port,
            tunnels,
            _handle: handle,
        }
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Number of tunnels successfully opened to a target.
    pub fn tunnels(&self) -> usize {
        self.tunnels.load(Ordering::SeqCst)
    }
}

async fn handle_http(client: TcpStream, behavior: HttpBehavior, tunnels: Arc<AtomicUsize>) {
    let mut reader = BufReader::new(client);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await.is_err() {
        return;
    }

    let mut authorization = None;
    loop {
        let mut header = String::new();
        match reader.read_line(&mut header).await {
            Ok(0) | Err(_) => return,
            Ok(_) if header.trim().is_empty() => break,
            Ok(_) => {}
        }
        if let Some((name, value)) = header.split_once(':')
            && name.trim().eq_ignore_ascii_case("Proxy-Authorization")
        {
            authorization = Some(value.trim().to_string());
        }
    }

    let mut client = reader.into_inner();
    let mut parts = request_line.split_whitespace();
    let (Some("CONNECT"), Some(target)) = (parts.next(), parts.next()) else {
        let _ = client.write_all(b"HTTP/1.1 405 Method Not Allowed\r\n\r\n").await;
        return;
    };

    let authorized = match behavior {
        HttpBehavior::Tunnel => true,
        HttpBehavior::RequireAuth => false,
        HttpBehavior::Basic(user, pass) => authorization
            .as_deref()
            .and_then(|value| value.strip_prefix("Basic "))
            .and_then(|encoded| STANDARD.decode(encoded.trim()).ok())
            .is_some_and(|decoded| decoded == format!("{user}:{pass}").as_bytes()),
    };
    if !authorized {
        let _ = client
            .write_all(
                b"HTTP/1.1 407 Proxy Authentication Required\r\n\
                  Proxy-Authenticate: Basic realm=\"fake\"\r\n\r\n",
            )
            .await;
        return;
    }

    let Ok(mut upstream) = TcpStream::connect(target).await else {
        let _ = client.write_all(b"HTTP/1.1 502 Bad Gateway\r\n\r\n").await;
        return;
    };
    if client
        .write_all(b"HTTP/1.1 200 Connection established\r\n\r\n")
        .await
        .is_err()
    {
        return;
    }

    tunnels.fetch_add(1, Ordering::SeqCst);
    let _ = tokio::io::copy_bidirectional(&mut client, &mut upstream).await;
}

async fn handle_socks5(mut client: TcpStream, login: Login, tunnels: Arc<AtomicUsize>) {
    // Greeting: VER NMETHODS METHODS...
    let mut head = [0u8; 2];
    if client.read_exact(&mut head).await.is_err() || head[0] != 5 {
        return;
    }
    let mut methods = vec![0u8; usize::from(head[1])];
    if client.read_exact(&mut methods).await.is_err() {
        return;
    }
    let method = if login.is_some() { 2 } else { 0 };
    if !methods.contains(&method) {
        let _ = client.write_all(&[5, 0xff]).await;
        return;
    }
    if client.write_all(&[5, method]).await.is_err() {
        return;
    }
    if let Some((username, password)) = login
        && !socks5_login(&mut client, username, password).await
    {
        return;
    }

    // Request: VER CMD RSV ATYP DST.ADDR DST.PORT
    let mut request = [0u8; 4];
    if client.read_exact(&mut request).await.is_err() || request[1] != 1 {
        return;
    }
    let host = match request[3] {
        1 => {
            let mut ip = [0u8; 4];
            if client.read_exact(&mut ip).await.is_err() {
                return;
            }
            std::net::Ipv4Addr::from(ip).to_string()
        }
        3 => {
            let Ok(len) = client.read_u8().await else {
                return;
            };
            let mut name = vec![0u8; usize::from(len)];
            if client.read_exact(&mut name).await.is_err() {
                return;
            }
            String::from_utf8_lossy(&name).into_owned()
        }
        4 => {
            let mut ip = [0u8; 16];
            if client.read_exact(&mut ip).await.is_err() {
                return;
            }
            std::net::Ipv6Addr::from(ip).to_string()
        }
        _ => return,
    };
    let Ok(port) = client.read_u16().await else {
        return;
    };

    let Ok(mut upstream) = TcpStream::connect((host.as_str(), port)).await else {
        // 0x05: connection refused
        let _ = client.write_all(&[5, 5, 0, 1, 0, 0, 0, 0, 0, 0]).await;
        return;
    };
    if client
        .write_all(&[5, 0, 0, 1, 0, 0, 0, 0, 0, 0])
        .await
        .is_err()
    {
        return;
    }

    tunnels.fetch_add(1, Ordering::SeqCst);
    let _ = tokio::io::copy_bidirectional(&mut client, &mut upstream).await;
}

/// RFC 1929 sub-negotiation. Answers and returns whether the client
/// may continue.
async fn socks5_login(client: &mut TcpStream, username: &str, password: &str) -> bool {
    let Ok(1) = client.read_u8().await else {
        return false;
    };
    let Some(given_user) = read_short_string(client).await else {
        return false;
    };
    let Some(given_pass) = read_short_string(client).await else {
        return false;
    };

    let ok = given_user == username.as_bytes() && given_pass == password.as_bytes();
    let status = if ok { 0 } else { 1 };
    client.write_all(&[1, status]).await.is_ok() && ok
}

/// A length-prefixed byte string.
async fn read_short_string(client: &mut TcpStream) -> Option<Vec<u8>> {
    let len = client.read_u8().await.ok()?;
    let mut buf = vec![0u8; usize::from(len)];
    client.read_exact(&mut buf).await.ok()?;
    Some(buf)
}
