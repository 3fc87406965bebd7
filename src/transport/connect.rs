//! Name resolution and TCP connection setup.

use std::{
    io,
    net::{IpAddr, SocketAddr},
    time::Duration,
};

use tokio::{
    net::{TcpStream, lookup_host},
    task::spawn_blocking,
    time::timeout,
};
use tracing::debug;

use super::TransportError;

/// A freshly connected stream plus what was learnt about the peer.
#[derive(Debug)]
pub struct Connected {
    /// The connected socket.
    pub stream: TcpStream,
    /// Address that accepted the connection.
    pub peer_addr: SocketAddr,
    /// Reverse-resolved name of `peer_addr`, if the resolver knew one.
    pub canonical_name: Option<String>,
}

/// Resolve `host:port` and connect to the first address that accepts.
///
/// Addresses are tried in resolver order regardless of family. When
/// `attempt_timeout` is set it bounds each attempt separately. The reverse
/// lookup of the connected address is best-effort.
///
/// # Errors
/// Returns [`TransportError::Resolve`] if resolution fails or yields no
/// addresses, and [`TransportError::Connect`] with the last OS error once
/// every candidate has failed.
pub async fn connect(
    host: &str,
    port: u16,
    attempt_timeout: Option<Duration>,
) -> Result<Connected, TransportError> {
    let candidates: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|source| TransportError::Resolve {
            host: host.to_owned(),
            source,
        })?
        .collect();
    if candidates.is_empty() {
        return Err(TransportError::Resolve {
            host: host.to_owned(),
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses found"),
        });
    }

    let mut last_error = None;
    for addr in candidates {
        debug!(%addr, "connecting");
        match connect_one(addr, attempt_timeout).await {
            Ok(stream) => {
                let canonical_name = reverse_lookup(addr.ip()).await;
                debug!(%addr, ?canonical_name, "connected");
                return Ok(Connected {
                    stream,
                    peer_addr: addr,
                    canonical_name,
                });
            }
            Err(err) => {
                debug!(%addr, error = %err, "connect attempt failed");
                last_error = Some(err);
            }
        }
    }
    Err(TransportError::Connect {
        host: host.to_owned(),
        port,
        source: last_error
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses found")),
    })
}

async fn connect_one(addr: SocketAddr, attempt_timeout: Option<Duration>) -> io::Result<TcpStream> {
    match attempt_timeout {
        Some(limit) => timeout(limit, TcpStream::connect(addr))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))?,
        None => TcpStream::connect(addr).await,
    }
}

/// Look up the host name registered for `ip`.
///
/// Runs on the blocking pool; failures are logged and yield `None`.
pub async fn reverse_lookup(ip: IpAddr) -> Option<String> {
    match spawn_blocking(move || dns_lookup::lookup_addr(&ip)).await {
        Ok(Ok(name)) => Some(name),
        Ok(Err(err)) => {
            debug!(%ip, error = %err, "reverse lookup failed");
            None
        }
        Err(err) => {
            debug!(%ip, error = %err, "reverse lookup task failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn connects_to_listening_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let accept = tokio::spawn(async move { listener.accept().await.map(|(s, _)| s) });
        let connected = connect("127.0.0.1", port, Some(Duration::from_secs(5)))
            .await
            .expect("connect");
        assert_eq!(connected.peer_addr.port(), port);
        accept.await.expect("join").expect("accept");
    }

    #[tokio::test]
    async fn refused_connection_reports_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);
        let err = connect("127.0.0.1", port, None).await.expect_err("refused");
        assert!(matches!(err, TransportError::Connect { port: p, .. } if p == port));
    }

    #[tokio::test]
    async fn unresolvable_host_reports_resolve_error() {
        let err = connect("name.invalid", 80, None)
            .await
            .expect_err("no such host");
        assert!(matches!(err, TransportError::Resolve { .. }));
    }
}
