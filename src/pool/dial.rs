//! TCP connection establishment for pooled connections

use socket2::{SockRef, TcpKeepalive};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::constants::socket::{KEEPALIVE_INTERVAL, KEEPALIVE_TIME};
use crate::error::{ClientError, Result};

/// Connect to `addr`, giving up after `dial_timeout`
///
/// The socket is tuned for long-lived reuse: Nagle disabled and TCP
/// keepalive probing so peers that vanish silently are noticed by the kernel
/// as well as by the pool's active tests.
pub async fn connect(addr: &str, dial_timeout: Duration) -> Result<TcpStream> {
    let stream = match timeout(dial_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => {
            return Err(ClientError::Connect {
                addr: addr.to_string(),
                source,
            });
        }
        Err(_) => {
            return Err(ClientError::ConnectTimeout {
                addr: addr.to_string(),
                timeout: dial_timeout,
            });
        }
    };

    tune_socket(&stream).map_err(|source| ClientError::Connect {
        addr: addr.to_string(),
        source,
    })?;

    debug!(addr = %addr, local = ?stream.local_addr().ok(), "Dialed connection");
    Ok(stream)
}

fn tune_socket(stream: &TcpStream) -> std::io::Result<()> {
    stream.set_nodelay(true)?;

    let keepalive = TcpKeepalive::new()
        .with_time(KEEPALIVE_TIME)
        .with_interval(KEEPALIVE_INTERVAL);
    SockRef::from(stream).set_tcp_keepalive(&keepalive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_success() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let stream = connect(&addr, Duration::from_secs(1)).await.unwrap();
        assert!(stream.nodelay().unwrap());
    }

    #[tokio::test]
    async fn test_connect_refused_is_transport() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = connect(&addr, Duration::from_secs(1)).await.unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains(&addr));
    }

    #[tokio::test]
    async fn test_connect_invalid_address() {
        let err = connect("not an address", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }));
    }
}
