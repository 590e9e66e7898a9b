//! Frame exchange over pooled connections against misbehaving peers
//!
//! Transport failures must discard the connection; a failed status must
//! leave it reusable.

use std::time::Duration;

use anyhow::Result;
use fdfs_client::protocol::{HEADER_LEN, codes, encode_header};
use fdfs_client::{ClientError, ConnectionPool};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve every connection with the same raw reply after each request header
async fn spawn_raw_server(reply: Vec<u8>) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?.to_string();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let reply = reply.clone();
            tokio::spawn(async move {
                let mut header = [0u8; HEADER_LEN];
                while stream.read_exact(&mut header).await.is_ok() {
                    if stream.write_all(&reply).await.is_err() {
                        break;
                    }
                }
            });
        }
    });
    Ok(addr)
}

async fn pool_for(addr: &str) -> Result<ConnectionPool> {
    Ok(ConnectionPool::builder(addr)
        .max_connections(5)
        .network_timeout(Duration::from_millis(200))
        .health_check_interval(Duration::from_secs(3600))
        .build()
        .await?)
}

#[tokio::test]
async fn test_unexpected_command_is_malformed_and_discarded() -> Result<()> {
    let addr = spawn_raw_server(encode_header(codes::UPLOAD_FILE, 0, 0).to_vec()).await?;
    let pool = pool_for(&addr).await?;

    let mut conn = pool.acquire().await?;
    conn.send_frame(codes::ACTIVE_TEST, &[]).await?;
    let outcome = conn.recv_frame().await;

    assert!(matches!(outcome, Err(ClientError::Malformed { .. })));
    assert!(conn.is_broken());
    conn.settle(&outcome);
    assert_eq!(pool.status().open.get(), 4);
    Ok(())
}

#[tokio::test]
async fn test_truncated_body_is_transport_error() -> Result<()> {
    // Announces 10 bytes, sends 3, then goes quiet
    let mut reply = encode_header(codes::RESP, 0, 10).to_vec();
    reply.extend_from_slice(b"abc");
    let addr = spawn_raw_server(reply).await?;
    let pool = pool_for(&addr).await?;

    let mut conn = pool.acquire().await?;
    conn.send_frame(codes::DELETE_FILE, b"x").await?;
    let outcome = conn.recv_frame().await;

    let err = outcome.as_ref().unwrap_err();
    assert!(matches!(err, ClientError::Timeout { .. }), "got {err}");
    assert!(err.is_transport());
    conn.settle(&outcome);
    assert_eq!(pool.status().open.get(), 4);
    Ok(())
}

#[tokio::test]
async fn test_oversized_body_rejected() -> Result<()> {
    let addr = spawn_raw_server(encode_header(codes::RESP, 0, u64::MAX).to_vec()).await?;
    let pool = pool_for(&addr).await?;

    let mut conn = pool.acquire().await?;
    conn.send_frame(codes::DOWNLOAD_FILE, &[]).await?;
    let outcome = conn.recv_frame().await;

    assert!(matches!(outcome, Err(ClientError::Malformed { .. })));
    conn.settle(&outcome);
    assert_eq!(pool.status().open.get(), 4);
    Ok(())
}

#[tokio::test]
async fn test_failed_status_body_is_drained() -> Result<()> {
    // Failure carrying a body, then nothing else: the body must not leak
    // into the next exchange
    let mut reply = encode_header(codes::RESP, 2, 4).to_vec();
    reply.extend_from_slice(b"oops");
    let addr = spawn_raw_server(reply).await?;
    let pool = pool_for(&addr).await?;

    let mut conn = pool.acquire().await?;
    for _ in 0..2 {
        conn.send_frame(codes::DELETE_FILE, &[]).await?;
        let err = conn.recv_frame().await.unwrap_err();
        assert_eq!(err.status(), Some(2));
    }
    assert!(!conn.is_broken());
    conn.release();
    assert_eq!(pool.status().available.get(), 5);
    Ok(())
}

#[tokio::test]
async fn test_pooled_connection_as_byte_stream() -> Result<()> {
    let addr = spawn_raw_server(encode_header(codes::RESP, 0, 0).to_vec()).await?;
    let pool = pool_for(&addr).await?;

    let mut conn = pool.acquire().await?;
    conn.write_all(&encode_header(codes::ACTIVE_TEST, 0, 0)).await?;
    let mut reply = [0u8; HEADER_LEN];
    conn.read_exact(&mut reply).await?;
    assert_eq!(reply, encode_header(codes::RESP, 0, 0));

    assert!(conn.peer_addr()?.to_string() == addr);
    conn.release();
    assert_eq!(pool.status().available.get(), 5);
    Ok(())
}
