//! Health check tests
//!
//! Active tests against real sockets and the pool's background sweep:
//! - Healthy, silent and closed peers
//! - Eviction of idle connections only
//! - No refill after eviction

use anyhow::Result;
use fdfs_client::ConnectionPool;
use fdfs_client::pool::health_check::{HealthCheckError, check_active_test};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

mod test_helpers;

use test_helpers::MockStorage;

async fn pool_for(addr: &str, interval: Duration) -> Result<ConnectionPool> {
    Ok(ConnectionPool::builder(addr)
        .max_connections(5)
        .dial_timeout(Duration::from_secs(1))
        .health_check_interval(interval)
        .build()
        .await?)
}

/// A peer answering ACTIVE_TEST passes
#[tokio::test]
async fn test_active_test_against_storage() -> Result<()> {
    let storage = MockStorage::spawn().await;
    let mut stream = TcpStream::connect(&storage.addr).await?;

    check_active_test(&mut stream, Duration::from_secs(1)).await?;
    check_active_test(&mut stream, Duration::from_secs(1)).await?;
    Ok(())
}

/// A peer that reads but never answers times out
#[tokio::test]
async fn test_active_test_silent_peer_times_out() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 64];
        while let Ok(n) = stream.read(&mut buf).await {
            if n == 0 {
                break;
            }
        }
    });

    let mut stream = TcpStream::connect(addr).await?;
    let err = check_active_test(&mut stream, Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, HealthCheckError::Timeout));

    server.abort();
    Ok(())
}

/// A peer that hangs up fails the check
#[tokio::test]
async fn test_active_test_closed_peer_fails() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
    });

    let mut stream = TcpStream::connect(addr).await?;
    server.await?;

    let err = check_active_test(&mut stream, Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HealthCheckError::ReadError(_) | HealthCheckError::WriteError(_)
    ));
    Ok(())
}

#[tokio::test]
async fn test_background_sweep_evicts_failing_connections() -> Result<()> {
    let storage = MockStorage::spawn().await;
    let pool = pool_for(&storage.addr, Duration::from_millis(100)).await?;

    let checked_out = pool.acquire().await?;
    storage.state.set_active_test_status(1);

    tokio::time::sleep(Duration::from_millis(500)).await;

    let status = pool.status();
    assert_eq!(status.available.get(), 0);
    assert_eq!(status.open.get(), 1, "checked-out connection must survive");
    assert_eq!(pool.health_check_metrics().connections_failed(), 4);

    checked_out.release();
    assert_eq!(pool.status().available.get(), 1);
    Ok(())
}

#[tokio::test]
async fn test_sweep_without_failures_keeps_pool() -> Result<()> {
    let storage = MockStorage::spawn().await;
    let pool = pool_for(&storage.addr, Duration::from_millis(100)).await?;

    tokio::time::sleep(Duration::from_millis(350)).await;

    let metrics = pool.health_check_metrics();
    assert!(metrics.cycles_run() >= 2);
    assert_eq!(metrics.connections_failed(), 0);
    assert_eq!(metrics.failure_rate(), 0.0);
    assert_eq!(pool.status().open.get(), 5);
    // Active tests reuse the pooled connections
    assert_eq!(storage.state.accepted(), 5);
    Ok(())
}

#[tokio::test]
async fn test_evicted_connections_are_not_refilled() -> Result<()> {
    let storage = MockStorage::spawn().await;
    let pool = pool_for(&storage.addr, Duration::from_secs(3600)).await?;
    storage.state.set_active_test_status(1);

    assert_eq!(pool.check_idle_connections().await, (5, 5));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(pool.status().open.get(), 0);
    assert_eq!(storage.state.accepted(), 5);
    Ok(())
}

#[tokio::test]
async fn test_destroy_stops_sweeps() -> Result<()> {
    let storage = MockStorage::spawn().await;
    let pool = pool_for(&storage.addr, Duration::from_millis(50)).await?;

    pool.destroy();
    let cycles = pool.health_check_metrics().cycles_run();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(pool.health_check_metrics().cycles_run(), cycles);
    Ok(())
}
