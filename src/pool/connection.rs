//! Checked-out connection handle
//!
//! A [`PooledConnection`] owns its TCP stream exclusively while checked out.
//! Settling it is explicit: [`PooledConnection::release`] hands the stream
//! back to the idle list, [`PooledConnection::discard`] closes it and frees
//! the pool slot. A handle dropped without either is treated as discarded.

use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use super::connection_pool::PoolShared;
use crate::constants::buffer::{MAX_BUFFERED_BODY, STREAM_CHUNK};
use crate::error::{ClientError, Result};
use crate::protocol::{Frame, FrameHeader, codes, drain_body, read_header};

/// A connection borrowed from a [`ConnectionPool`](super::ConnectionPool)
///
/// Implements [`AsyncRead`] and [`AsyncWrite`] so it can be used as a plain
/// byte stream; the frame helpers bound every exchange by the pool's network
/// timeout.
#[derive(Debug)]
pub struct PooledConnection {
    stream: Option<TcpStream>,
    pool: Arc<PoolShared>,
    broken: bool,
}

impl PooledConnection {
    pub(crate) fn new(stream: TcpStream, pool: Arc<PoolShared>) -> Self {
        Self {
            stream: Some(stream),
            pool,
            broken: false,
        }
    }

    /// Address of the endpoint this connection belongs to
    #[must_use]
    pub fn addr(&self) -> &str {
        self.pool.addr()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream_ref()?.local_addr()
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream_ref()?.peer_addr()
    }

    /// Whether a failed or interrupted exchange left the stream misaligned
    ///
    /// A broken connection is always discarded by [`settle`](Self::settle).
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Flag the connection as unusable for further frames
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    fn stream_ref(&self) -> io::Result<&TcpStream> {
        self.stream
            .as_ref()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))
    }

    /// Run one I/O step under the network timeout, marking the connection
    /// broken on any failure
    async fn guarded<'a, T, F, Fut>(&'a mut self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&'a mut TcpStream) -> Fut,
        Fut: Future<Output = Result<T>> + 'a,
    {
        let limit = self.pool.network_timeout();
        let Some(stream) = self.stream.as_mut() else {
            self.broken = true;
            return Err(io::Error::from(io::ErrorKind::NotConnected).into());
        };

        let outcome = match timeout(limit, f(stream)).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout { operation }),
        };
        // A failed status leaves the stream aligned: the body was drained
        if let Err(e) = &outcome
            && !e.is_protocol_status()
        {
            self.broken = true;
        }
        outcome
    }

    /// Send one complete frame: header followed by `body`
    pub async fn send_frame(&mut self, command: u8, body: &[u8]) -> Result<()> {
        let header = FrameHeader::request(command, body.len() as u64).encode();
        self.guarded("frame write", |stream| async move {
            stream.write_all(&header).await?;
            stream.write_all(body).await?;
            stream.flush().await?;
            Ok::<_, ClientError>(())
        })
        .await
    }

    /// Send only a request header; the caller streams `body_len` bytes after it
    pub async fn send_header(&mut self, command: u8, body_len: u64) -> Result<()> {
        let header = FrameHeader::request(command, body_len).encode();
        self.guarded("header write", |stream| async move {
            stream.write_all(&header).await?;
            Ok::<_, ClientError>(())
        })
        .await
    }

    /// Send raw body bytes after a header written by [`send_header`](Self::send_header)
    pub async fn send_body(&mut self, body: &[u8]) -> Result<()> {
        self.guarded("body write", |stream| async move {
            stream.write_all(body).await?;
            Ok::<_, ClientError>(())
        })
        .await
    }

    /// Stream exactly `len` body bytes from `reader` to the peer
    ///
    /// Each chunk is bounded by the network timeout separately so large
    /// uploads are not cut off by it. `source` names the reader in
    /// `LocalFile` errors.
    pub async fn send_body_from<R>(&mut self, reader: &mut R, len: u64, source: &Path) -> Result<()>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut buf = vec![0u8; STREAM_CHUNK];
        let mut remaining = len;
        while remaining > 0 {
            let want = remaining.min(STREAM_CHUNK as u64) as usize;
            let read = match reader.read(&mut buf[..want]).await {
                Ok(0) => Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("source ended with {remaining} of {len} bytes unsent"),
                )),
                other => other,
            };
            let n = match read {
                Ok(n) => n,
                Err(e) => {
                    // Part of the frame may already be on the wire
                    self.broken = true;
                    return Err(local_file(source, e));
                }
            };
            self.send_body(&buf[..n]).await?;
            remaining -= n as u64;
        }
        self.flush_body().await
    }

    /// Flush body bytes written with [`send_body`](Self::send_body)
    pub async fn flush_body(&mut self) -> Result<()> {
        self.guarded("body flush", |stream| async move {
            stream.flush().await?;
            Ok::<_, ClientError>(())
        })
        .await
    }

    /// Receive a response header
    ///
    /// Fails with `ProtocolStatus` on a non-zero status (the body is drained
    /// first) and with `Malformed` if the command is not the generic response.
    pub async fn recv_header(&mut self) -> Result<FrameHeader> {
        let header = self
            .guarded("header read", |stream| read_header(stream))
            .await?;
        if header.command != codes::RESP {
            self.broken = true;
            return Err(ClientError::malformed(format!(
                "expected response command {}, got {}",
                codes::RESP,
                header.command
            )));
        }
        Ok(header)
    }

    /// Receive a response header and its whole body
    pub async fn recv_frame(&mut self) -> Result<Frame> {
        let header = self.recv_header().await?;
        if header.body_len > MAX_BUFFERED_BODY {
            self.broken = true;
            return Err(ClientError::malformed(format!(
                "response body of {} bytes exceeds the {MAX_BUFFERED_BODY} byte limit",
                header.body_len
            )));
        }

        let mut body = vec![0u8; header.body_len as usize];
        self.recv_exact(&mut body).await?;
        Ok(Frame { header, body })
    }

    /// Fill `buf` completely from the response body
    pub async fn recv_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        self.guarded("body read", |stream| async move {
            stream.read_exact(buf).await?;
            Ok::<_, ClientError>(())
        })
        .await
    }

    /// Skip `len` body bytes, leaving the stream at the next header
    pub async fn drain(&mut self, len: u64) -> Result<()> {
        self.guarded("body drain", |stream| drain_body(stream, len))
            .await
    }

    /// Stream exactly `len` body bytes from the peer into `writer`
    ///
    /// `dest` names the writer in `LocalFile` errors.
    pub async fn recv_body_into<W>(&mut self, writer: &mut W, len: u64, dest: &Path) -> Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut buf = vec![0u8; STREAM_CHUNK];
        let mut remaining = len;
        while remaining > 0 {
            let want = remaining.min(STREAM_CHUNK as u64) as usize;
            self.recv_exact(&mut buf[..want]).await?;
            remaining -= want as u64;
            if let Err(e) = writer.write_all(&buf[..want]).await {
                // The rest of the body is still in flight
                if remaining > 0 {
                    self.broken = true;
                }
                return Err(local_file(dest, e));
            }
        }
        // The body is fully read here; a failed flush leaves the stream aligned
        writer.flush().await.map_err(|e| local_file(dest, e))
    }

    /// Return the connection to its pool's idle list
    ///
    /// On a closed pool the stream is shut down instead. A connection marked
    /// broken is discarded rather than reused.
    pub fn release(mut self) {
        if self.broken {
            self.discard();
            return;
        }
        if let Some(stream) = self.stream.take() {
            self.pool.put_back(stream);
        }
    }

    /// Close the connection and free its pool slot
    pub fn discard(mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            self.pool.forget(1);
            debug!(pool = %self.pool.addr(), "Discarded connection");
        }
    }

    /// Release or discard depending on how the exchange ended
    ///
    /// Transport failures and broken streams are discarded; success and
    /// server-side rejections are released.
    pub fn settle<T>(self, outcome: &Result<T>) {
        match outcome {
            Err(e) if e.is_transport() => self.discard(),
            _ => self.release(),
        }
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if self.stream.take().is_some() {
            self.pool.forget(1);
            debug!(pool = %self.pool.addr(), "Connection dropped without release, slot freed");
        }
    }
}

fn local_file(path: &Path, source: io::Error) -> ClientError {
    ClientError::LocalFile {
        path: path.to_path_buf(),
        source,
    }
}

fn not_connected() -> io::Error {
    io::Error::from(io::ErrorKind::NotConnected)
}

impl AsyncRead for PooledConnection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let Some(stream) = this.stream.as_mut() else {
            return Poll::Ready(Err(not_connected()));
        };
        let poll = Pin::new(stream).poll_read(cx, buf);
        if let Poll::Ready(Err(_)) = &poll {
            this.broken = true;
        }
        poll
    }
}

impl AsyncWrite for PooledConnection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let Some(stream) = this.stream.as_mut() else {
            return Poll::Ready(Err(not_connected()));
        };
        let poll = Pin::new(stream).poll_write(cx, buf);
        if let Poll::Ready(Err(_)) = &poll {
            this.broken = true;
        }
        poll
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match this.stream.as_mut() {
            Some(stream) => Pin::new(stream).poll_flush(cx),
            None => Poll::Ready(Err(not_connected())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        // A shut-down stream cannot go back to the idle list
        this.broken = true;
        match this.stream.as_mut() {
            Some(stream) => Pin::new(stream).poll_shutdown(cx),
            None => Poll::Ready(Err(not_connected())),
        }
    }
}
