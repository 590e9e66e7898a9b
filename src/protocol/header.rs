//! Frame header codec
//!
//! Every request and response starts with a fixed 10-byte header:
//!
//! ```text
//! +----------------------+---------+--------+
//! | body length (u64 BE) | command | status |
//! +----------------------+---------+--------+
//!        8 bytes            1 byte   1 byte
//! ```
//!
//! The body length never includes the header itself. A non-zero status on a
//! received header is a protocol-level failure: the server answered, and the
//! connection is still frame-aligned once the announced body is consumed.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ClientError, Result};

/// Size of the frame header on the wire
pub const HEADER_LEN: usize = 10;

/// Decoded frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHeader {
    /// Length of the body that follows, excluding the header
    pub body_len: u64,
    /// Command code, see [`crate::protocol::codes`]
    pub command: u8,
    /// 0 on success, anything else signals failure
    pub status: u8,
}

impl FrameHeader {
    #[must_use]
    pub const fn new(command: u8, status: u8, body_len: u64) -> Self {
        Self {
            body_len,
            command,
            status,
        }
    }

    /// Header for an outgoing request (status is always 0)
    #[must_use]
    pub const fn request(command: u8, body_len: u64) -> Self {
        Self::new(command, 0, body_len)
    }

    /// Serialize to the 10-byte wire layout
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[..8].copy_from_slice(&self.body_len.to_be_bytes());
        buf[8] = self.command;
        buf[9] = self.status;
        buf
    }

    /// Parse the 10-byte wire layout
    ///
    /// Pure parsing; the status byte is not interpreted here.
    #[must_use]
    pub fn decode(buf: &[u8; HEADER_LEN]) -> Self {
        let mut len = [0u8; 8];
        len.copy_from_slice(&buf[..8]);
        Self {
            body_len: u64::from_be_bytes(len),
            command: buf[8],
            status: buf[9],
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// Encode a header from its parts
#[must_use]
pub fn encode_header(command: u8, status: u8, body_len: u64) -> [u8; HEADER_LEN] {
    FrameHeader::new(command, status, body_len).encode()
}

/// Write a header to the stream
pub async fn write_header<W>(writer: &mut W, header: &FrameHeader) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(&header.encode()).await?;
    Ok(())
}

/// Read exactly one header without looking at its status
///
/// A short read surfaces as an `UnexpectedEof` I/O error.
pub async fn read_raw_header<R>(reader: &mut R) -> Result<FrameHeader>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = [0u8; HEADER_LEN];
    reader.read_exact(&mut buf).await?;
    Ok(FrameHeader::decode(&buf))
}

/// Read one header and fail with [`ClientError::ProtocolStatus`] if its
/// status is non-zero
///
/// The body of a failed response is consumed before returning the error so
/// the next frame on this connection starts at a header boundary.
pub async fn read_header<R>(reader: &mut R) -> Result<FrameHeader>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let header = read_raw_header(reader).await?;
    if !header.is_success() {
        drain_body(reader, header.body_len).await?;
        return Err(ClientError::ProtocolStatus {
            command: header.command,
            status: header.status,
        });
    }
    Ok(header)
}

/// Discard exactly `len` body bytes
pub async fn drain_body<R>(reader: &mut R, len: u64) -> Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    if len == 0 {
        return Ok(());
    }
    let mut limited = reader.take(len);
    let copied = tokio::io::copy(&mut limited, &mut tokio::io::sink()).await?;
    if copied != len {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("body ended after {copied} of {len} bytes"),
        )
        .into());
    }
    Ok(())
}
