//! Fixed-width body fields
//!
//! Strings travel NUL-padded to a fixed width, integers as 8-byte big-endian.

use crate::error::{ClientError, Result};

/// Append `value` truncated or NUL-padded to exactly `width` bytes
pub(crate) fn put_fixed_str(buf: &mut Vec<u8>, value: &str, width: usize) {
    let bytes = value.as_bytes();
    let n = bytes.len().min(width);
    buf.extend_from_slice(&bytes[..n]);
    buf.resize(buf.len() + (width - n), 0);
}

/// Read a NUL-padded string field
pub(crate) fn get_fixed_str(field: &[u8]) -> Result<String> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8(field[..end].to_vec())
        .map_err(|e| ClientError::invalid_response(format!("non UTF-8 string field: {e}")))
}

/// Read an 8-byte big-endian integer starting at `offset`
pub(crate) fn get_u64(body: &[u8], offset: usize) -> Result<u64> {
    body.get(offset..offset + 8)
        .and_then(|s| <[u8; 8]>::try_from(s).ok())
        .map(u64::from_be_bytes)
        .ok_or_else(|| ClientError::invalid_response(format!("missing integer field at offset {offset}")))
}
