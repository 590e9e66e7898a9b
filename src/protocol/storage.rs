//! Storage request and reply bodies
//!
//! Only the fixed-size prefixes are built here; file content is streamed by
//! the caller straight after the prefix.

use std::path::Path;

use crate::error::{ClientError, Result};
use crate::protocol::fields::{get_fixed_str, put_fixed_str};
use crate::protocol::{FILE_EXT_NAME_MAX_LEN, GROUP_NAME_MAX_LEN};
use crate::types::{FileId, GroupName, RemoteFilename};

/// Upload prefix: store path index, file size, extension
pub const UPLOAD_PREFIX_LEN: usize = 1 + 8 + FILE_EXT_NAME_MAX_LEN;

/// Body prefix of an upload; the file content follows it on the wire
#[must_use]
pub fn encode_upload_prefix(store_path_index: u8, file_size: u64, ext_name: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(UPLOAD_PREFIX_LEN);
    body.push(store_path_index);
    body.extend_from_slice(&file_size.to_be_bytes());
    put_fixed_str(&mut body, truncate_ext_name(ext_name), FILE_EXT_NAME_MAX_LEN);
    body
}

/// Parse an upload reply: group name followed by the remote filename
pub fn decode_upload_response(body: &[u8]) -> Result<FileId> {
    if body.len() <= GROUP_NAME_MAX_LEN {
        return Err(ClientError::invalid_response(format!(
            "upload reply body is {} bytes, expected more than {}",
            body.len(),
            GROUP_NAME_MAX_LEN
        )));
    }
    let group = get_fixed_str(&body[..GROUP_NAME_MAX_LEN])?;
    let remote = get_fixed_str(&body[GROUP_NAME_MAX_LEN..])?;

    let group = GroupName::new(group)
        .map_err(|e| ClientError::invalid_response(format!("upload reply: {e}")))?;
    let remote = RemoteFilename::new(remote)
        .map_err(|e| ClientError::invalid_response(format!("upload reply: {e}")))?;
    Ok(FileId::new(group, remote))
}

/// Download request: offset, byte count (0 reads to the end), group, remote filename
#[must_use]
pub fn encode_download_request(file_id: &FileId, offset: u64, download_bytes: u64) -> Vec<u8> {
    let remote = file_id.remote_filename().as_bytes();
    let mut body = Vec::with_capacity(16 + GROUP_NAME_MAX_LEN + remote.len());
    body.extend_from_slice(&offset.to_be_bytes());
    body.extend_from_slice(&download_bytes.to_be_bytes());
    put_fixed_str(&mut body, file_id.group(), GROUP_NAME_MAX_LEN);
    body.extend_from_slice(remote);
    body
}

/// Delete request: group, remote filename
#[must_use]
pub fn encode_delete_request(file_id: &FileId) -> Vec<u8> {
    let remote = file_id.remote_filename().as_bytes();
    let mut body = Vec::with_capacity(GROUP_NAME_MAX_LEN + remote.len());
    put_fixed_str(&mut body, file_id.group(), GROUP_NAME_MAX_LEN);
    body.extend_from_slice(remote);
    body
}

/// Cut an extension down to the wire width without splitting a character
#[must_use]
pub fn truncate_ext_name(ext_name: &str) -> &str {
    if ext_name.len() <= FILE_EXT_NAME_MAX_LEN {
        return ext_name;
    }
    let mut end = FILE_EXT_NAME_MAX_LEN;
    while !ext_name.is_char_boundary(end) {
        end -= 1;
    }
    &ext_name[..end]
}

/// Extension of a local file: everything after the last `.` of its name
#[must_use]
pub fn ext_name_from_path(path: &Path) -> &str {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| truncate_ext_name(ext))
        .unwrap_or("")
}
