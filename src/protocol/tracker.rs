//! Tracker query bodies
//!
//! A tracker answers "which storage node should I talk to" with the node's
//! group, address and (for stores) the storage path index to write under.

use crate::error::{ClientError, Result};
use crate::protocol::fields::{get_fixed_str, get_u64, put_fixed_str};
use crate::protocol::{GROUP_NAME_MAX_LEN, IP_ADDRESS_LEN, codes};
use crate::types::FileId;

/// Reply body length for [`TrackerQuery::Store`]: group, ip, port, path index
pub const STORE_RESPONSE_LEN: usize = GROUP_NAME_MAX_LEN + IP_ADDRESS_LEN + 8 + 1;

/// Reply body length for [`TrackerQuery::Fetch`]: group, ip, port
pub const FETCH_RESPONSE_LEN: usize = GROUP_NAME_MAX_LEN + IP_ADDRESS_LEN + 8;

/// What to ask the tracker for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerQuery {
    /// A node to upload a new file to
    Store,
    /// A node holding an existing file
    Fetch(FileId),
}

impl TrackerQuery {
    #[must_use]
    pub const fn command(&self) -> u8 {
        match self {
            Self::Store => codes::QUERY_STORE_WITHOUT_GROUP_ONE,
            Self::Fetch(_) => codes::QUERY_FETCH_ONE,
        }
    }

    /// Request body: empty for stores, group + remote filename for fetches
    #[must_use]
    pub fn encode_body(&self) -> Vec<u8> {
        match self {
            Self::Store => Vec::new(),
            Self::Fetch(file_id) => {
                let remote = file_id.remote_filename().as_bytes();
                let mut body = Vec::with_capacity(GROUP_NAME_MAX_LEN + remote.len());
                put_fixed_str(&mut body, file_id.group(), GROUP_NAME_MAX_LEN);
                body.extend_from_slice(remote);
                body
            }
        }
    }

    /// Exact body length the tracker replies with
    #[must_use]
    pub const fn response_len(&self) -> usize {
        match self {
            Self::Store => STORE_RESPONSE_LEN,
            Self::Fetch(_) => FETCH_RESPONSE_LEN,
        }
    }

    /// Parse the tracker's reply body
    pub fn decode_response(&self, body: &[u8]) -> Result<StorageTarget> {
        if body.len() != self.response_len() {
            return Err(ClientError::invalid_response(format!(
                "tracker reply body is {} bytes, expected {}",
                body.len(),
                self.response_len()
            )));
        }

        let group = get_fixed_str(&body[..GROUP_NAME_MAX_LEN])?;
        let ip_end = GROUP_NAME_MAX_LEN + IP_ADDRESS_LEN;
        let ip = get_fixed_str(&body[GROUP_NAME_MAX_LEN..ip_end])?;
        if ip.is_empty() {
            return Err(ClientError::invalid_response("tracker reply has an empty IP address"));
        }
        let port = get_u64(body, ip_end)?;
        let port = u16::try_from(port)
            .map_err(|_| ClientError::invalid_response(format!("storage port {port} out of range")))?;
        let store_path_index = match self {
            Self::Store => body[ip_end + 8],
            Self::Fetch(_) => 0,
        };

        Ok(StorageTarget {
            group,
            addr: format!("{ip}:{port}"),
            store_path_index,
        })
    }
}

/// Storage node picked by the tracker for one operation
///
/// Consumed immediately by the storage phase; never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTarget {
    pub group: String,
    /// `ip:port` of the storage node
    pub addr: String,
    pub store_path_index: u8,
}
