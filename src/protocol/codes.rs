//! Command codes carried in the frame header
//!
//! The header's command byte names the request on the way out and is the
//! generic [`RESP`] code on every reply, from trackers and storage nodes alike.

// Replies

/// Generic response code sent back for every request
pub const RESP: u8 = 100;

// Tracker requests

/// Ask for a storage node to store a new file, letting the tracker pick the group
pub const QUERY_STORE_WITHOUT_GROUP_ONE: u8 = 101;
/// Ask for a storage node holding an existing file
pub const QUERY_FETCH_ONE: u8 = 102;

// Storage requests

/// Upload a regular file
pub const UPLOAD_FILE: u8 = 11;
/// Delete a file
pub const DELETE_FILE: u8 = 12;
/// Download a file, optionally a byte range of it
pub const DOWNLOAD_FILE: u8 = 14;

// Shared

/// Liveness check with an empty body, answered by an empty [`RESP`]
pub const ACTIVE_TEST: u8 = 111;

/// Human-readable name for logging
#[must_use]
pub const fn name(command: u8) -> &'static str {
    match command {
        RESP => "RESP",
        QUERY_STORE_WITHOUT_GROUP_ONE => "QUERY_STORE_WITHOUT_GROUP_ONE",
        QUERY_FETCH_ONE => "QUERY_FETCH_ONE",
        UPLOAD_FILE => "UPLOAD_FILE",
        DELETE_FILE => "DELETE_FILE",
        DOWNLOAD_FILE => "DOWNLOAD_FILE",
        ACTIVE_TEST => "ACTIVE_TEST",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(name(ACTIVE_TEST), "ACTIVE_TEST");
        assert_eq!(name(RESP), "RESP");
        assert_eq!(name(250), "UNKNOWN");
    }
}
