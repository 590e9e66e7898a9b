//! Wire protocol shared by trackers and storage nodes
//!
//! [`header`] frames every message; [`tracker`] and [`storage`] build and
//! parse the bodies of the requests this client issues.

pub mod codes;
mod fields;
pub mod header;
pub mod storage;
pub mod tracker;

pub use header::{
    FrameHeader, HEADER_LEN, drain_body, encode_header, read_header, read_raw_header, write_header,
};
pub use tracker::{StorageTarget, TrackerQuery};

/// Width of the NUL-padded group name field
pub const GROUP_NAME_MAX_LEN: usize = 16;

/// Width of the NUL-padded IP address field in tracker replies
pub const IP_ADDRESS_LEN: usize = 15;

/// Width of the NUL-padded file extension field in uploads
pub const FILE_EXT_NAME_MAX_LEN: usize = 6;

/// One received message: header plus fully buffered body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub body: Vec<u8>,
}

impl Frame {
    #[inline]
    #[must_use]
    pub const fn command(&self) -> u8 {
        self.header.command
    }

    #[inline]
    #[must_use]
    pub const fn status(&self) -> u8 {
        self.header.status
    }
}
