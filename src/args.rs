//! Command-line arguments for the `fdfs` binary

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Upload, download and delete files on a tracker/storage cluster
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "fdfs.toml", env = "FDFS_CONFIG")]
    pub config: PathBuf,

    /// Also write logs to this file
    #[arg(long, env = "FDFS_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Upload a local file and print its file id
    Upload {
        /// File to upload
        path: PathBuf,
    },

    /// Download a file to a local path
    Download {
        /// File id as printed by upload (group/remote_filename)
        file_id: String,
        /// Destination path, created or truncated
        dest: PathBuf,
        /// Byte offset to start from
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Number of bytes to fetch (0 = to the end)
        #[arg(long, default_value_t = 0)]
        length: u64,
    },

    /// Delete a stored file
    Delete {
        /// File id as printed by upload (group/remote_filename)
        file_id: String,
    },
}
