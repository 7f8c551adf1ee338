//! # winfs-rs
//!
//! A Rust library for parsing Win32 paths and enumerating the data streams of NTFS files.
//!
//! Path parsing is portable: [`PathInfo`] validates and normalizes any Win32 path form
//! (relative, drive, UNC, `\\?\` long paths, volume GUID and `\\?\GLOBALROOT` paths)
//! and exposes its root, directory, file name and extension as slices of the
//! normalized text. Stream enumeration walks `BackupRead` output, or any recorded
//! copy of it, and yields one [`StreamEntry`] per stream.
//!
//! ## Features
//! - Validate and normalize Win32 paths, resolving `.` and `..`
//! - Enumerate alternate data streams as a Rust iterator
//! - Decode symbolic link and junction targets
//! - Safe wrappers over Windows API calls
//!
//! ## Example: Parse a path
//! ```rust
//! use winfs_rs::PathInfo;
//!
//! let path = PathInfo::new(r"C:\Users\.\alice\..\bob\notes.txt").unwrap();
//! assert_eq!(path.full_path(), r"C:\Users\bob\notes.txt");
//! assert_eq!(path.root(), r"C:\");
//! assert_eq!(path.file_name(), "notes.txt");
//! assert_eq!(path.extension(), "txt");
//! assert_eq!(path.parent().full_path(), r"C:\Users\bob\");
//! ```
//!
//! ## Example: Enumerate alternate data streams
//! ```rust,no_run
//! # #[cfg(windows)]
//! # fn main() -> winfs_rs::WinFsResult<()> {
//! use winfs_rs::streams::{self, StreamEnumOptions};
//!
//! for entry in streams::enumerate_streams(r"C:\data\report.docx", StreamEnumOptions::alternate_streams())? {
//!     let entry = entry?;
//!     println!("{} ({} bytes)", entry.name, entry.size);
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```
//!
//! ## Platform
//! - Path parsing, stream record decoding and reparse buffer decoding work everywhere
//! - File access requires Windows and NTFS or ReFS volumes
//!
//! ## License
//! MIT License.

pub mod backup;
#[cfg(windows)]
pub mod backup_file;
pub mod errors;
pub mod file_info;
pub mod parser;
pub mod path;
pub mod reparse;
pub mod stream_entry;
pub mod streams;

// Re-export commonly used types
pub use errors::WinFsError;
pub use path::PathInfo;
pub use stream_entry::{StreamEntry, StreamType};
pub use streams::{AlternateDataStreams, StreamEnumOptions};

/// A convenient type alias for Results with WinFsError.
pub type WinFsResult<T> = std::result::Result<T, WinFsError>;

mod time;

// Utility functions for cargo tests
#[cfg(test)]
mod tests;

pub const PATH_SEPARATOR: char = '\\';
pub const ALT_PATH_SEPARATOR: char = '/';
pub const LONG_PATH_PREFIX: &str = r"\\?\";
pub const UNC_PREFIX: &str = r"\\";

/// Size of the fixed part of a `WIN32_STREAM_ID` record.
pub const STREAM_HEADER_SIZE: usize = 20;

/// Largest raw stream name a backup record can carry, in bytes: a 255 character
/// name plus the `:` prefix and the `:$DATA` suffix, in UTF-16.
pub const MAXIMUM_STREAM_NAME_SIZE: usize = (255 + 1 + 6) * 2;

pub const MAXIMUM_REPARSE_DATA_BUFFER_SIZE: usize = 16 * 1024; // 16KB
