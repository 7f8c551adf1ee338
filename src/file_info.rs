//! Basic file metadata: attributes, timestamps, size and file identity.

use std::time::SystemTime;

#[cfg(windows)]
use std::path::Path;

#[cfg(windows)]
use log::debug;
#[cfg(windows)]
use windows::{
    Win32::{
        Foundation::{CloseHandle, GetLastError, HANDLE},
        Storage::FileSystem::{
            BY_HANDLE_FILE_INFORMATION, GetFileAttributesW, GetFileInformationByHandle,
            INVALID_FILE_ATTRIBUTES,
        },
    },
    core::HSTRING,
};

#[cfg(windows)]
use crate::{WinFsResult, backup_file::open_for_backup, time};

// Mirror `windows::Win32::Storage::FileSystem::FILE_ATTRIBUTE_*` so `FileInfo` builds
// on targets without the `windows` crate.
pub const FILE_ATTRIBUTE_READONLY: u32 = 0x0000_0001;
pub const FILE_ATTRIBUTE_HIDDEN: u32 = 0x0000_0002;
pub const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x0000_0010;
pub const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x0000_0400;

/// Metadata of an open file, as reported by `GetFileInformationByHandle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub attributes: u32,
    /// `None` when the filesystem does not record the timestamp.
    pub creation_time: Option<SystemTime>,
    pub last_access_time: Option<SystemTime>,
    pub last_write_time: Option<SystemTime>,
    /// Size of the default data stream in bytes.
    pub file_size: u64,
    pub number_of_links: u32,
    /// Unique per volume; together with the volume serial number it identifies the file.
    pub file_index: u64,
    pub volume_serial_number: u32,
}

impl FileInfo {
    pub fn is_directory(&self) -> bool {
        self.attributes & FILE_ATTRIBUTE_DIRECTORY != 0
    }

    pub fn is_reparse_point(&self) -> bool {
        self.attributes & FILE_ATTRIBUTE_REPARSE_POINT != 0
    }

    pub fn is_hidden(&self) -> bool {
        self.attributes & FILE_ATTRIBUTE_HIDDEN != 0
    }

    pub fn is_readonly(&self) -> bool {
        self.attributes & FILE_ATTRIBUTE_READONLY != 0
    }

    /// True if both describe the same file on the same volume.
    pub fn is_same_file(&self, other: &FileInfo) -> bool {
        self.volume_serial_number == other.volume_serial_number && self.file_index == other.file_index
    }
}

#[cfg_attr(not(windows), allow(dead_code))]
fn quadpart(high: u32, low: u32) -> u64 {
    (u64::from(high) << 32) | u64::from(low)
}

#[cfg(windows)]
impl FileInfo {
    /// Queries the metadata of an open handle. The handle is not closed.
    pub fn from_handle(handle: HANDLE) -> WinFsResult<Self> {
        let mut info = BY_HANDLE_FILE_INFORMATION::default();
        unsafe { GetFileInformationByHandle(handle, &mut info) }?;

        Ok(FileInfo {
            attributes: info.dwFileAttributes,
            creation_time: time::filetime_to_systemtime(
                info.ftCreationTime.dwLowDateTime,
                info.ftCreationTime.dwHighDateTime,
            ),
            last_access_time: time::filetime_to_systemtime(
                info.ftLastAccessTime.dwLowDateTime,
                info.ftLastAccessTime.dwHighDateTime,
            ),
            last_write_time: time::filetime_to_systemtime(
                info.ftLastWriteTime.dwLowDateTime,
                info.ftLastWriteTime.dwHighDateTime,
            ),
            file_size: quadpart(info.nFileSizeHigh, info.nFileSizeLow),
            number_of_links: info.nNumberOfLinks,
            file_index: quadpart(info.nFileIndexHigh, info.nFileIndexLow),
            volume_serial_number: info.dwVolumeSerialNumber,
        })
    }

    /// Opens `path` with backup semantics, so directories work too, and queries its metadata.
    pub fn from_path(path: &Path) -> WinFsResult<Self> {
        let handle = open_for_backup(path)?;
        let result = Self::from_handle(handle);
        unsafe { CloseHandle(handle) }?;
        result
    }
}

/// Returns true if `path` names an existing directory.
#[cfg(windows)]
pub fn is_directory(path: &Path) -> WinFsResult<bool> {
    let attributes = unsafe { GetFileAttributesW(&HSTRING::from(path)) };
    if attributes == INVALID_FILE_ATTRIBUTES {
        let err = unsafe { GetLastError() };
        debug!("GetFileAttributesW failed, path={}, error={:?}", path.display(), err);
        return Err(windows::core::Error::from(err).into());
    }
    Ok(attributes & FILE_ATTRIBUTE_DIRECTORY != 0)
}
