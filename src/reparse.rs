//! Reparse point decoding for symbolic links and mount points (junctions).
//!
//! `FSCTL_GET_REPARSE_POINT` returns a `REPARSE_DATA_BUFFER`. Its fields are read here
//! at fixed offsets with bounds checks; tags other than symbolic links and mount
//! points are reported as [`WinFsError::UnrecognizedFormatError`].

#[cfg(windows)]
use std::path::Path;

#[cfg(windows)]
use log::warn;
#[cfg(windows)]
use windows::{
    Win32::{
        Foundation::CloseHandle,
        Storage::FileSystem::{
            CreateFileW, FILE_FLAG_BACKUP_SEMANTICS, FILE_FLAG_OPEN_REPARSE_POINT,
            FILE_READ_ATTRIBUTES, FILE_SHARE_DELETE, FILE_SHARE_READ, FILE_SHARE_WRITE,
            OPEN_EXISTING,
        },
        System::{IO::DeviceIoControl, Ioctl::FSCTL_GET_REPARSE_POINT},
    },
    core::HSTRING,
};

#[cfg(windows)]
use crate::MAXIMUM_REPARSE_DATA_BUFFER_SIZE;
use crate::{
    LONG_PATH_PREFIX, UNC_PREFIX, WinFsResult,
    errors::WinFsError,
    path::PathInfo,
    stream_entry::{decode_utf16, read_u16, read_u32},
};

pub const IO_REPARSE_TAG_MOUNT_POINT: u32 = 0xA000_0003;
pub const IO_REPARSE_TAG_SYMLINK: u32 = 0xA000_000C;

const SYMLINK_FLAG_RELATIVE: u32 = 0x0000_0001;

/// Tag, data length and reserved field.
const REPARSE_HEADER_SIZE: usize = 8;
const MOUNT_POINT_PATH_BUFFER_OFFSET: usize = 16;
const SYMLINK_PATH_BUFFER_OFFSET: usize = 20;

/// Prefix of NT object manager paths stored in substitute names.
const NT_PATH_PREFIX: &str = r"\??\";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReparseKind {
    SymbolicLink,
    /// A junction or a volume mount point.
    MountPoint,
}

/// The decoded target of a symbolic link or mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTargetInfo {
    pub kind: ReparseKind,
    /// The target as the filesystem resolves it, usually an NT path (`\??\C:\target`).
    pub substitute_name: String,
    /// The target meant for display; may be empty.
    pub print_name: String,
    /// Only symbolic links can be relative.
    pub is_relative: bool,
}

impl LinkTargetInfo {
    /// The target as a Win32 path: the print name if present, otherwise the
    /// substitute name with its NT prefix translated.
    pub fn target(&self) -> String {
        if !self.print_name.is_empty() {
            return self.print_name.clone();
        }
        win32_path_from_nt(&self.substitute_name)
    }

    /// The target parsed as a [`PathInfo`].
    pub fn target_path(&self) -> WinFsResult<PathInfo> {
        PathInfo::new(&self.target())
    }
}

/// Translates `\??\C:\x` to `C:\x`, `\??\UNC\server\share` to `\\server\share`
/// and any other `\??\` path to the `\\?\` form.
fn win32_path_from_nt(name: &str) -> String {
    let Some(rest) = name.strip_prefix(NT_PATH_PREFIX) else {
        return name.to_string();
    };

    if let Some(unc) = rest.strip_prefix(r"UNC\") {
        return format!("{UNC_PREFIX}{unc}");
    }

    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic() => rest.to_string(),
        _ => format!("{LONG_PATH_PREFIX}{rest}"),
    }
}

/// Decodes a `REPARSE_DATA_BUFFER`.
pub fn decode_reparse_buffer(bytes: &[u8]) -> WinFsResult<LinkTargetInfo> {
    let tag = read_u32(bytes, 0)?;
    let data_length = read_u16(bytes, 4)? as usize;
    if bytes.len() < REPARSE_HEADER_SIZE + data_length {
        return Err(WinFsError::UnrecognizedFormatError(format!(
            "reparse buffer declares {} data bytes but holds {}",
            data_length,
            bytes.len().saturating_sub(REPARSE_HEADER_SIZE)
        )));
    }
    let bytes = &bytes[..REPARSE_HEADER_SIZE + data_length];

    let (kind, path_buffer_offset, is_relative) = match tag {
        IO_REPARSE_TAG_MOUNT_POINT => (ReparseKind::MountPoint, MOUNT_POINT_PATH_BUFFER_OFFSET, false),
        IO_REPARSE_TAG_SYMLINK => {
            let flags = read_u32(bytes, 16)?;
            (
                ReparseKind::SymbolicLink,
                SYMLINK_PATH_BUFFER_OFFSET,
                flags & SYMLINK_FLAG_RELATIVE != 0,
            )
        }
        other => {
            return Err(WinFsError::UnrecognizedFormatError(format!(
                "unsupported reparse tag {other:#010x}"
            )));
        }
    };

    let substitute_name = read_name(
        bytes,
        path_buffer_offset,
        read_u16(bytes, 8)?,
        read_u16(bytes, 10)?,
    )?;
    let print_name = read_name(
        bytes,
        path_buffer_offset,
        read_u16(bytes, 12)?,
        read_u16(bytes, 14)?,
    )?;

    Ok(LinkTargetInfo {
        kind,
        substitute_name,
        print_name,
        is_relative,
    })
}

fn read_name(bytes: &[u8], path_buffer_offset: usize, offset: u16, length: u16) -> WinFsResult<String> {
    let start = path_buffer_offset + offset as usize;
    let end = start + length as usize;
    bytes.get(start..end).map(decode_utf16).ok_or_else(|| {
        WinFsError::UnrecognizedFormatError(format!(
            "reparse name at {start}..{end} lies outside the {} byte buffer",
            bytes.len()
        ))
    })
}

/// Reads the reparse point of the symbolic link or mount point at `path`.
#[cfg(windows)]
pub fn get_link_target_info(path: &Path) -> WinFsResult<LinkTargetInfo> {
    let handle = unsafe {
        CreateFileW(
            &HSTRING::from(path),
            FILE_READ_ATTRIBUTES.0,
            FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
            None,
            OPEN_EXISTING,
            FILE_FLAG_BACKUP_SEMANTICS | FILE_FLAG_OPEN_REPARSE_POINT,
            None,
        )?
    };

    let mut buffer = vec![0u8; MAXIMUM_REPARSE_DATA_BUFFER_SIZE];
    let mut bytes_returned = 0u32;

    // https://learn.microsoft.com/en-us/windows/win32/api/winioctl/ni-winioctl-fsctl_get_reparse_point
    // Retrieves the reparse point data associated with the file or directory identified by the specified handle.
    let result = unsafe {
        DeviceIoControl(
            handle,
            FSCTL_GET_REPARSE_POINT,
            None,
            0,
            Some(buffer.as_mut_ptr() as _),
            buffer.len() as u32,
            Some(&mut bytes_returned),
            None,
        )
    };
    let close_result = unsafe { CloseHandle(handle) };

    if let Err(err) = result {
        warn!("FSCTL_GET_REPARSE_POINT failed, path={}, error={}", path.display(), err);
        return Err(err.into());
    }
    close_result?;

    buffer.truncate(bytes_returned as usize);
    decode_reparse_buffer(&buffer)
}
