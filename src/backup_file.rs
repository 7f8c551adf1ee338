//! `BackupRead`/`BackupSeek` access to files and directories.
//!
//! A [`BackupFile`] either owns the handle it opened or borrows one from the caller.
//! It threads the backup context through every call, issues the final abort read when
//! the walk ends or when it is dropped, and closes the handle only if it owns it.

use std::{ffi::c_void, io, path::Path, ptr};

use log::{debug, warn};
use windows::{
    Win32::{
        Foundation::{CloseHandle, ERROR_ACCESS_DENIED, HANDLE},
        Storage::FileSystem::{
            BackupRead, BackupSeek, CreateFileW, FILE_FLAG_BACKUP_SEMANTICS, FILE_GENERIC_READ,
            FILE_SHARE_DELETE, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
        },
    },
    core::HSTRING,
};

use crate::{WinFsResult, backup::BackupSource, errors::WinFsError};

/// The handle a [`BackupFile`] reads from.
#[derive(Debug)]
pub enum StreamHandle<'a> {
    /// Opened by this crate, closed on drop.
    Owned(HANDLE),
    /// Supplied by the caller, never closed here.
    Borrowed(&'a HANDLE),
}

impl StreamHandle<'_> {
    fn raw(&self) -> HANDLE {
        match self {
            StreamHandle::Owned(handle) => *handle,
            StreamHandle::Borrowed(handle) => **handle,
        }
    }
}

/// A file or directory opened for a backup-semantics read.
#[derive(Debug)]
pub struct BackupFile<'a> {
    handle: StreamHandle<'a>,
    /// Opaque state `BackupRead` keeps between calls; null until the first read.
    context: *mut c_void,
    process_security: bool,
}

impl BackupFile<'static> {
    /// Opens `path` with backup semantics. The handle is closed when the `BackupFile` is dropped.
    pub fn open(path: &Path, process_security: bool) -> WinFsResult<Self> {
        let handle = open_for_backup(path)?;
        Ok(BackupFile {
            handle: StreamHandle::Owned(handle),
            context: ptr::null_mut(),
            process_security,
        })
    }
}

impl<'a> BackupFile<'a> {
    /// Wraps a caller-owned handle, which must have been opened with
    /// `FILE_FLAG_BACKUP_SEMANTICS` and read access.
    pub fn from_handle(handle: &'a HANDLE, process_security: bool) -> WinFsResult<Self> {
        if handle.is_invalid() {
            return Err(WinFsError::HandleInvalidError);
        }
        Ok(BackupFile {
            handle: StreamHandle::Borrowed(handle),
            context: ptr::null_mut(),
            process_security,
        })
    }
}

impl BackupSource for BackupFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut bytes_read = 0u32;
        unsafe {
            BackupRead(
                self.handle.raw(),
                buf,
                &mut bytes_read,
                false,
                self.process_security,
                &mut self.context,
            )
        }
        .map_err(to_io_error)?;
        Ok(bytes_read as usize)
    }

    fn seek_forward(&mut self, bytes: u64) -> io::Result<u64> {
        let mut low_seeked = 0u32;
        let mut high_seeked = 0u32;
        unsafe {
            BackupSeek(
                self.handle.raw(),
                bytes as u32,
                (bytes >> 32) as u32,
                &mut low_seeked,
                &mut high_seeked,
                &mut self.context,
            )
        }
        .map_err(to_io_error)?;
        Ok((u64::from(high_seeked) << 32) | u64::from(low_seeked))
    }

    fn abort(&mut self) -> io::Result<()> {
        if self.context.is_null() {
            return Ok(());
        }

        // https://learn.microsoft.com/en-us/windows/win32/api/winbase/nf-winbase-backupread
        // When the backup is complete, call BackupRead with bAbort set to TRUE
        // to release the resources allocated for the context.
        let mut bytes_read = 0u32;
        let result = unsafe {
            BackupRead(
                self.handle.raw(),
                &mut [],
                &mut bytes_read,
                true,
                false,
                &mut self.context,
            )
        };
        self.context = ptr::null_mut();
        debug!("Backup read context released");

        result.map_err(to_io_error)
    }
}

impl Drop for BackupFile<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.abort() {
            warn!("Error releasing backup read context: {}", err);
        }

        if let StreamHandle::Owned(handle) = self.handle {
            if let Err(err) = unsafe { CloseHandle(handle) } {
                warn!("Error closing backup handle: {}", err);
            }
        }
    }
}

/// Converts a Windows error to an `io::Error` carrying the Win32 error code, so that
/// [`crate::backup::is_seek_past_end`] can recognize it.
fn to_io_error(err: windows::core::Error) -> io::Error {
    let code = err.code().0 as u32;
    // HRESULT_FROM_WIN32: facility 7 with the severity bit set.
    if code & 0xFFFF_0000 == 0x8007_0000 {
        io::Error::from_raw_os_error((code & 0xFFFF) as i32)
    } else {
        io::Error::other(err)
    }
}

/// Opens a file or directory for a backup-semantics read.
///
/// `FILE_FLAG_BACKUP_SEMANTICS` is required to open directories and lets holders of
/// the backup privilege bypass file security checks.
pub fn open_for_backup(path: &Path) -> WinFsResult<HANDLE> {
    match unsafe {
        CreateFileW(
            &HSTRING::from(path),
            FILE_GENERIC_READ.0,
            FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
            None,
            OPEN_EXISTING,
            FILE_FLAG_BACKUP_SEMANTICS,
            None,
        )
    } {
        Ok(handle) => Ok(handle),
        Err(err) if err == ERROR_ACCESS_DENIED.into() => Err(WinFsError::PermissionError),
        Err(err) => {
            warn!("CreateFileW failed, path={}, error={:?}", path.display(), err);
            Err(WinFsError::WinApiError(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        stream_entry::StreamType,
        streams::{self, StreamEnumOptions},
    };
    use std::{fs, path::PathBuf};

    fn temp_file(name: &str) -> std::io::Result<PathBuf> {
        let path = std::env::temp_dir().join(format!("winfs-rs-{}-{}", std::process::id(), name));
        fs::write(&path, b"primary data")?;
        Ok(path)
    }

    #[test]
    fn enumerate_alternate_streams_test() -> WinFsResult<()> {
        let path = temp_file("ads.txt")?;
        fs::write(format!("{}:meta", path.display()), b"hello")?;

        let result = {
            let entries = streams::enumerate_streams(&path, StreamEnumOptions::default())?
                .collect::<WinFsResult<Vec<_>>>()?;
            println!("Streams: {:?}", entries);

            assert!(entries.iter().any(|e| e.is_default_stream() && e.size == 12));
            let meta = entries
                .iter()
                .find(|e| e.name == "meta")
                .ok_or_else(|| WinFsError::OtherError("stream not found".to_string()))?;
            assert_eq!(meta.stream_type, StreamType::AlternateData);
            assert_eq!(meta.size, 5);
            Ok(())
        };

        fs::remove_file(&path)?;
        result
    }

    #[test]
    fn borrowed_handle_is_not_closed_test() -> WinFsResult<()> {
        let path = temp_file("borrowed.txt")?;

        let result = {
            let handle = open_for_backup(&path)?;
            let first_pass = streams::enumerate_streams_from_handle(&handle, StreamEnumOptions::default())?
                .count();
            assert!(first_pass >= 1);

            // The handle is still usable after the walker is gone.
            let info = crate::file_info::FileInfo::from_handle(handle)?;
            assert_eq!(info.file_size, 12);
            unsafe { CloseHandle(handle) }?;
            Ok(())
        };

        fs::remove_file(&path)?;
        result
    }

    #[test]
    fn seek_error_keeps_win32_code_test() {
        let err: windows::core::Error = windows::Win32::Foundation::ERROR_SEEK.into();
        assert!(crate::backup::is_seek_past_end(&to_io_error(err)));

        let err: windows::core::Error = ERROR_ACCESS_DENIED.into();
        assert_eq!(to_io_error(err).raw_os_error(), Some(5));
    }

    #[test]
    fn invalid_handle_is_rejected_test() {
        let handle = HANDLE::default();
        assert!(matches!(
            BackupFile::from_handle(&handle, false),
            Err(WinFsError::HandleInvalidError)
        ));
    }
}
