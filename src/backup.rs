//! Byte sources for backup stream walks.
//!
//! [`BackupSource`] is the forward-only cursor the stream walker reads from. On Windows
//! it is implemented over `BackupRead`/`BackupSeek` by [`crate::backup_file::BackupFile`];
//! [`BackupImage`] implements it over any `Read + Seek`, for backup data that was
//! recorded to a file or buffer.

use std::io::{self, Read, Seek, SeekFrom};

use log::debug;

/// Win32 `ERROR_SEEK`: `BackupSeek` could not move the full requested distance
/// because the current stream ended first.
pub const ERROR_SEEK: i32 = 25;

/// Returns true if `err` is the benign seek error reported when skipping a payload.
pub fn is_seek_past_end(err: &io::Error) -> bool {
    err.raw_os_error() == Some(ERROR_SEEK)
}

/// A forward-only source of backup stream records.
pub trait BackupSource {
    /// Reads up to `buf.len()` bytes. Fewer bytes are returned only at the end of the
    /// backup data.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Skips `bytes` bytes of the current stream's payload, returning how many bytes
    /// were actually skipped.
    ///
    /// When the stream ends before `bytes` were skipped, implementations may fail with
    /// [`ERROR_SEEK`]; the walker treats that as success.
    fn seek_forward(&mut self, bytes: u64) -> io::Result<u64>;

    /// Ends the backup read and releases any state the OS keeps for it.
    fn abort(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: BackupSource + ?Sized> BackupSource for &mut S {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn seek_forward(&mut self, bytes: u64) -> io::Result<u64> {
        (**self).seek_forward(bytes)
    }

    fn abort(&mut self) -> io::Result<()> {
        (**self).abort()
    }
}

/// Backup data recorded by `BackupRead`, read back from any `Read + Seek`.
#[derive(Debug)]
pub struct BackupImage<R> {
    inner: R,
}

impl<R: Read + Seek> BackupImage<R> {
    pub fn new(inner: R) -> Self {
        BackupImage { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> BackupSource for BackupImage<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(filled)
    }

    fn seek_forward(&mut self, bytes: u64) -> io::Result<u64> {
        let position = self.inner.stream_position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        let target = position.saturating_add(bytes).min(end);
        self.inner.seek(SeekFrom::Start(target))?;

        if target - position < bytes {
            debug!(
                "Backup image ended {} bytes before the end of the current stream",
                bytes - (target - position)
            );
        }
        Ok(target - position)
    }
}
