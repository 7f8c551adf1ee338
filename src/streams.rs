//! Enumeration of the streams of a file or directory.
//!
//! The walk reads the backup data of a file one record at a time: a fixed-size
//! header, the stream name when the header declares one, then a forward seek over
//! the payload. A header read that comes back short marks the end of the data.
//!
//! [`AlternateDataStreams`] is a single-pass iterator. It cannot be restarted, and it
//! finishes the backup read (the `abort` call on its source) exactly once: when the
//! data is exhausted, when an error stops the walk, or when it is dropped early.

#[cfg(windows)]
use std::path::Path;

use log::{debug, warn};
#[cfg(windows)]
use windows::Win32::Foundation::HANDLE;

#[cfg(windows)]
use crate::backup_file::BackupFile;
use crate::{
    MAXIMUM_STREAM_NAME_SIZE, STREAM_HEADER_SIZE, WinFsResult,
    backup::{self, BackupSource},
    errors::WinFsError,
    stream_entry::{self, StreamEntry, StreamHeader, StreamType},
};

/// Options for enumerating streams.
#[derive(Debug, Clone, Default)]
pub struct StreamEnumOptions {
    /// Only yield the stream with this name (case-insensitive).
    pub name_filter: Option<String>,
    /// Only yield streams of this type.
    pub stream_type: Option<StreamType>,
    /// Ask the OS to include security data in the walk (Windows only).
    pub process_security: bool,
}

impl StreamEnumOptions {
    /// Options that yield named alternate data streams only.
    pub fn alternate_streams() -> Self {
        StreamEnumOptions {
            stream_type: Some(StreamType::AlternateData),
            ..Default::default()
        }
    }

    fn matches(&self, entry: &StreamEntry) -> bool {
        if self
            .stream_type
            .is_some_and(|stream_type| stream_type != entry.stream_type)
        {
            return false;
        }
        match &self.name_filter {
            Some(name) => names_equal(name, &entry.name),
            None => true,
        }
    }
}

fn names_equal(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_uppercase)
        .eq(b.chars().flat_map(char::to_uppercase))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    AwaitHeader,
    /// The data is exhausted and the source has been finalized.
    Finished,
    /// An error was returned; no more reads are attempted.
    Poisoned,
}

/// Iterator over the streams found in a backup data source.
pub struct AlternateDataStreams<S: BackupSource> {
    source: S,
    options: StreamEnumOptions,
    state: WalkState,
    finalized: bool,
    header_buffer: [u8; STREAM_HEADER_SIZE],
    name_buffer: Vec<u8>,
}

impl<S: BackupSource> AlternateDataStreams<S> {
    /// Creates a walker over `source` that yields every stream.
    pub fn new(source: S) -> Self {
        Self::new_with_options(source, StreamEnumOptions::default())
    }

    /// Creates a walker over `source` with filtering options.
    pub fn new_with_options(source: S, options: StreamEnumOptions) -> Self {
        AlternateDataStreams {
            source,
            options,
            state: WalkState::AwaitHeader,
            finalized: false,
            header_buffer: [0u8; STREAM_HEADER_SIZE],
            name_buffer: Vec::new(),
        }
    }

    pub fn options(&self) -> &StreamEnumOptions {
        &self.options
    }

    /// Reads the next header, or returns `None` at the end of the backup data.
    fn read_header(&mut self) -> WinFsResult<Option<StreamHeader>> {
        let bytes_read = self.source.read(&mut self.header_buffer)?;
        if bytes_read < STREAM_HEADER_SIZE {
            debug!("Short header read ({} bytes), end of backup data", bytes_read);
            return Ok(None);
        }

        let header = StreamHeader::parse(&self.header_buffer)?;
        debug!("Stream header: {:?}", header);
        Ok(Some(header))
    }

    fn read_name(&mut self, name_size: u32) -> WinFsResult<String> {
        let name_size = name_size as usize;
        if name_size > MAXIMUM_STREAM_NAME_SIZE {
            return Err(WinFsError::UnrecognizedFormatError(format!(
                "stream name size {name_size} exceeds the {MAXIMUM_STREAM_NAME_SIZE} byte limit"
            )));
        }
        self.name_buffer.resize(name_size, 0);

        let bytes_read = self.source.read(&mut self.name_buffer)?;
        if bytes_read < name_size {
            return Err(WinFsError::IoError(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("stream name truncated: expected {name_size} bytes, got {bytes_read}"),
            )));
        }

        Ok(stream_entry::decode_stream_name(&self.name_buffer))
    }

    /// Moves the cursor past the payload of the current stream.
    fn skip_payload(&mut self, size: u64) -> WinFsResult<()> {
        if size == 0 {
            return Ok(());
        }

        match self.source.seek_forward(size) {
            Ok(_) => Ok(()),
            Err(err) if backup::is_seek_past_end(&err) => {
                debug!("Seek past end of stream while skipping {} bytes, ignored", size);
                Ok(())
            }
            Err(err) => {
                warn!("Error skipping stream payload: {}", err);
                Err(err.into())
            }
        }
    }

    fn find_next_entry(&mut self) -> WinFsResult<Option<StreamEntry>> {
        loop {
            let Some(header) = self.read_header()? else {
                return Ok(None);
            };

            let name = if header.name_size > 0 {
                self.read_name(header.name_size)?
            } else {
                String::new()
            };

            let entry = StreamEntry::new(&header, name)?;
            self.skip_payload(header.size)?;

            if self.options.matches(&entry) {
                return Ok(Some(entry));
            }
            debug!("Skipping filtered stream {:?}", entry.name);
        }
    }

    /// Finishes the backup read on the source. Runs at most once.
    fn finalize(&mut self) -> WinFsResult<()> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;
        self.source.abort()?;
        Ok(())
    }
}

impl<S: BackupSource> Iterator for AlternateDataStreams<S> {
    type Item = WinFsResult<StreamEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != WalkState::AwaitHeader {
            return None;
        }

        match self.find_next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.state = WalkState::Finished;
                self.finalize().err().map(Err)
            }
            Err(err) => {
                warn!("Error walking backup streams: {}", err);
                self.state = WalkState::Poisoned;
                if let Err(abort_err) = self.finalize() {
                    warn!("Error finishing backup read: {}", abort_err);
                }
                Some(Err(err))
            }
        }
    }
}

impl<S: BackupSource> std::iter::FusedIterator for AlternateDataStreams<S> {}

impl<S: BackupSource> Drop for AlternateDataStreams<S> {
    fn drop(&mut self) {
        if let Err(err) = self.finalize() {
            warn!("Error finishing backup read on drop: {}", err);
        }
    }
}

/// Enumerates the streams of the file or directory at `path`.
///
/// The file is opened with backup semantics and closed when the returned iterator
/// is dropped.
#[cfg(windows)]
pub fn enumerate_streams<P: AsRef<Path>>(
    path: P,
    options: StreamEnumOptions,
) -> WinFsResult<AlternateDataStreams<BackupFile<'static>>> {
    let file = BackupFile::open(path.as_ref(), options.process_security)?;
    Ok(AlternateDataStreams::new_with_options(file, options))
}

/// Enumerates the streams behind a caller-owned handle. The handle is not closed.
#[cfg(windows)]
pub fn enumerate_streams_from_handle(
    handle: &HANDLE,
    options: StreamEnumOptions,
) -> WinFsResult<AlternateDataStreams<BackupFile<'_>>> {
    let file = BackupFile::from_handle(handle, options.process_security)?;
    Ok(AlternateDataStreams::new_with_options(file, options))
}
