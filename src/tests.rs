#![allow(dead_code)]
//! Shared fixtures for unit tests: an in-memory backup source with scripted
//! failures, and a builder for backup stream records.

use std::io;

use crate::{
    backup::BackupSource,
    stream_entry::{StreamAttributes, StreamHeader, StreamType},
};

/// Encodes `text` as little-endian UTF-16 bytes.
pub fn encode_utf16(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// One record of backup data: header fields, raw name and payload.
#[derive(Debug, Clone)]
pub struct StreamRecord {
    pub stream_id: u32,
    pub attributes: StreamAttributes,
    /// The raw name as the OS reports it, e.g. `:name:$DATA`.
    pub name: String,
    pub payload: Vec<u8>,
}

impl StreamRecord {
    pub fn new(stream_type: StreamType, name: &str, payload_len: usize) -> Self {
        StreamRecord {
            stream_id: stream_type.id(),
            attributes: StreamAttributes::NORMAL,
            name: name.to_string(),
            payload: (0..payload_len).map(|i| (i % 251) as u8).collect(),
        }
    }
}

/// Serializes records the way `BackupRead` returns them.
pub fn encode_records(records: &[StreamRecord]) -> Vec<u8> {
    let mut data = Vec::new();
    for record in records {
        let name = encode_utf16(&record.name);
        let header = StreamHeader {
            stream_id: record.stream_id,
            attributes: record.attributes,
            size: record.payload.len() as u64,
            name_size: name.len() as u32,
        };
        data.extend_from_slice(&header.to_bytes());
        data.extend_from_slice(&name);
        data.extend_from_slice(&record.payload);
    }
    data
}

/// An in-memory [`BackupSource`] that records how it was driven and can be told
/// to fail at specific points.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    pub data: Vec<u8>,
    pub position: usize,
    pub read_calls: usize,
    /// Fail the read call with this (zero-based) index.
    pub fail_read_at: Option<usize>,
    /// Fail every seek with this OS error code, after moving the cursor.
    pub seek_error: Option<i32>,
    pub abort_error: Option<io::ErrorKind>,
    pub abort_calls: usize,
    pub skipped: u64,
}

impl ScriptedSource {
    pub fn new(data: Vec<u8>) -> Self {
        ScriptedSource {
            data,
            ..Default::default()
        }
    }

    pub fn from_records(records: &[StreamRecord]) -> Self {
        Self::new(encode_records(records))
    }
}

impl BackupSource for ScriptedSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let call = self.read_calls;
        self.read_calls += 1;
        if self.fail_read_at == Some(call) {
            return Err(io::Error::other("scripted read failure"));
        }

        let remaining = &self.data[self.position.min(self.data.len())..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }

    fn seek_forward(&mut self, bytes: u64) -> io::Result<u64> {
        let available = (self.data.len().saturating_sub(self.position)) as u64;
        let moved = bytes.min(available);
        self.position += moved as usize;
        self.skipped += bytes;

        match self.seek_error {
            Some(code) => Err(io::Error::from_raw_os_error(code)),
            None => Ok(moved),
        }
    }

    fn abort(&mut self) -> io::Result<()> {
        self.abort_calls += 1;
        match self.abort_error {
            Some(kind) => Err(io::Error::new(kind, "scripted abort failure")),
            None => Ok(()),
        }
    }
}
