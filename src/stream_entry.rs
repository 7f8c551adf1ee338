//! Backup stream records.
//!
//! A backup-semantics read of a file yields a sequence of records, each made of a
//! fixed `WIN32_STREAM_ID` header, an optional UTF-16 stream name, and the stream
//! payload. This module decodes the header and the name; walking the sequence is
//! done by [`crate::streams::AlternateDataStreams`].

use std::fmt;

use crate::{STREAM_HEADER_SIZE, WinFsResult, errors::WinFsError};

/// Suffix the OS appends to the names of `$DATA` streams.
const DATA_STREAM_SUFFIX: &str = ":$DATA";

/// The kind of data carried by a backup stream (`WIN32_STREAM_ID.dwStreamId`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    /// Standard data; the unnamed primary stream of a file.
    Data,
    ExtendedAttributeData,
    SecurityData,
    /// A named alternate data stream.
    AlternateData,
    /// Hard link information.
    Link,
    PropertyData,
    ObjectId,
    ReparseData,
    SparseBlock,
    TransactionalData,
    GhostedFileExtents,
}

impl StreamType {
    /// The `BACKUP_*` identifier used in the stream header.
    pub fn id(self) -> u32 {
        match self {
            StreamType::Data => 1,
            StreamType::ExtendedAttributeData => 2,
            StreamType::SecurityData => 3,
            StreamType::AlternateData => 4,
            StreamType::Link => 5,
            StreamType::PropertyData => 6,
            StreamType::ObjectId => 7,
            StreamType::ReparseData => 8,
            StreamType::SparseBlock => 9,
            StreamType::TransactionalData => 10,
            StreamType::GhostedFileExtents => 11,
        }
    }
}

impl TryFrom<u32> for StreamType {
    type Error = WinFsError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        let stream_type = match id {
            1 => StreamType::Data,
            2 => StreamType::ExtendedAttributeData,
            3 => StreamType::SecurityData,
            4 => StreamType::AlternateData,
            5 => StreamType::Link,
            6 => StreamType::PropertyData,
            7 => StreamType::ObjectId,
            8 => StreamType::ReparseData,
            9 => StreamType::SparseBlock,
            10 => StreamType::TransactionalData,
            11 => StreamType::GhostedFileExtents,
            other => {
                return Err(WinFsError::UnrecognizedFormatError(format!(
                    "unknown backup stream id {other}"
                )));
            }
        };
        Ok(stream_type)
    }
}

/// Stream attribute flags (`WIN32_STREAM_ID.dwStreamAttributes`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StreamAttributes(pub u32);

impl StreamAttributes {
    pub const NORMAL: StreamAttributes = StreamAttributes(0x0000_0000);
    /// The data was modified while it was being read.
    pub const MODIFIED: StreamAttributes = StreamAttributes(0x0000_0001);
    pub const CONTAINS_SECURITY: StreamAttributes = StreamAttributes(0x0000_0002);
    pub const CONTAINS_PROPERTIES: StreamAttributes = StreamAttributes(0x0000_0004);
    pub const SPARSE: StreamAttributes = StreamAttributes(0x0000_0008);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: StreamAttributes) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for StreamAttributes {
    type Output = StreamAttributes;

    fn bitor(self, rhs: Self) -> Self::Output {
        StreamAttributes(self.0 | rhs.0)
    }
}

impl fmt::Display for StreamAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(StreamAttributes::MODIFIED) {
            names.push("MODIFIED");
        }
        if self.contains(StreamAttributes::CONTAINS_SECURITY) {
            names.push("CONTAINS_SECURITY");
        }
        if self.contains(StreamAttributes::CONTAINS_PROPERTIES) {
            names.push("CONTAINS_PROPERTIES");
        }
        if self.contains(StreamAttributes::SPARSE) {
            names.push("SPARSE");
        }
        if names.is_empty() {
            names.push("NORMAL");
        }
        f.write_str(&names.join(" | "))
    }
}

/// The fixed part of a `WIN32_STREAM_ID` record.
///
/// Layout, little-endian:
///
/// | offset | size | field             |
/// |--------|------|-------------------|
/// | 0      | 4    | stream id         |
/// | 4      | 4    | stream attributes |
/// | 8      | 4    | size, low part    |
/// | 12     | 4    | size, high part   |
/// | 16     | 4    | name size (bytes) |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub stream_id: u32,
    pub attributes: StreamAttributes,
    pub size: u64,
    pub name_size: u32,
}

impl StreamHeader {
    /// Decodes a header from the first [`STREAM_HEADER_SIZE`] bytes of `bytes`.
    pub fn parse(bytes: &[u8]) -> WinFsResult<Self> {
        if bytes.len() < STREAM_HEADER_SIZE {
            return Err(WinFsError::UnrecognizedFormatError(format!(
                "stream header needs {} bytes, got {}",
                STREAM_HEADER_SIZE,
                bytes.len()
            )));
        }

        let size_low = read_u32(bytes, 8)?;
        let size_high = read_u32(bytes, 12)?;

        Ok(StreamHeader {
            stream_id: read_u32(bytes, 0)?,
            attributes: StreamAttributes(read_u32(bytes, 4)?),
            size: (u64::from(size_high) << 32) | u64::from(size_low),
            name_size: read_u32(bytes, 16)?,
        })
    }

    /// Encodes the header in its on-the-wire layout.
    pub fn to_bytes(&self) -> [u8; STREAM_HEADER_SIZE] {
        let mut bytes = [0u8; STREAM_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.stream_id.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.attributes.bits().to_le_bytes());
        bytes[8..12].copy_from_slice(&(self.size as u32).to_le_bytes());
        bytes[12..16].copy_from_slice(&((self.size >> 32) as u32).to_le_bytes());
        bytes[16..20].copy_from_slice(&self.name_size.to_le_bytes());
        bytes
    }

    pub fn stream_type(&self) -> WinFsResult<StreamType> {
        StreamType::try_from(self.stream_id)
    }
}

pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> WinFsResult<u32> {
    bytes
        .get(offset..offset + 4)
        .and_then(|field| field.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| {
            WinFsError::UnrecognizedFormatError(format!("buffer too short for u32 at offset {offset}"))
        })
}

pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> WinFsResult<u16> {
    bytes
        .get(offset..offset + 2)
        .and_then(|field| field.try_into().ok())
        .map(u16::from_le_bytes)
        .ok_or_else(|| {
            WinFsError::UnrecognizedFormatError(format!("buffer too short for u16 at offset {offset}"))
        })
}

/// Decodes a little-endian UTF-16 buffer. A trailing odd byte is ignored.
pub(crate) fn decode_utf16(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Decodes a raw stream name (`:name:$DATA`) into the bare stream name (`name`).
pub fn decode_stream_name(bytes: &[u8]) -> String {
    let raw = decode_utf16(bytes);
    let name = raw.strip_prefix(':').unwrap_or(&raw);
    let name = name.strip_suffix(DATA_STREAM_SUFFIX).unwrap_or(name);
    name.to_string()
}

/// One stream of a file or directory, as found by a backup-semantics walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    /// The stream name, empty for the unnamed primary data stream.
    pub name: String,
    pub stream_type: StreamType,
    /// Length of the stream data in bytes.
    pub size: u64,
    pub attributes: StreamAttributes,
}

impl StreamEntry {
    /// Create a new `StreamEntry` from a decoded header and its decoded name.
    ///
    /// Fails with [`WinFsError::UnrecognizedFormatError`] for unknown stream ids.
    pub(crate) fn new(header: &StreamHeader, name: String) -> WinFsResult<Self> {
        Ok(StreamEntry {
            name,
            stream_type: header.stream_type()?,
            size: header.size,
            attributes: header.attributes,
        })
    }

    /// Returns true for the unnamed primary data stream.
    pub fn is_default_stream(&self) -> bool {
        self.name.is_empty() && self.stream_type == StreamType::Data
    }

    /// Returns true for a named alternate data stream.
    pub fn is_alternate_stream(&self) -> bool {
        self.stream_type == StreamType::AlternateData
    }

    /// The `file:stream` suffix used to open this stream, e.g. `:Zone.Identifier`.
    pub fn stream_suffix(&self) -> String {
        if self.name.is_empty() {
            String::new()
        } else {
            format!(":{}", self.name)
        }
    }
}

impl fmt::Display for StreamEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name.is_empty() {
            "<default>"
        } else {
            self.name.as_str()
        };
        write!(
            f,
            "{name} ({:?}, {} bytes, {})",
            self.stream_type, self.size, self.attributes
        )
    }
}
