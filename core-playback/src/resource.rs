//! Bundle-resident resources and the byte-source adapter decoders read through.
//!
//! Decode libraries never see the filesystem. They receive a
//! [`ResourceSource`], which implements `Read`, `Seek`, and symphonia's
//! `MediaSource` directly over the resource's bytes, with the resource's own
//! offset as the only read position.

use bridge_traits::{BridgeError, ResourceBundle};
use bytes::Bytes;
use core_runtime::logging::strip_path;
use std::io::{self, Read, Seek, SeekFrom};
use symphonia::core::io::MediaSource;
use tracing::debug;

use crate::error::{PlaybackError, Result};

/// Named bytes taken from a bundle, plus a read offset.
#[derive(Debug, Clone)]
pub struct Resource {
    name: String,
    data: Bytes,
    offset: u64,
}

impl Resource {
    /// Read `name` out of `bundle`.
    pub fn open(bundle: &dyn ResourceBundle, name: &str) -> Result<Self> {
        let data = bundle.open(name).map_err(|e| PlaybackError::ResourceUnavailable {
            name: name.to_string(),
            reason: match e {
                BridgeError::NotFound(_) => "not found in bundle".to_string(),
                other => other.to_string(),
            },
        })?;

        debug!(resource = %strip_path(name), bytes = data.len(), "Opened resource");
        Ok(Self::from_bytes(name, data))
    }

    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            offset: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn remaining(&self) -> u64 {
        self.size() - self.offset
    }
}

/// Read/seek/tell/close adapter over a [`Resource`].
///
/// - `read` returns fewer bytes than asked only at the end, and `Ok(0)` there.
/// - `seek` to a negative position fails with `InvalidInput` and leaves the
///   offset alone; past the end it clamps to the size.
/// - [`tell`](Self::tell) cannot fail.
/// - [`close`](Self::close) releases nothing; the bytes belong to the bundle.
#[derive(Debug)]
pub struct ResourceSource {
    resource: Resource,
}

impl ResourceSource {
    pub fn new(resource: Resource) -> Self {
        Self { resource }
    }

    pub fn tell(&self) -> u64 {
        self.resource.offset
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Give the resource back.
    pub fn close(self) -> Resource {
        self.resource
    }
}

impl Read for ResourceSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let start = self.resource.offset as usize;
        let count = buf.len().min(self.resource.remaining() as usize);
        buf[..count].copy_from_slice(&self.resource.data[start..start + count]);
        self.resource.offset += count as u64;
        Ok(count)
    }
}

impl Seek for ResourceSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let size = self.resource.size() as i128;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(delta) => self.resource.offset as i128 + delta as i128,
            SeekFrom::End(delta) => size + delta as i128,
        };

        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("seek to negative offset {} in {}", target, self.resource.name),
            ));
        }

        self.resource.offset = target.min(size) as u64;
        Ok(self.resource.offset)
    }
}

impl MediaSource for ResourceSource {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        Some(self.resource.size())
    }
}
