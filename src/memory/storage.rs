//! Physical storage: the byte arrays that subsets window onto.

use serde::{Deserialize, Serialize};

use super::{MemoryError, StorageId};

/// Whether the CPU may write a storage through an ordinary subset.
///
/// ROM storages can still be filled with [`PhysicalStorage::load`] when an
/// image is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Ram,
    Rom,
}

/// A named, fixed-size block of bytes.
#[derive(Debug, Clone)]
pub struct PhysicalStorage {
    id: StorageId,
    name: String,
    kind: StorageKind,
    data: Vec<u8>,
}

impl PhysicalStorage {
    pub(crate) fn new(id: StorageId, name: &str, kind: StorageKind, size: usize, fill: u8) -> Self {
        Self {
            id,
            name: name.to_string(),
            kind,
            data: vec![fill; size],
        }
    }

    pub fn id(&self) -> StorageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Byte at `offset`. Offsets are validated when subsets are created, so
    /// an out-of-range offset here reads as zero.
    pub fn read(&self, offset: usize) -> u8 {
        self.data.get(offset).copied().unwrap_or(0)
    }

    pub(crate) fn write(&mut self, offset: usize, value: u8) {
        if let Some(slot) = self.data.get_mut(offset) {
            *slot = value;
        }
    }

    /// Copies `bytes` in at `offset`, regardless of kind.
    pub fn load(&mut self, offset: usize, bytes: &[u8]) -> Result<(), MemoryError> {
        let end = offset
            .checked_add(bytes.len())
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| MemoryError::StorageOverflow {
                storage: self.name.clone(),
                offset,
                len: bytes.len(),
                size: self.data.len(),
            })?;
        self.data[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    pub(crate) fn fill(&mut self, value: u8) {
        self.data.fill(value);
    }
}
