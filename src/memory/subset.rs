//! Storage subsets: windows of a storage (or of a chip's registers) placed
//! at an address range.

use serde::{Deserialize, Serialize};

use super::{StorageId, SubsetId};
use crate::address::Address;
use crate::chips::ChipId;

/// Access policy of a storage-backed subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    ReadOnly,
    #[default]
    ReadWrite,
}

/// What a subset's addresses are served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsetTarget {
    Storage {
        storage: StorageId,
        /// Offset of the subset's first byte inside the storage.
        offset: usize,
        access: Access,
        /// Subset that receives writes aimed at a read-only subset
        /// (RAM underneath ROM).
        write_through: Option<SubsetId>,
    },
    /// Chip register window. The chip sees offsets relative to `start`.
    Registers { chip: ChipId },
}

/// A contiguous address range backed by one target.
#[derive(Debug, Clone)]
pub struct StorageSubset {
    pub(crate) id: SubsetId,
    pub(crate) name: String,
    pub(crate) start: Address,
    pub(crate) len: usize,
    pub(crate) target: SubsetTarget,
}

impl StorageSubset {
    pub fn id(&self) -> SubsetId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last address, as a 32-bit value so $FFFF-ending subsets
    /// don't wrap.
    pub fn end(&self) -> u32 {
        self.start.value() as u32 + self.len as u32
    }

    pub fn contains(&self, address: Address) -> bool {
        let a = address.value() as u32;
        a >= self.start.value() as u32 && a < self.end()
    }

    pub fn target(&self) -> SubsetTarget {
        self.target
    }

    pub fn is_writable(&self) -> bool {
        matches!(
            self.target,
            SubsetTarget::Storage {
                access: Access::ReadWrite,
                ..
            } | SubsetTarget::Registers { .. }
        )
    }
}
