//! Memory views and their interval tables.

use super::{SubsetId, ViewId};

/// One active subset occupying `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Binding {
    pub start: u32,
    pub end: u32,
    pub subset: SubsetId,
}

/// A named address space seen by one observer (the CPU, a video chip).
///
/// Active subsets are kept sorted by start address and never overlap, so a
/// lookup is a binary search. The table only changes on map/unmap.
#[derive(Debug, Clone)]
pub struct MemoryView {
    id: ViewId,
    name: String,
    bindings: Vec<Binding>,
}

impl MemoryView {
    pub(crate) fn new(id: ViewId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            bindings: Vec::new(),
        }
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Active subsets in address order.
    pub fn mapped(&self) -> impl Iterator<Item = SubsetId> + '_ {
        self.bindings.iter().map(|b| b.subset)
    }

    pub fn is_mapped(&self, subset: SubsetId) -> bool {
        self.bindings.iter().any(|b| b.subset == subset)
    }

    pub fn resolve(&self, address: u16) -> Option<SubsetId> {
        let a = address as u32;
        let i = self.bindings.partition_point(|b| b.start <= a);
        let candidate = self.bindings.get(i.checked_sub(1)?)?;
        (a < candidate.end).then_some(candidate.subset)
    }

    /// Adds a binding. Returns the subset already occupying part of the
    /// range on overlap. Re-adding a mapped subset is a no-op.
    pub(crate) fn insert(&mut self, binding: Binding) -> Result<(), SubsetId> {
        if self.is_mapped(binding.subset) {
            return Ok(());
        }
        let pos = self.bindings.partition_point(|b| b.start < binding.start);
        if let Some(prev) = pos.checked_sub(1).and_then(|i| self.bindings.get(i)) {
            if prev.end > binding.start {
                return Err(prev.subset);
            }
        }
        if let Some(next) = self.bindings.get(pos) {
            if next.start < binding.end {
                return Err(next.subset);
            }
        }
        self.bindings.insert(pos, binding);
        Ok(())
    }

    pub(crate) fn remove(&mut self, subset: SubsetId) -> bool {
        let before = self.bindings.len();
        self.bindings.retain(|b| b.subset != subset);
        self.bindings.len() != before
    }
}
