//! # Memory Model
//!
//! Two layers sit between the CPU and the bytes it touches:
//!
//! - [`MemoryBus`]: the trait the CPU executes against. Reads may have side
//!   effects (chip registers), so there is a separate side-effect-free
//!   [`MemoryBus::peek`].
//! - [`Memory`]: the banked address-space model. Physical storages are
//!   windowed by [`StorageSubset`]s, and each [`MemoryView`] is the set of
//!   subsets currently active for one observer. The CPU and the video chip
//!   look at different views of the same storages.
//!
//! Invariant: within a view, at most one active subset covers any address.
//! Mapping a subset over an occupied range fails with
//! [`MemoryError::MappingConflict`] and leaves the view unchanged.
//!
//! ```
//! use mos_machine::address::Address;
//! use mos_machine::memory::{Access, Memory, StorageKind};
//!
//! let mut memory = Memory::new();
//! let ram = memory.add_storage("ram", StorageKind::Ram, 0x10000, 0x00);
//! let all = memory
//!     .add_subset("ram", ram, 0, Address::new(0x0000), 0x10000, Access::ReadWrite)
//!     .unwrap();
//! let cpu = memory.add_view("cpu");
//! memory.map(all, cpu).unwrap();
//!
//! memory.write(Address::new(0x1234), 0x42, cpu);
//! assert_eq!(memory.read(Address::new(0x1234), cpu), 0x42);
//! ```

mod storage;
mod subset;
mod view;

pub use storage::{PhysicalStorage, StorageKind};
pub use subset::{Access, StorageSubset, SubsetTarget};
pub use view::MemoryView;

use thiserror::Error;
use tracing::{debug, trace};

use crate::address::{Address, ADDRESS_SPACE};
use crate::chips::ChipId;
use crate::numeric::UBytes;
use view::Binding;

/// Byte-level bus the CPU executes against.
///
/// There are no bus errors on a 6502: every read returns something and every
/// write is accepted. Implementations return an open-bus value for unmapped
/// reads and drop writes that hit nothing writable.
///
/// # Examples
///
/// ```
/// use mos_machine::{FlatMemory, MemoryBus};
///
/// let mut mem = FlatMemory::new();
/// mem.write(0x1234, 0x42);
/// assert_eq!(mem.read(0x1234), 0x42);
/// assert_eq!(mem.peek(0x1234), 0x42);
/// ```
pub trait MemoryBus {
    /// Reads a byte as the CPU would, with any side effects the target has
    /// (e.g. clear-on-read interrupt registers).
    fn read(&mut self, addr: u16) -> u8 {
        self.peek(addr)
    }

    /// Reads a byte without side effects. Used by inspection.
    fn peek(&self, addr: u16) -> u8;

    fn write(&mut self, addr: u16, value: u8);

    /// Level of the shared IRQ line (OR of all sources).
    fn irq_active(&self) -> bool {
        false
    }

    /// Level of the NMI line. The CPU latches its rising edge.
    fn nmi_active(&self) -> bool {
        false
    }
}

/// Simple 64KB flat memory with manually driven interrupt lines.
///
/// Handy for exercising the CPU on its own.
///
/// ```
/// use mos_machine::{Cpu, FlatMemory, MemoryBus};
///
/// let mut memory = FlatMemory::new();
/// memory.write(0xFFFC, 0x00);
/// memory.write(0xFFFD, 0x80);
///
/// let cpu = Cpu::power_on(&mut memory);
/// assert_eq!(cpu.pc(), 0x8000);
/// ```
pub struct FlatMemory {
    data: Box<[u8; ADDRESS_SPACE]>,
    irq: bool,
    nmi: bool,
}

impl FlatMemory {
    pub fn new() -> Self {
        Self {
            data: Box::new([0; ADDRESS_SPACE]),
            irq: false,
            nmi: false,
        }
    }

    /// Copies `bytes` in starting at `start`, wrapping at $FFFF.
    pub fn load(&mut self, start: u16, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            self.data[start.wrapping_add(i as u16) as usize] = *byte;
        }
    }

    pub fn set_irq_line(&mut self, active: bool) {
        self.irq = active;
    }

    pub fn set_nmi_line(&mut self, active: bool) {
        self.nmi = active;
    }
}

impl Default for FlatMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus for FlatMemory {
    fn peek(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.data[addr as usize] = value;
    }

    fn irq_active(&self) -> bool {
        self.irq
    }

    fn nmi_active(&self) -> bool {
        self.nmi
    }
}

/// Handle to a [`PhysicalStorage`] inside a [`Memory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageId(pub(crate) usize);

/// Handle to a [`StorageSubset`] inside a [`Memory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubsetId(pub(crate) usize);

/// Handle to a [`MemoryView`] inside a [`Memory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub(crate) usize);

/// Errors raised by the memory model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("{len} byte(s) starting at ${start:04X} exceed the 64KB address space")]
    OutOfRange { start: usize, len: usize },

    #[error("{address} is backed by read-only storage")]
    ReadOnlyTarget { address: Address },

    #[error("subset '{subset}' overlaps '{existing}' at {address} in view '{view}'")]
    MappingConflict {
        view: String,
        subset: String,
        existing: String,
        address: Address,
    },

    #[error("{len} byte(s) at offset {offset} do not fit in storage '{storage}' ({size} bytes)")]
    StorageOverflow {
        storage: String,
        offset: usize,
        len: usize,
        size: usize,
    },

    #[error("no storage with id {0}")]
    UnknownStorage(usize),

    #[error("no subset with id {0}")]
    UnknownSubset(usize),

    #[error("no view with id {0}")]
    UnknownView(usize),
}

/// Where an address lands after resolution through a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Storage {
        subset: SubsetId,
        storage: StorageId,
        offset: usize,
        writable: bool,
    },
    Registers {
        chip: ChipId,
        offset: u16,
    },
    OpenBus,
}

/// Saved set of view layouts, restored on machine reset.
#[derive(Debug, Clone)]
pub struct ViewSnapshot(Vec<MemoryView>);

/// The banked address-space model: storages, subsets and views.
#[derive(Debug, Clone)]
pub struct Memory {
    storages: Vec<PhysicalStorage>,
    subsets: Vec<StorageSubset>,
    views: Vec<MemoryView>,
    active_view: Option<ViewId>,
    open_bus: u8,
}

impl Memory {
    /// Default value returned for unmapped reads.
    pub const OPEN_BUS: u8 = 0xFF;

    pub fn new() -> Self {
        Self {
            storages: Vec::new(),
            subsets: Vec::new(),
            views: Vec::new(),
            active_view: None,
            open_bus: Self::OPEN_BUS,
        }
    }

    pub fn open_bus(&self) -> u8 {
        self.open_bus
    }

    pub fn set_open_bus(&mut self, value: u8) {
        self.open_bus = value;
    }

    // ---------- construction ----------

    pub fn add_storage(
        &mut self,
        name: &str,
        kind: StorageKind,
        size: usize,
        fill: u8,
    ) -> StorageId {
        let id = StorageId(self.storages.len());
        self.storages
            .push(PhysicalStorage::new(id, name, kind, size, fill));
        id
    }

    /// Windows `len` bytes of `storage`, starting at `offset`, onto
    /// `start..start+len`.
    pub fn add_subset(
        &mut self,
        name: &str,
        storage: StorageId,
        offset: usize,
        start: Address,
        len: usize,
        access: Access,
    ) -> Result<SubsetId, MemoryError> {
        start.check_span(len)?;
        let backing = self.storage(storage)?;
        let fits = offset.checked_add(len).is_some_and(|end| end <= backing.len());
        if !fits || len == 0 {
            return Err(MemoryError::StorageOverflow {
                storage: backing.name().to_string(),
                offset,
                len,
                size: backing.len(),
            });
        }
        Ok(self.push_subset(
            name,
            start,
            len,
            SubsetTarget::Storage {
                storage,
                offset,
                access,
                write_through: None,
            },
        ))
    }

    /// Places a chip's register file at `start..start+len`.
    pub fn add_register_window(
        &mut self,
        name: &str,
        chip: ChipId,
        start: Address,
        len: usize,
    ) -> Result<SubsetId, MemoryError> {
        start.check_span(len)?;
        if len == 0 {
            return Err(MemoryError::OutOfRange {
                start: start.index(),
                len,
            });
        }
        Ok(self.push_subset(name, start, len, SubsetTarget::Registers { chip }))
    }

    fn push_subset(
        &mut self,
        name: &str,
        start: Address,
        len: usize,
        target: SubsetTarget,
    ) -> SubsetId {
        let id = SubsetId(self.subsets.len());
        self.subsets.push(StorageSubset {
            id,
            name: name.to_string(),
            start,
            len,
            target,
        });
        id
    }

    /// Routes writes aimed at read-only `subset` into `target`.
    pub fn set_write_through(
        &mut self,
        subset: SubsetId,
        target: SubsetId,
    ) -> Result<(), MemoryError> {
        self.subset(target)?;
        let entry = self
            .subsets
            .get_mut(subset.0)
            .ok_or(MemoryError::UnknownSubset(subset.0))?;
        if let SubsetTarget::Storage { write_through, .. } = &mut entry.target {
            *write_through = Some(target);
        }
        Ok(())
    }

    pub fn add_view(&mut self, name: &str) -> ViewId {
        let id = ViewId(self.views.len());
        self.views.push(MemoryView::new(id, name));
        if self.active_view.is_none() {
            self.active_view = Some(id);
        }
        id
    }

    // ---------- lookup ----------

    pub fn storage(&self, id: StorageId) -> Result<&PhysicalStorage, MemoryError> {
        self.storages.get(id.0).ok_or(MemoryError::UnknownStorage(id.0))
    }

    pub fn storage_mut(&mut self, id: StorageId) -> Result<&mut PhysicalStorage, MemoryError> {
        self.storages
            .get_mut(id.0)
            .ok_or(MemoryError::UnknownStorage(id.0))
    }

    pub fn subset(&self, id: SubsetId) -> Result<&StorageSubset, MemoryError> {
        self.subsets.get(id.0).ok_or(MemoryError::UnknownSubset(id.0))
    }

    pub fn view(&self, id: ViewId) -> Result<&MemoryView, MemoryError> {
        self.views.get(id.0).ok_or(MemoryError::UnknownView(id.0))
    }

    pub fn find_storage(&self, name: &str) -> Option<StorageId> {
        self.storages.iter().find(|s| s.name() == name).map(|s| s.id())
    }

    pub fn find_subset(&self, name: &str) -> Option<SubsetId> {
        self.subsets.iter().find(|s| s.name() == name).map(|s| s.id())
    }

    pub fn find_view(&self, name: &str) -> Option<ViewId> {
        self.views.iter().find(|v| v.name() == name).map(|v| v.id())
    }

    pub fn storages(&self) -> impl Iterator<Item = &PhysicalStorage> {
        self.storages.iter()
    }

    pub fn subsets(&self) -> impl Iterator<Item = &StorageSubset> {
        self.subsets.iter()
    }

    pub fn views(&self) -> impl Iterator<Item = &MemoryView> {
        self.views.iter()
    }

    pub fn is_mapped(&self, subset: SubsetId, view: ViewId) -> bool {
        self.view(view).map_or(false, |v| v.is_mapped(subset))
    }

    // ---------- mapping ----------

    /// Activates `subset` in `view`.
    pub fn map(&mut self, subset: SubsetId, view: ViewId) -> Result<(), MemoryError> {
        self.remap(view, &[], &[subset])
    }

    /// Deactivates `subset` in `view`. Unmapping an inactive subset is a
    /// no-op.
    pub fn unmap(&mut self, subset: SubsetId, view: ViewId) -> Result<(), MemoryError> {
        self.remap(view, &[subset], &[])
    }

    /// Removes `unmap` and then adds `map` as one change. On conflict the
    /// view is left as it was.
    pub fn remap(
        &mut self,
        view: ViewId,
        unmap: &[SubsetId],
        map: &[SubsetId],
    ) -> Result<(), MemoryError> {
        let staged = self.stage_remap(view, unmap, map)?;
        debug!(
            view = staged.name(),
            unmapped = unmap.len(),
            mapped = map.len(),
            "view remapped"
        );
        self.views[view.0] = staged;
        Ok(())
    }

    /// Validates a remap without applying it.
    pub fn check_remap(
        &self,
        view: ViewId,
        unmap: &[SubsetId],
        map: &[SubsetId],
    ) -> Result<(), MemoryError> {
        self.stage_remap(view, unmap, map).map(|_| ())
    }

    fn stage_remap(
        &self,
        view: ViewId,
        unmap: &[SubsetId],
        map: &[SubsetId],
    ) -> Result<MemoryView, MemoryError> {
        let mut staged = self.view(view)?.clone();
        for id in unmap {
            self.subset(*id)?;
            staged.remove(*id);
        }
        for id in map {
            let subset = self.subset(*id)?;
            let binding = Binding {
                start: subset.start().value() as u32,
                end: subset.end(),
                subset: *id,
            };
            staged
                .insert(binding)
                .map_err(|existing| self.conflict(&staged, subset, existing))?;
        }
        Ok(staged)
    }

    fn conflict(
        &self,
        view: &MemoryView,
        subset: &StorageSubset,
        existing: SubsetId,
    ) -> MemoryError {
        let (existing_name, existing_start) = self
            .subset(existing)
            .map(|s| (s.name().to_string(), s.start()))
            .unwrap_or_else(|_| (format!("#{}", existing.0), subset.start()));
        MemoryError::MappingConflict {
            view: view.name().to_string(),
            subset: subset.name().to_string(),
            existing: existing_name,
            address: subset.start().max(existing_start),
        }
    }

    /// The view CPU accesses go through.
    pub fn active_view(&self) -> Option<ViewId> {
        self.active_view
    }

    pub fn set_active_view(&mut self, view: ViewId) -> Result<(), MemoryError> {
        self.view(view)?;
        self.active_view = Some(view);
        Ok(())
    }

    pub fn snapshot_views(&self) -> ViewSnapshot {
        ViewSnapshot(self.views.clone())
    }

    pub fn restore_views(&mut self, snapshot: &ViewSnapshot) {
        self.views = snapshot.0.clone();
    }

    // ---------- access ----------

    /// Resolves `address` for a read in `view`.
    pub fn resolve(&self, address: Address, view: ViewId) -> Target {
        let Some(id) = self.view(view).ok().and_then(|v| v.resolve(address.value())) else {
            return Target::OpenBus;
        };
        match self.subsets.get(id.0) {
            Some(subset) => Self::target_in(subset, address),
            None => Target::OpenBus,
        }
    }

    /// Resolves `address` for a write in `view`, following write-through
    /// links from read-only subsets.
    pub fn resolve_write(&self, address: Address, view: ViewId) -> Target {
        let resolved = self.resolve(address, view);
        if let Target::Storage {
            subset,
            writable: false,
            ..
        } = resolved
        {
            if let Some(SubsetTarget::Storage {
                write_through: Some(through),
                ..
            }) = self.subsets.get(subset.0).map(|s| s.target)
            {
                if let Some(t) = self.subsets.get(through.0).filter(|t| t.contains(address)) {
                    return Self::target_in(t, address);
                }
            }
        }
        resolved
    }

    fn target_in(subset: &StorageSubset, address: Address) -> Target {
        let delta = (address.value() - subset.start().value()) as usize;
        match subset.target {
            SubsetTarget::Storage {
                storage,
                offset,
                access,
                ..
            } => Target::Storage {
                subset: subset.id,
                storage,
                offset: offset + delta,
                writable: access == Access::ReadWrite,
            },
            SubsetTarget::Registers { chip } => Target::Registers {
                chip,
                offset: delta as u16,
            },
        }
    }

    /// Reads a storage-backed byte. Chip registers and unmapped addresses
    /// read as open bus here; the machine bus services registers itself.
    pub fn read(&self, address: Address, view: ViewId) -> u8 {
        match self.resolve(address, view) {
            Target::Storage {
                storage, offset, ..
            } => self.storages[storage.0].read(offset),
            Target::Registers { .. } => self.open_bus,
            Target::OpenBus => {
                trace!(%address, "unmapped read");
                self.open_bus
            }
        }
    }

    /// Writes a storage-backed byte. Writes into read-only storage without
    /// a write-through target and writes to unmapped addresses are dropped.
    pub fn write(&mut self, address: Address, value: u8, view: ViewId) {
        match self.resolve_write(address, view) {
            Target::Storage {
                storage,
                offset,
                writable: true,
                ..
            } => self.storages[storage.0].write(offset, value),
            Target::Storage { writable: false, .. } => {
                trace!(%address, value, "write absorbed by read-only subset");
            }
            Target::Registers { .. } => {}
            Target::OpenBus => trace!(%address, value, "unmapped write"),
        }
    }

    /// Copies `len` bytes as seen through `view`, without side effects.
    pub fn dump(&self, start: Address, len: usize, view: ViewId) -> Result<UBytes, MemoryError> {
        start.check_span(len)?;
        self.view(view)?;
        let bytes: Vec<u8> = (0..len)
            .map(|i| self.read(start.wrapping_add(i as u16), view))
            .collect();
        Ok(UBytes::from(bytes))
    }

    /// Checks that every address of `start..start+len` is writable in
    /// `view` (directly or through a write-through link).
    pub fn check_writable(
        &self,
        start: Address,
        len: usize,
        view: ViewId,
    ) -> Result<(), MemoryError> {
        start.check_span(len)?;
        self.view(view)?;
        for i in 0..len {
            let address = start.wrapping_add(i as u16);
            match self.resolve_write(address, view) {
                Target::Storage { writable: true, .. } | Target::Registers { .. } => {}
                _ => return Err(MemoryError::ReadOnlyTarget { address }),
            }
        }
        Ok(())
    }

    /// Wipes RAM storages to `value`. ROM contents are kept.
    pub fn clear_ram(&mut self, value: u8) {
        for storage in self.storages.iter_mut() {
            if storage.kind() == StorageKind::Ram {
                storage.fill(value);
            }
        }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banked() -> (Memory, ViewId, SubsetId, SubsetId) {
        let mut memory = Memory::new();
        let ram = memory.add_storage("ram", StorageKind::Ram, 0x10000, 0x00);
        let rom = memory.add_storage("rom", StorageKind::Rom, 0x2000, 0xAA);
        let low = memory
            .add_subset("ram_low", ram, 0, Address::new(0), 0xE000, Access::ReadWrite)
            .unwrap();
        let high_ram = memory
            .add_subset("ram_high", ram, 0xE000, Address::new(0xE000), 0x2000, Access::ReadWrite)
            .unwrap();
        let high_rom = memory
            .add_subset("rom", rom, 0, Address::new(0xE000), 0x2000, Access::ReadOnly)
            .unwrap();
        memory.set_write_through(high_rom, high_ram).unwrap();
        let cpu = memory.add_view("cpu");
        memory.map(low, cpu).unwrap();
        memory.map(high_rom, cpu).unwrap();
        (memory, cpu, high_ram, high_rom)
    }

    #[test]
    fn test_first_view_becomes_active() {
        let (memory, cpu, _, _) = banked();
        assert_eq!(memory.active_view(), Some(cpu));
    }

    #[test]
    fn test_rom_reads_and_write_through() {
        let (mut memory, cpu, high_ram, high_rom) = banked();
        assert_eq!(memory.read(Address::new(0xE000), cpu), 0xAA);

        memory.write(Address::new(0xE000), 0x55, cpu);
        assert_eq!(memory.read(Address::new(0xE000), cpu), 0xAA);

        memory.remap(cpu, &[high_rom], &[high_ram]).unwrap();
        assert_eq!(memory.read(Address::new(0xE000), cpu), 0x55);
    }

    #[test]
    fn test_conflicting_map_leaves_view_untouched() {
        let (mut memory, cpu, high_ram, _) = banked();
        let err = memory.map(high_ram, cpu).unwrap_err();
        match err {
            MemoryError::MappingConflict {
                subset, existing, address, ..
            } => {
                assert_eq!(subset, "ram_high");
                assert_eq!(existing, "rom");
                assert_eq!(address, Address::new(0xE000));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(memory.read(Address::new(0xE000), cpu), 0xAA);
    }

    #[test]
    fn test_unmapped_reads_open_bus() {
        let (mut memory, cpu, _, high_rom) = banked();
        memory.unmap(high_rom, cpu).unwrap();
        assert_eq!(memory.read(Address::new(0xFFFF), cpu), Memory::OPEN_BUS);
        memory.set_open_bus(0x00);
        assert_eq!(memory.read(Address::new(0xFFFF), cpu), 0x00);
    }

    #[test]
    fn test_subset_outside_storage_rejected() {
        let mut memory = Memory::new();
        let rom = memory.add_storage("rom", StorageKind::Rom, 0x1000, 0);
        let err = memory
            .add_subset("too_big", rom, 0x800, Address::new(0xF000), 0x1000, Access::ReadOnly)
            .unwrap_err();
        assert!(matches!(err, MemoryError::StorageOverflow { .. }));
        let err = memory
            .add_subset("wraps", rom, 0, Address::new(0xFF00), 0x200, Access::ReadOnly)
            .unwrap_err();
        assert!(matches!(err, MemoryError::OutOfRange { .. }));
        let err = memory
            .add_subset(
                "huge_offset",
                rom,
                usize::MAX,
                Address::new(0x1000),
                0x10,
                Access::ReadOnly,
            )
            .unwrap_err();
        assert!(matches!(err, MemoryError::StorageOverflow { .. }));
    }

    #[test]
    fn test_dump_and_writable_checks() {
        let (mut memory, cpu, _, _) = banked();
        memory.write(Address::new(0x0200), 0x01, cpu);
        memory.write(Address::new(0x0201), 0x02, cpu);
        let bytes = memory.dump(Address::new(0x0200), 2, cpu).unwrap();
        assert_eq!(bytes.to_vec(), vec![0x01, 0x02]);

        assert!(memory.check_writable(Address::new(0xDFFF), 2, cpu).is_ok());
        assert!(memory.dump(Address::new(0xFFFF), 2, cpu).is_err());
    }

    #[test]
    fn test_read_only_without_write_through_is_reported() {
        let mut memory = Memory::new();
        let rom = memory.add_storage("rom", StorageKind::Rom, 0x100, 0);
        let s = memory
            .add_subset("rom", rom, 0, Address::new(0xFF00), 0x100, Access::ReadOnly)
            .unwrap();
        let cpu = memory.add_view("cpu");
        memory.map(s, cpu).unwrap();
        assert_eq!(
            memory.check_writable(Address::new(0xFF10), 1, cpu),
            Err(MemoryError::ReadOnlyTarget {
                address: Address::new(0xFF10)
            })
        );
    }

    #[test]
    fn test_snapshot_restores_layout() {
        let (mut memory, cpu, high_ram, high_rom) = banked();
        let snapshot = memory.snapshot_views();
        memory.remap(cpu, &[high_rom], &[high_ram]).unwrap();
        memory.restore_views(&snapshot);
        assert!(memory.is_mapped(high_rom, cpu));
        assert!(!memory.is_mapped(high_ram, cpu));
    }
}
