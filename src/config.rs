//! Machine description.
//!
//! A [`MachineConfig`] lists everything a [`Computer`](crate::Computer) is
//! built from: physical storages, the subsets that window them, the chips
//! and where their registers sit, the views and what each maps initially,
//! and the clock. Everything is referred to by name; names are resolved
//! when the computer is constructed and any dangling reference fails
//! construction with a [`ConfigError`].
//!
//! ```
//! use mos_machine::config::MachineConfig;
//!
//! let config = MachineConfig::from_json(r#"{
//!     "name": "flat",
//!     "storages": [{ "name": "ram", "kind": "ram", "size": 65536 }],
//!     "subsets": [{ "name": "all", "storage": "ram", "start": 0, "len": 65536 }],
//!     "views": [{ "name": "cpu", "map": ["all"] }],
//!     "cpu_view": "cpu"
//! }"#).unwrap();
//! assert_eq!(config.storages.len(), 1);
//! assert!(config.clock.throttled);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::{Clock, VideoStandard};
use crate::cpu::IllegalOpcodePolicy;
use crate::interrupts::InterruptLine;
use crate::memory::{Access, MemoryError, StorageKind};

/// Errors raised while a machine is assembled from its description.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("invalid machine description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown storage '{0}'")]
    UnknownStorage(String),

    #[error("unknown subset '{0}'")]
    UnknownSubset(String),

    #[error("unknown view '{0}'")]
    UnknownView(String),

    #[error("unknown chip '{0}'")]
    UnknownChip(String),

    #[error("{kind} name '{name}' is used more than once")]
    DuplicateName { kind: &'static str, name: String },

    #[error("chip '{0}' has an empty bank table")]
    EmptyBankTable(String),

    #[error("speed factor {0} is outside 0.0001..=1000")]
    SpeedFactor(f64),
}

fn default_speed() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_open_bus() -> u8 {
    0xFF
}

/// Clock settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default)]
    pub standard: VideoStandard,
    /// 1.0 runs at the standard's rate.
    #[serde(default = "default_speed")]
    pub speed_factor: f64,
    /// When false the machine runs as fast as the host allows.
    #[serde(default = "default_true")]
    pub throttled: bool,
}

impl ClockConfig {
    /// Rejects speed factors that are not finite or lie outside the
    /// accepted range.
    pub fn check(&self) -> Result<(), ConfigError> {
        if Clock::valid_speed_factor(self.speed_factor) {
            Ok(())
        } else {
            Err(ConfigError::SpeedFactor(self.speed_factor))
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            standard: VideoStandard::default(),
            speed_factor: default_speed(),
            throttled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub name: String,
    pub kind: StorageKind,
    pub size: usize,
    /// Initial contents of every byte.
    #[serde(default)]
    pub fill: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsetConfig {
    pub name: String,
    pub storage: String,
    /// Offset into the storage of the subset's first byte.
    #[serde(default)]
    pub offset: usize,
    pub start: u16,
    pub len: usize,
    #[serde(default)]
    pub access: Access,
    /// Subset receiving writes that hit this (read-only) one.
    #[serde(default)]
    pub write_through: Option<String>,
}

/// A selector-indexed table of subset groups for one view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankConfig {
    pub view: String,
    pub configurations: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChipKind {
    /// 6510 processor port.
    IoPort {
        #[serde(default)]
        bank: Option<BankConfig>,
    },
    /// CIA-style timer chip.
    Timer {
        #[serde(default)]
        line: InterruptLine,
        #[serde(default)]
        bank: Option<BankConfig>,
    },
    /// VIC-style raster chip.
    Raster {
        #[serde(default)]
        view: Option<String>,
        #[serde(default)]
        color_storage: Option<String>,
    },
}

/// Where a chip's register file sits in the CPU's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterWindow {
    pub start: u16,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipConfig {
    pub name: String,
    #[serde(flatten)]
    pub kind: ChipKind,
    /// Creates a subset named after the chip; map it in a view to expose
    /// the registers.
    #[serde(default)]
    pub registers: Option<RegisterWindow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    pub name: String,
    /// Subsets mapped when the machine is built (and after every reset,
    /// before the chips re-apply their banks).
    #[serde(default)]
    pub map: Vec<String>,
}

/// Complete description of a machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default = "default_open_bus")]
    pub open_bus: u8,
    #[serde(default)]
    pub illegal_opcodes: IllegalOpcodePolicy,
    #[serde(default)]
    pub storages: Vec<StorageConfig>,
    #[serde(default)]
    pub subsets: Vec<SubsetConfig>,
    /// Simulated in this order, every step.
    #[serde(default)]
    pub chips: Vec<ChipConfig>,
    #[serde(default)]
    pub views: Vec<ViewConfig>,
    /// The view the CPU executes against.
    pub cpu_view: String,
}

impl MachineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that names are unique within each kind. Register windows
    /// share the subset namespace.
    pub fn check_names(&self) -> Result<(), ConfigError> {
        unique("storage", self.storages.iter().map(|s| s.name.as_str()))?;
        unique(
            "subset",
            self.subsets
                .iter()
                .map(|s| s.name.as_str())
                .chain(
                    self.chips
                        .iter()
                        .filter(|c| c.registers.is_some())
                        .map(|c| c.name.as_str()),
                ),
        )?;
        unique("chip", self.chips.iter().map(|c| c.name.as_str()))?;
        unique("view", self.views.iter().map(|v| v.name.as_str()))?;
        Ok(())
    }
}

fn unique<'a>(kind: &'static str, names: impl Iterator<Item = &'a str>) -> Result<(), ConfigError> {
    let mut seen = std::collections::HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}
