//! CPU interrupt kinds.
//!
//! The 6502 has three ways into a handler:
//!
//! - **IRQ**: level-sensitive and maskable by the I flag. The line is the OR
//!   of every source, so it stays asserted until each source is acknowledged
//!   through its own registers. A handler that returns without acknowledging
//!   is re-entered straight after RTI.
//! - **NMI**: edge-triggered. The CPU latches a rising edge of the line and
//!   services it once, whatever the I flag says. The line must drop and rise
//!   again before another NMI is taken.
//! - **Reset**: restarts the CPU through the reset vector and clears a halt.
//!
//! Servicing takes 7 cycles: PC and status are pushed (with B clear), I is
//! set and the vector is loaded. Requests are checked at instruction
//! boundaries; when several are pending the highest priority wins.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An interrupt request kind, with its vector and priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuInterrupt {
    Irq,
    Nmi,
    Reset,
}

impl CpuInterrupt {
    /// Cycles taken to enter a handler.
    pub const SERVICE_CYCLES: u32 = 7;

    /// Address of the little-endian handler pointer.
    pub const fn vector(self) -> u16 {
        match self {
            CpuInterrupt::Nmi => 0xFFFA,
            CpuInterrupt::Reset => 0xFFFC,
            CpuInterrupt::Irq => 0xFFFE,
        }
    }

    /// Higher wins.
    pub const fn priority(self) -> u8 {
        match self {
            CpuInterrupt::Irq => 0,
            CpuInterrupt::Nmi => 1,
            CpuInterrupt::Reset => 2,
        }
    }

    /// Whether the I flag holds this kind off.
    pub const fn maskable(self) -> bool {
        matches!(self, CpuInterrupt::Irq)
    }
}

impl fmt::Display for CpuInterrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CpuInterrupt::Irq => "IRQ",
            CpuInterrupt::Nmi => "NMI",
            CpuInterrupt::Reset => "RESET",
        })
    }
}

/// Which CPU line a chip's interrupt output is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptLine {
    #[default]
    Irq,
    Nmi,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectors() {
        assert_eq!(CpuInterrupt::Nmi.vector(), 0xFFFA);
        assert_eq!(CpuInterrupt::Reset.vector(), 0xFFFC);
        assert_eq!(CpuInterrupt::Irq.vector(), 0xFFFE);
    }

    #[test]
    fn test_priority_order() {
        assert!(CpuInterrupt::Reset.priority() > CpuInterrupt::Nmi.priority());
        assert!(CpuInterrupt::Nmi.priority() > CpuInterrupt::Irq.priority());
        assert!(CpuInterrupt::Irq.maskable());
        assert!(!CpuInterrupt::Nmi.maskable());
    }
}
