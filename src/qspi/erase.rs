//! Erase granularities (§4.5.6).
//!
//! Erase addresses are encoded MSB-first, unlike the little-endian address
//! octets [`crate::commands::Session::qspi_read`] and
//! [`crate::commands::Session::qspi_write`] use — this matches the device
//! firmware's erase-command parser, not a general convention.

use std::time::Duration;

use log::{debug, info};

use super::FlashEngine;
use crate::error::Result;
use crate::transport::Transport;

/// An erase granularity: an address-alignment mask and the opcode that
/// erases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseGranularity {
    Sector4K,
    Block32K,
    Block64K,
    Chip,
}

impl EraseGranularity {
    fn opcode(self) -> u8 {
        match self {
            EraseGranularity::Sector4K => 0x20,
            EraseGranularity::Block32K => 0x52,
            EraseGranularity::Block64K => 0xD8,
            EraseGranularity::Chip => 0xC7,
        }
    }

    /// The alignment mask this granularity requires of an erase address;
    /// `None` for [`EraseGranularity::Chip`], which takes no address.
    fn alignment_mask(self) -> Option<u32> {
        match self {
            EraseGranularity::Sector4K => Some(0xFFF000),
            EraseGranularity::Block32K => Some(0xFF8000),
            EraseGranularity::Block64K => Some(0xFF0000),
            EraseGranularity::Chip => None,
        }
    }

    /// Rounds `addr` down to this granularity's boundary; a no-op for
    /// [`EraseGranularity::Chip`].
    fn align_down(self, addr: u32) -> u32 {
        match self.alignment_mask() {
            Some(mask) => addr & mask,
            None => addr,
        }
    }
}

const ERASE_TIMEOUT: Duration = Duration::from_secs(30);

impl<'a, T: Transport> FlashEngine<'a, T> {
    /// Erases `granularity` at `addr` (ignored for [`EraseGranularity::Chip`]).
    ///
    /// `addr` is rounded down to the granularity's boundary before being
    /// sent to the device. Issues write-enable, the erase command, and
    /// waits out BUSY before returning.
    pub fn erase(&mut self, granularity: EraseGranularity, addr: u32) -> Result<()> {
        let addr = granularity.align_down(addr);
        debug!("erase: {:?} at {:#08x}", granularity, addr);

        self.write_enable()?;

        let tx = match granularity {
            EraseGranularity::Chip => Vec::new(),
            _ => vec![
                ((addr >> 16) & 0xFF) as u8,
                ((addr >> 8) & 0xFF) as u8,
                (addr & 0xFF) as u8,
            ],
        };
        self.session.qspi_cmd(granularity.opcode(), &tx)?;

        let timeout = if granularity == EraseGranularity::Chip {
            Duration::from_secs(120)
        } else {
            ERASE_TIMEOUT
        };
        self.busy_wait(timeout)?;
        info!("erase: {:?} at {:#08x} complete", granularity, addr);
        Ok(())
    }
}
