//! JEDEC identification (§4.5.1).

use log::{debug, info};

use super::FlashEngine;
use crate::error::Result;
use crate::qspi::mode::SpiMode;
use crate::transport::Transport;

const OPCODE_READ_JEDEC: u8 = 0x9F;

/// The 3-octet JEDEC manufacturer/device identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identification {
    pub manufacturer: u8,
    pub device_high: u8,
    pub device_low: u8,
}

impl Identification {
    /// `(device_high << 8) | device_low`.
    pub fn device_id(&self) -> u16 {
        ((self.device_high as u16) << 8) | self.device_low as u16
    }

    /// A manufacturer of `0x00` or `0xFF` means no device responded.
    pub fn is_present(&self) -> bool {
        self.manufacturer != 0x00 && self.manufacturer != 0xFF
    }

    /// Best-effort human-readable manufacturer name, for logging/display
    /// only; it carries no behavioral weight.
    pub fn manufacturer_name(&self) -> &'static str {
        match self.manufacturer {
            0xEF => "Winbond",
            0xC8 => "GigaDevice",
            0xC2 => "Macronix",
            0x01 => "Spansion/Cypress",
            0x20 => "Micron/Numonyx",
            0xBF => "SST/Microchip",
            _ => "Unknown",
        }
    }
}

impl<'a, T: Transport> FlashEngine<'a, T> {
    /// Sets mode to Standard, issues JEDEC-ID (0x9F), and reports the
    /// manufacturer/device triple.
    pub fn identify(&mut self) -> Result<Identification> {
        debug!("identify: setting mode to Standard before JEDEC read");
        self.session.qspi_set_mode(SpiMode::Standard.as_u8())?;
        let resp = self.session.qspi_cmd(OPCODE_READ_JEDEC, &[0x00, 0x00, 0x00])?;
        let ident = Identification {
            manufacturer: resp.first().copied().unwrap_or(0),
            device_high: resp.get(1).copied().unwrap_or(0),
            device_low: resp.get(2).copied().unwrap_or(0),
        };
        if ident.is_present() {
            info!(
                "identify: {} (0x{:02X}) device 0x{:04X}",
                ident.manufacturer_name(),
                ident.manufacturer,
                ident.device_id()
            );
        } else {
            info!("identify: no device on bus");
        }
        Ok(ident)
    }
}
