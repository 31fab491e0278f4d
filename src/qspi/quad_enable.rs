//! Vendor-dispatched Quad-Enable (§4.5.5).

use std::thread::sleep;
use std::time::Duration;

use log::{debug, info};

use super::identify::Identification;
use super::status::Status;
use super::FlashEngine;
use crate::error::{Error, Result};
use crate::transport::Transport;

const OPCODE_WRITE_SR1: u8 = 0x01;
const OPCODE_WRITE_SR2: u8 = 0x31;
const QE_SETTLE: Duration = Duration::from_millis(100);

/// Which status-register convention a part follows for its Quad-Enable
/// bit, dispatched on JEDEC manufacturer ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    /// 0xEF: QE lives in SR2 bit 1.
    Winbond,
    /// 0xC8: same SR2-bit-1 convention as Winbond.
    GigaDevice,
    /// 0xC2: QE lives in SR1 bit 6.
    Macronix,
    /// Anything else: treated as Winbond, per spec fallback.
    Other,
}

impl Vendor {
    pub fn from_manufacturer(id: u8) -> Self {
        match id {
            0xEF => Vendor::Winbond,
            0xC8 => Vendor::GigaDevice,
            0xC2 => Vendor::Macronix,
            _ => Vendor::Other,
        }
    }
}

impl From<Identification> for Vendor {
    fn from(ident: Identification) -> Self {
        Vendor::from_manufacturer(ident.manufacturer)
    }
}

impl<'a, T: Transport> FlashEngine<'a, T> {
    /// Ensures the Quad-Enable bit is set for `vendor`'s convention.
    ///
    /// Idempotent: if the bit already reads set, no write is issued. After
    /// writing, waits ~100ms and re-reads to confirm before returning.
    pub fn quad_enable(&mut self, vendor: Vendor) -> Result<()> {
        match vendor {
            Vendor::Macronix => self.set_macronix_qe(),
            Vendor::Winbond | Vendor::GigaDevice | Vendor::Other => self.set_winbond_qe(),
        }
    }

    fn set_macronix_qe(&mut self) -> Result<()> {
        let sr1 = self.read_sr1()?;
        if sr1.contains(Status::MACRONIX_QE) {
            debug!("quad_enable: Macronix QE already set");
            return Ok(());
        }
        self.write_enable()?;
        let new_sr1 = sr1 | Status::MACRONIX_QE;
        self.session.qspi_cmd(OPCODE_WRITE_SR1, &[new_sr1.bits()])?;
        sleep(QE_SETTLE);
        let confirmed = self.read_sr1()?;
        if !confirmed.contains(Status::MACRONIX_QE) {
            return Err(Error::OperationFailed(
                "Macronix QE bit did not latch in SR1".into(),
            ));
        }
        info!("quad_enable: Macronix QE set");
        Ok(())
    }

    fn set_winbond_qe(&mut self) -> Result<()> {
        let sr2 = self.read_sr2()?;
        if sr2.contains(Status::WINBOND_QE) {
            debug!("quad_enable: Winbond/GigaDevice QE already set");
            return Ok(());
        }
        self.write_enable()?;
        let new_sr2 = sr2 | Status::WINBOND_QE;
        self.session.qspi_cmd(OPCODE_WRITE_SR2, &[new_sr2.bits()])?;
        sleep(QE_SETTLE);
        let confirmed = self.read_sr2()?;
        if !confirmed.contains(Status::WINBOND_QE) {
            return Err(Error::OperationFailed(
                "Winbond/GigaDevice QE bit did not latch in SR2".into(),
            ));
        }
        info!("quad_enable: Winbond/GigaDevice QE set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_known_manufacturers() {
        assert_eq!(Vendor::from_manufacturer(0xEF), Vendor::Winbond);
        assert_eq!(Vendor::from_manufacturer(0xC8), Vendor::GigaDevice);
        assert_eq!(Vendor::from_manufacturer(0xC2), Vendor::Macronix);
        assert_eq!(Vendor::from_manufacturer(0x01), Vendor::Other);
    }
}
