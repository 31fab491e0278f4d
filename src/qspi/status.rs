//! Status-register reads, write-enable, and busy polling (§4.5.2-4.5.4).

use std::thread::sleep;
use std::time::{Duration, Instant};

use bitflags::bitflags;
use log::{debug, trace, warn};

use super::FlashEngine;
use crate::error::{Error, Result};
use crate::transport::Transport;

const OPCODE_READ_SR1: u8 = 0x05;
const OPCODE_READ_SR2: u8 = 0x35;
const OPCODE_WRITE_ENABLE: u8 = 0x06;

const BUSY_POLL_INTERVAL: Duration = Duration::from_millis(1);

bitflags! {
    /// Bits common to SR1/SR2 across the vendors this engine dispatches on.
    ///
    /// `MACRONIX_QE` and `WINBOND_QE` occupy different bit positions
    /// (SR1 bit 6 vs SR2 bit 1) and are never both meaningful for the same
    /// part; [`crate::qspi::quad_enable`] picks the right one per vendor.
    pub struct Status: u8 {
        const BUSY = 0b0000_0001;
        const WEL = 0b0000_0010;
        const MACRONIX_QE = 0b0100_0000;
        const WINBOND_QE = 0b0000_0010;
    }
}

impl<'a, T: Transport> FlashEngine<'a, T> {
    /// Reads SR1 (opcode 0x05). QSPI-cmd's response is clocked in during the
    /// tail of the transaction, so a status byte must be sent one zero
    /// octet to clock it out on.
    pub fn read_sr1(&mut self) -> Result<Status> {
        let resp = self.session.qspi_cmd(OPCODE_READ_SR1, &[0x00])?;
        let byte = resp.first().copied().ok_or_else(|| {
            Error::OperationFailed("SR1 read returned no status byte".into())
        })?;
        Ok(Status::from_bits_truncate(byte))
    }

    /// Reads SR2 (opcode 0x35). See [`Self::read_sr1`] for why a zero octet
    /// is sent.
    pub fn read_sr2(&mut self) -> Result<Status> {
        let resp = self.session.qspi_cmd(OPCODE_READ_SR2, &[0x00])?;
        let byte = resp.first().copied().ok_or_else(|| {
            Error::OperationFailed("SR2 read returned no status byte".into())
        })?;
        Ok(Status::from_bits_truncate(byte))
    }

    /// Issues Write-Enable (0x06), then reads SR1 back to confirm WEL is
    /// set. Returns [`Error::OperationFailed`] if the device never latched
    /// it.
    pub fn write_enable(&mut self) -> Result<()> {
        debug!("write_enable");
        self.session.qspi_cmd(OPCODE_WRITE_ENABLE, &[])?;
        let sr1 = self.read_sr1()?;
        if !sr1.contains(Status::WEL) {
            warn!("write_enable: WEL did not latch, SR1={:#04x}", sr1.bits());
            return Err(Error::OperationFailed(
                "write-enable latch not observed in SR1".into(),
            ));
        }
        trace!("write_enable: WEL confirmed");
        Ok(())
    }

    /// Polls SR1.BUSY at ~1ms intervals until it clears or `timeout`
    /// elapses.
    pub fn busy_wait(&mut self, timeout: Duration) -> Result<()> {
        debug!("busy_wait: timeout {:?}", timeout);
        let start = Instant::now();
        loop {
            let sr1 = self.read_sr1()?;
            if !sr1.contains(Status::BUSY) {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                warn!("busy_wait: timed out after {:?}", timeout);
                return Err(Error::OperationFailed(format!(
                    "device still busy after {:?}",
                    timeout
                )));
            }
            sleep(BUSY_POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_bits_are_distinct_where_it_matters() {
        assert_eq!(Status::BUSY.bits(), 0x01);
        assert_eq!(Status::WEL.bits(), 0x02);
        assert_eq!(Status::MACRONIX_QE.bits(), 0x40);
    }

    #[test]
    fn busy_and_wel_combine() {
        let both = Status::BUSY | Status::WEL;
        assert!(both.contains(Status::BUSY));
        assert!(both.contains(Status::WEL));
        assert!(!both.contains(Status::MACRONIX_QE));
    }
}
