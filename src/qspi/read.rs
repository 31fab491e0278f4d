//! Plain read-data (§4.5.9), issued through [`crate::commands`]'s
//! QSPI-read command surface at a fixed 3-octet address and no dummy
//! cycles.

use log::debug;

use super::FlashEngine;
use crate::error::Result;
use crate::qspi::mode::SpiMode;
use crate::transport::Transport;

const OPCODE_READ: u8 = 0x03;
const ADDR_LEN: u8 = 3;
const DUMMY_CYCLES: u8 = 0;

impl<'a, T: Transport> FlashEngine<'a, T> {
    /// Sets mode to Standard, then reads `len` bytes starting at `addr`
    /// using the standard 0x03 read-data command.
    pub fn read(&mut self, addr: u32, len: u16) -> Result<Vec<u8>> {
        debug!("read: {} bytes at {:#08x}", len, addr);
        self.session.qspi_set_mode(SpiMode::Standard.as_u8())?;
        self.session
            .qspi_read(OPCODE_READ, addr, ADDR_LEN, DUMMY_CYCLES, len)
    }
}
