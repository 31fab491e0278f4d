//! The command surface: one operation per OPUP opcode, each encoding and
//! decoding exactly one payload schema.
//!
//! Every function here validates its response length against the schema
//! before reading past the declared minimum; a short response yields
//! [`Error::ProtocolViolation`] naming the opcode and lengths involved.

use std::convert::TryInto;

use crate::error::{Error, Result};
use crate::opcode::Opcode;
use crate::session::Session;
use crate::transport::Transport;

fn require_len(opcode: Opcode, payload: &[u8], minimum: usize) -> Result<()> {
    if payload.len() < minimum {
        return Err(Error::ProtocolViolation {
            opcode,
            expected: minimum,
            actual: payload.len(),
        });
    }
    Ok(())
}

/// Device status as reported by [`Session::get_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Idle,
    Busy,
    Error,
    Unknown(u8),
}

impl From<u8> for DeviceStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => DeviceStatus::Idle,
            1 => DeviceStatus::Busy,
            2 => DeviceStatus::Error,
            other => DeviceStatus::Unknown(other),
        }
    }
}

/// Parsed Get-status (0x03) response.
#[derive(Debug, Clone, Copy)]
pub struct StatusReport {
    pub status: DeviceStatus,
    pub uptime_ms: u32,
    pub free_ram: u32,
}

/// Parsed GPIO-test (0x05) response.
#[derive(Debug, Clone, Copy)]
pub struct GpioState {
    pub cs: u8,
    pub sck: u8,
    pub mosi: u8,
    pub miso: u8,
    pub io2: u8,
    pub io3: u8,
}

impl<T: Transport> Session<T> {
    /// Ping (0x01): expects the payload `CA FE`.
    pub fn ping(&mut self) -> Result<bool> {
        let payload = self.transact(Opcode::SysPing, &[])?;
        Ok(payload == [0xCA, 0xFE])
    }

    /// Get-status (0x03).
    pub fn get_status(&mut self) -> Result<StatusReport> {
        let payload = self.transact(Opcode::SysGetStatus, &[])?;
        require_len(Opcode::SysGetStatus, &payload, 9)?;
        let uptime_ms = u32::from_le_bytes(payload[1..5].try_into().unwrap());
        let free_ram = u32::from_le_bytes(payload[5..9].try_into().unwrap());
        Ok(StatusReport {
            status: payload[0].into(),
            uptime_ms,
            free_ram,
        })
    }

    /// GPIO-test (0x05).
    pub fn gpio_test(&mut self) -> Result<GpioState> {
        let payload = self.transact(Opcode::SysGpioTest, &[])?;
        require_len(Opcode::SysGpioTest, &payload, 6)?;
        Ok(GpioState {
            cs: payload[0],
            sck: payload[1],
            mosi: payload[2],
            miso: payload[3],
            io2: payload[4],
            io3: payload[5],
        })
    }

    /// I2C-scan (0x10): returns the 7-bit addresses with devices present.
    pub fn i2c_scan(&mut self) -> Result<Vec<u8>> {
        let payload = self.transact(Opcode::I2cScan, &[])?;
        require_len(Opcode::I2cScan, &payload, 1)?;
        let count = payload[0] as usize;
        require_len(Opcode::I2cScan, &payload, 1 + count)?;
        Ok(payload[1..1 + count].to_vec())
    }

    /// SPI-scan (0x20): returns `(manufacturer, device_high, device_low)` if
    /// a device was found.
    pub fn spi_scan(&mut self) -> Result<Option<(u8, u8, u8)>> {
        let payload = self.transact(Opcode::SpiScan, &[])?;
        require_len(Opcode::SpiScan, &payload, 1)?;
        let count = payload[0];
        if count == 0 {
            return Ok(None);
        }
        require_len(Opcode::SpiScan, &payload, 4)?;
        Ok(Some((payload[1], payload[2], payload[3])))
    }

    /// SPI-xfer (0x22): raw bidirectional SPI transfer.
    pub fn spi_xfer(&mut self, out: &[u8]) -> Result<Vec<u8>> {
        self.transact(Opcode::SpiXfer, out)
    }

    /// QSPI-set-mode (0x25): returns the mode now in force.
    pub fn qspi_set_mode(&mut self, mode: u8) -> Result<u8> {
        let payload = self.transact(Opcode::QspiSetMode, &[mode])?;
        require_len(Opcode::QspiSetMode, &payload, 1)?;
        Ok(payload[0])
    }

    /// QSPI-read (0x26): `cmd`, `addr` truncated to `addr_len` little-endian
    /// octets, `dummy_cycles`, then `read_len` octets are returned.
    pub fn qspi_read(&mut self, cmd: u8, addr: u32, addr_len: u8, dummy_cycles: u8, read_len: u16) -> Result<Vec<u8>> {
        let mut payload = Vec::with_capacity(2 + addr_len as usize + 3);
        payload.push(cmd);
        payload.push(addr_len);
        for i in 0..addr_len {
            payload.push(((addr >> (i * 8)) & 0xFF) as u8);
        }
        payload.push(dummy_cycles);
        payload.extend_from_slice(&read_len.to_le_bytes());
        self.transact(Opcode::QspiRead, &payload)
    }

    /// QSPI-fast-read (0x28): reads `pages` 256-byte pages starting at the
    /// 24-bit address `addr`, using whatever mode is currently in force.
    pub fn qspi_fast_read(&mut self, addr: u32, pages: u8) -> Result<Vec<u8>> {
        let payload = [
            (addr & 0xFF) as u8,
            ((addr >> 8) & 0xFF) as u8,
            ((addr >> 16) & 0xFF) as u8,
            pages,
        ];
        self.transact(Opcode::QspiFastRead, &payload)
    }

    /// QSPI-write (0x27): `cmd`, a little-endian address of `addr_len`
    /// octets, then `data`.
    pub fn qspi_write(&mut self, cmd: u8, addr: u32, addr_len: u8, data: &[u8]) -> Result<()> {
        let mut payload = Vec::with_capacity(2 + addr_len as usize + data.len());
        payload.push(cmd);
        payload.push(addr_len);
        for i in 0..addr_len {
            payload.push(((addr >> (i * 8)) & 0xFF) as u8);
        }
        payload.extend_from_slice(data);
        self.transact(Opcode::QspiWrite, &payload)?;
        Ok(())
    }

    /// QSPI-cmd (0x29): clocks `tx` out after `cmd`, returns whatever was
    /// clocked in during the tail of the transaction.
    pub fn qspi_cmd(&mut self, cmd: u8, tx: &[u8]) -> Result<Vec<u8>> {
        let mut payload = Vec::with_capacity(2 + tx.len());
        payload.push(cmd);
        payload.push(tx.len() as u8);
        payload.extend_from_slice(tx);
        self.transact(Opcode::QspiCmd, &payload)
    }

    /// ISP-enter (0x30): true iff the device confirms it entered ISP mode.
    pub fn isp_enter(&mut self) -> Result<bool> {
        let payload = self.transact(Opcode::IspEnter, &[])?;
        require_len(Opcode::IspEnter, &payload, 1)?;
        Ok(payload[0] == 1)
    }

    /// ISP-xfer (0x31): a 4-byte AVR ISP command, returning the device's
    /// 4-byte shift-register echo.
    pub fn isp_xfer(&mut self, bytes: [u8; 4]) -> Result<[u8; 4]> {
        let payload = self.transact(Opcode::IspXfer, &bytes)?;
        require_len(Opcode::IspXfer, &payload, 4)?;
        Ok([payload[0], payload[1], payload[2], payload[3]])
    }

    /// ISP-exit (0x32).
    pub fn isp_exit(&mut self) -> Result<()> {
        self.transact(Opcode::IspExit, &[])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc32::Crc32Table;
    use crate::transport::MockTransport;

    fn frame_response(seq: u8, opcode: u8, flags: u8, payload: &[u8]) -> Vec<u8> {
        let crc = Crc32Table::new();
        let mut header = vec![
            0xA5,
            seq,
            opcode,
            flags,
            (payload.len() & 0xFF) as u8,
            ((payload.len() >> 8) & 0xFF) as u8,
        ];
        let mut to_crc = header.clone();
        to_crc.extend_from_slice(payload);
        let checksum = crc.compute(&to_crc);
        header.extend_from_slice(payload);
        header.extend_from_slice(&checksum.to_le_bytes());
        header
    }

    #[test]
    fn get_status_rejects_short_payload() {
        let script = frame_response(1, Opcode::SysGetStatus.into(), 0x01, &[0, 1, 2]);
        let transport = MockTransport::new(&script);
        let mut session = Session::new(transport, "test");
        match session.get_status() {
            Err(Error::ProtocolViolation { expected, actual, .. }) => {
                assert_eq!(expected, 9);
                assert_eq!(actual, 3);
            }
            other => panic!("expected ProtocolViolation, got {other:?}"),
        }
    }

    #[test]
    fn get_status_decodes_fields() {
        let mut payload = vec![1u8]; // Busy
        payload.extend_from_slice(&1234u32.to_le_bytes());
        payload.extend_from_slice(&4096u32.to_le_bytes());
        let script = frame_response(1, Opcode::SysGetStatus.into(), 0x01, &payload);
        let transport = MockTransport::new(&script);
        let mut session = Session::new(transport, "test");
        let report = session.get_status().unwrap();
        assert_eq!(report.status, DeviceStatus::Busy);
        assert_eq!(report.uptime_ms, 1234);
        assert_eq!(report.free_ram, 4096);
    }

    #[test]
    fn spi_scan_of_w25q128() {
        let script = frame_response(1, Opcode::SpiScan.into(), 0x01, &[0x03, 0xEF, 0x40, 0x18]);
        let transport = MockTransport::new(&script);
        let mut session = Session::new(transport, "test");
        let (mfg, dev_h, dev_l) = session.spi_scan().unwrap().unwrap();
        assert_eq!(mfg, 0xEF);
        assert_eq!(((dev_h as u16) << 8) | dev_l as u16, 0x4018);
    }

    #[test]
    fn spi_scan_reports_no_device() {
        let script = frame_response(1, Opcode::SpiScan.into(), 0x01, &[0x00]);
        let transport = MockTransport::new(&script);
        let mut session = Session::new(transport, "test");
        assert!(session.spi_scan().unwrap().is_none());
    }

    #[test]
    fn qspi_read_encodes_known_request() {
        // 16 bytes at 0x001000, standard mode: cmd=0x03 addr_len=3 little-endian
        // address then dummy=0 and read_len=16 little-endian.
        let script = frame_response(1, Opcode::QspiRead.into(), 0x01, &vec![0u8; 16]);
        let transport = MockTransport::new(&script);
        let mut session = Session::new(transport, "test");
        let data = session.qspi_read(0x03, 0x001000, 3, 0, 16).unwrap();
        assert_eq!(data.len(), 16);
        // header(6) + payload(8: cmd,addrlen,3 addr bytes,dummy,2 len bytes) + crc(4)
        assert_eq!(
            session.transport.written[6..14],
            [0x03, 0x03, 0x00, 0x10, 0x00, 0x00, 0x10, 0x00]
        );
    }
}
