//! The closed OPUP opcode enumeration, partitioned by family.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// An OPUP command opcode.
///
/// The discriminant space is partitioned by family: system (0x01-0x05),
/// I2C (0x10-0x12), SPI (0x20-0x22), QSPI (0x25-0x29), ISP (0x30-0x32),
/// SWD (0x40-0x42). Not every opcode the device accepts has a corresponding
/// command-surface function in this crate; the set the core emits is a
/// subset of this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    /// 0x01 - system ping.
    SysPing = 0x01,
    /// 0x02 - system capability query (not emitted by this crate).
    SysGetCaps = 0x02,
    /// 0x03 - system status query.
    SysGetStatus = 0x03,
    /// 0x04 - system reset (not emitted by this crate).
    SysReset = 0x04,
    /// 0x05 - debug GPIO state read.
    SysGpioTest = 0x05,

    /// 0x10 - I2C bus scan.
    I2cScan = 0x10,
    /// 0x11 - I2C read (not emitted by this crate).
    I2cRead = 0x11,
    /// 0x12 - I2C write (not emitted by this crate).
    I2cWrite = 0x12,

    /// 0x20 - SPI flash scan (JEDEC ID via the device's built-in probe).
    SpiScan = 0x20,
    /// 0x21 - SPI bus configuration (not emitted by this crate).
    SpiConfig = 0x21,
    /// 0x22 - raw SPI transfer.
    SpiXfer = 0x22,

    /// 0x25 - select the QSPI lane mode.
    QspiSetMode = 0x25,
    /// 0x26 - generic QSPI read.
    QspiRead = 0x26,
    /// 0x27 - generic QSPI write.
    QspiWrite = 0x27,
    /// 0x28 - fast page-oriented QSPI read in the mode currently in force.
    QspiFastRead = 0x28,
    /// 0x29 - raw QSPI command/response transaction.
    QspiCmd = 0x29,

    /// 0x30 - enter AVR ISP mode.
    IspEnter = 0x30,
    /// 0x31 - 4-byte AVR ISP transfer.
    IspXfer = 0x31,
    /// 0x32 - exit AVR ISP mode.
    IspExit = 0x32,

    /// 0x40 - SWD init (not emitted by this crate).
    SwdInit = 0x40,
    /// 0x41 - SWD read (not emitted by this crate).
    SwdRead = 0x41,
    /// 0x42 - SWD write (not emitted by this crate).
    SwdWrite = 0x42,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryFrom;

    #[test]
    fn round_trips_through_u8() {
        let byte: u8 = Opcode::QspiFastRead.into();
        assert_eq!(byte, 0x28);
        assert_eq!(Opcode::try_from(0x28u8).unwrap(), Opcode::QspiFastRead);
    }

    #[test]
    fn rejects_unknown_discriminant() {
        assert!(Opcode::try_from(0x99u8).is_err());
    }
}
