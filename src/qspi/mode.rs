//! The six SPI/QSPI lane-width modes a device can be switched between.

/// SPI-lane mode, named by command/address/data lane counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SpiMode {
    /// 1-1-1: standard single-lane SPI.
    Standard = 0,
    /// 1-1-2: data phase on 2 lines.
    DualOutput = 1,
    /// 1-2-2: address and data on 2 lines.
    DualIo = 2,
    /// 1-1-4: data phase on 4 lines.
    QuadOutput = 3,
    /// 1-4-4: address and data on 4 lines.
    QuadIo = 4,
    /// 4-4-4: everything on 4 lines.
    Qpi = 5,
}

impl SpiMode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for SpiMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SpiMode::Standard => "Standard (1-1-1)",
            SpiMode::DualOutput => "Dual-Output (1-1-2)",
            SpiMode::DualIo => "Dual-IO (1-2-2)",
            SpiMode::QuadOutput => "Quad-Output (1-1-4)",
            SpiMode::QuadIo => "Quad-IO (1-4-4)",
            SpiMode::Qpi => "QPI (4-4-4)",
        };
        f.write_str(name)
    }
}
