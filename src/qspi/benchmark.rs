//! Per-mode read throughput benchmark (§4.5.11).

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::FlashEngine;
use crate::error::Result;
use crate::transport::Transport;

/// The (mode, opcode, dummy-cycle) tuples exercised by [`FlashEngine::benchmark`],
/// in the order the device firmware documents them. Mode 0 appears twice:
/// once for the plain read-data command, once for fast-read.
const MODES: &[(u8, u8, u8)] = &[
    (0, 0x03, 0), // Standard read
    (0, 0x0B, 8), // Standard fast-read
    (1, 0x3B, 8), // Dual-Output
    (2, 0xBB, 4), // Dual-IO
    (3, 0x6B, 8), // Quad-Output
    (4, 0xEB, 6), // Quad-IO
];

/// One mode's measured read throughput.
#[derive(Debug, Clone, Copy)]
pub struct BenchmarkResult {
    pub mode: u8,
    pub bytes_read: usize,
    pub elapsed: Duration,
    /// `Some` iff this mode's read failed; a non-fatal data point rather
    /// than aborting the rest of the sweep.
    pub error: Option<String>,
}

impl BenchmarkResult {
    pub fn bytes_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() == 0.0 {
            return 0.0;
        }
        self.bytes_read as f64 / self.elapsed.as_secs_f64()
    }
}

impl<'a, T: Transport> FlashEngine<'a, T> {
    /// Switches through each documented mode and times one `read_len`-byte
    /// read from `addr`, restoring Standard mode afterward. A mode whose
    /// read fails is recorded as a non-fatal data point; the sweep
    /// continues with the remaining modes.
    pub fn benchmark(&mut self, addr: u32, read_len: u16) -> Result<Vec<BenchmarkResult>> {
        debug!("benchmark: {} bytes at {:#08x} across {} modes", read_len, addr, MODES.len());
        let mut results = Vec::with_capacity(MODES.len());
        for &(mode, cmd, dummy) in MODES {
            let attempt = (|| -> Result<(usize, Duration)> {
                self.session.qspi_set_mode(mode)?;
                let start = Instant::now();
                let data = self.session.qspi_read(cmd, addr, 3, dummy, read_len)?;
                Ok((data.len(), start.elapsed()))
            })();
            match attempt {
                Ok((bytes_read, elapsed)) => {
                    info!("benchmark: mode {} read {} bytes in {:?}", mode, bytes_read, elapsed);
                    results.push(BenchmarkResult {
                        mode,
                        bytes_read,
                        elapsed,
                        error: None,
                    });
                }
                Err(e) => {
                    warn!("benchmark: mode {} failed: {}", mode, e);
                    results.push(BenchmarkResult {
                        mode,
                        bytes_read: 0,
                        elapsed: Duration::from_secs(0),
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        self.session.qspi_set_mode(0)?;
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_all_documented_tuples() {
        assert_eq!(MODES.len(), 6);
        assert_eq!(MODES[0], (0, 0x03, 0));
        assert_eq!(MODES[1], (0, 0x0B, 8));
        assert_eq!(MODES.last(), Some(&(4, 0xEB, 6)));
    }

    #[test]
    fn throughput_is_zero_for_zero_elapsed() {
        let result = BenchmarkResult {
            mode: 0,
            bytes_read: 100,
            elapsed: Duration::from_secs(0),
            error: None,
        };
        assert_eq!(result.bytes_per_second(), 0.0);
    }

    #[test]
    fn failed_mode_is_a_data_point_not_a_panic() {
        let result = BenchmarkResult {
            mode: 3,
            bytes_read: 0,
            elapsed: Duration::from_secs(0),
            error: Some("device timed out".into()),
        };
        assert!(result.error.is_some());
        assert_eq!(result.bytes_per_second(), 0.0);
    }
}
