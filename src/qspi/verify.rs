//! Erase-program-read-back verification (§4.5.10).

use log::{debug, info, warn};

use super::erase::EraseGranularity;
use super::FlashEngine;
use crate::error::Result;
use crate::transport::Transport;

/// The outcome of a [`FlashEngine::verify_write`] round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub bytes_checked: usize,
    /// The offset (relative to the start of `data`) of the first mismatch,
    /// if any.
    pub first_mismatch: Option<usize>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.first_mismatch.is_none()
    }
}

impl<'a, T: Transport> FlashEngine<'a, T> {
    /// Erases the sector(s) covering `addr..addr+data.len()`, programs
    /// `data`, reads it back, and reports the first differing offset, if
    /// any.
    ///
    /// Erase proceeds one 4KiB sector at a time so `data` need not be
    /// sector-aligned in length; `addr` itself must be sector-aligned.
    pub fn verify_write(&mut self, addr: u32, data: &[u8]) -> Result<VerifyReport> {
        debug!("verify_write: {} bytes at {:#08x}", data.len(), addr);
        let sector_size: u32 = 0x1000;
        let mut sector = addr & !(sector_size - 1);
        let end = addr + data.len() as u32;
        while sector < end {
            self.erase(EraseGranularity::Sector4K, sector)?;
            sector += sector_size;
        }

        self.write(addr, data)?;

        let read_back = self.read(addr, data.len() as u16)?;
        let first_mismatch = read_back
            .iter()
            .zip(data.iter())
            .position(|(a, b)| a != b)
            .or_else(|| {
                if read_back.len() != data.len() {
                    Some(read_back.len().min(data.len()))
                } else {
                    None
                }
            });

        if let Some(offset) = first_mismatch {
            warn!("verify_write: mismatch at offset {}", offset);
        } else {
            info!("verify_write: {} bytes verified ok", data.len());
        }

        Ok(VerifyReport {
            bytes_checked: data.len(),
            first_mismatch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_is_ok_iff_no_mismatch() {
        let clean = VerifyReport {
            bytes_checked: 10,
            first_mismatch: None,
        };
        assert!(clean.is_ok());

        let dirty = VerifyReport {
            bytes_checked: 10,
            first_mismatch: Some(4),
        };
        assert!(!dirty.is_ok());
    }
}
