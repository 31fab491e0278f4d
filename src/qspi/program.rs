//! Page-program and the multi-page write planner (§4.5.7-4.5.8).

use std::time::Duration;

use log::{debug, trace};

use super::FlashEngine;
use crate::error::Result;
use crate::transport::Transport;

const OPCODE_PAGE_PROGRAM: u8 = 0x02;
const PAGE_SIZE: usize = 256;
const PROGRAM_TIMEOUT: Duration = Duration::from_secs(5);

impl<'a, T: Transport> FlashEngine<'a, T> {
    /// Programs a single page. `data` is truncated to 256 bytes if longer;
    /// callers that need more than one page should use [`Self::write`].
    pub fn page_program(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        debug!("page_program: {} bytes at {:#08x}", data.len(), addr);
        let data = if data.len() > PAGE_SIZE {
            &data[..PAGE_SIZE]
        } else {
            data
        };
        self.write_enable()?;
        self.session.qspi_write(OPCODE_PAGE_PROGRAM, addr, 3, data)?;
        self.busy_wait(PROGRAM_TIMEOUT)?;
        trace!("page_program: {} bytes at {:#08x}", data.len(), addr);
        Ok(())
    }

    /// Writes an arbitrarily long buffer starting at `addr`, splitting it
    /// into page-program calls that never cross a 256-byte page boundary.
    ///
    /// Fails fast on the first page-program error; bytes already
    /// programmed before the failing chunk are not rolled back.
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < data.len() {
            let cur_addr = addr.wrapping_add(offset as u32);
            let page_offset = (cur_addr as usize) & (PAGE_SIZE - 1);
            let remaining_in_page = PAGE_SIZE - page_offset;
            let chunk_len = remaining_in_page.min(data.len() - offset);
            let chunk = &data[offset..offset + chunk_len];
            debug!(
                "write: chunk of {} bytes at {:#08x} (page offset {})",
                chunk_len, cur_addr, page_offset
            );
            self.page_program(cur_addr, chunk)?;
            offset += chunk_len;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_chunks(addr: u32, len: usize) -> Vec<(u32, usize)> {
        let mut chunks = Vec::new();
        let mut offset = 0usize;
        while offset < len {
            let cur_addr = addr.wrapping_add(offset as u32);
            let page_offset = (cur_addr as usize) & (PAGE_SIZE - 1);
            let remaining_in_page = PAGE_SIZE - page_offset;
            let chunk_len = remaining_in_page.min(len - offset);
            chunks.push((cur_addr, chunk_len));
            offset += chunk_len;
        }
        chunks
    }

    #[test]
    fn single_page_fits_in_one_chunk() {
        let chunks = plan_chunks(0x000000, 100);
        assert_eq!(chunks, vec![(0x000000, 100)]);
    }

    #[test]
    fn crosses_page_boundary_into_two_chunks() {
        // Starting 200 bytes into a page, writing 150 bytes: 56 bytes fit
        // in the first page, 94 spill into the next.
        let chunks = plan_chunks(0x0000C8, 150);
        assert_eq!(chunks, vec![(0x0000C8, 56), (0x000100, 94)]);
    }

    #[test]
    fn exact_page_multiple_splits_cleanly() {
        let chunks = plan_chunks(0x000000, 512);
        assert_eq!(chunks, vec![(0x000000, 256), (0x000100, 256)]);
    }
}
