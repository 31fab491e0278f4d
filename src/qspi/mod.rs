//! The QSPI flash programming engine: JEDEC identification, mode
//! negotiation, vendor-dispatched Quad-Enable, status polling,
//! multi-granularity erase, page-oriented program, and the read/verify
//! and benchmark test routines built on top of those primitives.
//!
//! Every operation here is expressed purely in terms of the command
//! surface in [`crate::commands`]; nothing below this layer knows about
//! CRC or SOF.

mod benchmark;
mod erase;
mod identify;
mod mode;
mod program;
mod quad_enable;
mod read;
mod status;
mod verify;

pub use benchmark::BenchmarkResult;
pub use erase::EraseGranularity;
pub use identify::Identification;
pub use mode::SpiMode;
pub use quad_enable::Vendor;
pub use status::Status;
pub use verify::VerifyReport;

use crate::session::Session;
use crate::transport::Transport;

/// The flash engine: a thin wrapper around a [`Session`] that sequences
/// QSPI command-surface calls into the higher-level operations a NOR flash
/// programming session needs.
pub struct FlashEngine<'a, T: Transport> {
    pub(crate) session: &'a mut Session<T>,
}

impl<'a, T: Transport> FlashEngine<'a, T> {
    /// Wraps an existing session. Does not touch the bus; call
    /// [`FlashEngine::identify`] to confirm a device responds.
    pub fn new(session: &'a mut Session<T>) -> Self {
        Self { session }
    }
}
