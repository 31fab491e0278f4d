//! A host-side client and flash programming engine for the OPUP serial
//! protocol: an external programmer appliance that tunnels SPI, QSPI, I2C,
//! and AVR ISP bus operations over a framed serial link.
//!
//! The framing layer ([`session`]) and command surface ([`commands`]) sit
//! directly on a [`transport::Transport`]; the flash engine ([`qspi`]) and
//! the AVR ISP sequencer ([`isp`]) are expressed entirely in terms of that
//! command surface and know nothing about CRC or SOF.

#![warn(missing_debug_implementations, rust_2018_idioms)]

mod commands;
mod crc32;
mod error;
mod isp;
mod opcode;
pub mod qspi;
mod session;
mod transport;
mod utils;

pub use crate::commands::{DeviceStatus, GpioState, StatusReport};
pub use crate::error::{Error, Result};
pub use crate::opcode::Opcode;
pub use crate::qspi::FlashEngine;
pub use crate::session::Session;
pub use crate::transport::{SerialTransport, Transport};
