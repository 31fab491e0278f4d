//! AVR ISP sequencer (§4.6): enter/exit ISP mode and the 4-byte command
//! transfers used to read a target's signature bytes.

use log::{debug, warn};

use crate::error::Result;
use crate::session::Session;
use crate::transport::Transport;

impl<T: Transport> Session<T> {
    /// Enters ISP mode, reads the three signature-byte transfers, and
    /// exits ISP mode unconditionally — even if a middle transfer failed,
    /// the device must not be left in ISP mode.
    pub fn avr_signature(&mut self) -> Result<(u8, u8, u8)> {
        debug!("avr_signature: entering ISP mode");
        self.isp_enter()?;

        let outcome = (|| -> Result<(u8, u8, u8)> {
            let mut bytes = [0u8; 3];
            for (i, slot) in bytes.iter_mut().enumerate() {
                let resp = self.isp_xfer([0x30, 0x00, i as u8, 0x00])?;
                *slot = resp[3];
            }
            Ok((bytes[0], bytes[1], bytes[2]))
        })();

        if let Err(ref e) = outcome {
            warn!("avr_signature: transfer failed, exiting ISP anyway: {e}");
        }
        self.isp_exit()?;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc32::Crc32Table;
    use crate::opcode::Opcode;
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
    fn reads_atmega328p_signature() {
        let mut script = Vec::new();
        script.extend(frame_response(1, Opcode::IspEnter.into(), 0x01, &[0x01]));
        script.extend(frame_response(2, Opcode::IspXfer.into(), 0x01, &[0x30, 0x00, 0, 0x1E]));
        script.extend(frame_response(3, Opcode::IspXfer.into(), 0x01, &[0x30, 0x00, 1, 0x95]));
        script.extend(frame_response(4, Opcode::IspXfer.into(), 0x01, &[0x30, 0x00, 2, 0x0F]));
        script.extend(frame_response(5, Opcode::IspExit.into(), 0x01, &[]));

        let transport = MockTransport::new(&script);
        let mut session = Session::new(transport, "test");
        let sig = session.avr_signature().unwrap();
        assert_eq!(sig, (0x1E, 0x95, 0x0F));
    }

    #[test]
    fn exits_isp_even_when_a_transfer_fails() {
        let mut script = Vec::new();
        script.extend(frame_response(1, Opcode::IspEnter.into(), 0x01, &[0x01]));
        // Second xfer times out: only 2 of the 6 header bytes arrive.
        script.extend(&[0xA5, 3][..]);
        script.extend(frame_response(3, Opcode::IspExit.into(), 0x01, &[]));

        let transport = MockTransport::new(&script);
        let mut session = Session::new(transport, "test");
        assert!(session.avr_signature().is_err());

        // The last outgoing request is a 10-byte empty-payload frame
        // (6-byte header + 4-byte CRC); its opcode octet must be IspExit.
        let isp_exit_byte: u8 = Opcode::IspExit.into();
        let written = &session.transport.written;
        let last_request_start = written.len() - 10;
        assert_eq!(written[last_request_start + 2], isp_exit_byte);
    }
}
