//! OPUP framing and session layer: frame construction, CRC validation,
//! sequence tracking, and synchronous request/response correlation.

use byteorder::{ByteOrder, LittleEndian};
use log::{trace, warn};

use crate::crc32::Crc32Table;
use crate::error::{Error, Result};
use crate::opcode::Opcode;
use crate::transport::Transport;
use crate::utils::HexSlice;

const SOF: u8 = 0xA5;
const FLAG_ERROR: u8 = 0x02;
const HEADER_LEN: usize = 6;
const CRC_LEN: usize = 4;

/// An OPUP session: a transport, a sequence counter, and a CRC table.
///
/// One session owns one serial port exclusively for its lifetime (open to
/// close). Sessions are cheap to multiply within one process — the CRC
/// table is immutable and the sequence counter is session-local — but the
/// spec assumes no two sessions share a port.
pub struct Session<T: Transport> {
    pub(crate) transport: T,
    seq: u8,
    crc: Crc32Table,
    label: String,
}

impl<T: Transport> Session<T> {
    /// Wraps `transport` in a fresh session with SEQ initialised to 0 (the
    /// first `transact` call advances it to 1).
    pub fn new(transport: T, label: impl Into<String>) -> Self {
        Self {
            transport,
            seq: 0,
            crc: Crc32Table::new(),
            label: label.into(),
        }
    }

    /// Builds a request frame, transmits it, reads exactly one response
    /// frame, and validates it end to end.
    ///
    /// Advances SEQ before every request. On any framing error, the
    /// transport is left exactly as the error found it: this call never
    /// retries and never scans forward for a fresh SOF.
    pub fn transact(&mut self, opcode: Opcode, payload: &[u8]) -> Result<Vec<u8>> {
        self.seq = self.seq.wrapping_add(1);
        let opcode_byte: u8 = opcode.into();

        let len = payload.len();
        let mut frame = Vec::with_capacity(HEADER_LEN + len + CRC_LEN);
        frame.push(SOF);
        frame.push(self.seq);
        frame.push(opcode_byte);
        frame.push(0x00); // FLAGS, zero on requests
        let mut len_bytes = [0u8; 2];
        LittleEndian::write_u16(&mut len_bytes, len as u16);
        frame.extend_from_slice(&len_bytes);
        frame.extend_from_slice(payload);

        let crc = self.crc.compute(&frame);
        let mut crc_bytes = [0u8; 4];
        LittleEndian::write_u32(&mut crc_bytes, crc);
        frame.extend_from_slice(&crc_bytes);

        trace!(
            "{}: TX seq={} opcode={:?} payload={:?}",
            self.label, self.seq, opcode, HexSlice(payload)
        );
        self.transport.write_all(&frame)?;

        let mut header = [0u8; HEADER_LEN];
        let n = self.transport.read(&mut header)?;
        if n < HEADER_LEN {
            return Err(Error::Timeout {
                expected: HEADER_LEN,
                actual: n,
            });
        }
        if header[0] != SOF {
            warn!("{}: bad framing, first octet {:#04x}", self.label, header[0]);
            return Err(Error::BadFraming(header[0]));
        }

        let rx_flags = header[3];
        let rx_len = LittleEndian::read_u16(&header[4..6]) as usize;

        let mut rx_payload = vec![0u8; rx_len];
        if rx_len > 0 {
            let n = self.transport.read(&mut rx_payload)?;
            if n < rx_len {
                return Err(Error::Timeout {
                    expected: rx_len,
                    actual: n,
                });
            }
        }

        let mut crc_bytes = [0u8; CRC_LEN];
        let n = self.transport.read(&mut crc_bytes)?;
        if n < CRC_LEN {
            return Err(Error::Timeout {
                expected: CRC_LEN,
                actual: n,
            });
        }
        let received_crc = LittleEndian::read_u32(&crc_bytes);

        let mut checked = Vec::with_capacity(HEADER_LEN + rx_len);
        checked.extend_from_slice(&header);
        checked.extend_from_slice(&rx_payload);
        let computed_crc = self.crc.compute(&checked);

        if received_crc != computed_crc {
            warn!(
                "{}: CRC mismatch received={:#010x} computed={:#010x}",
                self.label, received_crc, computed_crc
            );
            return Err(Error::BadCrc {
                received: received_crc,
                computed: computed_crc,
            });
        }

        if rx_flags & FLAG_ERROR != 0 {
            warn!("{}: device error response, {} byte payload", self.label, rx_len);
            return Err(Error::DeviceError { payload: rx_payload });
        }

        trace!("{}: RX ok, {} byte payload", self.label, rx_len);
        Ok(rx_payload)
    }

    /// Closes the underlying transport. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        self.transport.close()
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        let _ = self.transport.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    fn crc_of(bytes: &[u8]) -> u32 {
        Crc32Table::new().compute(bytes)
    }

    fn frame_response(seq: u8, opcode: u8, flags: u8, payload: &[u8]) -> Vec<u8> {
        let mut header = vec![SOF, seq, opcode, flags, (payload.len() & 0xFF) as u8, ((payload.len() >> 8) & 0xFF) as u8];
        let mut to_crc = header.clone();
        to_crc.extend_from_slice(payload);
        let crc = crc_of(&to_crc);
        header.extend_from_slice(payload);
        header.extend_from_slice(&crc.to_le_bytes());
        header
    }

    #[test]
    fn ping_round_trip() {
        let script = frame_response(1, Opcode::SysPing.into(), 0x01, &[0xCA, 0xFE]);
        let transport = MockTransport::new(&script);
        let mut session = Session::new(transport, "test");
        let payload = session.transact(Opcode::SysPing, &[]).unwrap();
        assert_eq!(payload, vec![0xCA, 0xFE]);
    }

    #[test]
    fn sequence_increments_modulo_256() {
        let mut script = Vec::new();
        script.extend(frame_response(1, Opcode::SysPing.into(), 0x01, &[]));
        script.extend(frame_response(2, Opcode::SysPing.into(), 0x01, &[]));
        let transport = MockTransport::new(&script);
        let mut session = Session::new(transport, "test");
        session.transact(Opcode::SysPing, &[]).unwrap();
        assert_eq!(session.seq, 1);
        session.transact(Opcode::SysPing, &[]).unwrap();
        assert_eq!(session.seq, 2);
    }

    #[test]
    fn short_header_is_timeout() {
        let transport = MockTransport::new(&[SOF, 1, 1]);
        let mut session = Session::new(transport, "test");
        match session.transact(Opcode::SysPing, &[]) {
            Err(Error::Timeout { expected, actual }) => {
                assert_eq!(expected, HEADER_LEN);
                assert_eq!(actual, 3);
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[test]
    fn bad_sof_is_bad_framing() {
        let transport = MockTransport::new(&[0x00, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut session = Session::new(transport, "test");
        match session.transact(Opcode::SysPing, &[]) {
            Err(Error::BadFraming(0x00)) => {}
            other => panic!("expected BadFraming, got {other:?}"),
        }
    }

    #[test]
    fn crc_mismatch_is_detected() {
        let mut script = frame_response(1, Opcode::SysPing.into(), 0x01, &[0xCA, 0xFE]);
        // Corrupt the last CRC byte.
        let last = script.len() - 1;
        script[last] ^= 0xFF;
        let transport = MockTransport::new(&script);
        let mut session = Session::new(transport, "test");
        match session.transact(Opcode::SysPing, &[]) {
            Err(Error::BadCrc { .. }) => {}
            other => panic!("expected BadCrc, got {other:?}"),
        }
    }

    #[test]
    fn error_flag_yields_device_error() {
        let script = frame_response(1, Opcode::SysPing.into(), 0x01 | FLAG_ERROR, &[0x7F]);
        let transport = MockTransport::new(&script);
        let mut session = Session::new(transport, "test");
        match session.transact(Opcode::SysPing, &[]) {
            Err(Error::DeviceError { payload }) => assert_eq!(payload, vec![0x7F]),
            other => panic!("expected DeviceError, got {other:?}"),
        }
    }

    #[test]
    fn tx_frame_matches_known_ping_encoding() {
        let script = frame_response(1, Opcode::SysPing.into(), 0x01, &[0xCA, 0xFE]);
        let transport = MockTransport::new(&script);
        let mut session = Session::new(transport, "test");
        session.transact(Opcode::SysPing, &[]).unwrap();
        let expected_header = [SOF, 1, 0x01, 0x00, 0x00, 0x00];
        let expected_crc = crc_of(&expected_header);
        let mut expected = expected_header.to_vec();
        expected.extend_from_slice(&expected_crc.to_le_bytes());
        assert_eq!(session.transport.written, expected);
    }
}
