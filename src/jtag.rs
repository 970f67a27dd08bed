//! Raw JTAG shifts.
//!
//! Each byte of a shift carries eight TCK cycles, LSB first. Slow mode sends
//! a TMS byte alongside every TDI byte so the caller can walk the TAP state
//! machine; fast mode sends TDI only with TMS held low, for long data phases
//! in Shift-DR.

use crate::cmd::{JtagCmd, Opcode, Result, UsbJtagError};
use crate::conn::UsbJtag;
use crate::usb::Transport;
use crate::{JTAG_FAST_MAX, JTAG_SLOW_MAX};

fn slow_payload(tms: &[u8], tdi: &[u8]) -> Result<Vec<u8>> {
    if tdi.is_empty() || tdi.len() > JTAG_SLOW_MAX || tms.len() != tdi.len() {
        return Err(UsbJtagError::InvalidLength);
    }
    let mut payload = Vec::with_capacity(tms.len() * 2);
    payload.extend_from_slice(tms);
    payload.extend_from_slice(tdi);
    Ok(payload)
}

fn check_fast(tdi: &[u8]) -> Result<()> {
    if tdi.is_empty() || tdi.len() > JTAG_FAST_MAX {
        return Err(UsbJtagError::InvalidLength);
    }
    Ok(())
}

impl<B: Transport> UsbJtag<B> {
    /// Shifts paired TMS/TDI bytes (1 to 31 of each).
    pub fn jtag_write(&mut self, tms: &[u8], tdi: &[u8]) -> Result<()> {
        let payload = slow_payload(tms, tdi)?;
        self.send(Opcode::Jtag as u8, JtagCmd::Write as u8, &payload)
    }

    /// Shifts paired TMS/TDI bytes and returns the TDO byte captured for
    /// each, in shift order.
    pub fn jtag_write_read(&mut self, tms: &[u8], tdi: &[u8]) -> Result<Vec<u8>> {
        let payload = slow_payload(tms, tdi)?;
        self.call(
            Opcode::Jtag as u8,
            JtagCmd::WriteRead as u8,
            &payload,
            Some(tdi.len()),
        )
    }

    /// Shifts 1 to 62 TDI bytes with TMS low.
    pub fn jtag_write_fast(&mut self, tdi: &[u8]) -> Result<()> {
        check_fast(tdi)?;
        self.send(Opcode::Jtag as u8, JtagCmd::FastWrite as u8, tdi)
    }

    pub fn jtag_write_read_fast(&mut self, tdi: &[u8]) -> Result<Vec<u8>> {
        check_fast(tdi)?;
        self.call(
            Opcode::Jtag as u8,
            JtagCmd::FastWriteRead as u8,
            tdi,
            Some(tdi.len()),
        )
    }

    /// Clocks `count` bytes worth of TMS=0 cycles, keeping the TAP in
    /// Run-Test/Idle. A count of zero still clocks one byte.
    pub fn run_test_idle(&mut self, count: usize) -> Result<()> {
        if count == 0 {
            return self.jtag_write(&[0x00], &[0x00]);
        }

        let zeros = [0u8; JTAG_SLOW_MAX];
        let mut left = count;
        while left > 0 {
            let n = left.min(JTAG_SLOW_MAX);
            self.jtag_write(&zeros[..n], &zeros[..n])?;
            left -= n;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slow_payload_is_tms_then_tdi() {
        let p = slow_payload(&[0x30, 0x80, 0x01], &[0x00, 0x11, 0x00]).unwrap();
        assert_eq!(p, vec![0x30, 0x80, 0x01, 0x00, 0x11, 0x00]);
    }

    #[test]
    fn slow_payload_bounds() {
        assert!(slow_payload(&[], &[]).is_err());
        assert!(slow_payload(&[0; 2], &[0; 3]).is_err());
        assert!(slow_payload(&[0; 32], &[0; 32]).is_err());
        assert_eq!(slow_payload(&[0; 31], &[0; 31]).unwrap().len(), 62);
    }

    #[test]
    fn fast_bounds() {
        assert!(check_fast(&[]).is_err());
        assert!(check_fast(&[0; 62]).is_ok());
        assert!(check_fast(&[0; 63]).is_err());
    }
}
